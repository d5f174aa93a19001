//! SQLite-backed implementation of the core store traits.
//!
//! Records and subscribers live in the `records` and `subscribers` tables
//! created by [`crate::migrate`]. Both identity columns are `UNIQUE`, and
//! every insert is `INSERT OR IGNORE`, so duplicate keys never produce a
//! second row regardless of what the caller checked beforehand.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use listing_watch_core::models::{Record, Subscriber};
use listing_watch_core::store::{RecordStore, SubscriberStore};

use crate::config::Config;
use crate::{db, migrate};

/// SQLite implementation of [`RecordStore`] and [`SubscriberStore`].
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect using the configured path and make sure the schema exists.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(&config.db).await?;
        migrate::apply(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn record_from_row(row: &SqliteRow) -> Result<Record> {
    let year: i64 = row.try_get("year")?;
    Ok(Record {
        car_id: row.try_get("car_id")?,
        title: row.try_get("title")?,
        year: u32::try_from(year)?,
        mileage: row.try_get("mileage")?,
        price: row.try_get("price")?,
        credit: row.try_get("credit")?,
        fuel: row.try_get("fuel")?,
        engine: row.try_get("engine")?,
        drive: row.try_get("drive")?,
        power: row.try_get("power")?,
        transmission: row.try_get("transmission")?,
        body: row.try_get("body")?,
        link: row.try_get("link")?,
    })
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn find_all(&self) -> Result<Vec<Record>> {
        let rows = sqlx::query(
            r#"
            SELECT car_id, title, year, mileage, price, credit, fuel, engine,
                   drive, power, transmission, body, link
            FROM records
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn find_all_ids(&self) -> Result<HashSet<String>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT car_id FROM records")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().collect())
    }

    async fn insert_many(&self, records: &[Record]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;
        let mut written = 0u64;

        for record in records {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO records (car_id, title, year, mileage, price, credit, fuel,
                                               engine, drive, power, transmission, body, link,
                                               first_seen_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.car_id)
            .bind(&record.title)
            .bind(i64::from(record.year))
            .bind(&record.mileage)
            .bind(&record.price)
            .bind(&record.credit)
            .bind(&record.fuel)
            .bind(&record.engine)
            .bind(&record.drive)
            .bind(&record.power)
            .bind(&record.transmission)
            .bind(&record.body)
            .bind(&record.link)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }

    async fn count(&self) -> Result<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }
}

#[async_trait]
impl SubscriberStore for SqliteStore {
    async fn find_subscriber(&self, id: i64) -> Result<Option<Subscriber>> {
        let found: Option<i64> = sqlx::query_scalar("SELECT chat_id FROM subscribers WHERE chat_id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.map(Subscriber::new))
    }

    async fn insert_subscriber(&self, subscriber: Subscriber) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO subscribers (chat_id, registered_at) VALUES (?, ?)",
        )
        .bind(subscriber.id)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_subscribers(&self) -> Result<Vec<Subscriber>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT chat_id FROM subscribers ORDER BY seq ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(Subscriber::new).collect())
    }
}
