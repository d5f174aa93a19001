use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(&config.db).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the schema on an open pool. Idempotent.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // Seen listings; car_id is the identity key
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            car_id TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            year INTEGER NOT NULL,
            mileage TEXT,
            price TEXT,
            credit TEXT,
            fuel TEXT,
            engine TEXT,
            drive TEXT,
            power TEXT,
            transmission TEXT,
            body TEXT,
            link TEXT NOT NULL,
            first_seen_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Chats registered via /start
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS subscribers (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            chat_id INTEGER NOT NULL UNIQUE,
            registered_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
