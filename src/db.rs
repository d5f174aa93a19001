//! SQLite pool for the record set and the subscriber registry.
//!
//! The scheduler's cycle and the `/start` listener write from separate
//! tasks, so the pool runs in WAL mode and waits on a locked database
//! instead of failing the write.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;
use std::time::Duration;

use crate::config::DbConfig;

/// How long a writer waits for a competing write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// At most one connection per concurrent task.
const MAX_CONNECTIONS: u32 = 4;

pub async fn connect(db: &DbConfig) -> Result<SqlitePool> {
    let db_path = &db.path;

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(BUSY_TIMEOUT);

    SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open listing database at {}", db_path.display()))
}
