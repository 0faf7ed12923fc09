use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

use kiosk_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

/// Milliseconds SQLite waits on a locked database before surfacing
/// SQLITE_BUSY. Order commits from different customers contend on the
/// products table, so writers back off rather than fail immediately.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Opens the pool described by `config`. Each new connection enables
/// foreign-key enforcement (off by default in SQLite), WAL journaling so
/// readers never block the committing writer, and the busy timeout above.
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query(&format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS}"))
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .connect(&config.url)
        .await
}

#[cfg(test)]
pub(crate) fn test_config(url: &str) -> DatabaseConfig {
    DatabaseConfig {
        url: url.to_string(),
        max_connections: 1,
        acquire_timeout_secs: 5,
    }
}
