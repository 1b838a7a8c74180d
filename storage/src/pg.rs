//! Pool setup and the one place a sqlx error becomes a domain error.

use sqlx::postgres::{PgPool, PgPoolOptions};

use stakeboard_core::{Error, Result};

/// Opens a pool against `database_url` and runs every migration under
/// `migrations/` that hasn't already been applied. Safe to call on
/// every process start: `sqlx::migrate!` tracks applied versions in its
/// own `_sqlx_migrations` table.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(pg_err)?;
    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| Error::Storage(e.to_string()))?;
    Ok(pool)
}

pub(crate) fn pg_err(e: sqlx::Error) -> Error {
    Error::Storage(e.to_string())
}
