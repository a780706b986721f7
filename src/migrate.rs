//! `fsearch init`: create the database and the configured index.

use anyhow::Result;

use fractal_search_core::store::SearchBackend;

use crate::config::Config;
use crate::db;
use crate::sqlite_backend::SqliteBackend;

/// Create the SQLite file and index tables. Safe to run repeatedly.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let schema = config.schema();
    let backend = SqliteBackend::new(pool.clone(), &schema)?;

    backend.ensure_index(&schema).await?;

    pool.close().await;
    Ok(())
}
