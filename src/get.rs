//! Document retrieval by id, for `fsearch get`.

use anyhow::{bail, Result};

use fractal_search_core::store::{LabeledDocument, SearchBackend};

use crate::config::Config;
use crate::db;
use crate::sqlite_backend::SqliteBackend;

pub async fn get_document(config: &Config, id: &str) -> Result<LabeledDocument> {
    let pool = db::connect(config).await?;
    let backend = SqliteBackend::new(pool.clone(), &config.schema())?;

    let result = backend.get_document(id).await;
    pool.close().await;

    match result? {
        Some(doc) => Ok(doc),
        None => bail!("document not found: {}", id),
    }
}

/// CLI entry point for `fsearch get <id>`.
pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let doc = get_document(config, id).await?;

    println!("id:    {}", doc.id);
    println!("label: {}", doc.label);
    println!();
    println!("{}", doc.text);

    Ok(())
}
