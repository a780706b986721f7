//! Labelling and indexing commands.
//!
//! Coordinates the full flow: source → documents → partition →
//! `(id, text, label)` triples → SQLite backend.

use anyhow::{bail, Result};
use std::path::Path;
use tracing::info;

use fractal_search_core::document::Document;
use fractal_search_core::partition::{LabelMapping, Partitioner, ROOT_LABEL};
use fractal_search_core::pipeline::label_and_index;
use fractal_search_core::store::{LabeledDocument, SearchBackend};

use crate::config::Config;
use crate::db;
use crate::sources;
use crate::sqlite_backend::SqliteBackend;

/// Where to read documents from.
#[derive(Debug, Clone)]
pub enum DocumentSource<'a> {
    JsonFile(&'a Path),
    Filesystem,
}

pub fn load_documents(config: &Config, source: &DocumentSource<'_>) -> Result<Vec<Document>> {
    match source {
        DocumentSource::JsonFile(path) => sources::load_json_file(path),
        DocumentSource::Filesystem => sources::scan_filesystem(config),
    }
}

fn partitioner(config: &Config, max_documents: Option<usize>) -> Result<Partitioner> {
    let max = max_documents.unwrap_or(config.partition.max_documents);
    if max < 1 {
        bail!("--max-documents must be >= 1");
    }
    Ok(Partitioner::new(max))
}

/// Partition and index `documents` into the configured SQLite index.
pub async fn index_documents(
    config: &Config,
    documents: &[Document],
    max_documents: Option<usize>,
) -> Result<LabelMapping> {
    let partitioner = partitioner(config, max_documents)?;
    let pool = db::connect(config).await?;
    let schema = config.schema();
    let backend = SqliteBackend::new(pool.clone(), &schema)?;

    let mapping = label_and_index(&backend, &schema, &partitioner, documents).await?;

    pool.close().await;
    Ok(mapping)
}

/// Index one document under a caller-chosen label (default `root`).
pub async fn add_document(
    config: &Config,
    id: &str,
    text: &str,
    label: Option<&str>,
) -> Result<LabeledDocument> {
    let doc = Document::new(id, text)?;
    let labeled = LabeledDocument {
        id: doc.id().to_string(),
        text: doc.text().to_string(),
        label: label.unwrap_or(ROOT_LABEL).to_string(),
    };

    let pool = db::connect(config).await?;
    let schema = config.schema();
    let backend = SqliteBackend::new(pool.clone(), &schema)?;
    backend.ensure_index(&schema).await?;
    backend.upsert_documents(std::slice::from_ref(&labeled)).await?;
    backend.refresh().await?;
    pool.close().await;

    info!(id = %labeled.id, label = %labeled.label, "indexed document");
    Ok(labeled)
}

/// CLI entry point for `fsearch label`: partition and print, no writes.
pub fn run_label(
    config: &Config,
    source: &DocumentSource<'_>,
    max_documents: Option<usize>,
    json: bool,
) -> Result<()> {
    let documents = load_documents(config, source)?;
    let mapping = partitioner(config, max_documents)?.compute_labels(&documents)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&mapping)?);
        return Ok(());
    }

    print_mapping(&documents, &mapping);
    Ok(())
}

/// CLI entry point for `fsearch index`.
pub async fn run_index(
    config: &Config,
    source: &DocumentSource<'_>,
    max_documents: Option<usize>,
) -> Result<()> {
    let documents = load_documents(config, source)?;
    if documents.is_empty() {
        println!("No documents found.");
        return Ok(());
    }

    let mapping = index_documents(config, &documents, max_documents).await?;

    println!(
        "indexed documents: {} into {} labels",
        mapping.len(),
        mapping.labels().len()
    );
    print_mapping(&documents, &mapping);
    Ok(())
}

/// CLI entry point for `fsearch add`.
pub async fn run_add(config: &Config, id: &str, text: &str, label: Option<&str>) -> Result<()> {
    let doc = add_document(config, id, text, label).await?;
    println!("indexed {} with label {}", doc.id, doc.label);
    Ok(())
}

/// Print `id  label` lines in input order.
fn print_mapping(documents: &[Document], mapping: &LabelMapping) {
    let width = documents.iter().map(|d| d.id().len()).max().unwrap_or(2).max(2);
    println!("{:<width$}  LABEL", "ID", width = width);
    for doc in documents {
        if let Some(label) = mapping.get(doc.id()) {
            println!("{:<width$}  {}", doc.id(), label, width = width);
        }
    }
}
