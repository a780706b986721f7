//! Label a document batch and hand it to a search backend.
//!
//! Partitioning runs first and is all-or-nothing: if it fails (duplicate
//! ids, `max_documents < 1`) nothing is written to the backend.

use anyhow::Result;
use tracing::info;

use crate::document::Document;
use crate::partition::{LabelMapping, Partitioner};
use crate::similarity::Similarity;
use crate::store::{IndexSchema, LabeledDocument, SearchBackend};

/// Attach labels from `mapping` to `documents`.
///
/// Documents missing from the mapping are skipped.
pub fn attach_labels(documents: &[Document], mapping: &LabelMapping) -> Vec<LabeledDocument> {
    documents
        .iter()
        .filter_map(|d| {
            mapping.get(d.id()).map(|label| LabeledDocument {
                id: d.id().to_string(),
                text: d.text().to_string(),
                label: label.to_string(),
            })
        })
        .collect()
}

/// Partition `documents`, ensure the index, upsert, and refresh.
///
/// Returns the mapping that was written.
pub async fn label_and_index<B, S>(
    backend: &B,
    schema: &IndexSchema,
    partitioner: &Partitioner<S>,
    documents: &[Document],
) -> Result<LabelMapping>
where
    B: SearchBackend + ?Sized,
    S: Similarity,
{
    let mapping = partitioner.compute_labels(documents)?;
    let labeled = attach_labels(documents, &mapping);

    backend.ensure_index(schema).await?;
    backend.upsert_documents(&labeled).await?;
    backend.refresh().await?;

    info!(
        index = %schema.name,
        documents = labeled.len(),
        labels = mapping.labels().len(),
        "indexed labeled documents"
    );
    Ok(mapping)
}
