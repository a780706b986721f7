//! Pluggable similarity measure used by the partitioner.

use crate::document::{jaccard, Document};

/// Similarity between two documents, in `[0.0, 1.0]`.
///
/// The partitioner only ever compares documents through this trait, so an
/// alternative measure can be swapped in without touching tree building.
pub trait Similarity: Send + Sync {
    fn similarity(&self, a: &Document, b: &Document) -> f64;
}

/// Jaccard similarity over the documents' token sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct Jaccard;

impl Similarity for Jaccard {
    fn similarity(&self, a: &Document, b: &Document) -> f64 {
        jaccard(a.tokens(), b.tokens())
    }
}
