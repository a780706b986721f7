//! In-memory [`SearchBackend`] for tests and embedding in other tools.
//!
//! Uses a `HashMap` behind `std::sync::RwLock`. Scoring is a plain term
//! count: the number of distinct query tokens present in the document's
//! token set, with the same normalization as the document model.
//! Writes are visible immediately, so `refresh` is a no-op.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::document::tokenize;
use crate::error::Error;

use super::{IndexSchema, LabeledDocument, SearchBackend, SearchHit};

struct StoredDoc {
    doc: LabeledDocument,
    tokens: BTreeSet<String>,
}

/// In-memory backend holding a single index.
pub struct InMemoryBackend {
    schema: RwLock<Option<IndexSchema>>,
    docs: RwLock<HashMap<String, StoredDoc>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            schema: RwLock::new(None),
            docs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.docs.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn require_index(&self) -> Result<()> {
        let schema = self.schema.read().map_err(|_| anyhow!("schema lock poisoned"))?;
        if schema.is_none() {
            return Err(Error::IndexMissing("call ensure_index first".to_string()).into());
        }
        Ok(())
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchBackend for InMemoryBackend {
    async fn ensure_index(&self, schema: &IndexSchema) -> Result<()> {
        schema.validate()?;
        let mut current = self.schema.write().map_err(|_| anyhow!("schema lock poisoned"))?;
        if current.is_none() {
            *current = Some(schema.clone());
        }
        Ok(())
    }

    async fn upsert_documents(&self, docs: &[LabeledDocument]) -> Result<()> {
        self.require_index()?;
        let mut stored = self.docs.write().map_err(|_| anyhow!("docs lock poisoned"))?;
        for doc in docs {
            stored.insert(
                doc.id.clone(),
                StoredDoc {
                    doc: doc.clone(),
                    tokens: tokenize(&doc.text),
                },
            );
        }
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        Ok(())
    }

    async fn query(
        &self,
        text_query: &str,
        label_filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        self.require_index()?;
        let terms = tokenize(text_query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let stored = self.docs.read().map_err(|_| anyhow!("docs lock poisoned"))?;
        let mut hits: Vec<SearchHit> = stored
            .values()
            .filter(|sd| label_filter.map_or(true, |l| sd.doc.label == l))
            .filter_map(|sd| {
                let matches = terms.intersection(&sd.tokens).count();
                if matches == 0 {
                    return None;
                }
                Some(SearchHit {
                    id: sd.doc.id.clone(),
                    text: sd.doc.text.clone(),
                    label: sd.doc.label.clone(),
                    score: matches as f64,
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn get_document(&self, id: &str) -> Result<Option<LabeledDocument>> {
        self.require_index()?;
        let stored = self.docs.read().map_err(|_| anyhow!("docs lock poisoned"))?;
        Ok(stored.get(id).map(|sd| sd.doc.clone()))
    }
}
