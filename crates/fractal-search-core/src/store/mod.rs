//! Search backend abstraction for Fractal Search.
//!
//! The [`SearchBackend`] trait is the full contract the labelling core
//! needs from a text-search engine: create an index, write
//! `(id, text, label)` triples, and answer "match text, optionally filtered
//! by exact label" queries. Ranking is the backend's business.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// How a field is indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Exact-match key, usable in equality filters.
    Keyword,
    /// Tokenized and searchable with a text query.
    FullText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

/// Name and field layout of a searchable store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl IndexSchema {
    /// The `{id: keyword, text: full_text, label: keyword}` layout.
    pub fn labeled(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: vec![
                FieldSpec {
                    name: "id".to_string(),
                    kind: FieldKind::Keyword,
                },
                FieldSpec {
                    name: "text".to_string(),
                    kind: FieldKind::FullText,
                },
                FieldSpec {
                    name: "label".to_string(),
                    kind: FieldKind::Keyword,
                },
            ],
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check the name is `[A-Za-z0-9_]+` and the three required fields exist
    /// with the right kinds.
    ///
    /// The name restriction lets SQL backends use it as a table prefix.
    pub fn validate(&self) -> std::result::Result<(), Error> {
        if self.name.is_empty()
            || !self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::InvalidInput(format!(
                "index name must match [A-Za-z0-9_]+: '{}'",
                self.name
            )));
        }
        for (name, kind) in [
            ("id", FieldKind::Keyword),
            ("text", FieldKind::FullText),
            ("label", FieldKind::Keyword),
        ] {
            match self.field(name) {
                Some(f) if f.kind == kind => {}
                Some(f) => {
                    return Err(Error::InvalidInput(format!(
                        "field '{}' must be {:?}, found {:?}",
                        name, kind, f.kind
                    )))
                }
                None => {
                    return Err(Error::InvalidInput(format!(
                        "index schema is missing field '{}'",
                        name
                    )))
                }
            }
        }
        Ok(())
    }
}

/// A document with its assigned label, as written to a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledDocument {
    pub id: String,
    pub text: String,
    pub label: String,
}

/// One query match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub text: String,
    pub label: String,
    /// Backend relevance score; higher is better. Scale is backend-specific.
    pub score: f64,
}

/// Abstract text-search backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`ensure_index`](SearchBackend::ensure_index) | Create the index if missing (idempotent) |
/// | [`upsert_documents`](SearchBackend::upsert_documents) | Batch write; same id replaces |
/// | [`refresh`](SearchBackend::refresh) | Make recent writes visible to queries |
/// | [`query`](SearchBackend::query) | Full-text match with optional exact label filter |
/// | [`get_document`](SearchBackend::get_document) | Fetch one stored document by id |
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Ensure a store with `schema` exists. Calling it twice is a no-op.
    async fn ensure_index(&self, schema: &IndexSchema) -> Result<()>;

    /// Insert or replace documents by id.
    async fn upsert_documents(&self, docs: &[LabeledDocument]) -> Result<()>;

    /// Make just-written documents visible. Backends that are always
    /// consistent may no-op.
    async fn refresh(&self) -> Result<()>;

    /// Match `text_query` against document text, restricted to
    /// `label == label_filter` when given. Results are ordered by
    /// descending score, at most `limit` of them.
    async fn query(
        &self,
        text_query: &str,
        label_filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchHit>>;

    /// Retrieve a stored document by id.
    async fn get_document(&self, id: &str) -> Result<Option<LabeledDocument>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labeled_schema_is_valid() {
        assert!(IndexSchema::labeled("fractal_search").validate().is_ok());
    }

    #[test]
    fn test_bad_index_name() {
        let err = IndexSchema::labeled("drop table;").validate().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(IndexSchema::labeled("").validate().is_err());
    }

    #[test]
    fn test_missing_or_mistyped_field() {
        let mut schema = IndexSchema::labeled("idx");
        schema.fields.retain(|f| f.name != "label");
        assert!(schema.validate().is_err());

        let mut schema = IndexSchema::labeled("idx");
        schema.fields[1].kind = FieldKind::Keyword;
        let err = schema.validate().unwrap_err();
        assert!(err.to_string().contains("'text'"));
    }
}
