//! Document model: raw text normalized into a comparable token set.
//!
//! Normalization is deliberately minimal: lower-case, split on whitespace
//! runs, drop empty tokens, deduplicate. No stemming, stopword removal, or
//! punctuation stripping, so `"python,"` and `"python"` are different tokens.
//!
//! # Example
//!
//! ```rust
//! use fractal_search_core::document::{jaccard, Document};
//!
//! let a = Document::new("a", "Python programming").unwrap();
//! let b = Document::new("b", "python WEB").unwrap();
//! assert!((jaccard(a.tokens(), b.tokens()) - 1.0 / 3.0).abs() < 1e-12);
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A caller-supplied document with its derived token set.
///
/// `tokens` is a pure function of `text`, computed once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    id: String,
    text: String,
    tokens: BTreeSet<String>,
}

impl Document {
    /// Build a document, normalizing `text` into its token set.
    ///
    /// Fails with [`Error::InvalidInput`] if `id` or `text` is empty or
    /// whitespace-only.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let text = text.into();
        if id.trim().is_empty() {
            return Err(Error::invalid("document id must not be empty"));
        }
        if text.trim().is_empty() {
            return Err(Error::invalid(format!(
                "document '{}' has empty text",
                id
            )));
        }
        let tokens = tokenize(&text);
        Ok(Self { id, text, tokens })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &BTreeSet<String> {
        &self.tokens
    }
}

/// Wire shape for documents arriving from files or HTTP.
///
/// Accepts `doc_id` as an alias for `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInput {
    #[serde(alias = "doc_id")]
    pub id: String,
    pub text: String,
}

impl TryFrom<DocumentInput> for Document {
    type Error = Error;

    fn try_from(input: DocumentInput) -> Result<Self> {
        Document::new(input.id, input.text)
    }
}

/// Lower-case `text`, split on whitespace, and collapse duplicates.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity `|A ∩ B| / |A ∪ B|`.
///
/// Returns `0.0` when both sets are empty.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_jaccard_partial_overlap() {
        let sim = jaccard(&set(&["a", "b"]), &set(&["b", "c"]));
        assert_eq!(sim, 1.0 / 3.0);
    }

    #[test]
    fn test_jaccard_both_empty() {
        assert_eq!(jaccard(&set(&[]), &set(&[])), 0.0);
    }

    #[test]
    fn test_jaccard_identical() {
        assert_eq!(jaccard(&set(&["a"]), &set(&["a"])), 1.0);
    }

    #[test]
    fn test_jaccard_one_empty() {
        assert_eq!(jaccard(&set(&["a"]), &set(&[])), 0.0);
    }

    #[test]
    fn test_tokenize_case_folds_and_dedups() {
        let tokens = tokenize("Python  python\tPYTHON\nweb");
        assert_eq!(tokens, set(&["python", "web"]));
    }

    #[test]
    fn test_tokenize_keeps_punctuation() {
        let tokens = tokenize("C++ and c++, too");
        assert_eq!(tokens, set(&["c++", "and", "c++,", "too"]));
    }

    #[test]
    fn test_same_text_after_case_fold_same_tokens() {
        let a = Document::new("a", "Java Programming").unwrap();
        let b = Document::new("b", "java programming").unwrap();
        assert_eq!(a.tokens(), b.tokens());
        assert_ne!(a.text(), b.text());
    }

    #[test]
    fn test_empty_text_rejected() {
        let err = Document::new("a", "   \n").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_empty_id_rejected() {
        let err = Document::new("", "text").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_input_accepts_doc_id_alias() {
        let input: DocumentInput =
            serde_json::from_str(r#"{"doc_id": "doc1", "text": "hello"}"#).unwrap();
        let doc = Document::try_from(input).unwrap();
        assert_eq!(doc.id(), "doc1");
    }
}
