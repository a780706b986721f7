//! Label-filtered search over a [`SearchBackend`].
//!
//! The backend does the matching and ranking; this module validates the
//! request, normalizes backend scores to `[0, 1]` so results from different
//! backends read the same, and shapes the response.
//!
//! # Algorithm
//!
//! 1. Blank query → empty result (no backend call).
//! 2. Fetch up to `limit` hits, filtered by exact label if requested.
//! 3. Min-max normalize raw scores to `[0, 1]`.
//! 4. Sort by score (desc), id (asc).

use anyhow::Result;
use serde::Serialize;

use crate::error::Error;
use crate::store::{SearchBackend, SearchHit};

/// Characters of document text kept in [`SearchResultItem::snippet`].
const SNIPPET_CHARS: usize = 240;

/// Inputs for a single search invocation.
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    /// Only return documents whose label equals this exactly.
    pub label_filter: Option<&'a str>,
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResultItem {
    pub id: String,
    pub label: String,
    pub text: String,
    /// Relevance in `[0.0, 1.0]`.
    pub score: f64,
    /// Score as reported by the backend.
    pub raw_score: f64,
    pub snippet: String,
}

/// Run a search against `backend`.
pub async fn search<B: SearchBackend + ?Sized>(
    backend: &B,
    req: &SearchRequest<'_>,
) -> Result<Vec<SearchResultItem>> {
    if req.limit < 1 {
        return Err(Error::InvalidInput("limit must be >= 1".to_string()).into());
    }
    if req.query.trim().is_empty() {
        return Ok(Vec::new());
    }

    let hits = backend
        .query(req.query, req.label_filter, req.limit)
        .await?;

    let mut results: Vec<SearchResultItem> = normalize_scores(&hits)
        .into_iter()
        .map(|(hit, score)| SearchResultItem {
            id: hit.id.clone(),
            label: hit.label.clone(),
            text: hit.text.clone(),
            score,
            raw_score: hit.score,
            snippet: hit.text.chars().take(SNIPPET_CHARS).collect(),
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });
    results.truncate(req.limit);

    Ok(results)
}

/// Min-max normalize raw scores to `[0.0, 1.0]`.
///
/// If all scores are equal, they are normalized to `1.0`.
pub fn normalize_scores(hits: &[SearchHit]) -> Vec<(&SearchHit, f64)> {
    if hits.is_empty() {
        return Vec::new();
    }

    let s_min = hits.iter().map(|h| h.score).fold(f64::INFINITY, f64::min);
    let s_max = hits
        .iter()
        .map(|h| h.score)
        .fold(f64::NEG_INFINITY, f64::max);

    hits.iter()
        .map(|h| {
            let norm = if (s_max - s_min).abs() < f64::EPSILON {
                1.0
            } else {
                (h.score - s_min) / (s_max - s_min)
            };
            (h, norm)
        })
        .collect()
}
