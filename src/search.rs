//! Application-level search entry points.
//!
//! The search algorithm itself lives in `fractal_search_core::search` and
//! runs over any [`SearchBackend`](fractal_search_core::store::SearchBackend).
//! This wrapper opens the SQLite backend from config and formats CLI output.

use anyhow::Result;

pub use fractal_search_core::search::{SearchRequest, SearchResultItem};

use crate::config::Config;
use crate::db;
use crate::sqlite_backend::SqliteBackend;

/// Search the configured SQLite index.
pub async fn search_documents(
    config: &Config,
    query: &str,
    label_filter: Option<&str>,
    limit: Option<usize>,
) -> Result<Vec<SearchResultItem>> {
    let pool = db::connect(config).await?;
    let backend = SqliteBackend::new(pool.clone(), &config.schema())?;

    let req = SearchRequest {
        query,
        label_filter,
        limit: limit.unwrap_or(config.search.default_limit),
    };
    let results = fractal_search_core::search::search(&backend, &req).await;

    pool.close().await;
    results
}

/// CLI entry point: runs [`search_documents`] and prints results to stdout.
pub async fn run_search(
    config: &Config,
    query: &str,
    label_filter: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    let results = search_documents(config, query, label_filter.as_deref(), limit).await?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        println!("{}. [{:.2}] {} ({})", i + 1, result.score, result.id, result.label);
        println!(
            "    excerpt: \"{}\"",
            result.snippet.replace('\n', " ").trim()
        );
        println!();
    }

    Ok(())
}
