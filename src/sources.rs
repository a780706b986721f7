//! Document sources: a JSON file, or a directory walk.
//!
//! # JSON file
//!
//! An array of objects with `doc_id` (or `id`) and `text`:
//!
//! ```json
//! [
//!   { "doc_id": "doc1", "text": "Python is a programming language" },
//!   { "doc_id": "doc2", "text": "Web development uses HTML, CSS, and JavaScript" }
//! ]
//! ```
//!
//! Extra keys (such as a pre-assigned `cluster`) are ignored; labels are
//! always recomputed.
//!
//! # Filesystem
//!
//! Walks `[sources.filesystem].root`, keeping files that match the include
//! globs and none of the exclude globs. Each file becomes one document whose
//! id is its path relative to the root. Output is sorted by id, since the
//! partitioner's labels depend on input order.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use fractal_search_core::document::{Document, DocumentInput};

use crate::config::Config;

/// Read a JSON array of documents, preserving file order.
pub fn load_json_file(path: &Path) -> Result<Vec<Document>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_json_documents(&content).with_context(|| format!("Invalid documents in {}", path.display()))
}

/// Parse a JSON array of `{doc_id|id, text}` objects.
pub fn parse_json_documents(content: &str) -> Result<Vec<Document>> {
    let inputs: Vec<DocumentInput> =
        serde_json::from_str(content).with_context(|| "Expected a JSON array of documents")?;
    let docs = inputs
        .into_iter()
        .map(Document::try_from)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(docs)
}

/// Walk the configured filesystem source.
pub fn scan_filesystem(config: &Config) -> Result<Vec<Document>> {
    let fs_config = config
        .sources
        .filesystem
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Filesystem source not configured ([sources.filesystem])"))?;

    let root = &fs_config.root;
    if !root.exists() {
        bail!("Filesystem source root does not exist: {}", root.display());
    }

    let include_set = build_globset(&fs_config.include_globs)?;

    let mut excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    excludes.extend(fs_config.exclude_globs.clone());
    let exclude_set = build_globset(&excludes)?;

    let mut docs = Vec::new();

    for entry in WalkDir::new(root).follow_links(fs_config.follow_symlinks) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };
        if text.trim().is_empty() {
            debug!(path = %rel_str, "skipping empty file");
            continue;
        }

        docs.push(Document::new(rel_str, text)?);
    }

    docs.sort_by(|a, b| a.id().cmp(b.id()));

    Ok(docs)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
