//! Index statistics for `fsearch stats`.
//!
//! Shows how the last partitioning spread documents across labels, which
//! is the quickest way to judge whether `max_documents` suits the corpus.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::sqlite_backend::SqliteBackend;

/// Query the index and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let backend = SqliteBackend::new(pool.clone(), &config.schema())?;

    let total_docs = backend.document_count().await?;
    let labels = backend.label_stats().await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Fractal Search — Index Stats");
    println!("============================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!("  Index:       {}", backend.name());
    println!();
    println!("  Documents:   {}", total_docs);
    println!("  Labels:      {}", labels.len());

    if !labels.is_empty() {
        let deepest = labels
            .iter()
            .map(|l| l.label.matches('.').count())
            .max()
            .unwrap_or(0);
        println!("  Max depth:   {}", deepest);
        println!();
        println!("  By label:");
        println!("  {:<32} {:>6}   {}", "LABEL", "DOCS", "LAST INDEXED");
        println!("  {}", "-".repeat(60));
        for l in &labels {
            println!(
                "  {:<32} {:>6}   {}",
                l.label,
                l.doc_count,
                format_ts_relative(l.last_indexed_at)
            );
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp relative to now (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let delta = chrono::Utc::now().timestamp() - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
