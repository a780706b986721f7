//! SQLite FTS5 implementation of [`SearchBackend`].
//!
//! Each index is a pair of tables named after the index:
//!
//! | Table | Contents |
//! |-------|----------|
//! | `<name>_documents` | `id` (primary key), `text`, `label`, `indexed_at` |
//! | `<name>_fts` | FTS5 over `text`, with `id` unindexed |
//!
//! Text queries become an `OR` of quoted terms, so any document sharing a
//! term with the query matches (punctuation such as `C++` cannot break
//! the FTS5 query syntax). The label filter is an exact `=` on the
//! documents table. Ranking is BM25; the hit score is `-bm25` so higher
//! is better.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use fractal_search_core::document::tokenize;
use fractal_search_core::error::Error;
use fractal_search_core::store::{IndexSchema, LabeledDocument, SearchBackend, SearchHit};

/// Document count and freshness for one label.
#[derive(Debug, Clone)]
pub struct LabelStats {
    pub label: String,
    pub doc_count: i64,
    pub last_indexed_at: i64,
}

/// SQLite implementation of the [`SearchBackend`] trait.
pub struct SqliteBackend {
    pool: SqlitePool,
    name: String,
    documents_table: String,
    fts_table: String,
}

impl SqliteBackend {
    /// Bind to the index described by `schema`. Tables are created by
    /// [`ensure_index`](SearchBackend::ensure_index).
    pub fn new(pool: SqlitePool, schema: &IndexSchema) -> Result<Self> {
        schema.validate()?;
        Ok(Self {
            pool,
            name: schema.name.clone(),
            documents_table: format!("{}_documents", schema.name),
            fts_table: format!("{}_fts", schema.name),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn index_exists(&self) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN (?, ?)",
        )
        .bind(&self.documents_table)
        .bind(&self.fts_table)
        .fetch_one(&self.pool)
        .await?;
        Ok(count == 2)
    }

    async fn require_index(&self) -> Result<()> {
        if !self.index_exists().await? {
            return Err(Error::IndexMissing(format!(
                "'{}' (run `fsearch init` first)",
                self.name
            ))
            .into());
        }
        Ok(())
    }

    /// Total number of indexed documents.
    pub async fn document_count(&self) -> Result<i64> {
        self.require_index().await?;
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {}",
            self.documents_table
        ))
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Per-label document counts, largest first.
    pub async fn label_stats(&self) -> Result<Vec<LabelStats>> {
        self.require_index().await?;
        let rows = sqlx::query(&format!(
            r#"
            SELECT label, COUNT(*) AS doc_count, MAX(indexed_at) AS last_indexed_at
            FROM {}
            GROUP BY label
            ORDER BY doc_count DESC, label ASC
            "#,
            self.documents_table
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| LabelStats {
                label: row.get("label"),
                doc_count: row.get("doc_count"),
                last_indexed_at: row.get("last_indexed_at"),
            })
            .collect())
    }
}

/// Build an FTS5 `MATCH` expression: each query token quoted, joined by `OR`.
///
/// Returns `None` when the query has no tokens.
pub fn match_expression(query: &str) -> Option<String> {
    let terms: Vec<String> = tokenize(query)
        .into_iter()
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

#[async_trait]
impl SearchBackend for SqliteBackend {
    async fn ensure_index(&self, schema: &IndexSchema) -> Result<()> {
        schema.validate()?;
        if schema.name != self.name {
            return Err(Error::InvalidInput(format!(
                "backend is bound to index '{}', not '{}'",
                self.name, schema.name
            ))
            .into());
        }

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                label TEXT NOT NULL,
                indexed_at INTEGER NOT NULL
            )
            "#,
            self.documents_table
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{0}_label ON {0}(label)",
            self.documents_table
        ))
        .execute(&self.pool)
        .await?;

        // FTS5 CREATE has no IF NOT EXISTS on older SQLite builds, so check first
        let fts_exists: bool = sqlx::query_scalar(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(&self.fts_table)
        .fetch_one(&self.pool)
        .await?;

        if !fts_exists {
            sqlx::query(&format!(
                "CREATE VIRTUAL TABLE {} USING fts5(id UNINDEXED, text)",
                self.fts_table
            ))
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    async fn upsert_documents(&self, docs: &[LabeledDocument]) -> Result<()> {
        self.require_index().await?;
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for doc in docs {
            sqlx::query(&format!(
                r#"
                INSERT INTO {} (id, text, label, indexed_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    text = excluded.text,
                    label = excluded.label,
                    indexed_at = excluded.indexed_at
                "#,
                self.documents_table
            ))
            .bind(&doc.id)
            .bind(&doc.text)
            .bind(&doc.label)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            sqlx::query(&format!("DELETE FROM {} WHERE id = ?", self.fts_table))
                .bind(&doc.id)
                .execute(&mut *tx)
                .await?;

            sqlx::query(&format!(
                "INSERT INTO {} (id, text) VALUES (?, ?)",
                self.fts_table
            ))
            .bind(&doc.id)
            .bind(&doc.text)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        // Committed FTS5 writes are visible to the next query.
        Ok(())
    }

    async fn query(
        &self,
        text_query: &str,
        label_filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        self.require_index().await?;
        let expr = match match_expression(text_query) {
            Some(e) => e,
            None => return Ok(Vec::new()),
        };

        let label_clause = if label_filter.is_some() {
            "AND d.label = ?"
        } else {
            ""
        };
        let sql = format!(
            r#"
            SELECT d.id, d.text, d.label, bm25({fts}) AS rank
            FROM {fts}
            JOIN {docs} d ON d.id = {fts}.id
            WHERE {fts} MATCH ? {label_clause}
            ORDER BY rank ASC, d.id ASC
            LIMIT ?
            "#,
            fts = self.fts_table,
            docs = self.documents_table,
            label_clause = label_clause,
        );

        let mut query = sqlx::query(&sql).bind(expr);
        if let Some(label) = label_filter {
            query = query.bind(label);
        }
        let rows = query.bind(limit as i64).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| {
                let rank: f64 = row.get("rank");
                SearchHit {
                    id: row.get("id"),
                    text: row.get("text"),
                    label: row.get("label"),
                    score: -rank,
                }
            })
            .collect())
    }

    async fn get_document(&self, id: &str) -> Result<Option<LabeledDocument>> {
        self.require_index().await?;
        let row = sqlx::query(&format!(
            "SELECT id, text, label FROM {} WHERE id = ?",
            self.documents_table
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| LabeledDocument {
            id: r.get("id"),
            text: r.get("text"),
            label: r.get("label"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn labeled(id: &str, text: &str, label: &str) -> LabeledDocument {
        LabeledDocument {
            id: id.to_string(),
            text: text.to_string(),
            label: label.to_string(),
        }
    }

    async fn backend(dir: &tempfile::TempDir) -> SqliteBackend {
        let pool = db::connect_path(&dir.path().join("test.sqlite"))
            .await
            .unwrap();
        let schema = IndexSchema::labeled("test_index");
        let backend = SqliteBackend::new(pool, &schema).unwrap();
        backend.ensure_index(&schema).await.unwrap();
        backend
            .upsert_documents(&[
                labeled("d1", "python programming language", "root.0.0"),
                labeled("d2", "python web development", "root.1"),
                labeled("d3", "java programming language", "root.0.1"),
            ])
            .await
            .unwrap();
        backend
    }

    #[test]
    fn test_match_expression_quotes_terms() {
        assert_eq!(
            match_expression("C++ \"quoted\"").as_deref(),
            Some("\"\"\"quoted\"\"\" OR \"c++\"")
        );
        assert_eq!(match_expression("   "), None);
    }

    #[tokio::test]
    async fn test_query_before_init_is_index_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let pool = db::connect_path(&dir.path().join("empty.sqlite"))
            .await
            .unwrap();
        let backend = SqliteBackend::new(pool, &IndexSchema::labeled("nothing")).unwrap();
        let err = backend.query("python", None, 10).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::IndexMissing(_))
        ));
    }

    #[tokio::test]
    async fn test_ensure_index_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let b = backend(&dir).await;
        b.ensure_index(&IndexSchema::labeled("test_index"))
            .await
            .unwrap();
        assert_eq!(b.document_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_ensure_index_rejects_other_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let b = backend(&dir).await;
        assert!(b.ensure_index(&IndexSchema::labeled("other")).await.is_err());
    }

    #[tokio::test]
    async fn test_query_matches_any_term() {
        let dir = tempfile::TempDir::new().unwrap();
        let b = backend(&dir).await;
        let hits = b.query("python", None, 10).await.unwrap();
        let mut ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["d1", "d2"]);
        assert!(hits.iter().all(|h| h.score > 0.0));
    }

    #[tokio::test]
    async fn test_query_label_filter() {
        let dir = tempfile::TempDir::new().unwrap();
        let b = backend(&dir).await;
        let hits = b.query("programming", Some("root.0.1"), 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "d3");
    }

    #[tokio::test]
    async fn test_query_label_with_no_members() {
        let dir = tempfile::TempDir::new().unwrap();
        let b = backend(&dir).await;
        let hits = b.query("python", Some("root.0.1.1"), 10).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let dir = tempfile::TempDir::new().unwrap();
        let b = backend(&dir).await;
        b.upsert_documents(&[labeled("d2", "rust systems programming", "root")])
            .await
            .unwrap();
        assert_eq!(b.document_count().await.unwrap(), 3);
        assert!(b.query("web", None, 10).await.unwrap().is_empty());
        let doc = b.get_document("d2").await.unwrap().unwrap();
        assert_eq!(doc.label, "root");

        let stats = b.label_stats().await.unwrap();
        assert_eq!(stats.len(), 3);
        assert!(stats.iter().all(|s| s.doc_count == 1));
    }

    #[tokio::test]
    async fn test_get_missing_document() {
        let dir = tempfile::TempDir::new().unwrap();
        let b = backend(&dir).await;
        assert!(b.get_document("nope").await.unwrap().is_none());
    }
}
