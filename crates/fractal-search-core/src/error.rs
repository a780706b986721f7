//! Error type for partitioning and index validation.
//!
//! Backend operations return [`anyhow::Result`] like the rest of the
//! pipeline; these variants are raised where the caller needs to match on
//! the failure (for example, to map it to a `400` in the HTTP server).
//! Use `err.downcast_ref::<Error>()` to recover them from an `anyhow::Error`.

use thiserror::Error;

/// Result alias for the typed core error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the document model, the partitioner, and backends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed parameters: `max_documents < 1`, duplicate ids, empty
    /// ids or text, invalid index schemas.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A backend was written to or queried before `ensure_index`.
    #[error("index not found: {0}")]
    IndexMissing(String),
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }
}
