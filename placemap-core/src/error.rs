//! Error types for placemap-core.

use thiserror::Error;

/// Errors raised by the index, row sources and configuration parsing.
///
/// Row-level resolution failures are not errors; see
/// [`ResolveFailure`](crate::resolver::ResolveFailure).
#[derive(Debug, Error)]
pub enum Error {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid place record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("row source task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, Error>;
