//! Error types for metaxy.

use thiserror::Error;

/// Errors that can occur during indexing/query operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexError {
    /// Invalid construction parameter (e.g. tree order below 3).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Insert of a zero-length vector.
    #[error("cannot insert empty vector")]
    EmptyVector,

    /// Dimension mismatch between a vector and the indexed data.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Query against an index with no records.
    #[error("index is empty")]
    NoData,

    /// Malformed line in an ingest file.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// Result type alias for metaxy operations.
pub type Result<T> = std::result::Result<T, IndexError>;
