use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Query is empty after trimming")]
    EmptyQuery,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Embedding failed: {0}")]
    EmbeddingFailure(String),

    #[error("Axis '{axis}' failed on collection '{collection}': {reason}")]
    AxisQueryFailure {
        axis: String,
        collection: String,
        reason: String,
    },

    #[error("All {0} axes failed")]
    AllAxesFailed(usize),

    #[error("Dimension mismatch on '{collection}': expected {expected}, got {actual}")]
    DimensionMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },

    #[error("Deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store operation failed: {0}")]
    Store(String),
}

impl Error {
    /// Input and configuration errors are never worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::EmbeddingFailure(_)
                | Error::AxisQueryFailure { .. }
                | Error::AllAxesFailed(_)
                | Error::DeadlineExceeded(_)
                | Error::Store(_)
        )
    }

    pub fn store<E: std::fmt::Display>(err: E) -> Self {
        Error::Store(err.to_string())
    }

    pub fn embedding<E: std::fmt::Display>(err: E) -> Self {
        Error::EmbeddingFailure(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
