//! Error handling for the market tracker
//!
//! Defines the error taxonomy of the pipeline and establishes a unified
//! Result type using anyhow for context chaining and error propagation.

use thiserror::Error;

/// Core error types for tracker operations
#[derive(Error, Debug)]
pub enum TrackerError {
    /// No usable price rows for any requested ticker. Fatal.
    #[error("no data: {0}")]
    EmptyData(String),

    #[error("invalid price table: {0}")]
    InvalidTable(String),

    #[error("pricing error: {0}")]
    Pricing(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error")]
    Io(#[from] std::io::Error),
}

/// Result type alias for tracker operations
pub type Result<T> = anyhow::Result<T>;

/// True when the error chain carries a [`TrackerError::EmptyData`].
pub fn is_empty_data(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<TrackerError>(),
            Some(TrackerError::EmptyData(_))
        )
    })
}
