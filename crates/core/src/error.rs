//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("invalid transaction id: {0}")]
    InvalidTransactionId(String),

    #[error("invalid chunk size: {0} (must be greater than zero)")]
    InvalidChunkSize(usize),

    #[error("invalid store uri: {0}")]
    InvalidStoreUri(String),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
