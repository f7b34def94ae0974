//! Storage error types.

use permastore_signer::SignerError;
use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] permastore_core::Error),

    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Lookup could not complete. Callers treat this as "not found".
    #[error("lookup failed: {0}")]
    Lookup(String),

    #[error("bundling relay rejected data item ({status}): {body}")]
    Relay { status: u16, body: String },

    #[error("gateway error ({status}): {body}")]
    Gateway { status: u16, body: String },

    /// Both the bundled and the chunked upload failed.
    #[error("upload of {name} failed: bundled: {bundled}; chunked: {chunked}")]
    Upload {
        name: String,
        bundled: Box<StorageError>,
        chunked: Box<StorageError>,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl StorageError {
    /// Whether the wallet could not be loaded.
    pub fn is_credential(&self) -> bool {
        matches!(self, Self::Signer(SignerError::Credential { .. }))
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Map a failed blocking task to an I/O error.
pub(crate) fn join_error(err: tokio::task::JoinError) -> StorageError {
    StorageError::Io(std::io::Error::other(format!("spawn_blocking failed: {err}")))
}
