//! Signer error types.

use thiserror::Error;

/// Boxed underlying cause of a credential failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Signing operation errors.
#[derive(Debug, Error)]
pub enum SignerError {
    /// Key material is missing or invalid. No client can be built from it.
    #[error("credential error: {message}")]
    Credential {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("key parsing error: {0}")]
    KeyParsing(String),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("invalid data item: {0}")]
    InvalidDataItem(String),

    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("verification failed")]
    VerificationFailed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SignerError {
    pub(crate) fn credential(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Credential {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Result type for signing operations.
pub type SignerResult<T> = std::result::Result<T, SignerError>;
