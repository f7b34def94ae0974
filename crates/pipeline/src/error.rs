//! Pipeline error types.

use permastore_storage::StorageError;
use thiserror::Error;

/// Media and feed processing errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("download error: {url} returned status {status}")]
    Download { url: String, status: u16 },

    #[error("download failed for {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("empty content: {url}")]
    EmptyContent { url: String },

    #[error("image too small ({width}x{height} < {min_width}x{min_height})")]
    ImageTooSmall {
        width: u32,
        height: u32,
        min_width: u32,
        min_height: u32,
    },

    #[error("image error: {0}")]
    Image(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<permastore_core::Error> for PipelineError {
    fn from(err: permastore_core::Error) -> Self {
        Self::Storage(StorageError::Core(err))
    }
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
