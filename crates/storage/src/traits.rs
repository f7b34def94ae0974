//! File store contract consumed by the pipelines.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;
use permastore_core::{ContentHash, TransactionId};
use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;
use url::Url;

/// Where a persisted file can be found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreKey {
    /// A permanent transaction.
    Permanent(TransactionId),
    /// A local file only.
    Local(PathBuf),
}

impl StoreKey {
    pub fn tx_id(&self) -> Option<&TransactionId> {
        match self {
            Self::Permanent(tx_id) => Some(tx_id),
            Self::Local(_) => None,
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permanent(tx_id) => write!(f, "ar:{tx_id}"),
            Self::Local(path) => write!(f, "file:{}", path.display()),
        }
    }
}

/// Metadata supplied with a persisted file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileMeta {
    /// MIME type; guessed from the path when absent.
    pub content_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl FileMeta {
    pub fn with_content_type(content_type: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            ..Self::default()
        }
    }
}

/// Result of a successful stat: the file is already stored.
#[derive(Clone, Debug)]
pub struct FileStat {
    pub key: StoreKey,
    pub checksum: ContentHash,
    pub size: u64,
    pub last_modified: Option<SystemTime>,
}

/// Per-file lifecycle as driven by a pipeline.
///
/// `Unknown → UpToDate | Absent`, then `Absent → Stored | Failed`.
/// `UpToDate`, `Stored` and `Failed` are terminal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FileState {
    #[default]
    Unknown,
    UpToDate(StoreKey),
    Absent,
    Stored(StoreKey),
    Failed,
}

impl FileState {
    /// State after a stat. A stat error counts as absent.
    pub fn after_stat(stat: &StorageResult<Option<FileStat>>) -> Self {
        match stat {
            Ok(Some(stat)) => Self::UpToDate(stat.key.clone()),
            Ok(None) | Err(_) => Self::Absent,
        }
    }

    /// State after a persist attempt.
    pub fn after_persist(result: &StorageResult<StoreKey>) -> Self {
        match result {
            Ok(key) => Self::Stored(key.clone()),
            Err(_) => Self::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::UpToDate(_) | Self::Stored(_) | Self::Failed)
    }

    /// Key of the stored file, once known.
    pub fn key(&self) -> Option<&StoreKey> {
        match self {
            Self::UpToDate(key) | Self::Stored(key) => Some(key),
            _ => None,
        }
    }
}

/// Storage backend used by the files and images pipelines.
///
/// Every operation may be called concurrently for different paths.
#[async_trait]
pub trait FilesStore: Send + Sync + 'static {
    /// Store `data` under `path` and return where it ended up.
    async fn persist(&self, path: &str, data: Bytes, meta: &FileMeta) -> StorageResult<StoreKey>;

    /// Check whether the file at `path` is already stored.
    ///
    /// `None` means absent: the caller should download and persist it.
    async fn stat(&self, path: &str) -> StorageResult<Option<FileStat>>;

    /// URL under which a stored file can be fetched.
    fn resolve_url(&self, key: &StoreKey) -> StorageResult<Url>;

    /// Backend name for logging and metrics.
    fn backend_name(&self) -> &'static str;
}
