//! Local filesystem file store.

use crate::error::{StorageError, StorageResult, join_error};
use crate::traits::{FileMeta, FileStat, FilesStore, StoreKey};
use async_trait::async_trait;
use bytes::Bytes;
use permastore_core::{DEFAULT_HASH_CHUNK_SIZE, hash_file};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

/// Files stored under a root directory.
#[derive(Clone, Debug)]
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create the root directory if needed and open the store.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).await?;
        let root = fs::canonicalize(root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for a store path, with traversal protection.
    pub async fn local_path(&self, path: &str) -> StorageResult<PathBuf> {
        let root = self.root.clone();
        let path = path.to_string();
        tokio::task::spawn_blocking(move || resolve_path(&root, &path))
            .await
            .map_err(join_error)?
    }

    /// Write `data` atomically and return the absolute path.
    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    pub async fn write(&self, path: &str, data: &Bytes) -> StorageResult<PathBuf> {
        let target = self.local_path(path).await?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        // unique temp name so concurrent writers of one path never collide
        let temp_path = target.with_file_name(format!(
            "{}.tmp.{}",
            target
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Uuid::new_v4()
        ));
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
        }
        if let Err(e) = fs::rename(&temp_path, &target).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(target)
    }
}

/// Reject paths that would escape `root`, including through symlinks.
fn resolve_path(root: &Path, path: &str) -> StorageResult<PathBuf> {
    if path.is_empty() || path.contains("..") || path.starts_with('/') || path.starts_with('\\') {
        return Err(StorageError::InvalidKey(format!(
            "path traversal not allowed: {path}"
        )));
    }
    if !Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return Err(StorageError::InvalidKey(format!(
            "contains unsafe path component: {path}"
        )));
    }

    let full = root.join(path);

    // nearest existing ancestor (or the path itself) must resolve inside root
    let mut candidate = Some(full.as_path());
    while let Some(current) = candidate {
        match std::fs::symlink_metadata(current) {
            Ok(meta) => {
                let canonical = current.canonicalize().map_err(|e| {
                    if meta.file_type().is_symlink() {
                        StorageError::InvalidKey(format!("symlink target missing: {path}"))
                    } else {
                        StorageError::Io(e)
                    }
                })?;
                if !canonical.starts_with(root) {
                    return Err(StorageError::InvalidKey(format!(
                        "resolved path escapes storage root: {path}"
                    )));
                }
                break;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => candidate = current.parent(),
            Err(e) => return Err(StorageError::Io(e)),
        }
    }

    Ok(full)
}

#[async_trait]
impl FilesStore for FilesystemBackend {
    async fn persist(&self, path: &str, data: Bytes, _meta: &FileMeta) -> StorageResult<StoreKey> {
        let target = self.write(path, &data).await?;
        debug!(path = %target.display(), "stored file locally");
        Ok(StoreKey::Local(target))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn stat(&self, path: &str) -> StorageResult<Option<FileStat>> {
        let target = self.local_path(path).await?;
        let metadata = match fs::metadata(&target).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let hash_path = target.clone();
        let checksum =
            tokio::task::spawn_blocking(move || hash_file(&hash_path, DEFAULT_HASH_CHUNK_SIZE))
                .await
                .map_err(join_error)??;

        Ok(Some(FileStat {
            key: StoreKey::Local(target),
            checksum,
            size: metadata.len(),
            last_modified: metadata.modified().ok(),
        }))
    }

    fn resolve_url(&self, key: &StoreKey) -> StorageResult<Url> {
        match key {
            StoreKey::Local(path) => Url::from_file_path(path).map_err(|()| {
                StorageError::InvalidKey(format!("not an absolute path: {}", path.display()))
            }),
            StoreKey::Permanent(tx_id) => Err(StorageError::InvalidKey(format!(
                "filesystem store cannot resolve transaction {tx_id}"
            ))),
        }
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
