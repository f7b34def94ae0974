//! Arweave file store: a local copy plus a permanent upload, deduplicated by
//! content hash.

use crate::backends::filesystem::FilesystemBackend;
use crate::client::ArweaveClient;
use crate::error::StorageResult;
use crate::traits::{FileMeta, FileStat, FilesStore, StoreKey};
use async_trait::async_trait;
use bytes::Bytes;
use permastore_core::{ArweaveConfig, UploadItem};
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub struct ArweaveBackend {
    local: FilesystemBackend,
    client: Arc<ArweaveClient>,
}

impl ArweaveBackend {
    pub async fn new(root: impl AsRef<Path>, client: Arc<ArweaveClient>) -> StorageResult<Self> {
        let local = FilesystemBackend::new(root).await?;
        Ok(Self { local, client })
    }

    /// Load the wallet from `config` and open the local store at `root`.
    pub async fn from_config(root: impl AsRef<Path>, config: &ArweaveConfig) -> StorageResult<Self> {
        let client = Arc::new(ArweaveClient::from_config(config)?);
        Self::new(root, client).await
    }

    pub fn client(&self) -> &ArweaveClient {
        &self.client
    }

    pub fn local(&self) -> &FilesystemBackend {
        &self.local
    }
}

#[async_trait]
impl FilesStore for ArweaveBackend {
    /// Write the local copy, hash it and upload with a `File-Hash` tag.
    ///
    /// Upload errors are returned unchanged.
    #[instrument(skip(self, data, meta), fields(backend = "arweave", size = data.len()))]
    async fn persist(&self, path: &str, data: Bytes, meta: &FileMeta) -> StorageResult<StoreKey> {
        let local_path = self.local.write(path, &data).await?;
        let hash = self.client.hash_file(&local_path).await?;

        let mut item = UploadItem::new(path, data).with_hash(hash);
        if let Some(content_type) = &meta.content_type {
            item = item.with_content_type(content_type.clone());
        }

        let tx_id = self.client.upload(item).await?;
        info!(%tx_id, %hash, "stored file permanently");
        Ok(StoreKey::Permanent(tx_id))
    }

    /// Hash the local copy and look for an existing upload of it.
    ///
    /// A missing local copy, a lookup miss and a failed lookup all report the
    /// file as absent.
    #[instrument(skip(self), fields(backend = "arweave"))]
    async fn stat(&self, path: &str) -> StorageResult<Option<FileStat>> {
        let local_path = self.local.local_path(path).await?;
        let metadata = match tokio::fs::metadata(&local_path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no local copy");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let hash = self.client.hash_file(&local_path).await?;
        match self.client.find_by_hash(&hash).await {
            Ok(Some(tx_id)) => {
                debug!(%tx_id, %hash, "content already stored");
                Ok(Some(FileStat {
                    key: StoreKey::Permanent(tx_id),
                    checksum: hash,
                    size: metadata.len(),
                    last_modified: metadata.modified().ok(),
                }))
            }
            Ok(None) => {
                debug!(%hash, "content not stored yet");
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, %hash, "lookup failed, treating file as absent");
                Ok(None)
            }
        }
    }

    fn resolve_url(&self, key: &StoreKey) -> StorageResult<Url> {
        match key {
            StoreKey::Permanent(tx_id) => self.client.resolve_url(tx_id),
            StoreKey::Local(_) => self.local.resolve_url(key),
        }
    }

    fn backend_name(&self) -> &'static str {
        "arweave"
    }
}

impl std::fmt::Debug for ArweaveBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArweaveBackend")
            .field("root", &self.local.root())
            .field("gateway", &self.client.gateway().base_url().as_str())
            .finish()
    }
}
