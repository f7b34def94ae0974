//! Permanent file storage on Arweave for crawler pipelines.
//!
//! This crate provides:
//! - Tag lookups and base-layer submission against a gateway
//! - Bundled data-item submission to a bundling relay
//! - A two-phase upload engine (bundled, then chunked)
//! - The `FilesStore` contract with filesystem and Arweave backends

pub mod backends;
pub mod bundler;
pub mod client;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod traits;
pub mod uploader;

pub use backends::{arweave::ArweaveBackend, filesystem::FilesystemBackend};
pub use bundler::BundlerClient;
pub use client::ArweaveClient;
pub use engine::UploadEngine;
pub use error::{StorageError, StorageResult};
pub use gateway::GatewayClient;
pub use traits::{FileMeta, FileStat, FileState, FilesStore, StoreKey};
pub use uploader::ChunkUploader;

use permastore_core::StoreConfig;
use std::sync::Arc;
use tracing::info;

/// Create a file store from configuration.
///
/// The backend kind is resolved here once; the Arweave backend loads its
/// wallet and fails with a credential error if it cannot.
pub async fn from_config(config: &StoreConfig) -> StorageResult<Arc<dyn FilesStore>> {
    config.validate().map_err(StorageError::Config)?;

    let store: Arc<dyn FilesStore> = match config {
        StoreConfig::Filesystem { path } => Arc::new(FilesystemBackend::new(path).await?),
        StoreConfig::Arweave { path, arweave } => {
            Arc::new(ArweaveBackend::from_config(path, arweave).await?)
        }
    };
    info!(backend = store.backend_name(), kind = ?config.kind(), "opened file store");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use permastore_core::ArweaveConfig;
    use tempfile::tempdir;

    #[tokio::test]
    async fn from_config_filesystem_ok() {
        let temp = tempdir().unwrap();
        let config = StoreConfig::Filesystem {
            path: temp.path().join("store"),
        };

        let store = from_config(&config).await.unwrap();
        assert_eq!(store.backend_name(), "filesystem");
        store
            .persist("hello.txt", Bytes::from_static(b"hi"), &FileMeta::default())
            .await
            .unwrap();
        assert!(store.stat("hello.txt").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn from_config_arweave_ok() {
        let temp = tempdir().unwrap();
        let wallet = concat!(env!("CARGO_MANIFEST_DIR"), "/../signer/tests/fixtures/test_jwk.json");
        let config = StoreConfig::Arweave {
            path: temp.path().join("files"),
            arweave: ArweaveConfig::new(wallet, "http://localhost:1984"),
        };

        let store = from_config(&config).await.unwrap();
        assert_eq!(store.backend_name(), "arweave");
    }

    #[tokio::test]
    async fn from_config_rejects_missing_wallet() {
        let temp = tempdir().unwrap();
        let config = StoreConfig::Arweave {
            path: temp.path().join("files"),
            arweave: ArweaveConfig::default(),
        };

        match from_config(&config).await {
            Ok(_) => panic!("expected error"),
            Err(StorageError::Config(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn from_config_rejects_unreadable_wallet() {
        let temp = tempdir().unwrap();
        let config = StoreConfig::Arweave {
            path: temp.path().join("files"),
            arweave: ArweaveConfig::new("/nonexistent/wallet.json", "http://localhost:1984"),
        };

        match from_config(&config).await {
            Ok(_) => panic!("expected error"),
            Err(e) => assert!(e.is_credential(), "unexpected error: {e:?}"),
        }
    }
}
