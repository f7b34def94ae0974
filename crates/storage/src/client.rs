//! Arweave client facade: one wallet, one gateway, one upload engine.

use crate::bundler::BundlerClient;
use crate::engine::UploadEngine;
use crate::error::{StorageResult, join_error};
use crate::gateway::GatewayClient;
use permastore_core::{
    ArweaveConfig, ContentHash, DEFAULT_HASH_CHUNK_SIZE, TransactionId, UploadItem, hash_file,
};
use permastore_signer::Wallet;
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;
use url::Url;

/// Hashes, looks up and uploads content with a single loaded wallet.
///
/// Safe to share between concurrent operations; no call holds state beyond
/// its own duration.
#[derive(Clone, Debug)]
pub struct ArweaveClient {
    wallet: Arc<Wallet>,
    gateway: GatewayClient,
    engine: UploadEngine,
}

impl ArweaveClient {
    /// Load the wallet and build the network clients.
    ///
    /// Fails with a credential error when the wallet cannot be loaded.
    pub fn from_config(config: &ArweaveConfig) -> StorageResult<Self> {
        let gateway_url = config.gateway()?;
        let bundler_url = config.bundler()?;
        let wallet = Arc::new(Wallet::load(&config.wallet_jwk, &gateway_url)?);
        Ok(Self::new(wallet, gateway_url, bundler_url))
    }

    pub fn new(wallet: Arc<Wallet>, gateway_url: Url, bundler_url: Url) -> Self {
        let http = reqwest::Client::new();
        let gateway = GatewayClient::new(http.clone(), gateway_url);
        let bundler = BundlerClient::new(http, bundler_url);
        let engine = UploadEngine::new(Arc::clone(&wallet), gateway.clone(), bundler);
        Self {
            wallet,
            gateway,
            engine,
        }
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn gateway(&self) -> &GatewayClient {
        &self.gateway
    }

    pub fn engine(&self) -> &UploadEngine {
        &self.engine
    }

    /// Hash a file on the blocking pool.
    pub async fn hash_file(&self, path: impl AsRef<Path>) -> StorageResult<ContentHash> {
        let path = path.as_ref().to_path_buf();
        let hash = tokio::task::spawn_blocking(move || hash_file(&path, DEFAULT_HASH_CHUNK_SIZE))
            .await
            .map_err(join_error)??;
        Ok(hash)
    }

    pub async fn find_by_hash(&self, hash: &ContentHash) -> StorageResult<Option<TransactionId>> {
        self.gateway.find_by_hash(hash).await
    }

    pub async fn upload(&self, item: UploadItem) -> StorageResult<TransactionId> {
        self.engine.upload(item).await
    }

    /// Read, hash and upload a file, tagging it with its content hash.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn upload_file(&self, path: impl AsRef<Path>) -> StorageResult<TransactionId> {
        let path = path.as_ref();
        let hash = self.hash_file(path).await?;
        let data = tokio::fs::read(path).await?;
        let item = UploadItem::new(path.to_string_lossy(), data).with_hash(hash);
        self.upload(item).await
    }

    /// Permalink for a transaction. No network call.
    pub fn resolve_url(&self, tx_id: &TransactionId) -> StorageResult<Url> {
        self.gateway.permalink(tx_id)
    }
}
