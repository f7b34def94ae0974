//! Two-phase upload: bundled data item first, chunked transaction second.

use crate::bundler::BundlerClient;
use crate::error::{StorageError, StorageResult, join_error};
use crate::gateway::GatewayClient;
use crate::uploader::ChunkUploader;
use bytes::Bytes;
use permastore_core::{Tag, TransactionId, UploadItem};
use permastore_signer::{DataItem, Transaction, Wallet};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Uploads items with a single wallet.
///
/// Performs no dedup and no retries; each call creates a new permanent record.
#[derive(Clone, Debug)]
pub struct UploadEngine {
    wallet: Arc<Wallet>,
    gateway: GatewayClient,
    bundler: BundlerClient,
}

impl UploadEngine {
    pub fn new(wallet: Arc<Wallet>, gateway: GatewayClient, bundler: BundlerClient) -> Self {
        Self {
            wallet,
            gateway,
            bundler,
        }
    }

    /// Upload an item, falling back to a chunked transaction when the
    /// bundling relay fails.
    ///
    /// Returns [`StorageError::Upload`] carrying both causes when neither
    /// path succeeds.
    #[instrument(skip(self, item), fields(name = %item.name, size = item.payload.len()))]
    pub async fn upload(&self, item: UploadItem) -> StorageResult<TransactionId> {
        let tags = item.tags();

        let bundled = match self.upload_bundled(item.payload.clone(), tags.clone()).await {
            Ok(tx_id) => {
                info!(%tx_id, "uploaded via bundling relay");
                return Ok(tx_id);
            }
            Err(e) => e,
        };
        warn!(error = %bundled, "bundled upload failed, falling back to chunked transaction");

        match self.upload_chunked(item.payload, tags).await {
            Ok(tx_id) => {
                info!(%tx_id, "uploaded via chunked transaction");
                Ok(tx_id)
            }
            Err(chunked) => {
                error!(error = %chunked, "chunked upload failed");
                Err(StorageError::Upload {
                    name: item.name,
                    bundled: Box::new(bundled),
                    chunked: Box::new(chunked),
                })
            }
        }
    }

    /// Phase 1: sign a data item and submit it to the bundling relay.
    pub async fn upload_bundled(&self, payload: Bytes, tags: Vec<Tag>) -> StorageResult<TransactionId> {
        let wallet = Arc::clone(&self.wallet);
        let encoded = tokio::task::spawn_blocking(move || -> StorageResult<Vec<u8>> {
            let mut item = DataItem::new(payload, tags)?;
            item.sign(&wallet)?;
            Ok(item.to_bytes()?)
        })
        .await
        .map_err(join_error)??;

        self.bundler.submit(encoded).await
    }

    /// Phase 2: sign a base-layer transaction and post it chunk by chunk.
    pub async fn upload_chunked(&self, payload: Bytes, tags: Vec<Tag>) -> StorageResult<TransactionId> {
        let anchor = self.gateway.tx_anchor().await?;
        let reward = self.gateway.price(payload.len()).await?;

        let wallet = Arc::clone(&self.wallet);
        let tx = tokio::task::spawn_blocking(move || -> StorageResult<Transaction> {
            let mut tx = Transaction::new(payload, tags);
            tx.set_anchor(&anchor)?;
            tx.set_reward(&reward)?;
            tx.sign(&wallet)?;
            Ok(tx)
        })
        .await
        .map_err(join_error)??;
        let tx_id = tx.id()?;
        debug!(%tx_id, chunks = tx.chunk_count(), "signed transaction");

        let mut uploader = ChunkUploader::new(&self.gateway, &tx);
        while !uploader.is_complete() {
            uploader.upload_chunk().await?;
        }
        Ok(tx_id)
    }
}
