//! Feed export storage: an exported feed file is uploaded once per distinct
//! content.

use crate::error::{PipelineError, PipelineResult};
use permastore_core::{ArweaveConfig, StoreKind, TransactionId, UploadItem};
use permastore_storage::ArweaveClient;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Feed storage for `ar://name`, bare names and absolute paths.
#[derive(Clone, Debug)]
pub struct FeedStorage {
    file_name: String,
    client: Arc<ArweaveClient>,
}

impl FeedStorage {
    /// Parse the feed URI and load the wallet.
    pub fn from_uri(uri: &str, config: &ArweaveConfig) -> PipelineResult<Self> {
        let client = ArweaveClient::from_config(config)?;
        Self::with_client(uri, Arc::new(client))
    }

    pub fn with_client(uri: &str, client: Arc<ArweaveClient>) -> PipelineResult<Self> {
        let (kind, _) = StoreKind::from_uri(uri)?;
        if kind != StoreKind::Arweave {
            return Err(PipelineError::Config(format!(
                "feed storage needs an ar:// or plain URI, got {uri}"
            )));
        }
        Ok(Self {
            file_name: feed_file_name(uri)?,
            client,
        })
    }

    /// Name recorded for the uploaded feed: the URI path, else its host.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn client(&self) -> &ArweaveClient {
        &self.client
    }

    /// Temporary file the exporter writes the feed into.
    pub fn open(&self) -> PipelineResult<NamedTempFile> {
        Ok(NamedTempFile::new()?)
    }

    /// Upload the finished feed unless identical content is already stored.
    ///
    /// A failed lookup is treated as a miss. The temporary file is removed
    /// when this returns.
    #[instrument(skip(self, file), fields(file_name = %self.file_name))]
    pub async fn store(&self, file: NamedTempFile) -> PipelineResult<TransactionId> {
        let hash = self.client.hash_file(file.path()).await?;
        let existing = match self.client.find_by_hash(&hash).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, %hash, "feed lookup failed, uploading");
                None
            }
        };

        let tx_id = match existing {
            Some(tx_id) => {
                debug!(%tx_id, "feed already stored");
                tx_id
            }
            None => {
                let data = tokio::fs::read(file.path()).await?;
                let item = UploadItem::new(&self.file_name, data).with_hash(hash);
                self.client.upload(item).await?
            }
        };
        let permalink = self.client.resolve_url(&tx_id)?;
        info!(%permalink, "feed stored");
        Ok(tx_id)
    }
}

fn feed_file_name(uri: &str) -> PipelineResult<String> {
    if !uri.contains("://") {
        return Ok(uri.to_string());
    }
    let url = Url::parse(uri).map_err(permastore_core::Error::from)?;
    let path = url.path();
    let name = if path.is_empty() || path == "/" {
        url.host_str().unwrap_or_default()
    } else {
        path
    };
    if name.is_empty() {
        return Err(PipelineError::Config(format!("feed URI has no name: {uri}")));
    }
    Ok(name.to_string())
}
