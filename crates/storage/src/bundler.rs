//! Bundling relay client.

use crate::error::{StorageError, StorageResult};
use crate::gateway::with_trailing_slash;
use permastore_core::TransactionId;
use serde::Deserialize;
use tracing::instrument;
use url::Url;

#[derive(Deserialize)]
struct SubmitResponse {
    id: String,
}

/// Submits signed data items to a bundling relay.
#[derive(Clone, Debug)]
pub struct BundlerClient {
    http: reqwest::Client,
    base_url: Url,
    api_base: Url,
}

impl BundlerClient {
    pub fn new(http: reqwest::Client, base_url: Url) -> Self {
        let api_base = with_trailing_slash(base_url.clone());
        Self {
            http,
            base_url,
            api_base,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// POST a signed data item to `/tx/arweave` and return the id the relay
    /// assigned.
    #[instrument(skip(self, item), fields(relay = %self.base_url, size = item.len()))]
    pub async fn submit(&self, item: Vec<u8>) -> StorageResult<TransactionId> {
        let url = self.submit_url()?;
        let response = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(item)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(StorageError::Relay {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SubmitResponse = serde_json::from_str(&body).map_err(|e| StorageError::Relay {
            status: status.as_u16(),
            body: format!("invalid response: {e}"),
        })?;
        Ok(TransactionId::parse(&parsed.id)?)
    }

    fn submit_url(&self) -> StorageResult<Url> {
        self.api_base
            .join("tx/arweave")
            .map_err(|e| StorageError::Core(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundler(url: &str) -> BundlerClient {
        BundlerClient::new(reqwest::Client::new(), Url::parse(url).unwrap())
    }

    #[test]
    fn test_submit_url_keeps_relay_path_prefix() {
        for relay in ["http://localhost:3000/relay", "http://localhost:3000/relay/"] {
            assert_eq!(
                bundler(relay).submit_url().unwrap().as_str(),
                "http://localhost:3000/relay/tx/arweave"
            );
        }
        assert_eq!(
            bundler("https://node1.bundlr.network").submit_url().unwrap().as_str(),
            "https://node1.bundlr.network/tx/arweave"
        );
        assert_eq!(
            bundler("http://localhost:3000/relay").base_url().as_str(),
            "http://localhost:3000/relay"
        );
    }
}
