//! Gateway client: tag lookups over GraphQL and base-layer transaction
//! submission.

use crate::error::{StorageError, StorageResult};
use permastore_core::{ContentHash, FILE_HASH_TAG, TransactionId, permalink};
use permastore_signer::{ChunkPayload, TransactionHeader};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

const FIND_BY_TAG_QUERY: &str = r#"query($name: String!, $value: String!) {
  transactions(tags: [{name: $name, values: [$value]}], first: 1) {
    edges { node { id } }
  }
}"#;

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: TagVariables<'a>,
}

#[derive(Serialize)]
struct TagVariables<'a> {
    name: &'a str,
    value: &'a str,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<GraphQlData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlData {
    transactions: TransactionConnection,
}

#[derive(Deserialize)]
struct TransactionConnection {
    edges: Vec<TransactionEdge>,
}

#[derive(Deserialize)]
struct TransactionEdge {
    node: TransactionNode,
}

#[derive(Deserialize)]
struct TransactionNode {
    id: String,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

/// Make `url` a directory base so relative joins keep its last path segment.
pub(crate) fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// HTTP client for one Arweave gateway.
#[derive(Clone, Debug)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: Url,
    api_base: Url,
}

impl GatewayClient {
    pub fn new(http: reqwest::Client, base_url: Url) -> Self {
        let api_base = with_trailing_slash(base_url.clone());
        Self {
            http,
            base_url,
            api_base,
        }
    }

    /// The gateway URL as configured.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> StorageResult<Url> {
        self.api_base
            .join(path)
            .map_err(|e| StorageError::Core(e.into()))
    }

    /// Permalink of a transaction. No network call.
    pub fn permalink(&self, tx_id: &TransactionId) -> StorageResult<Url> {
        Ok(permalink(&self.api_base, tx_id)?)
    }

    /// Find an existing transaction tagged with `File-Hash = hash`.
    ///
    /// Any failure is reported as [`StorageError::Lookup`].
    #[instrument(skip(self), fields(gateway = %self.base_url))]
    pub async fn find_by_hash(&self, hash: &ContentHash) -> StorageResult<Option<TransactionId>> {
        self.find_by_tag(FILE_HASH_TAG, &hash.to_hex()).await
    }

    /// Find the first transaction carrying tag `name = value`.
    pub async fn find_by_tag(&self, name: &str, value: &str) -> StorageResult<Option<TransactionId>> {
        let url = self
            .url("graphql")
            .map_err(|e| StorageError::Lookup(e.to_string()))?;
        let request = GraphQlRequest {
            query: FIND_BY_TAG_QUERY,
            variables: TagVariables { name, value },
        };

        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| StorageError::Lookup(format!("request failed: {e}")))?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(StorageError::Lookup(format!(
                "gateway returned {status}: {body}"
            )));
        }

        let parsed: GraphQlResponse = serde_json::from_str(&body)
            .map_err(|e| StorageError::Lookup(format!("invalid response: {e}")))?;
        if let Some(error) = parsed.errors.first() {
            return Err(StorageError::Lookup(error.message.clone()));
        }
        let data = parsed
            .data
            .ok_or_else(|| StorageError::Lookup("response has no data".to_string()))?;

        match data.transactions.edges.into_iter().next() {
            Some(edge) => {
                let id = TransactionId::parse(&edge.node.id)
                    .map_err(|e| StorageError::Lookup(e.to_string()))?;
                debug!(tx_id = %id, "found existing transaction");
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    /// Anchor (`last_tx`) for a new transaction.
    pub async fn tx_anchor(&self) -> StorageResult<String> {
        let url = self.url("tx_anchor")?;
        let body = self.send_text(self.http.get(url)).await?;
        Ok(body.trim().to_string())
    }

    /// Fee in winston for storing `bytes` bytes.
    pub async fn price(&self, bytes: usize) -> StorageResult<String> {
        let url = self.url(&format!("price/{bytes}"))?;
        let body = self.send_text(self.http.get(url)).await?;
        Ok(body.trim().to_string())
    }

    /// Submit a signed transaction header.
    #[instrument(skip(self, header), fields(tx_id = %header.id, inline = !header.data.is_empty()))]
    pub async fn post_transaction(&self, header: &TransactionHeader) -> StorageResult<()> {
        let url = self.url("tx")?;
        self.send_text(self.http.post(url).json(header)).await?;
        Ok(())
    }

    /// Submit one chunk of a transaction's data.
    #[instrument(skip(self, chunk), fields(offset = %chunk.offset))]
    pub async fn post_chunk(&self, chunk: &ChunkPayload) -> StorageResult<()> {
        let url = self.url("chunk")?;
        self.send_text(self.http.post(url).json(chunk)).await?;
        Ok(())
    }

    async fn send_text(&self, req: reqwest::RequestBuilder) -> StorageResult<String> {
        let response = req.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        // 208: already received
        if !status.is_success() && status != StatusCode::ALREADY_REPORTED {
            return Err(StorageError::Gateway {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}
