//! Format 2 base-layer transactions with chunked data.

use crate::deep_hash::{DeepHashChunk, deep_hash};
use crate::encoding::{b64url_decode, b64url_encode, id_from_signature};
use crate::error::{SignerError, SignerResult};
use crate::merkle::{Chunks, prepare_chunks};
use crate::wallet::{Wallet, verify};
use bytes::Bytes;
use permastore_core::{Tag, TransactionId};
use serde::{Deserialize, Serialize};

const FORMAT: u8 = 2;

/// A tag in a transaction header, name and value base64url-encoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderTag {
    pub name: String,
    pub value: String,
}

/// JSON header posted to `/tx`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionHeader {
    pub format: u8,
    pub id: String,
    pub last_tx: String,
    pub owner: String,
    pub tags: Vec<HeaderTag>,
    pub target: String,
    pub quantity: String,
    pub data: String,
    pub data_size: String,
    pub data_root: String,
    pub reward: String,
    pub signature: String,
}

/// JSON body posted to `/chunk`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub data_root: String,
    pub data_size: String,
    pub data_path: String,
    pub offset: String,
    pub chunk: String,
}

/// A data-carrying base-layer transaction.
#[derive(Clone, Debug)]
pub struct Transaction {
    tags: Vec<Tag>,
    data: Bytes,
    chunks: Option<Chunks>,
    last_tx: String,
    reward: String,
    owner: Vec<u8>,
    signature: Vec<u8>,
}

impl Transaction {
    /// Create an unsigned transaction and compute its data root.
    pub fn new(data: impl Into<Bytes>, tags: Vec<Tag>) -> Self {
        let data = data.into();
        let chunks = (!data.is_empty()).then(|| prepare_chunks(&data));
        Self {
            tags,
            data,
            chunks,
            last_tx: String::new(),
            reward: "0".to_string(),
            owner: Vec::new(),
            signature: Vec::new(),
        }
    }

    /// Set the anchor returned by the gateway's `/tx_anchor`.
    pub fn set_anchor(&mut self, anchor: &str) -> SignerResult<()> {
        let anchor = anchor.trim();
        b64url_decode(anchor)
            .map_err(|e| SignerError::InvalidTransaction(format!("invalid anchor: {e}")))?;
        self.last_tx = anchor.to_string();
        Ok(())
    }

    /// Set the fee in winston, as returned by the gateway's `/price`.
    pub fn set_reward(&mut self, reward: &str) -> SignerResult<()> {
        let reward = reward.trim();
        if reward.is_empty() || !reward.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SignerError::InvalidTransaction(format!(
                "invalid reward {reward:?}"
            )));
        }
        self.reward = reward.to_string();
        Ok(())
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    pub fn data_root(&self) -> Option<&[u8; 32]> {
        self.chunks.as_ref().map(|c| &c.data_root)
    }

    /// Number of chunks the data is split into.
    pub fn chunk_count(&self) -> usize {
        self.chunks.as_ref().map_or(0, |c| c.chunks.len())
    }

    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }

    /// Deep hash signed by the owner.
    pub fn signature_data(&self) -> SignerResult<[u8; 48]> {
        let last_tx = b64url_decode(&self.last_tx)
            .map_err(|e| SignerError::InvalidTransaction(format!("invalid anchor: {e}")))?;
        let data_size = self.data.len().to_string();
        let data_root = self.data_root().map(|r| r.as_slice()).unwrap_or_default();

        let tags = self
            .tags
            .iter()
            .map(|tag| {
                DeepHashChunk::List(vec![
                    DeepHashChunk::blob(tag.name.as_bytes()),
                    DeepHashChunk::blob(tag.value.as_bytes()),
                ])
            })
            .collect();

        Ok(deep_hash(&DeepHashChunk::List(vec![
            DeepHashChunk::blob(b"2"),
            DeepHashChunk::blob(&self.owner),
            DeepHashChunk::blob(&[]),
            DeepHashChunk::blob(b"0"),
            DeepHashChunk::blob(self.reward.as_bytes()),
            DeepHashChunk::blob(&last_tx),
            DeepHashChunk::List(tags),
            DeepHashChunk::blob(data_size.as_bytes()),
            DeepHashChunk::blob(data_root),
        ])))
    }

    /// Sign the transaction with `wallet`.
    pub fn sign(&mut self, wallet: &Wallet) -> SignerResult<TransactionId> {
        self.owner = wallet.owner().to_vec();
        let message = self.signature_data()?;
        self.signature = wallet.sign(&message)?;
        self.id()
    }

    /// Transaction id: base64url(SHA-256(signature)).
    pub fn id(&self) -> SignerResult<TransactionId> {
        if !self.is_signed() {
            return Err(SignerError::InvalidTransaction(
                "transaction is not signed".to_string(),
            ));
        }
        id_from_signature(&self.signature)
    }

    pub fn verify(&self) -> SignerResult<()> {
        if !self.is_signed() {
            return Err(SignerError::InvalidTransaction(
                "transaction is not signed".to_string(),
            ));
        }
        verify(&self.owner, &self.signature_data()?, &self.signature)
    }

    /// The signed header. With `include_data` the payload travels inline,
    /// otherwise it is uploaded chunk by chunk.
    pub fn header(&self, include_data: bool) -> SignerResult<TransactionHeader> {
        let id = self.id()?;
        Ok(TransactionHeader {
            format: FORMAT,
            id: id.into(),
            last_tx: self.last_tx.clone(),
            owner: b64url_encode(&self.owner),
            tags: self
                .tags
                .iter()
                .map(|tag| HeaderTag {
                    name: b64url_encode(&tag.name),
                    value: b64url_encode(&tag.value),
                })
                .collect(),
            target: String::new(),
            quantity: "0".to_string(),
            data: if include_data {
                b64url_encode(&self.data)
            } else {
                String::new()
            },
            data_size: self.data.len().to_string(),
            data_root: self.data_root().map(b64url_encode).unwrap_or_default(),
            reward: self.reward.clone(),
            signature: b64url_encode(&self.signature),
        })
    }

    /// Chunk `index` with its proof, ready to post to `/chunk`.
    pub fn chunk(&self, index: usize) -> SignerResult<ChunkPayload> {
        let chunks = self
            .chunks
            .as_ref()
            .ok_or_else(|| SignerError::InvalidTransaction("transaction has no data".to_string()))?;
        let (chunk, proof) = chunks
            .chunks
            .get(index)
            .zip(chunks.proofs.get(index))
            .ok_or_else(|| {
                SignerError::InvalidTransaction(format!(
                    "chunk {index} out of range ({} chunks)",
                    chunks.chunks.len()
                ))
            })?;

        Ok(ChunkPayload {
            data_root: b64url_encode(chunks.data_root),
            data_size: self.data.len().to_string(),
            data_path: b64url_encode(&proof.proof),
            offset: proof.offset.to_string(),
            chunk: b64url_encode(&self.data[chunk.min_byte_range..chunk.max_byte_range]),
        })
    }
}
