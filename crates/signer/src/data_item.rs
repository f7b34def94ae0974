//! ANS-104 data items signed with an Arweave RSA wallet.
//!
//! A data item is a self-contained signed blob that a bundling relay packs
//! into a base-layer transaction on the uploader's behalf.

use crate::deep_hash::{DeepHashChunk, deep_hash};
use crate::encoding::id_from_signature;
use crate::error::{SignerError, SignerResult};
use crate::wallet::{Wallet, verify};
use bytes::Bytes;
use permastore_core::{Tag, TransactionId};

/// Signature type 1: Arweave RSA-PSS with a 4096-bit key.
pub const SIGNATURE_TYPE_ARWEAVE: u16 = 1;

/// Signature and owner length for signature type 1.
pub const ARWEAVE_SIGNATURE_LEN: usize = 512;

pub const MAX_TAGS: usize = 128;
pub const MAX_TAG_NAME_LEN: usize = 1024;
pub const MAX_TAG_VALUE_LEN: usize = 3072;

/// A data item before or after signing.
#[derive(Clone, Debug)]
pub struct DataItem {
    tags: Vec<Tag>,
    encoded_tags: Vec<u8>,
    data: Bytes,
    owner: Vec<u8>,
    signature: Vec<u8>,
}

impl DataItem {
    /// Create an unsigned data item, validating its tags.
    pub fn new(data: impl Into<Bytes>, tags: Vec<Tag>) -> SignerResult<Self> {
        let encoded_tags = encode_tags(&tags)?;
        Ok(Self {
            tags,
            encoded_tags,
            data: data.into(),
            owner: Vec::new(),
            signature: Vec::new(),
        })
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn owner(&self) -> &[u8] {
        &self.owner
    }

    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }

    /// Deep hash signed by the owner. Target and anchor are always empty.
    pub fn signature_data(&self) -> [u8; 48] {
        let sig_type = SIGNATURE_TYPE_ARWEAVE.to_string();
        deep_hash(&DeepHashChunk::List(vec![
            DeepHashChunk::blob(b"dataitem"),
            DeepHashChunk::blob(b"1"),
            DeepHashChunk::blob(sig_type.as_bytes()),
            DeepHashChunk::blob(&self.owner),
            DeepHashChunk::blob(&[]),
            DeepHashChunk::blob(&[]),
            DeepHashChunk::blob(&self.encoded_tags),
            DeepHashChunk::blob(&self.data),
        ]))
    }

    /// Sign the item with `wallet`, replacing any previous signature.
    pub fn sign(&mut self, wallet: &Wallet) -> SignerResult<TransactionId> {
        if wallet.owner().len() != ARWEAVE_SIGNATURE_LEN {
            return Err(SignerError::InvalidDataItem(format!(
                "owner must be {ARWEAVE_SIGNATURE_LEN} bytes, got {}",
                wallet.owner().len()
            )));
        }
        self.owner = wallet.owner().to_vec();
        let signature = wallet.sign(&self.signature_data())?;
        if signature.len() != ARWEAVE_SIGNATURE_LEN {
            return Err(SignerError::Signing(format!(
                "unexpected signature length {}",
                signature.len()
            )));
        }
        self.signature = signature;
        self.id()
    }

    /// The item id: base64url(SHA-256(signature)).
    pub fn id(&self) -> SignerResult<TransactionId> {
        if !self.is_signed() {
            return Err(SignerError::InvalidDataItem("item is not signed".to_string()));
        }
        id_from_signature(&self.signature)
    }

    /// Check the signature against the owner.
    pub fn verify(&self) -> SignerResult<()> {
        if !self.is_signed() {
            return Err(SignerError::InvalidDataItem("item is not signed".to_string()));
        }
        verify(&self.owner, &self.signature_data(), &self.signature)
    }

    /// Binary encoding submitted to the bundling relay.
    pub fn to_bytes(&self) -> SignerResult<Vec<u8>> {
        if !self.is_signed() {
            return Err(SignerError::InvalidDataItem("item is not signed".to_string()));
        }
        let mut buf = Vec::with_capacity(
            2 + 2 * ARWEAVE_SIGNATURE_LEN + 2 + 16 + self.encoded_tags.len() + self.data.len(),
        );
        buf.extend_from_slice(&SIGNATURE_TYPE_ARWEAVE.to_le_bytes());
        buf.extend_from_slice(&self.signature);
        buf.extend_from_slice(&self.owner);
        // target and anchor absent
        buf.push(0);
        buf.push(0);
        buf.extend_from_slice(&(self.tags.len() as u64).to_le_bytes());
        buf.extend_from_slice(&(self.encoded_tags.len() as u64).to_le_bytes());
        buf.extend_from_slice(&self.encoded_tags);
        buf.extend_from_slice(&self.data);
        Ok(buf)
    }

    /// Parse a binary data item. Only items without target and anchor are
    /// accepted.
    pub fn from_bytes(bytes: &[u8]) -> SignerResult<Self> {
        let mut reader = Reader::new(bytes);
        let sig_type = u16::from_le_bytes(reader.array()?);
        if sig_type != SIGNATURE_TYPE_ARWEAVE {
            return Err(SignerError::InvalidDataItem(format!(
                "unsupported signature type {sig_type}"
            )));
        }
        let signature = reader.take(ARWEAVE_SIGNATURE_LEN)?.to_vec();
        let owner = reader.take(ARWEAVE_SIGNATURE_LEN)?.to_vec();
        if reader.take(1)? != [0] || reader.take(1)? != [0] {
            return Err(SignerError::InvalidDataItem(
                "target and anchor are not supported".to_string(),
            ));
        }
        let tag_count = u64::from_le_bytes(reader.array()?);
        let tags_len = usize::try_from(u64::from_le_bytes(reader.array()?))
            .map_err(|_| SignerError::InvalidDataItem("tag section too large".to_string()))?;
        let encoded_tags = reader.take(tags_len)?.to_vec();
        let tags = decode_tags(&encoded_tags)?;
        if tags.len() as u64 != tag_count {
            return Err(SignerError::InvalidDataItem(format!(
                "tag count mismatch: header says {tag_count}, found {}",
                tags.len()
            )));
        }
        let data = Bytes::copy_from_slice(reader.rest());

        Ok(Self {
            tags,
            encoded_tags,
            data,
            owner,
            signature,
        })
    }
}

/// Avro-encode tags as an array of `{name: bytes, value: bytes}` records.
///
/// An empty tag list encodes to zero bytes.
pub fn encode_tags(tags: &[Tag]) -> SignerResult<Vec<u8>> {
    if tags.is_empty() {
        return Ok(Vec::new());
    }
    if tags.len() > MAX_TAGS {
        return Err(SignerError::InvalidDataItem(format!(
            "too many tags: {} > {MAX_TAGS}",
            tags.len()
        )));
    }

    let mut buf = Vec::new();
    write_long(&mut buf, tags.len() as i64);
    for tag in tags {
        if tag.name.is_empty() || tag.name.len() > MAX_TAG_NAME_LEN {
            return Err(SignerError::InvalidDataItem(format!(
                "tag name must be 1..={MAX_TAG_NAME_LEN} bytes, got {}",
                tag.name.len()
            )));
        }
        if tag.value.is_empty() || tag.value.len() > MAX_TAG_VALUE_LEN {
            return Err(SignerError::InvalidDataItem(format!(
                "tag {:?} value must be 1..={MAX_TAG_VALUE_LEN} bytes, got {}",
                tag.name,
                tag.value.len()
            )));
        }
        write_bytes(&mut buf, tag.name.as_bytes());
        write_bytes(&mut buf, tag.value.as_bytes());
    }
    write_long(&mut buf, 0);
    Ok(buf)
}

/// Decode Avro-encoded tags.
pub fn decode_tags(bytes: &[u8]) -> SignerResult<Vec<Tag>> {
    let mut tags = Vec::new();
    if bytes.is_empty() {
        return Ok(tags);
    }

    let mut reader = Reader::new(bytes);
    loop {
        let count = reader.long()?;
        if count == 0 {
            break;
        }
        // negative block counts are followed by the block size in bytes
        if count < 0 {
            reader.long()?;
        }
        for _ in 0..count.unsigned_abs() {
            let name = reader.string()?;
            let value = reader.string()?;
            tags.push(Tag { name, value });
            if tags.len() > MAX_TAGS {
                return Err(SignerError::InvalidDataItem("too many tags".to_string()));
            }
        }
    }
    if !reader.rest().is_empty() {
        return Err(SignerError::InvalidDataItem(
            "trailing bytes after tags".to_string(),
        ));
    }
    Ok(tags)
}

fn write_long(buf: &mut Vec<u8>, value: i64) {
    let mut n = ((value << 1) ^ (value >> 63)) as u64;
    while n >= 0x80 {
        buf.push((n as u8 & 0x7f) | 0x80);
        n >>= 7;
    }
    buf.push(n as u8);
}

fn write_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    write_long(buf, data.len() as i64);
    buf.extend_from_slice(data);
}

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn take(&mut self, n: usize) -> SignerResult<&'a [u8]> {
        if self.buf.len() < n {
            return Err(SignerError::InvalidDataItem("unexpected end of input".to_string()));
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn array<const N: usize>(&mut self) -> SignerResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn long(&mut self) -> SignerResult<i64> {
        let mut n: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = self.take(1)?[0];
            if shift >= 64 {
                return Err(SignerError::InvalidDataItem("varint overflow".to_string()));
            }
            n |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        Ok(((n >> 1) as i64) ^ -((n & 1) as i64))
    }

    fn string(&mut self) -> SignerResult<String> {
        let len = usize::try_from(self.long()?)
            .map_err(|_| SignerError::InvalidDataItem("negative length".to_string()))?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| SignerError::InvalidDataItem("tag is not valid UTF-8".to_string()))
    }

    fn rest(&self) -> &'a [u8] {
        self.buf
    }
}
