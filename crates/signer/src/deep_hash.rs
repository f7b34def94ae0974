//! Arweave deep hash.
//!
//! A SHA-384 hash over a tree of byte blobs, used as the signature message for
//! both data items and base-layer transactions. Blobs and lists are tagged
//! with their kind and length so that different trees never collide.

use sha2::{Digest, Sha384};

/// Output of a deep hash: 48 bytes of SHA-384.
pub type DeepHashDigest = [u8; 48];

/// A node in the structure being hashed.
#[derive(Clone, Debug)]
pub enum DeepHashChunk<'a> {
    Blob(&'a [u8]),
    List(Vec<DeepHashChunk<'a>>),
}

impl<'a> DeepHashChunk<'a> {
    pub fn blob(data: &'a [u8]) -> Self {
        Self::Blob(data)
    }
}

/// Compute the deep hash of a chunk tree.
pub fn deep_hash(chunk: &DeepHashChunk<'_>) -> DeepHashDigest {
    match chunk {
        DeepHashChunk::Blob(data) => {
            let tag = sha384(format!("blob{}", data.len()).as_bytes());
            let mut hasher = Sha384::new();
            hasher.update(tag);
            hasher.update(sha384(data));
            to_digest(&hasher.finalize())
        }
        DeepHashChunk::List(children) => {
            let mut acc = sha384(format!("list{}", children.len()).as_bytes());
            for child in children {
                let mut hasher = Sha384::new();
                hasher.update(acc);
                hasher.update(deep_hash(child));
                acc = to_digest(&hasher.finalize());
            }
            acc
        }
    }
}

fn sha384(data: &[u8]) -> DeepHashDigest {
    to_digest(&Sha384::digest(data))
}

fn to_digest(bytes: &[u8]) -> DeepHashDigest {
    let mut out = [0u8; 48];
    out.copy_from_slice(bytes);
    out
}
