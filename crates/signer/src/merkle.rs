//! Chunking and Merkle data roots for base-layer transactions.
//!
//! Transaction data is split into chunks of at most [`MAX_CHUNK_SIZE`]; the
//! chunk hashes form a binary Merkle tree whose root is signed as the
//! transaction's `data_root`. Each chunk is later uploaded together with its
//! proof (`data_path`) against that root.

use sha2::{Digest, Sha256};

/// Maximum chunk size: 256 KiB
pub const MAX_CHUNK_SIZE: usize = 256 * 1024;

/// Minimum size of a non-final chunk: 32 KiB
pub const MIN_CHUNK_SIZE: usize = 32 * 1024;

const HASH_SIZE: usize = 32;
const NOTE_SIZE: usize = 32;

type Hash = [u8; HASH_SIZE];

/// A chunk boundary and the hash of its bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub data_hash: Hash,
    pub min_byte_range: usize,
    pub max_byte_range: usize,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.max_byte_range - self.min_byte_range
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Merkle proof for one chunk.
#[derive(Clone, Debug)]
pub struct Proof {
    /// Offset of the chunk's last byte.
    pub offset: usize,
    pub proof: Vec<u8>,
}

/// Chunk layout, data root and proofs for a payload.
#[derive(Clone, Debug)]
pub struct Chunks {
    pub data_root: Hash,
    pub chunks: Vec<Chunk>,
    pub proofs: Vec<Proof>,
}

/// Bounds of a chunk whose proof was validated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidatedChunk {
    pub offset: usize,
    pub left_bound: usize,
    pub right_bound: usize,
}

enum Node {
    Leaf {
        id: Hash,
        data_hash: Hash,
        max_byte_range: usize,
    },
    Branch {
        id: Hash,
        byte_range: usize,
        max_byte_range: usize,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn id(&self) -> &Hash {
        match self {
            Node::Leaf { id, .. } | Node::Branch { id, .. } => id,
        }
    }

    fn max_byte_range(&self) -> usize {
        match self {
            Node::Leaf { max_byte_range, .. } | Node::Branch { max_byte_range, .. } => {
                *max_byte_range
            }
        }
    }
}

/// Split data into chunks.
///
/// Chunks are [`MAX_CHUNK_SIZE`] except that when the remainder after a full
/// chunk would be smaller than [`MIN_CHUNK_SIZE`], the last two chunks are
/// balanced instead. Data that is an exact multiple of the chunk size ends
/// with a zero-length chunk, which [`prepare_chunks`] drops after the root is
/// built.
pub fn chunk_data(data: &[u8]) -> Vec<Chunk> {
    let mut chunks = Vec::with_capacity(data.len() / MAX_CHUNK_SIZE + 1);
    let mut rest = data;
    let mut cursor = 0;

    while rest.len() >= MAX_CHUNK_SIZE {
        let mut chunk_size = MAX_CHUNK_SIZE;
        let next_chunk_size = rest.len() - MAX_CHUNK_SIZE;
        if next_chunk_size > 0 && next_chunk_size < MIN_CHUNK_SIZE {
            chunk_size = rest.len().div_ceil(2);
        }

        let (chunk, remainder) = rest.split_at(chunk_size);
        chunks.push(Chunk {
            data_hash: sha256(chunk),
            min_byte_range: cursor,
            max_byte_range: cursor + chunk.len(),
        });
        cursor += chunk.len();
        rest = remainder;
    }

    chunks.push(Chunk {
        data_hash: sha256(rest),
        min_byte_range: cursor,
        max_byte_range: cursor + rest.len(),
    });
    chunks
}

/// Compute chunks, data root and per-chunk proofs for a payload.
pub fn prepare_chunks(data: &[u8]) -> Chunks {
    let mut chunks = chunk_data(data);
    let leaves = chunks
        .iter()
        .map(|chunk| Node::Leaf {
            id: hash_parts(&[
                &sha256(&chunk.data_hash),
                &sha256(&note(chunk.max_byte_range)),
            ]),
            data_hash: chunk.data_hash,
            max_byte_range: chunk.max_byte_range,
        })
        .collect();

    let root = build_layers(leaves);
    let data_root = *root.id();
    let mut proofs = Vec::with_capacity(chunks.len());
    resolve_proofs(&root, Vec::new(), &mut proofs);

    if chunks.last().is_some_and(Chunk::is_empty) {
        chunks.pop();
        proofs.pop();
    }

    Chunks {
        data_root,
        chunks,
        proofs,
    }
}

fn build_layers(mut nodes: Vec<Node>) -> Node {
    while nodes.len() > 1 {
        let mut next = Vec::with_capacity(nodes.len().div_ceil(2));
        let mut iter = nodes.into_iter();
        while let Some(left) = iter.next() {
            match iter.next() {
                Some(right) => next.push(hash_branch(left, right)),
                None => next.push(left),
            }
        }
        nodes = next;
    }
    // chunk_data always yields at least one chunk
    nodes.pop().unwrap_or(Node::Leaf {
        id: [0u8; HASH_SIZE],
        data_hash: [0u8; HASH_SIZE],
        max_byte_range: 0,
    })
}

fn hash_branch(left: Node, right: Node) -> Node {
    let byte_range = left.max_byte_range();
    let id = hash_parts(&[
        &sha256(left.id()),
        &sha256(right.id()),
        &sha256(&note(byte_range)),
    ]);
    Node::Branch {
        id,
        byte_range,
        max_byte_range: right.max_byte_range(),
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn resolve_proofs(node: &Node, mut proof: Vec<u8>, out: &mut Vec<Proof>) {
    match node {
        Node::Leaf {
            data_hash,
            max_byte_range,
            ..
        } => {
            proof.extend_from_slice(data_hash);
            proof.extend_from_slice(&note(*max_byte_range));
            out.push(Proof {
                offset: max_byte_range.saturating_sub(1),
                proof,
            });
        }
        Node::Branch {
            byte_range,
            left,
            right,
            ..
        } => {
            proof.extend_from_slice(left.id());
            proof.extend_from_slice(right.id());
            proof.extend_from_slice(&note(*byte_range));
            resolve_proofs(left, proof.clone(), out);
            resolve_proofs(right, proof, out);
        }
    }
}

/// Check that `path` proves a chunk containing byte `dest` under root `id`.
///
/// Returns the chunk bounds on success.
pub fn validate_path(
    id: &Hash,
    dest: usize,
    left_bound: usize,
    right_bound: usize,
    path: &[u8],
) -> Option<ValidatedChunk> {
    if right_bound == 0 {
        return None;
    }
    if dest >= right_bound {
        return validate_path(id, 0, right_bound - 1, right_bound, path);
    }

    if path.len() == HASH_SIZE + NOTE_SIZE {
        let (path_data, end_offset) = path.split_at(HASH_SIZE);
        let leaf_id = hash_parts(&[&sha256(path_data), &sha256(end_offset)]);
        return (&leaf_id == id).then_some(ValidatedChunk {
            offset: right_bound - 1,
            left_bound,
            right_bound,
        });
    }

    if path.len() < 2 * HASH_SIZE + NOTE_SIZE {
        return None;
    }
    let (left, rest) = path.split_at(HASH_SIZE);
    let (right, rest) = rest.split_at(HASH_SIZE);
    let (offset_note, remainder) = rest.split_at(NOTE_SIZE);
    let offset = read_note(offset_note)?;

    let branch_id = hash_parts(&[&sha256(left), &sha256(right), &sha256(offset_note)]);
    if &branch_id != id {
        return None;
    }

    let left: Hash = left.try_into().ok()?;
    let right: Hash = right.try_into().ok()?;
    if dest < offset {
        validate_path(&left, dest, left_bound, right_bound.min(offset), remainder)
    } else {
        validate_path(&right, dest, left_bound.max(offset), right_bound, remainder)
    }
}

fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

fn hash_parts(parts: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// 32-byte big-endian encoding of an offset.
fn note(value: usize) -> [u8; NOTE_SIZE] {
    let mut buf = [0u8; NOTE_SIZE];
    buf[NOTE_SIZE - 8..].copy_from_slice(&(value as u64).to_be_bytes());
    buf
}

fn read_note(buf: &[u8]) -> Option<usize> {
    let (high, low) = buf.split_at(NOTE_SIZE - 8);
    if high.iter().any(|b| *b != 0) {
        return None;
    }
    let low: [u8; 8] = low.try_into().ok()?;
    usize::try_from(u64::from_be_bytes(low)).ok()
}
