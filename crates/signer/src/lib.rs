//! Arweave signing primitives.
//!
//! This crate provides:
//! - RSA wallet loading from JWK files or inline JSON
//! - Deep hashing of signature messages
//! - ANS-104 data items for bundled uploads
//! - Format 2 transactions with Merkle-chunked data

pub mod data_item;
pub mod deep_hash;
pub mod encoding;
pub mod error;
pub mod merkle;
pub mod transaction;
pub mod wallet;

pub use data_item::DataItem;
pub use error::{SignerError, SignerResult};
pub use transaction::{ChunkPayload, Transaction, TransactionHeader};
pub use wallet::{Jwk, Wallet};
