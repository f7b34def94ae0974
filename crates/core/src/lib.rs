//! Core domain types shared by the permastore crates.
//!
//! This crate defines the data model used across all other crates:
//! - Content hashes and streaming file hashing
//! - Permanent transaction identifiers and tags
//! - Upload items and permalink derivation
//! - Store configuration and backend kinds

pub mod config;
pub mod error;
pub mod hash;
pub mod item;
pub mod media;
pub mod tx;

pub use config::{AppConfig, ArweaveConfig, StoreConfig, StoreKind};
pub use error::{Error, Result};
pub use hash::{ContentHash, ContentHasher, hash_file};
pub use item::UploadItem;
pub use tx::{Tag, TransactionId, permalink};

/// Default read size when hashing files: 64 KiB
pub const DEFAULT_HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Gateway used when none is configured.
pub const DEFAULT_GATEWAY_URL: &str = "https://arweave.net";

/// Bundling relay used when none is configured.
pub const DEFAULT_BUNDLER_URL: &str = "https://node1.bundlr.network";

/// Tag carrying the MIME type of an upload.
pub const CONTENT_TYPE_TAG: &str = "Content-Type";

/// Tag carrying the SHA-256 hex digest of an upload, queried for dedup.
pub const FILE_HASH_TAG: &str = "File-Hash";

/// MIME type used when none can be guessed from the item name.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
