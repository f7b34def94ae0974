//! File store backends.

pub mod arweave;
pub mod filesystem;
