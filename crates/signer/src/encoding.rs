//! Base64url helpers used by the Arweave wire formats.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use crate::error::{SignerError, SignerResult};
use permastore_core::TransactionId;
use sha2::{Digest, Sha256};

/// Encode bytes as unpadded base64url.
pub fn b64url_encode(data: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Decode base64url, tolerating trailing padding.
pub fn b64url_decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(s.trim().trim_end_matches('='))
}

/// Derive the id of a signed item: base64url(SHA-256(signature)).
pub fn id_from_signature(signature: &[u8]) -> SignerResult<TransactionId> {
    let digest = Sha256::digest(signature);
    TransactionId::parse(&b64url_encode(digest)).map_err(|e| SignerError::Signing(e.to_string()))
}
