//! Arweave wallet (RSA JWK) loading and signing.

use crate::encoding::{b64url_decode, b64url_encode};
use crate::error::{SignerError, SignerResult};
use rsa::pss::{BlindedSigningKey, Signature, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use url::Url;

/// Public exponent used by every Arweave wallet.
const PUBLIC_EXPONENT: u32 = 65537;

/// An RSA key in JSON Web Key form, as produced by Arweave wallets.
#[derive(Clone, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub n: String,
    pub e: String,
    pub d: String,
    pub p: String,
    pub q: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,
}

impl fmt::Debug for Jwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jwk")
            .field("kty", &self.kty)
            .field("n", &format_args!("{}...", self.n.chars().take(8).collect::<String>()))
            .finish_non_exhaustive()
    }
}

/// A loaded signing credential.
///
/// Immutable after load; signing does not touch key state, so one wallet can
/// be shared (`Arc<Wallet>`) by any number of concurrent uploads.
pub struct Wallet {
    key: RsaPrivateKey,
    owner: Vec<u8>,
    address: String,
    api_url: Option<Url>,
}

impl Wallet {
    /// Load a wallet from a JWK file path or inline JWK JSON.
    ///
    /// If `path_or_data` names an existing file the key is read from it,
    /// otherwise the string itself is parsed as JWK JSON. The wallet's API
    /// endpoint is bound to `gateway`.
    pub fn load(path_or_data: &str, gateway: &Url) -> SignerResult<Self> {
        let trimmed = path_or_data.trim();
        if trimmed.is_empty() {
            return Err(SignerError::Credential {
                message: "no wallet key material configured".to_string(),
                source: None,
            });
        }

        let path = Path::new(trimmed);
        let wallet = if path.is_file() {
            Self::from_jwk_file(path)?
        } else {
            Self::from_jwk_str(trimmed).map_err(|e| match e {
                SignerError::Credential { source, .. } => SignerError::Credential {
                    message: "wallet is neither an existing key file nor valid inline JWK"
                        .to_string(),
                    source,
                },
                other => other,
            })?
        };
        Ok(wallet.with_api_url(gateway.clone()))
    }

    /// Load a wallet from a JWK file.
    pub fn from_jwk_file(path: impl AsRef<Path>) -> SignerResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            SignerError::credential(format!("failed to read wallet file {}", path.display()), e)
        })?;
        Self::from_jwk_str(&data)
    }

    /// Parse a wallet from JWK JSON.
    pub fn from_jwk_str(data: &str) -> SignerResult<Self> {
        let jwk: Jwk = serde_json::from_str(data)
            .map_err(|e| SignerError::credential("failed to parse wallet JWK", e))?;
        Self::from_jwk(&jwk)
    }

    /// Build a wallet from a parsed JWK.
    pub fn from_jwk(jwk: &Jwk) -> SignerResult<Self> {
        if jwk.kty != "RSA" {
            return Err(SignerError::Credential {
                message: format!("unsupported key type {:?}, expected RSA", jwk.kty),
                source: None,
            });
        }

        let n = decode_component("n", &jwk.n)?;
        let e = decode_component("e", &jwk.e)?;
        let d = decode_component("d", &jwk.d)?;
        let p = decode_component("p", &jwk.p)?;
        let q = decode_component("q", &jwk.q)?;

        let key = RsaPrivateKey::from_components(n, e, d, vec![p, q])
            .map_err(|e| SignerError::credential("invalid RSA key", e))?;
        Ok(Self::from_key(key))
    }

    /// Generate a fresh wallet.
    pub fn generate(bits: usize) -> SignerResult<Self> {
        let mut rng = rand_core::OsRng;
        let key = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| SignerError::KeyParsing(format!("key generation failed: {e}")))?;
        Ok(Self::from_key(key))
    }

    fn from_key(key: RsaPrivateKey) -> Self {
        let owner = key.n().to_bytes_be();
        let address = b64url_encode(Sha256::digest(&owner));
        Self {
            key,
            owner,
            address,
            api_url: None,
        }
    }

    /// Bind the wallet to a gateway.
    pub fn with_api_url(mut self, api_url: Url) -> Self {
        self.api_url = Some(api_url);
        self
    }

    /// Export the key as a JWK.
    pub fn to_jwk(&self) -> Jwk {
        let encode = |v: &BigUint| b64url_encode(v.to_bytes_be());
        let primes = self.key.primes();
        let (p, q) = (&primes[0], &primes[1]);
        let one = BigUint::from(1u32);
        let d = self.key.d();
        Jwk {
            kty: "RSA".to_string(),
            n: encode(self.key.n()),
            e: encode(self.key.e()),
            d: encode(d),
            p: encode(p),
            q: encode(q),
            dp: Some(encode(&(d % (p - &one)))),
            dq: Some(encode(&(d % (q - &one)))),
            qi: self.key.crt_coefficient().map(|qi| encode(&qi)),
        }
    }

    /// Raw modulus bytes, used as the `owner` field of signed items.
    pub fn owner(&self) -> &[u8] {
        &self.owner
    }

    /// The wallet address: base64url(SHA-256(owner)).
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Gateway this wallet talks to, once bound.
    pub fn api_url(&self) -> Option<&Url> {
        self.api_url.as_ref()
    }

    /// Sign a message with RSA-PSS/SHA-256 (32-byte salt).
    pub fn sign(&self, message: &[u8]) -> SignerResult<Vec<u8>> {
        let signing_key = BlindedSigningKey::<Sha256>::new(self.key.clone());
        let mut rng = rand_core::OsRng;
        let signature = signing_key
            .try_sign_with_rng(&mut rng, message)
            .map_err(|e| SignerError::Signing(e.to_string()))?;
        Ok(signature.to_vec())
    }
}

/// Verify an RSA-PSS/SHA-256 signature made by the owner of `owner`.
pub fn verify(owner: &[u8], message: &[u8], signature: &[u8]) -> SignerResult<()> {
    let public = RsaPublicKey::new(
        BigUint::from_bytes_be(owner),
        BigUint::from(PUBLIC_EXPONENT),
    )
    .map_err(|e| SignerError::KeyParsing(format!("invalid owner: {e}")))?;
    let signature =
        Signature::try_from(signature).map_err(|_| SignerError::VerificationFailed)?;
    VerifyingKey::<Sha256>::new(public)
        .verify(message, &signature)
        .map_err(|_| SignerError::VerificationFailed)
}

fn decode_component(name: &str, value: &str) -> SignerResult<BigUint> {
    let bytes = b64url_decode(value)
        .map_err(|e| SignerError::credential(format!("invalid JWK component {name:?}"), e))?;
    if bytes.is_empty() {
        return Err(SignerError::Credential {
            message: format!("empty JWK component {name:?}"),
            source: None,
        });
    }
    Ok(BigUint::from_bytes_be(&bytes))
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("api_url", &self.api_url.as_ref().map(Url::as_str))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE_JWK: &str = include_str!("../tests/fixtures/test_jwk.json");

    fn gateway() -> Url {
        Url::parse("http://localhost:1984").unwrap()
    }

    #[test]
    fn test_load_inline_jwk() {
        let wallet = Wallet::load(FIXTURE_JWK, &gateway()).unwrap();
        assert_eq!(wallet.owner().len(), 512);
        assert_eq!(wallet.address().len(), 43);
        assert_eq!(wallet.api_url().unwrap().as_str(), "http://localhost:1984/");
    }

    #[test]
    fn test_load_from_file_path() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/test_jwk.json");
        let from_file = Wallet::load(path, &gateway()).unwrap();
        let inline = Wallet::load(FIXTURE_JWK, &gateway()).unwrap();
        assert_eq!(from_file.address(), inline.address());
    }

    #[test]
    fn test_load_rejects_missing_path_and_bad_data() {
        for input in ["/nonexistent/wallet.json", "{not json", "", "{\"kty\":\"EC\"}"] {
            match Wallet::load(input, &gateway()) {
                Err(SignerError::Credential { .. }) => {}
                other => panic!("expected credential error for {input:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_load_rejects_non_rsa_key() {
        let mut jwk: Jwk = serde_json::from_str(FIXTURE_JWK).unwrap();
        jwk.kty = "OKP".to_string();
        assert!(matches!(
            Wallet::from_jwk(&jwk),
            Err(SignerError::Credential { .. })
        ));
    }

    #[test]
    fn test_load_rejects_inconsistent_key() {
        let mut jwk: Jwk = serde_json::from_str(FIXTURE_JWK).unwrap();
        jwk.d = b64url_encode([7u8; 64]);
        assert!(Wallet::from_jwk(&jwk).is_err());
    }

    #[test]
    fn test_sign_and_verify() {
        let wallet = Wallet::from_jwk_str(FIXTURE_JWK).unwrap();
        let signature = wallet.sign(b"message").unwrap();
        assert_eq!(signature.len(), 512);
        verify(wallet.owner(), b"message", &signature).unwrap();
        assert!(verify(wallet.owner(), b"other", &signature).is_err());
    }

    #[test]
    fn test_jwk_roundtrip() {
        let wallet = Wallet::from_jwk_str(FIXTURE_JWK).unwrap();
        let json = serde_json::to_string(&wallet.to_jwk()).unwrap();
        let reloaded = Wallet::from_jwk_str(&json).unwrap();
        assert_eq!(reloaded.address(), wallet.address());
    }

    #[test]
    fn test_debug_redacts_key() {
        let wallet = Wallet::from_jwk_str(FIXTURE_JWK).unwrap();
        let debug = format!("{wallet:?}");
        assert!(debug.contains(wallet.address()));
        assert!(!debug.contains(&wallet.to_jwk().d));
    }

    #[test]
    fn test_jwk_debug_handles_multibyte_modulus() {
        let mut jwk: Jwk = serde_json::from_str(FIXTURE_JWK).unwrap();
        jwk.n = "ééééééééééé".to_string();
        let debug = format!("{jwk:?}");
        assert!(debug.contains("éééééééé..."));
        assert!(!debug.contains(&jwk.d));
    }
}
