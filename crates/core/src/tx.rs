//! Permanent transaction identifiers, tags and permalinks.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Length of a base64url-encoded 32-byte transaction id.
const TX_ID_LEN: usize = 43;

/// Identifier of a permanent write (bundled data item or base-layer transaction).
///
/// Always 43 characters of unpadded base64url, the encoding of a SHA-256
/// digest of the item's signature.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionId(String);

impl TransactionId {
    /// Parse and validate a transaction id.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let s = s.trim();
        if s.len() != TX_ID_LEN {
            return Err(crate::Error::InvalidTransactionId(format!(
                "expected {TX_ID_LEN} chars, got {}",
                s.len()
            )));
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(crate::Error::InvalidTransactionId(format!(
                "invalid character {c:?} in {s}"
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TransactionId {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::parse(&value)
    }
}

impl From<TransactionId> for String {
    fn from(id: TransactionId) -> Self {
        id.0
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self.0)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A key/value metadata pair attached to an upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Resolve the permalink for a transaction through a gateway.
///
/// The id is appended below the gateway path, so `https://arweave.net`,
/// `https://arweave.net/` and `http://localhost:1984/gw` yield
/// `https://arweave.net/<id>` and `http://localhost:1984/gw/<id>`. No network
/// access is involved.
pub fn permalink(gateway: &Url, tx_id: &TransactionId) -> crate::Result<Url> {
    if gateway.path().ends_with('/') {
        return Ok(gateway.join(tx_id.as_str())?);
    }
    let mut base = gateway.clone();
    base.set_path(&format!("{}/", gateway.path()));
    Ok(base.join(tx_id.as_str())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "bNbA3TEQVL60xlgCcqdz4ZPHFZ711cZ3hmkpGttDt_U";

    #[test]
    fn test_parse_valid_id() {
        let id = TransactionId::parse(ID).unwrap();
        assert_eq!(id.as_str(), ID);
        assert_eq!(id.to_string(), ID);
    }

    #[test]
    fn test_parse_rejects_bad_ids() {
        assert!(TransactionId::parse("").is_err());
        assert!(TransactionId::parse("short").is_err());
        assert!(TransactionId::parse(&ID.replace('_', "/")).is_err());
    }

    #[test]
    fn test_permalink_joins_gateway() {
        let id = TransactionId::parse(ID).unwrap();
        for gateway in ["https://arweave.net", "https://arweave.net/"] {
            let gateway = Url::parse(gateway).unwrap();
            assert_eq!(
                permalink(&gateway, &id).unwrap().as_str(),
                format!("https://arweave.net/{ID}")
            );
        }

        let local = Url::parse("http://localhost:1984").unwrap();
        let url = permalink(&local, &id).unwrap();
        assert!(url.as_str().starts_with("http://localhost:1984/"));
        assert!(url.as_str().ends_with(ID));
    }

    #[test]
    fn test_permalink_keeps_gateway_path() {
        let id = TransactionId::parse(ID).unwrap();
        for gateway in ["http://localhost:1984/gw", "http://localhost:1984/gw/"] {
            let gateway = Url::parse(gateway).unwrap();
            assert_eq!(
                permalink(&gateway, &id).unwrap().as_str(),
                format!("http://localhost:1984/gw/{ID}")
            );
        }
    }

    #[test]
    fn test_try_from_string_trims_whitespace() {
        let id = TransactionId::try_from(format!(" {ID}\n")).unwrap();
        assert_eq!(String::from(id), ID);
    }
}
