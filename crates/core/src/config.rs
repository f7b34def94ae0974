//! Configuration types shared across crates.

use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use url::Url;

/// Arweave network configuration.
///
/// Supplied once when a client or backend is constructed; never shared
/// between unrelated instances.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArweaveConfig {
    /// Gateway serving permalinks, GraphQL lookups and base-layer transactions.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    /// Bundling relay accepting signed data items.
    #[serde(default = "default_bundler_url")]
    pub bundler_url: String,
    /// Wallet JWK: either a path to a key file or the inline JSON key.
    /// WARNING: Prefer a key file path over inlining the key in config files.
    #[serde(default)]
    pub wallet_jwk: String,
}

fn default_gateway_url() -> String {
    crate::DEFAULT_GATEWAY_URL.to_string()
}

fn default_bundler_url() -> String {
    crate::DEFAULT_BUNDLER_URL.to_string()
}

impl Default for ArweaveConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            bundler_url: default_bundler_url(),
            wallet_jwk: String::new(),
        }
    }
}

impl ArweaveConfig {
    /// Create a configuration for the given wallet and gateway.
    pub fn new(wallet_jwk: impl Into<String>, gateway_url: impl Into<String>) -> Self {
        Self {
            gateway_url: gateway_url.into(),
            wallet_jwk: wallet_jwk.into(),
            ..Self::default()
        }
    }

    /// Parsed gateway URL.
    pub fn gateway(&self) -> crate::Result<Url> {
        Ok(Url::parse(&self.gateway_url)?)
    }

    /// Parsed bundling relay URL.
    pub fn bundler(&self) -> crate::Result<Url> {
        Ok(Url::parse(&self.bundler_url)?)
    }

    /// Validate configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        self.gateway()
            .map_err(|e| format!("arweave.gateway_url is invalid: {e}"))?;
        self.bundler()
            .map_err(|e| format!("arweave.bundler_url is invalid: {e}"))?;
        if self.wallet_jwk.trim().is_empty() {
            return Err("arweave.wallet_jwk must be set to a key file path or inline JWK".to_string());
        }
        Ok(())
    }
}

/// Named backend kinds, resolved once from a store URI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Local filesystem only.
    Filesystem,
    /// Local copy plus permanent upload to Arweave.
    Arweave,
}

impl StoreKind {
    /// Map a URI scheme to a backend kind.
    ///
    /// An empty scheme (plain or absolute paths) selects Arweave.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "" | "ar" => Some(Self::Arweave),
            "file" => Some(Self::Filesystem),
            _ => None,
        }
    }

    /// Split a store URI into its backend kind and location.
    ///
    /// `ar://files` → (Arweave, "files"), `/data/files` → (Arweave, "/data/files"),
    /// `file:///data/files` → (Filesystem, "/data/files").
    pub fn from_uri(uri: &str) -> crate::Result<(Self, String)> {
        let (scheme, location) = match uri.split_once("://") {
            Some((scheme, location)) => (scheme, location),
            None => ("", uri),
        };
        let kind = Self::from_scheme(&scheme.to_ascii_lowercase())
            .ok_or_else(|| crate::Error::InvalidStoreUri(format!("unsupported scheme in {uri}")))?;
        if location.is_empty() {
            return Err(crate::Error::InvalidStoreUri(format!(
                "missing location in {uri}"
            )));
        }
        Ok((kind, location.to_string()))
    }
}

/// File store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for storage.
        path: PathBuf,
    },
    /// Local copy plus Arweave upload.
    Arweave {
        /// Root directory for the local copies that get hashed and uploaded.
        path: PathBuf,
        /// Network and wallet settings.
        #[serde(default)]
        arweave: ArweaveConfig,
    },
}

impl StoreConfig {
    /// Build a store configuration from a store URI.
    pub fn from_uri(uri: &str, arweave: &ArweaveConfig) -> crate::Result<Self> {
        let (kind, location) = StoreKind::from_uri(uri)?;
        let path = PathBuf::from(location);
        Ok(match kind {
            StoreKind::Filesystem => Self::Filesystem { path },
            StoreKind::Arweave => Self::Arweave {
                path,
                arweave: arweave.clone(),
            },
        })
    }

    /// The backend kind this configuration selects.
    pub fn kind(&self) -> StoreKind {
        match self {
            Self::Filesystem { .. } => StoreKind::Filesystem,
            Self::Arweave { .. } => StoreKind::Arweave,
        }
    }

    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Filesystem { path } | Self::Arweave { path, .. }
                if path.as_os_str().is_empty() =>
            {
                Err("store path must not be empty".to_string())
            }
            Self::Arweave { arweave, .. } => arweave.validate(),
            Self::Filesystem { .. } => Ok(()),
        }
    }
}

/// Files pipeline configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FilesConfig {
    /// Store URI (`ar://dir`, `/abs/dir` or `file:///dir`).
    #[serde(default = "default_files_store")]
    pub store: String,
    /// Maximum media requests processed concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_files_store() -> String {
    "ar://files".to_string()
}

fn default_concurrency() -> usize {
    16
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            store: default_files_store(),
            concurrency: default_concurrency(),
        }
    }
}

/// Thumbnail bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbSize {
    pub width: u32,
    pub height: u32,
}

/// Images pipeline configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Store URI for images.
    #[serde(default = "default_images_store")]
    pub store: String,
    /// Images narrower than this are rejected.
    #[serde(default)]
    pub min_width: u32,
    /// Images shorter than this are rejected.
    #[serde(default)]
    pub min_height: u32,
    /// Named thumbnail variants.
    #[serde(default)]
    pub thumbs: BTreeMap<String, ThumbSize>,
}

fn default_images_store() -> String {
    "ar://images".to_string()
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            store: default_images_store(),
            min_width: 0,
            min_height: 0,
            thumbs: BTreeMap::new(),
        }
    }
}

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Network and wallet settings.
    #[serde(default)]
    pub arweave: ArweaveConfig,
    /// Files pipeline settings.
    #[serde(default)]
    pub files: FilesConfig,
    /// Images pipeline settings.
    #[serde(default)]
    pub images: ImagesConfig,
}

impl AppConfig {
    /// Configuration sources: an optional TOML file, then `PERMASTORE_`
    /// environment variables (`PERMASTORE_ARWEAVE__GATEWAY_URL=...`).
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new();
        if let Some(path) = path
            && path.exists()
        {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed("PERMASTORE_").split("__"))
    }

    /// Load configuration from the file (if present) and environment.
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }

    /// Store configuration for the files pipeline.
    pub fn files_store(&self) -> crate::Result<StoreConfig> {
        StoreConfig::from_uri(&self.files.store, &self.arweave)
    }

    /// Store configuration for the images pipeline.
    pub fn images_store(&self) -> crate::Result<StoreConfig> {
        StoreConfig::from_uri(&self.images.store, &self.arweave)
    }
}
