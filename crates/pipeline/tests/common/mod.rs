#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use permastore_core::ContentHash;
use permastore_core::config::ThumbSize;
use permastore_pipeline::{
    ConvertedImage, Downloader, ImageConverter, MediaRequest, MediaResponse, PipelineError,
    PipelineResult,
};
use permastore_storage::{
    FileMeta, FileStat, FilesStore, StorageError, StorageResult, StoreKey,
};
use std::collections::HashMap;
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

pub const WALLET_PATH: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../signer/tests/fixtures/test_jwk.json"
);
pub const EXISTING_TX: &str = "bNbA3TEQVL60xlgCcqdz4ZPHFZ711cZ3hmkpGttDt_U";
pub const RELAY_TX: &str = "Yq0o2s0QJ3lV7Jmv6b5wWbAG0z7u7mhtzbNpYaI4yd8";

pub fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

/// In-memory file store keyed by path.
#[derive(Default)]
pub struct MemoryStore {
    files: Mutex<HashMap<String, (Bytes, FileMeta)>>,
    fail_stat: bool,
}

impl MemoryStore {
    pub fn failing_stat() -> Self {
        Self {
            fail_stat: true,
            ..Self::default()
        }
    }

    pub fn insert(&self, path: &str, data: &'static [u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), (Bytes::from_static(data), FileMeta::default()));
    }

    pub fn get(&self, path: &str) -> Option<(Bytes, FileMeta)> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<_> = self.files.lock().unwrap().keys().cloned().collect();
        paths.sort();
        paths
    }

    fn key(path: &str) -> StoreKey {
        StoreKey::Local(PathBuf::from("/memory").join(path))
    }
}

#[async_trait]
impl FilesStore for MemoryStore {
    async fn persist(&self, path: &str, data: Bytes, meta: &FileMeta) -> StorageResult<StoreKey> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), (data, meta.clone()));
        Ok(Self::key(path))
    }

    async fn stat(&self, path: &str) -> StorageResult<Option<FileStat>> {
        if self.fail_stat {
            return Err(StorageError::Lookup("gateway unavailable".into()));
        }
        Ok(self.get(path).map(|(data, _)| FileStat {
            key: Self::key(path),
            checksum: ContentHash::compute(&data),
            size: data.len() as u64,
            last_modified: None,
        }))
    }

    fn resolve_url(&self, key: &StoreKey) -> StorageResult<Url> {
        match key {
            StoreKey::Local(path) => Url::from_file_path(path)
                .map_err(|()| StorageError::InvalidKey(path.display().to_string())),
            StoreKey::Permanent(tx_id) => Err(StorageError::InvalidKey(tx_id.to_string())),
        }
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Serves canned responses by URL and counts calls.
#[derive(Default)]
pub struct StaticDownloader {
    responses: HashMap<String, MediaResponse>,
    calls: AtomicUsize,
}

impl StaticDownloader {
    pub fn with(mut self, url: &str, response: MediaResponse) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Downloader for StaticDownloader {
    async fn download(&self, request: &MediaRequest) -> PipelineResult<MediaResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .responses
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| MediaResponse::new(404, "")))
    }
}

/// Treats the body as `<width>x<height>` and "scales" it to fit a size.
pub struct FakeConverter;

impl ImageConverter for FakeConverter {
    fn convert(&self, source: &[u8], size: Option<ThumbSize>) -> PipelineResult<ConvertedImage> {
        let text = std::str::from_utf8(source).map_err(|e| PipelineError::Image(e.to_string()))?;
        let (w, h) = text
            .split_once('x')
            .ok_or_else(|| PipelineError::Image(format!("cannot identify image: {text}")))?;
        let parse = |v: &str| {
            v.parse::<u32>()
                .map_err(|e| PipelineError::Image(e.to_string()))
        };
        let (mut width, mut height) = (parse(w)?, parse(h)?);
        if let Some(size) = size {
            width = width.min(size.width);
            height = height.min(size.height);
        }
        Ok(ConvertedImage {
            width,
            height,
            data: Bytes::from(format!("{width}x{height}")),
        })
    }
}
