//! Media requests, responses and the shared download lifecycle.

use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use permastore_storage::{FileState, FilesStore, StoreKey};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, warn};
use url::Url;

/// A media URL to fetch and store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaRequest {
    pub url: String,
    /// Page the media was found on, for logging.
    pub referer: Option<String>,
}

impl MediaRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            referer: None,
        }
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    fn referer(&self) -> &str {
        self.referer.as_deref().unwrap_or("None")
    }
}

/// Response to a media request.
#[derive(Clone, Debug)]
pub struct MediaResponse {
    pub status: u16,
    pub body: Bytes,
    /// Downloader flags; `cached` marks a response served from a cache.
    pub flags: Vec<String>,
}

impl MediaResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
            flags: Vec::new(),
        }
    }

    pub fn cached(mut self) -> Self {
        self.flags.push("cached".to_string());
        self
    }

    pub fn is_cached(&self) -> bool {
        self.flags.iter().any(|f| f == "cached")
    }
}

/// How a media result was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaStatus {
    /// Already stored; not downloaded again.
    Uptodate,
    Downloaded,
    Cached,
}

impl MediaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uptodate => "uptodate",
            Self::Downloaded => "downloaded",
            Self::Cached => "cached",
        }
    }
}

impl fmt::Display for MediaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a stored media request.
#[derive(Clone, Debug)]
pub struct FileResult {
    pub url: String,
    pub path: String,
    pub key: StoreKey,
    pub permalink: Url,
    pub status: MediaStatus,
    /// Derived files (thumbnails) by name.
    pub derivatives: BTreeMap<String, StoreKey>,
}

/// Keys written by a persist step: the primary file and any derivatives.
#[derive(Clone, Debug)]
pub struct Persisted {
    pub key: StoreKey,
    pub derivatives: BTreeMap<String, StoreKey>,
}

impl Persisted {
    pub fn single(key: StoreKey) -> Self {
        Self {
            key,
            derivatives: BTreeMap::new(),
        }
    }
}

/// Counters per media status.
#[derive(Debug, Default)]
pub struct MediaStats {
    uptodate: AtomicU64,
    downloaded: AtomicU64,
    cached: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`MediaStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MediaStatsSnapshot {
    pub uptodate: u64,
    pub downloaded: u64,
    pub cached: u64,
    pub failed: u64,
}

impl MediaStats {
    pub fn record(&self, status: MediaStatus) {
        let counter = match status {
            MediaStatus::Uptodate => &self.uptodate,
            MediaStatus::Downloaded => &self.downloaded,
            MediaStatus::Cached => &self.cached,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MediaStatsSnapshot {
        MediaStatsSnapshot {
            uptodate: self.uptodate.load(Ordering::Relaxed),
            downloaded: self.downloaded.load(Ordering::Relaxed),
            cached: self.cached.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Fetches media bytes. Supplied by the host crawler.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, request: &MediaRequest) -> PipelineResult<MediaResponse>;
}

/// Plain HTTP GET downloader.
#[derive(Clone, Debug, Default)]
pub struct HttpDownloader {
    http: reqwest::Client,
}

impl HttpDownloader {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, request: &MediaRequest) -> PipelineResult<MediaResponse> {
        let fetch_error = |source: reqwest::Error| PipelineError::Fetch {
            url: request.url.clone(),
            source,
        };
        let mut req = self.http.get(&request.url);
        if let Some(referer) = &request.referer {
            req = req.header(reqwest::header::REFERER, referer);
        }
        let response = req.send().await.map_err(fetch_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(fetch_error)?;
        Ok(MediaResponse::new(status, body))
    }
}

/// The stat → download → persist lifecycle shared by the files and images
/// pipelines.
#[async_trait]
pub trait MediaPipeline: Send + Sync {
    /// Name used in log lines (`file`, `image`).
    fn media_name(&self) -> &'static str;

    fn store(&self) -> &Arc<dyn FilesStore>;

    fn stats(&self) -> &MediaStats;

    /// Maximum requests processed at once by [`process_all`](Self::process_all).
    fn concurrency(&self) -> usize;

    /// Store path for a request.
    fn file_path(&self, request: &MediaRequest) -> String;

    /// Persist a successful download.
    async fn file_downloaded(
        &self,
        request: &MediaRequest,
        response: &MediaResponse,
    ) -> PipelineResult<Persisted>;

    /// Check whether the media is already stored.
    ///
    /// Returns a result when it is up to date; `None` means it must be
    /// downloaded. Stat errors are logged and treated as `None`.
    async fn media_to_download(&self, request: &MediaRequest) -> Option<FileResult> {
        let path = self.file_path(request);
        let stat = self.store().stat(&path).await;
        if let Err(e) = &stat {
            error!(
                error = %e,
                backend = self.store().backend_name(),
                %path,
                "stat failed"
            );
        }
        let state = FileState::after_stat(&stat);
        let FileState::UpToDate(key) = state else {
            return None;
        };

        let permalink = match self.store().resolve_url(&key) {
            Ok(permalink) => permalink,
            Err(e) => {
                error!(error = %e, %key, "cannot resolve stored file");
                return None;
            }
        };
        debug!(
            media = self.media_name(),
            url = %request.url,
            referer = request.referer(),
            "media up to date"
        );
        self.stats().record(MediaStatus::Uptodate);
        Some(FileResult {
            url: request.url.clone(),
            path,
            key,
            permalink,
            status: MediaStatus::Uptodate,
            derivatives: BTreeMap::new(),
        })
    }

    /// Validate a download and persist it.
    async fn media_downloaded(
        &self,
        request: &MediaRequest,
        response: &MediaResponse,
    ) -> PipelineResult<FileResult> {
        if response.status != 200 {
            warn!(
                media = self.media_name(),
                status = response.status,
                url = %request.url,
                referer = request.referer(),
                "error downloading media"
            );
            return Err(PipelineError::Download {
                url: request.url.clone(),
                status: response.status,
            });
        }
        if response.body.is_empty() {
            warn!(
                media = self.media_name(),
                url = %request.url,
                referer = request.referer(),
                "empty media content"
            );
            return Err(PipelineError::EmptyContent {
                url: request.url.clone(),
            });
        }

        let status = if response.is_cached() {
            MediaStatus::Cached
        } else {
            MediaStatus::Downloaded
        };
        debug!(media = self.media_name(), %status, url = %request.url, "media fetched");
        self.stats().record(status);

        let persisted = match self.file_downloaded(request, response).await {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!(
                    media = self.media_name(),
                    error = %e,
                    url = %request.url,
                    "error processing media"
                );
                return Err(e);
            }
        };
        let permalink = self.store().resolve_url(&persisted.key)?;
        Ok(FileResult {
            url: request.url.clone(),
            path: self.file_path(request),
            key: persisted.key,
            permalink,
            status,
            derivatives: persisted.derivatives,
        })
    }

    /// Run the full lifecycle for one request.
    async fn process(
        &self,
        request: &MediaRequest,
        downloader: &dyn Downloader,
    ) -> PipelineResult<FileResult> {
        if let Some(result) = self.media_to_download(request).await {
            return Ok(result);
        }
        let result = match downloader.download(request).await {
            Ok(response) => self.media_downloaded(request, &response).await,
            Err(e) => Err(e),
        };
        if result.is_err() {
            self.stats().record_failure();
        }
        result
    }

    /// Process many requests concurrently; results keep the input order.
    async fn process_all(
        &self,
        requests: Vec<MediaRequest>,
        downloader: &dyn Downloader,
    ) -> Vec<PipelineResult<FileResult>> {
        futures::stream::iter(requests)
            .map(|request| async move { self.process(&request, downloader).await })
            .buffered(self.concurrency().max(1))
            .collect()
            .await
    }
}
