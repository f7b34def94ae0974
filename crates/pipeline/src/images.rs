//! Image downloads with thumbnails.
//!
//! Decoding and resizing belong to the host through [`ImageConverter`]; this
//! module only validates dimensions and stores the results.

use crate::error::{PipelineError, PipelineResult};
use crate::media::{MediaPipeline, MediaRequest, MediaResponse, MediaStats, Persisted};
use async_trait::async_trait;
use bytes::Bytes;
use permastore_core::AppConfig;
use permastore_core::config::ThumbSize;
use permastore_core::media::{image_path, thumb_path};
use permastore_storage::{FileMeta, FilesStore, StoreKey};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Content type of every stored image and thumbnail.
pub const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// A JPEG produced by an [`ImageConverter`].
#[derive(Clone, Debug)]
pub struct ConvertedImage {
    pub width: u32,
    pub height: u32,
    pub data: Bytes,
}

/// Decodes an image and re-encodes it as RGB JPEG.
///
/// With a `size`, the result is scaled down to fit inside it, keeping the
/// aspect ratio. Called on the blocking pool.
pub trait ImageConverter: Send + Sync {
    fn convert(&self, source: &[u8], size: Option<ThumbSize>) -> PipelineResult<ConvertedImage>;
}

pub struct ImagesPipeline {
    store: Arc<dyn FilesStore>,
    converter: Arc<dyn ImageConverter>,
    min_width: u32,
    min_height: u32,
    thumbs: BTreeMap<String, ThumbSize>,
    concurrency: usize,
    stats: MediaStats,
}

impl ImagesPipeline {
    pub fn new(store: Arc<dyn FilesStore>, converter: Arc<dyn ImageConverter>) -> Self {
        Self {
            store,
            converter,
            min_width: 0,
            min_height: 0,
            thumbs: BTreeMap::new(),
            concurrency: 1,
            stats: MediaStats::default(),
        }
    }

    /// Open the configured images store.
    pub async fn from_config(
        config: &AppConfig,
        converter: Arc<dyn ImageConverter>,
    ) -> PipelineResult<Self> {
        let store = permastore_storage::from_config(&config.images_store()?).await?;
        Ok(Self::new(store, converter)
            .with_min_size(config.images.min_width, config.images.min_height)
            .with_thumbs(config.images.thumbs.clone())
            .with_concurrency(config.files.concurrency))
    }

    pub fn with_min_size(mut self, min_width: u32, min_height: u32) -> Self {
        self.min_width = min_width;
        self.min_height = min_height;
        self
    }

    pub fn with_thumbs(mut self, thumbs: BTreeMap<String, ThumbSize>) -> Self {
        self.thumbs = thumbs;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn thumb_path(&self, request: &MediaRequest, thumb_id: &str) -> String {
        thumb_path(&request.url, thumb_id)
    }

    async fn convert(
        &self,
        source: Bytes,
        size: Option<ThumbSize>,
    ) -> PipelineResult<ConvertedImage> {
        let converter = Arc::clone(&self.converter);
        tokio::task::spawn_blocking(move || converter.convert(&source, size))
            .await
            .map_err(|e| PipelineError::Image(format!("converter task failed: {e}")))?
    }

    async fn persist_image(&self, path: &str, image: ConvertedImage) -> PipelineResult<StoreKey> {
        let meta = FileMeta {
            content_type: Some(IMAGE_CONTENT_TYPE.to_string()),
            width: Some(image.width),
            height: Some(image.height),
        };
        Ok(self.store.persist(path, image.data, &meta).await?)
    }
}

#[async_trait]
impl MediaPipeline for ImagesPipeline {
    fn media_name(&self) -> &'static str {
        "image"
    }

    fn store(&self) -> &Arc<dyn FilesStore> {
        &self.store
    }

    fn stats(&self) -> &MediaStats {
        &self.stats
    }

    fn concurrency(&self) -> usize {
        self.concurrency
    }

    fn file_path(&self, request: &MediaRequest) -> String {
        image_path(&request.url)
    }

    async fn file_downloaded(
        &self,
        request: &MediaRequest,
        response: &MediaResponse,
    ) -> PipelineResult<Persisted> {
        let image = self.convert(response.body.clone(), None).await?;
        if image.width < self.min_width || image.height < self.min_height {
            return Err(PipelineError::ImageTooSmall {
                width: image.width,
                height: image.height,
                min_width: self.min_width,
                min_height: self.min_height,
            });
        }

        // thumbnails are scaled from the converted primary
        let source = image.data.clone();
        let key = self.persist_image(&self.file_path(request), image).await?;

        let mut derivatives = BTreeMap::new();
        for (thumb_id, size) in &self.thumbs {
            let thumb = self.convert(source.clone(), Some(*size)).await?;
            debug!(%thumb_id, width = thumb.width, height = thumb.height, "storing thumbnail");
            let thumb_key = self
                .persist_image(&self.thumb_path(request, thumb_id), thumb)
                .await?;
            derivatives.insert(thumb_id.clone(), thumb_key);
        }
        Ok(Persisted { key, derivatives })
    }
}

impl std::fmt::Debug for ImagesPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagesPipeline")
            .field("backend", &self.store.backend_name())
            .field("min_width", &self.min_width)
            .field("min_height", &self.min_height)
            .field("thumbs", &self.thumbs)
            .finish()
    }
}
