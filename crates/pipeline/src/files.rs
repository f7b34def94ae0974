//! Generic file downloads stored through a [`FilesStore`].

use crate::error::PipelineResult;
use crate::media::{MediaPipeline, MediaRequest, MediaResponse, MediaStats, Persisted};
use async_trait::async_trait;
use permastore_core::AppConfig;
use permastore_core::media::file_path;
use permastore_storage::{FileMeta, FilesStore};
use std::sync::Arc;

pub struct FilesPipeline {
    store: Arc<dyn FilesStore>,
    concurrency: usize,
    stats: MediaStats,
}

impl FilesPipeline {
    pub fn new(store: Arc<dyn FilesStore>, concurrency: usize) -> Self {
        Self {
            store,
            concurrency,
            stats: MediaStats::default(),
        }
    }

    /// Open the configured files store.
    pub async fn from_config(config: &AppConfig) -> PipelineResult<Self> {
        let store = permastore_storage::from_config(&config.files_store()?).await?;
        Ok(Self::new(store, config.files.concurrency))
    }
}

#[async_trait]
impl MediaPipeline for FilesPipeline {
    fn media_name(&self) -> &'static str {
        "file"
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
        file_path(&request.url)
    }

    async fn file_downloaded(
        &self,
        request: &MediaRequest,
        response: &MediaResponse,
    ) -> PipelineResult<Persisted> {
        let path = self.file_path(request);
        let key = self
            .store
            .persist(&path, response.body.clone(), &FileMeta::default())
            .await?;
        Ok(Persisted::single(key))
    }
}

impl std::fmt::Debug for FilesPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilesPipeline")
            .field("backend", &self.store.backend_name())
            .field("concurrency", &self.concurrency)
            .finish()
    }
}
