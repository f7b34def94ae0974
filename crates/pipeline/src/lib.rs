//! Crawler-facing integration for permastore file stores.
//!
//! This crate provides:
//! - The shared stat → download → persist media lifecycle
//! - A files pipeline and an images pipeline with thumbnails
//! - Feed export storage that uploads each distinct feed once

pub mod error;
pub mod feed;
pub mod files;
pub mod images;
pub mod media;

pub use error::{PipelineError, PipelineResult};
pub use feed::FeedStorage;
pub use files::FilesPipeline;
pub use images::{ConvertedImage, IMAGE_CONTENT_TYPE, ImageConverter, ImagesPipeline};
pub use media::{
    Downloader, FileResult, HttpDownloader, MediaPipeline, MediaRequest, MediaResponse,
    MediaStats, MediaStatsSnapshot, MediaStatus, Persisted,
};
