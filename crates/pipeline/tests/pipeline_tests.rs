mod common;

use common::*;
use permastore_core::config::ThumbSize;
use permastore_core::media::{file_path, image_path, thumb_path};
use permastore_pipeline::{
    FilesPipeline, ImagesPipeline, MediaPipeline, MediaRequest, MediaResponse, MediaStatus,
    PipelineError,
};
use permastore_storage::FilesStore;
use std::collections::BTreeMap;
use std::sync::Arc;

const PDF_URL: &str = "https://example.com/docs/report.pdf";
const CAT_URL: &str = "https://example.com/cat.png";

fn files(store: &Arc<MemoryStore>) -> FilesPipeline {
    let store: Arc<dyn FilesStore> = store.clone();
    FilesPipeline::new(store, 4)
}

fn images(store: &Arc<MemoryStore>) -> ImagesPipeline {
    let store: Arc<dyn FilesStore> = store.clone();
    let thumbs = BTreeMap::from([
        ("big".to_string(), ThumbSize { width: 270, height: 270 }),
        ("small".to_string(), ThumbSize { width: 50, height: 50 }),
    ]);
    ImagesPipeline::new(store, Arc::new(FakeConverter))
        .with_min_size(100, 100)
        .with_thumbs(thumbs)
}

#[tokio::test]
async fn stored_file_is_not_downloaded_again() {
    let store = Arc::new(MemoryStore::default());
    store.insert(&file_path(PDF_URL), b"%PDF");
    let pipeline = files(&store);
    let downloader = StaticDownloader::default();

    let result = pipeline
        .process(&MediaRequest::new(PDF_URL), &downloader)
        .await
        .unwrap();
    assert_eq!(result.status, MediaStatus::Uptodate);
    assert_eq!(downloader.calls(), 0);
    assert_eq!(pipeline.stats().snapshot().uptodate, 1);
}

#[tokio::test]
async fn absent_file_is_downloaded_and_persisted() {
    let store = Arc::new(MemoryStore::default());
    let pipeline = files(&store);
    let downloader = StaticDownloader::default().with(PDF_URL, MediaResponse::new(200, "%PDF-1.7"));

    let request = MediaRequest::new(PDF_URL).with_referer("https://example.com/docs/");
    let result = pipeline.process(&request, &downloader).await.unwrap();
    assert_eq!(result.status, MediaStatus::Downloaded);
    assert_eq!(result.path, file_path(PDF_URL));
    assert!(result.permalink.as_str().ends_with(".pdf"));
    assert_eq!(store.get(&result.path).unwrap().0.as_ref(), b"%PDF-1.7");
    assert_eq!(downloader.calls(), 1);
}

#[tokio::test]
async fn stat_errors_mean_download() {
    let store = Arc::new(MemoryStore::failing_stat());
    let pipeline = files(&store);
    let downloader = StaticDownloader::default().with(PDF_URL, MediaResponse::new(200, "%PDF"));

    let result = pipeline
        .process(&MediaRequest::new(PDF_URL), &downloader)
        .await
        .unwrap();
    assert_eq!(result.status, MediaStatus::Downloaded);
    assert_eq!(downloader.calls(), 1);
}

#[tokio::test]
async fn failed_download_counted_and_nothing_stored() {
    let store = Arc::new(MemoryStore::default());
    let pipeline = files(&store);
    let downloader = StaticDownloader::default();

    let err = pipeline
        .process(&MediaRequest::new(PDF_URL), &downloader)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Download { status: 404, .. }), "{err:?}");
    assert_eq!(pipeline.stats().snapshot().failed, 1);
    assert!(store.paths().is_empty());
}

#[tokio::test]
async fn process_all_keeps_request_order() {
    let store = Arc::new(MemoryStore::default());
    store.insert(&file_path("https://example.com/b.txt"), b"old");
    let pipeline = files(&store);
    let downloader = StaticDownloader::default()
        .with("https://example.com/a.txt", MediaResponse::new(200, "a"))
        .with("https://example.com/c.txt", MediaResponse::new(200, "c").cached());

    let requests = ["a", "b", "c", "d"]
        .iter()
        .map(|n| MediaRequest::new(format!("https://example.com/{n}.txt")))
        .collect();
    let results = pipeline.process_all(requests, &downloader).await;

    let statuses: Vec<_> = results
        .iter()
        .map(|r| r.as_ref().map(|f| f.status).ok())
        .collect();
    assert_eq!(
        statuses,
        vec![
            Some(MediaStatus::Downloaded),
            Some(MediaStatus::Uptodate),
            Some(MediaStatus::Cached),
            None
        ]
    );
    assert_eq!(results[0].as_ref().unwrap().url, "https://example.com/a.txt");
    let stats = pipeline.stats().snapshot();
    assert_eq!((stats.downloaded, stats.uptodate, stats.cached, stats.failed), (1, 1, 1, 1));
}

#[tokio::test]
async fn image_and_thumbnails_stored_as_jpeg() {
    let store = Arc::new(MemoryStore::default());
    let pipeline = images(&store);
    let downloader = StaticDownloader::default().with(CAT_URL, MediaResponse::new(200, "640x480"));

    let result = pipeline
        .process(&MediaRequest::new(CAT_URL), &downloader)
        .await
        .unwrap();
    assert_eq!(result.path, image_path(CAT_URL));
    assert_eq!(result.derivatives.len(), 2);

    let (data, meta) = store.get(&image_path(CAT_URL)).unwrap();
    assert_eq!(data.as_ref(), b"640x480");
    assert_eq!(meta.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!((meta.width, meta.height), (Some(640), Some(480)));

    let (_, small) = store.get(&thumb_path(CAT_URL, "small")).unwrap();
    assert_eq!((small.width, small.height), (Some(50), Some(50)));
    assert_eq!(small.content_type.as_deref(), Some("image/jpeg"));
    assert!(store.get(&thumb_path(CAT_URL, "big")).is_some());
}

#[tokio::test]
async fn small_image_rejected_before_persist() {
    let store = Arc::new(MemoryStore::default());
    let pipeline = images(&store);
    let downloader = StaticDownloader::default().with(CAT_URL, MediaResponse::new(200, "80x600"));

    let err = pipeline
        .process(&MediaRequest::new(CAT_URL), &downloader)
        .await
        .unwrap_err();
    match err {
        PipelineError::ImageTooSmall { width, height, .. } => assert_eq!((width, height), (80, 600)),
        other => panic!("expected ImageTooSmall, got {other:?}"),
    }
    assert!(store.paths().is_empty());
}

#[tokio::test]
async fn undecodable_image_is_an_error() {
    let store = Arc::new(MemoryStore::default());
    let pipeline = images(&store);
    let downloader = StaticDownloader::default().with(CAT_URL, MediaResponse::new(200, "GIF89a"));

    let err = pipeline
        .process(&MediaRequest::new(CAT_URL), &downloader)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Image(_)), "{err:?}");
}
