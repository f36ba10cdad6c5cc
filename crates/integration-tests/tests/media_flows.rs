//! Integration tests for uploads and deletes against the stub storage
//! surface.
//!
//! The pre-flight checks (type, size) must reject bad uploads without a
//! single request; the stub's hit counters prove that.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use sokoni_console::MediaClient;
use sokoni_console::media::{FileUpload, MAX_UPLOAD_BYTES, MediaError, ProgressFn};
use sokoni_integration_tests::StubBackend;

fn jpeg_upload(len: usize) -> FileUpload {
    FileUpload::new("photo.jpg", "image/jpeg", vec![0xAB; len])
}

// =============================================================================
// Uploads
// =============================================================================

#[tokio::test]
async fn test_upload_stores_object_and_reports_progress() {
    let backend = StubBackend::spawn().await;
    let media = MediaClient::new(&backend.media_config());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let progress: ProgressFn = Box::new(move |pct| sink.lock().unwrap().push(pct));

    let url = media
        .upload_product_image(&jpeg_upload(150 * 1024), Some("p-7"), Some(progress))
        .await
        .unwrap();

    assert!(url.contains("/v0/b/stub-bucket/o/"));
    assert!(url.contains("alt=media"));
    assert!(url.contains("token=stub-token"));

    // The object landed under the product path with its original bytes.
    let names = backend.object_names();
    assert_eq!(names.len(), 1);
    let name = names.first().unwrap();
    assert!(name.starts_with("products/p-7_"), "unexpected path: {name}");
    assert!(name.ends_with(".jpg"));
    assert_eq!(backend.object(name).unwrap(), vec![0xAB; 150 * 1024]);

    // 150 KiB streams as three chunks; progress lands exactly on 100.
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.last().copied(), Some(100.0));
}

#[tokio::test]
async fn test_oversized_upload_fails_before_any_request() {
    let backend = StubBackend::spawn().await;
    let media = MediaClient::new(&backend.media_config());

    let err = media
        .upload_product_image(&jpeg_upload(6 * 1024 * 1024), Some("p-7"), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MediaError::FileTooLarge { size, max }
            if size == 6 * 1024 * 1024 && max == MAX_UPLOAD_BYTES
    ));
    assert_eq!(backend.upload_hits(), 0);
}

#[tokio::test]
async fn test_disallowed_type_fails_before_any_request() {
    let backend = StubBackend::spawn().await;
    let media = MediaClient::new(&backend.media_config());

    let file = FileUpload::new("notes.txt", "text/plain", vec![1, 2, 3]);
    let err = media
        .upload_product_image(&file, None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, MediaError::InvalidFileType(t) if t == "text/plain"));
    assert_eq!(backend.upload_hits(), 0);
}

// =============================================================================
// Deletes
// =============================================================================

#[tokio::test]
async fn test_delete_product_image_removes_stored_object() {
    let backend = StubBackend::spawn().await;
    let media = MediaClient::new(&backend.media_config());

    let url = media
        .upload_product_image(&jpeg_upload(1024), Some("p-9"), None)
        .await
        .unwrap();
    assert_eq!(backend.object_names().len(), 1);

    media.delete_product_image(&url).await;

    assert_eq!(backend.delete_hits(), 1);
    assert!(backend.object_names().is_empty());
}

#[tokio::test]
async fn test_delete_product_image_ignores_foreign_host() {
    let backend = StubBackend::spawn().await;
    let media = MediaClient::new(&backend.media_config());

    media
        .delete_product_image("https://cdn.example.com/v0/b/stub-bucket/o/products%2Fx.jpg")
        .await;

    assert_eq!(backend.delete_hits(), 0);
}

#[tokio::test]
async fn test_delete_missing_object_surfaces_status() {
    let backend = StubBackend::spawn().await;
    let media = MediaClient::new(&backend.media_config());

    let err = media.delete_file("products/absent.jpg").await.unwrap_err();

    assert!(matches!(
        err,
        MediaError::Status { status, .. } if status.as_u16() == 404
    ));
    assert_eq!(backend.delete_hits(), 1);
}
