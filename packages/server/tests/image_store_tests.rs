//! Tests for image archival: idempotency, download failures and the
//! background-removal partial success path.

mod common;

use std::sync::Arc;
use std::time::Duration;

use crate::common::sample_png;
use reindeer_core::common::utils::{image_id_for_url, no_background_key, original_key};
use reindeer_core::kernel::test_dependencies::{InMemoryObjectStorage, MockBackgroundRemover};
use reindeer_core::kernel::{
    BaseBackgroundRemover, BaseImageStore, EdgeFloodRemover, ImageStoreError, ObjectImageStore,
    VariantState,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Test Helpers
// =============================================================================

fn image_store(
    storage: Arc<InMemoryObjectStorage>,
    remover: Arc<dyn BaseBackgroundRemover>,
) -> ObjectImageStore {
    ObjectImageStore::new(storage, remover, Duration::from_secs(2)).unwrap()
}

async fn serve_image(server: &MockServer, image_path: &str, expected_downloads: u64) {
    Mock::given(method("GET"))
        .and(path(image_path))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(sample_png()),
        )
        .expect(expected_downloads)
        .mount(server)
        .await;
}

// =============================================================================
// Idempotency
// =============================================================================

#[tokio::test]
async fn second_save_skips_download() {
    let server = MockServer::start().await;
    serve_image(&server, "/a.png", 1).await;
    let url = format!("{}/a.png", server.uri());

    let storage = Arc::new(InMemoryObjectStorage::new());
    let store = image_store(storage.clone(), Arc::new(MockBackgroundRemover::new()));

    let first = store.save(&url, true).await.unwrap();
    assert_eq!(first.original, VariantState::Stored);
    assert_eq!(first.background_removed, VariantState::Stored);

    let second = store.save(&url, true).await.unwrap();
    assert_eq!(second.original, VariantState::Existing);
    assert_eq!(second.background_removed, VariantState::Existing);
    assert!(second.original_saved());
    assert!(second.background_variant_saved());

    assert_eq!(storage.put_count(), 2);
}

#[tokio::test]
async fn original_only_save_is_idempotent() {
    let server = MockServer::start().await;
    serve_image(&server, "/b.png", 1).await;
    let url = format!("{}/b.png", server.uri());

    let storage = Arc::new(InMemoryObjectStorage::new());
    let store = image_store(storage.clone(), Arc::new(MockBackgroundRemover::new()));

    store.save(&url, false).await.unwrap();
    let again = store.save(&url, false).await.unwrap();

    assert_eq!(again.original, VariantState::Existing);
    assert_eq!(again.background_removed, VariantState::NotRequested);
    assert_eq!(storage.keys(), vec![original_key(&image_id_for_url(&url))]);
}

#[tokio::test]
async fn requesting_variant_later_downloads_again_but_keeps_original() {
    let server = MockServer::start().await;
    serve_image(&server, "/c.png", 2).await;
    let url = format!("{}/c.png", server.uri());

    let storage = Arc::new(InMemoryObjectStorage::new());
    let store = image_store(storage.clone(), Arc::new(MockBackgroundRemover::new()));

    store.save(&url, false).await.unwrap();
    let upgraded = store.save(&url, true).await.unwrap();

    assert_eq!(upgraded.original, VariantState::Existing);
    assert_eq!(upgraded.background_removed, VariantState::Stored);
    // original uploaded once, variant once
    assert_eq!(storage.put_count(), 2);
}

// =============================================================================
// Keys and content types
// =============================================================================

#[tokio::test]
async fn objects_stored_under_url_hash_keys() {
    let server = MockServer::start().await;
    serve_image(&server, "/d.png", 1).await;
    let url = format!("{}/d.png", server.uri());

    let storage = Arc::new(InMemoryObjectStorage::new());
    let store = image_store(storage.clone(), Arc::new(EdgeFloodRemover::default()));

    let outcome = store.save(&url, true).await.unwrap();
    let id = image_id_for_url(&url);
    assert_eq!(outcome.image_id, id);

    let original = storage.object(&original_key(&id)).unwrap();
    assert_eq!(original.content_type, "image/jpeg");
    assert_eq!(original.body, sample_png());

    let no_bg = storage.object(&no_background_key(&id)).unwrap();
    assert_eq!(no_bg.content_type, "image/png");
    let decoded = image::load_from_memory(&no_bg.body).unwrap().to_rgba8();
    assert_eq!(decoded.get_pixel(0, 0).0[3], 0);
    assert_eq!(decoded.get_pixel(4, 4).0[3], 255);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn non_200_download_fails_the_save() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let url = format!("{}/missing.png", server.uri());

    let storage = Arc::new(InMemoryObjectStorage::new());
    let store = image_store(storage.clone(), Arc::new(MockBackgroundRemover::new()));

    let err = store.save(&url, true).await.unwrap_err();
    assert!(matches!(err, ImageStoreError::Download { .. }));
    assert!(storage.keys().is_empty());
}

#[tokio::test]
async fn background_failure_still_saves_original() {
    let server = MockServer::start().await;
    serve_image(&server, "/e.png", 1).await;
    let url = format!("{}/e.png", server.uri());

    let storage = Arc::new(InMemoryObjectStorage::new());
    let remover = Arc::new(MockBackgroundRemover::failing());
    let store = image_store(storage.clone(), remover.clone());

    let outcome = store.save(&url, true).await.unwrap();

    assert!(outcome.original_saved());
    assert!(!outcome.background_variant_saved());
    assert!(matches!(outcome.background_removed, VariantState::Failed(_)));
    assert_eq!(remover.call_count(), 1);
    assert_eq!(storage.keys(), vec![original_key(&image_id_for_url(&url))]);
}

// =============================================================================
// Retrieval
// =============================================================================

#[tokio::test]
async fn get_returns_url_only_for_stored_variants() {
    let server = MockServer::start().await;
    serve_image(&server, "/f.png", 1).await;
    let url = format!("{}/f.png", server.uri());

    let storage = Arc::new(InMemoryObjectStorage::new());
    let store = image_store(storage, Arc::new(MockBackgroundRemover::new()));
    let id = image_id_for_url(&url);

    assert!(store.get(&id, true).await.unwrap().is_none());

    store.save(&url, false).await.unwrap();

    let original = store.get(&id, true).await.unwrap().unwrap();
    assert!(original.contains(&original_key(&id)));
    assert!(original.contains("expires_in=3600"));
    assert!(store.get(&id, false).await.unwrap().is_none());

    let by_url = store.get_by_url(&url, true).await.unwrap();
    assert_eq!(by_url, Some(original));
}
