//! End-to-end ingestion normalization tests: mocked remote origins and an
//! in-memory object store.

use chrono::Utc;
use std::sync::Arc;

use markdown_pipeline::config::PipelineConfig;
use markdown_pipeline::normalize::Normalizer;
use markdown_pipeline::store::MemoryObjectStore;

const STORE_BASE: &str = "https://assets.example.com";

fn config() -> PipelineConfig {
    PipelineConfig {
        // The store's base URL marks its objects as already durable so a
        // second normalize pass leaves them alone.
        normalized_hosts: vec!["assets.example.com".to_string()],
        ..PipelineConfig::default()
    }
}

fn normalizer(store: Arc<MemoryObjectStore>) -> Normalizer {
    Normalizer::new(config(), store).unwrap()
}

#[tokio::test]
async fn test_remote_image_relocated_to_store() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/pic.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(b"png-bytes".as_slice())
        .expect(1)
        .create_async()
        .await;

    let store = Arc::new(MemoryObjectStore::new(STORE_BASE));
    let n = normalizer(store.clone());
    let body = format!("before ![a]({}/pic.png) after", server.url());

    let outcome = n.normalize(&body).await;
    assert!(outcome.changed);
    assert_eq!(outcome.succeeded, 1);
    assert_eq!(outcome.failed, 0);
    mock.assert_async().await;

    // Date-partitioned, collision-free key under the configured folder.
    let keys = store.keys();
    assert_eq!(keys.len(), 1);
    let prefix = format!("articles/{}/", Utc::now().format("%Y/%m/%d"));
    assert!(keys[0].starts_with(&prefix), "{}", keys[0]);
    assert!(keys[0].ends_with(".png"), "{}", keys[0]);
    assert_eq!(store.get(&keys[0]).unwrap(), b"png-bytes");

    assert!(outcome.body.starts_with("before !["));
    assert!(outcome
        .body
        .contains(&format!("![a]({STORE_BASE}/{})", keys[0])));
    assert!(!outcome.body.contains(&server.url()));
}

#[tokio::test]
async fn test_normalize_is_idempotent() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/pic.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(b"png-bytes".as_slice())
        .expect(1)
        .create_async()
        .await;

    let store = Arc::new(MemoryObjectStore::new(STORE_BASE));
    let n = normalizer(store.clone());
    let body = format!("![a]({}/pic.png)", server.url());

    let first = n.normalize(&body).await;
    assert!(first.changed);

    let second = n.normalize(&first.body).await;
    assert!(!second.changed);
    assert_eq!(second.body, first.body);
    assert_eq!(store.object_count(), 1);
    // The origin was hit exactly once across both runs.
    mock.assert_async().await;
}

#[tokio::test]
async fn test_local_references_untouched() {
    let store = Arc::new(MemoryObjectStore::new(STORE_BASE));
    let n = normalizer(store.clone());

    let outcome = n.normalize("![a](/uploads/2025/img.png)").await;
    assert!(!outcome.changed);
    assert_eq!(outcome.body, "![a](/uploads/2025/img.png)");
    assert_eq!(outcome.skipped, 1);
    assert_eq!(store.object_count(), 0);
}

#[tokio::test]
async fn test_already_normalized_body_short_circuits() {
    let store = Arc::new(MemoryObjectStore::new(STORE_BASE));
    let n = normalizer(store.clone());

    let outcome = n.normalize("![a](./images/x.png)").await;
    assert!(!outcome.changed);
    assert_eq!(outcome.succeeded, 0);
    assert_eq!(outcome.failed, 0);
    assert_eq!(store.object_count(), 0);
}

#[tokio::test]
async fn test_body_without_images_unchanged() {
    let store = Arc::new(MemoryObjectStore::new(STORE_BASE));
    let n = normalizer(store);

    let body = "# Title\n\nJust text and a [link](https://example.com).";
    let outcome = n.normalize(body).await;
    assert!(!outcome.changed);
    assert_eq!(outcome.body, body);
}

#[tokio::test]
async fn test_failed_download_keeps_original_link() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/gone.png")
        .with_status(404)
        .create_async()
        .await;

    let store = Arc::new(MemoryObjectStore::new(STORE_BASE));
    let n = normalizer(store.clone());
    let body = format!("![a]({}/gone.png)", server.url());

    let outcome = n.normalize(&body).await;
    // The original link survives verbatim, so nothing changed on disk
    // or in the body.
    assert!(!outcome.changed);
    assert_eq!(outcome.body, body);
    assert_eq!(outcome.failed, 1);
    assert_eq!(store.object_count(), 0);
}

#[tokio::test]
async fn test_duplicate_remote_url_uploaded_once() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/pic.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(b"png-bytes".as_slice())
        .expect(1)
        .create_async()
        .await;

    let store = Arc::new(MemoryObjectStore::new(STORE_BASE));
    let n = normalizer(store.clone());
    let url = format!("{}/pic.png", server.url());
    let body = format!("![a]({url}) mid ![a]({url})");

    let outcome = n.normalize(&body).await;
    assert!(outcome.changed);
    assert_eq!(outcome.succeeded, 1);
    assert_eq!(store.object_count(), 1);
    mock.assert_async().await;

    let keys = store.keys();
    let stored = format!("![a]({STORE_BASE}/{})", keys[0]);
    assert_eq!(outcome.body.matches(&stored).count(), 2);
}
