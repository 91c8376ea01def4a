//! Durable object storage abstraction.
//!
//! The ingestion path uploads relocated assets through the [`ObjectStore`]
//! trait so the pipeline stays independent of the actual backend (cloud
//! bucket, CDN origin, plain disk). Two implementations ship with the
//! crate: [`FsObjectStore`] writes under a local directory and serves via
//! a base URL, and [`MemoryObjectStore`] backs tests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// A destination for relocated assets.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key`, returning the public URL of the stored
    /// object.
    async fn upload(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String>;
}

/// Filesystem-backed store: objects land under a root directory and are
/// assumed to be served at `base_url`.
pub struct FsObjectStore {
    root: PathBuf,
    base_url: String,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn upload(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<String> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(format!("{}/{}", self.base_url.trim_end_matches('/'), key))
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryObjectStore {
    base_url: String,
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<String> {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
        Ok(format!("{}/{}", self.base_url.trim_end_matches('/'), key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_store_writes_and_returns_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path(), "https://assets.example.com/");
        let url = store
            .upload("articles/2025/01/02/x.png", b"data", "image/png")
            .await
            .unwrap();
        assert_eq!(url, "https://assets.example.com/articles/2025/01/02/x.png");
        let written = std::fs::read(dir.path().join("articles/2025/01/02/x.png")).unwrap();
        assert_eq!(written, b"data");
    }

    #[tokio::test]
    async fn test_memory_store_records_objects() {
        let store = MemoryObjectStore::new("https://assets.example.com");
        let url = store.upload("a/b.png", b"data", "image/png").await.unwrap();
        assert_eq!(url, "https://assets.example.com/a/b.png");
        assert_eq!(store.get("a/b.png").unwrap(), b"data");
        assert_eq!(store.object_count(), 1);
    }
}
