//! JSON-file storage backend.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::Storage;

/// Storage backed by a single JSON object file, `{"key": "value", ...}`.
///
/// Two modes, selected at construction:
/// - cached (`use_cache: true`): the file is read once up front and kept in
///   an in-process cache; every write flushes the whole cache back to disk.
/// - read-through (`use_cache: false`): every operation re-reads the file
///   from disk first, so external writers are picked up, at the cost of an
///   extra read per call.
pub struct FileStorage {
    path: PathBuf,
    cache: Mutex<Option<HashMap<String, String>>>,
}

impl FileStorage {
    /// Open (or prepare to create) a JSON file store at `path`.
    ///
    /// If `use_cache` is true and the file exists and parses, its contents
    /// are loaded eagerly; a missing or malformed file starts from an empty
    /// map rather than erroring, matching the reference implementation's
    /// best-effort load.
    pub async fn new(path: impl Into<PathBuf>, use_cache: bool) -> Self {
        let path = path.into();
        let cache = if use_cache {
            Some(Self::read_from_disk(&path).await.unwrap_or_default())
        } else {
            None
        };
        Self {
            path,
            cache: Mutex::new(cache),
        }
    }

    async fn read_from_disk(path: &PathBuf) -> Option<HashMap<String, String>> {
        let text = tokio::fs::read_to_string(path).await.ok()?;
        serde_json::from_str(&text).ok()
    }

    async fn write_to_disk(path: &PathBuf, data: &HashMap<String, String>) {
        if let Ok(text) = serde_json::to_string(data) {
            if let Err(e) = tokio::fs::write(path, text).await {
                tracing::error!(error = %e, path = %path.display(), "failed to persist storage file");
            }
        }
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn set_item(&self, key: &str, value: String) {
        let mut guard = self.cache.lock().await;
        match guard.as_mut() {
            Some(cache) => {
                cache.insert(key.to_string(), value);
                Self::write_to_disk(&self.path, cache).await;
            }
            None => {
                let mut data = Self::read_from_disk(&self.path).await.unwrap_or_default();
                data.insert(key.to_string(), value);
                Self::write_to_disk(&self.path, &data).await;
            }
        }
    }

    async fn get_item_opt(&self, key: &str) -> Option<String> {
        let guard = self.cache.lock().await;
        match guard.as_ref() {
            Some(cache) => cache.get(key).cloned(),
            None => Self::read_from_disk(&self.path).await.and_then(|d| d.get(key).cloned()),
        }
    }

    async fn remove_item(&self, key: &str) {
        let mut guard = self.cache.lock().await;
        match guard.as_mut() {
            Some(cache) => {
                if cache.remove(key).is_some() {
                    Self::write_to_disk(&self.path, cache).await;
                }
            }
            None => {
                if let Some(mut data) = Self::read_from_disk(&self.path).await {
                    if data.remove(key).is_some() {
                        Self::write_to_disk(&self.path, &data).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cached_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let storage = FileStorage::new(&path, true).await;

        storage.set_item("connection", "{}".into()).await;
        assert_eq!(storage.get_item_opt("connection").await, Some("{}".into()));

        storage.remove_item("connection").await;
        assert_eq!(storage.get_item_opt("connection").await, None);
    }

    #[tokio::test]
    async fn read_through_sees_external_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let storage = FileStorage::new(&path, false).await;

        storage.set_item("k", "v1".into()).await;

        // A second handle in read-through mode should observe the write.
        let other = FileStorage::new(&path, false).await;
        assert_eq!(other.get_item_opt("k").await, Some("v1".into()));
    }
}
