//! In-memory storage backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::Storage;

/// Non-durable storage for tests and short-lived processes.
#[derive(Default)]
pub struct MemoryStorage {
    cache: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn set_item(&self, key: &str, value: String) {
        self.cache.lock().await.insert(key.to_string(), value);
    }

    async fn get_item_opt(&self, key: &str) -> Option<String> {
        self.cache.lock().await.get(key).cloned()
    }

    async fn remove_item(&self, key: &str) {
        self.cache.lock().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_remove_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item_opt("k").await, None);

        storage.set_item("k", "v".into()).await;
        assert_eq!(storage.get_item_opt("k").await, Some("v".into()));

        storage.remove_item("k").await;
        assert_eq!(storage.get_item_opt("k").await, None);
    }
}
