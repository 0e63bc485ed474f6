//! Durable key/value storage for session state.
//!
//! `Storage` is the narrow async contract the rest of the crate is built
//! on: opaque string values behind string keys, get/set/remove. Two
//! implementations ship here, `MemoryStorage` and `FileStorage`; both treat
//! values opaquely and know nothing about `ConnectionRecord` shapes — that
//! knowledge lives in [`session_store::SessionStore`].

mod file;
mod memory;
pub mod session_store;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use session_store::{BridgeCursorStore, SessionStore};

use async_trait::async_trait;

/// Key the session's `ConnectionRecord` JSON is stored under.
pub const KEY_CONNECTION: &str = "connection";
/// Key prefix for a per-bridge SSE resume cursor, suffixed with
/// `:<hash6(bridge_url)>` so switching bridges can't replay another
/// bridge's events.
pub const KEY_LAST_EVENT_ID: &str = "last_event_id";

/// Async key/value storage contract.
///
/// Implementors only need to persist opaque UTF-8 strings; all JSON
/// encoding/decoding of the `ConnectionRecord` happens above this trait.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Save `value` under `key`, overwriting any existing value.
    async fn set_item(&self, key: &str, value: String);

    /// Read the value under `key`, or `None` if absent.
    async fn get_item_opt(&self, key: &str) -> Option<String>;

    /// Remove the value under `key`, if present.
    async fn remove_item(&self, key: &str);

    /// Read the value under `key`, or `default` if absent.
    async fn get_item(&self, key: &str, default: String) -> String {
        self.get_item_opt(key).await.unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_get_item_falls_back() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("missing", "fallback".into()).await, "fallback");
        storage.set_item("missing", "present".into()).await;
        assert_eq!(storage.get_item("missing", "fallback".into()).await, "present");
    }
}
