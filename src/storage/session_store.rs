//! Typed views over [`Storage`] for connection state and SSE resume cursors.
//!
//! `SessionStore` owns the single `connection` JSON blob (the session
//! keypair, the wallet's last `connect_event`, and the RPC id counter).
//! `BridgeCursorStore` owns one `last_event_id:<hash6>` entry per bridge URL,
//! keyed by the first six hex digits of the bridge URL's SHA-256 so
//! switching bridges can never replay another bridge's cursor.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{Storage, KEY_CONNECTION, KEY_LAST_EVENT_ID};

/// The session keypair and peer identity, as persisted to storage.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoredSession {
    pub session_private_key: Option<String>,
    pub wallet_public_key: Option<String>,
    pub bridge_url: Option<String>,
}

/// The full on-disk shape of a connection: absent entirely before the first
/// `connect()`, holding just `session`/`connection_source` while waiting for
/// the wallet's `connect` event, and fully populated once it arrives.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConnectionRecord {
    pub session: Option<StoredSession>,
    pub connection_source: Option<serde_json::Value>,
    pub last_wallet_event_id: Option<serde_json::Value>,
    pub connect_event: Option<serde_json::Value>,
    pub next_rpc_request_id: Option<u64>,
}

impl ConnectionRecord {
    fn is_empty(&self) -> bool {
        self.session.is_none() && self.connection_source.is_none() && self.connect_event.is_none()
    }
}

/// Reads and writes the connector's single `ConnectionRecord`.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn Storage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn set_connection(&self, connection: &ConnectionRecord) {
        let encoded = serde_json::to_string(connection).expect("ConnectionRecord always serializes");
        self.storage.set_item(KEY_CONNECTION, encoded).await;
    }

    pub async fn remove_connection(&self) {
        self.storage.remove_item(KEY_CONNECTION).await;
    }

    pub async fn get_connection(&self) -> ConnectionRecord {
        let raw = self.storage.get_item(KEY_CONNECTION, "{}".to_string()).await;
        serde_json::from_str(&raw).unwrap_or_default()
    }

    /// Record the id of the latest non-`connect` wallet event, once the
    /// connection has a `connect_event` on file.
    pub async fn set_last_wallet_event_id(&self, id: i64) {
        let mut connection = self.get_connection().await;
        if connection.connect_event.is_some() {
            connection.last_wallet_event_id = Some(serde_json::Value::from(id));
            self.set_connection(&connection).await;
        }
    }

    pub async fn get_last_wallet_event_id(&self) -> i64 {
        self.get_connection()
            .await
            .last_wallet_event_id
            .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
            .unwrap_or(0)
    }

    /// Allocate the next outgoing RPC request id, persisting the increment.
    /// Returns `None` if there is no established connection to allocate
    /// against (mirrors the reference behavior of silently no-opping).
    pub async fn increase_next_rpc_request_id(&self) -> Option<u64> {
        let mut connection = self.get_connection().await;
        let id = connection.next_rpc_request_id?;
        connection.next_rpc_request_id = Some(id + 1);
        self.set_connection(&connection).await;
        Some(id)
    }
}

/// Resumable SSE cursor for one bridge URL.
#[derive(Clone)]
pub struct BridgeCursorStore {
    storage: Arc<dyn Storage>,
    key: String,
}

impl BridgeCursorStore {
    pub fn new(storage: Arc<dyn Storage>, bridge_url: &str) -> Self {
        let hash = hex::encode(Sha256::digest(bridge_url.as_bytes()));
        let key = format!("{KEY_LAST_EVENT_ID}:{}", &hash[..6]);
        Self { storage, key }
    }

    pub async fn set_last_event_id(&self, last_event_id: &str) {
        self.storage.set_item(&self.key, last_event_id.to_string()).await;
    }

    pub async fn remove_last_event_id(&self) {
        self.storage.remove_item(&self.key).await;
    }

    pub async fn get_last_event_id(&self) -> Option<String> {
        self.storage.get_item_opt(&self.key).await
    }
}
