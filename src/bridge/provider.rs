//! Session lifecycle and RPC correlation over one bridge connection.
//!
//! `BridgeProvider` is the piece that knows about TON Connect semantics;
//! `BridgeGateway` underneath only knows about bytes and SSE. A provider
//! owns at most one gateway at a time, a table of RPC requests awaiting a
//! response, and a broadcast channel fanning wallet events out to every
//! `listen()` subscriber.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::config::RetryConfig;
use crate::crypto::SessionCrypto;
use crate::errors::{TonConnectError, TonConnectResult};
use crate::model::{WalletDescriptor, WalletEvent};
use crate::parsers::ConnectEventParser;
use crate::rpc::RetryExecutor;
use crate::storage::session_store::{ConnectionRecord, StoredSession};
use crate::storage::{SessionStore, Storage};
use crate::universal_link;

use super::gateway::{BridgeGateway, BridgeIncomingMessage, GatewayEvent};

const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(600);
const STANDARD_UNIVERSAL_URL: &str = "tc://";
const EVENT_CHANNEL_CAPACITY: usize = 64;

struct OpenSession {
    session_crypto: SessionCrypto,
    bridge_url: String,
    /// Populated once the wallet's first `connect` event arrives; shared
    /// with the listener task so it can update it in place.
    wallet_public_key: Arc<Mutex<Option<String>>>,
    gateway: Arc<BridgeGateway>,
    listen_task: JoinHandle<()>,
}

#[derive(Default)]
struct PendingRequests {
    table: HashMap<u64, oneshot::Sender<serde_json::Value>>,
}

/// Drives one wallet connection over the HTTP bridge.
pub struct BridgeProvider {
    storage: Arc<dyn Storage>,
    session_store: SessionStore,
    wallet: Mutex<Option<WalletDescriptor>>,
    api_tokens: HashMap<String, String>,
    session: Mutex<Option<OpenSession>>,
    pending: Arc<Mutex<PendingRequests>>,
    events_tx: broadcast::Sender<WalletEvent>,
    retry: RetryExecutor,
    default_ttl_secs: u64,
}

impl BridgeProvider {
    pub fn new(storage: Arc<dyn Storage>, wallet: Option<WalletDescriptor>, api_tokens: HashMap<String, String>) -> Self {
        Self::with_config(storage, wallet, api_tokens, RetryConfig::default(), 300)
    }

    pub fn with_config(
        storage: Arc<dyn Storage>,
        wallet: Option<WalletDescriptor>,
        api_tokens: HashMap<String, String>,
        retry_config: RetryConfig,
        default_ttl_secs: u64,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            session_store: SessionStore::new(storage.clone()),
            storage,
            wallet: Mutex::new(wallet),
            api_tokens,
            session: Mutex::new(None),
            pending: Arc::new(Mutex::new(PendingRequests::default())),
            events_tx,
            retry: RetryExecutor::new(retry_config),
            default_ttl_secs,
        }
    }

    /// Subscribe to wallet events (`connect`, `disconnect`, and protocol
    /// errors) for as long as this receiver is held.
    pub fn listen(&self) -> broadcast::Receiver<WalletEvent> {
        self.events_tx.subscribe()
    }

    /// Start a new connection: generates a fresh session keypair, persists
    /// the pending connection, opens the SSE subscription, and returns the
    /// universal link to present to the user.
    pub async fn connect(&self, request: &serde_json::Value) -> TonConnectResult<String> {
        self.close_gateway().await;

        let wallet = self.wallet.lock().await.clone();
        let bridge_url = wallet.as_ref().map(|w| w.bridge_url.clone()).unwrap_or_default();
        let universal_url = wallet
            .as_ref()
            .map(|w| w.universal_url.clone())
            .unwrap_or_else(|| STANDARD_UNIVERSAL_URL.to_string());

        let session_crypto = SessionCrypto::new();
        let session_id = session_crypto.session_id.clone();

        self.session_store
            .set_connection(&ConnectionRecord {
                session: Some(StoredSession {
                    session_private_key: Some(session_crypto.private_key_hex()),
                    wallet_public_key: None,
                    bridge_url: Some(bridge_url.clone()),
                }),
                connection_source: wallet.as_ref().map(|w| serde_json::to_value(w).unwrap_or_default()),
                ..Default::default()
            })
            .await;

        self.open_gateway(session_crypto, bridge_url, None).await?;

        Ok(universal_link::generate_universal_url(&universal_url, &session_id, request))
    }

    /// Re-establish a previously persisted connection, if one is on file.
    /// Returns `false` (without error) when there is nothing to restore.
    pub async fn restore_connection(&self) -> TonConnectResult<bool> {
        self.close_gateway().await;

        let connection = self.session_store.get_connection().await;
        let Some(stored) = connection.session.clone() else {
            return Ok(false);
        };
        let session_crypto = match &stored.session_private_key {
            Some(key) => SessionCrypto::from_hex_private_key(key)?,
            None => return Ok(false),
        };
        let bridge_url = stored.bridge_url.unwrap_or_default();

        self.open_gateway(session_crypto, bridge_url, stored.wallet_public_key).await?;

        if let Some(connect_event) = connection.connect_event {
            if let Ok(wallet_info) = ConnectEventParser::parse_response(&connect_event) {
                let _ = self.events_tx.send(WalletEvent::Connect(wallet_info));
            }
        }

        Ok(true)
    }

    /// Drop local session state without notifying the wallet.
    pub async fn close_connection(&self) {
        self.close_gateway().await;
        self.pending.lock().await.table.clear();
    }

    /// Tell the wallet we're disconnecting, then drop local session state
    /// regardless of whether the wallet acknowledged in time.
    pub async fn disconnect(&self) {
        let request = serde_json::json!({"method": "disconnect", "params": Vec::<String>::new()});
        let result = tokio::time::timeout(DISCONNECT_TIMEOUT, self.send_request(&request)).await;
        if let Err(_) | Ok(Err(_)) = result {
            tracing::debug!("disconnect request did not complete cleanly; clearing session locally");
        }
        self.remove_session().await;
    }

    /// Stop listening for bridge events without forgetting the session;
    /// `unpause` resumes from the last delivered event.
    pub async fn pause(&self) {
        if let Some(session) = self.session.lock().await.as_ref() {
            session.gateway.pause().await;
        }
    }

    pub async fn unpause(&self) {
        if let Some(session) = self.session.lock().await.as_ref() {
            session.gateway.unpause().await;
        }
    }

    /// Encrypt and send an RPC request over the open gateway, resolving
    /// once the wallet answers with a matching request id.
    pub async fn send_request(&self, request: &serde_json::Value) -> TonConnectResult<serde_json::Value> {
        let (gateway, session_crypto, wallet_public_key) = {
            let guard = self.session.lock().await;
            let session = guard.as_ref().ok_or(TonConnectError::NoSession)?;
            let wallet_public_key = session
                .wallet_public_key
                .lock()
                .await
                .clone()
                .ok_or(TonConnectError::NoSession)?;
            (session.gateway.clone(), session.session_crypto.clone(), wallet_public_key)
        };

        let id = self
            .session_store
            .increase_next_rpc_request_id()
            .await
            .ok_or(TonConnectError::NoSession)?;

        let mut request = request.clone();
        request["id"] = serde_json::Value::from(id.to_string());
        let method = request.get("method").and_then(|m| m.as_str()).unwrap_or_default().to_string();

        let encrypted = session_crypto.encrypt(&request.to_string(), &wallet_public_key)?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.table.insert(id, tx);

        gateway
            .send(&encrypted, &wallet_public_key, &method, Some(self.default_ttl_secs))
            .await?;

        rx.await.map_err(|_| TonConnectError::Transport("gateway closed before response arrived".into()))
    }

    async fn open_gateway(
        &self,
        session_crypto: SessionCrypto,
        bridge_url: String,
        wallet_public_key: Option<String>,
    ) -> TonConnectResult<()> {
        let (gateway, mut events_rx) = BridgeGateway::new(
            self.storage.clone(),
            bridge_url.clone(),
            session_crypto.session_id.clone(),
            &self.api_tokens,
        );
        let gateway = Arc::new(gateway);
        let registered = self
            .retry
            .execute(|| {
                let gateway = gateway.clone();
                async move {
                    if gateway.register_session().await {
                        Ok(())
                    } else {
                        Err("bridge gateway refused to register".to_string())
                    }
                }
            })
            .await
            .is_ok();
        if !registered {
            return Err(TonConnectError::Transport("bridge gateway is closed".into()));
        }

        let wallet_public_key = Arc::new(Mutex::new(wallet_public_key));

        let session_store = self.session_store.clone();
        let pending = self.pending.clone();
        let events_tx = self.events_tx.clone();
        let session_crypto_for_task = session_crypto.clone();
        let wallet_public_key_for_task = wallet_public_key.clone();
        let gateway_for_task = gateway.clone();
        let listen_task = tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                match event {
                    GatewayEvent::Message(message) => {
                        let disconnected = handle_incoming(
                            &session_store,
                            &pending,
                            &events_tx,
                            &session_crypto_for_task,
                            &wallet_public_key_for_task,
                            message,
                        )
                        .await;
                        if disconnected {
                            *wallet_public_key_for_task.lock().await = None;
                            gateway_for_task.close().await;
                            break;
                        }
                    }
                    GatewayEvent::Error(e) => {
                        tracing::warn!(error = %e, "bridge gateway error");
                    }
                    GatewayEvent::Opened | GatewayEvent::Closed => {}
                }
            }
        });

        *self.session.lock().await = Some(OpenSession {
            session_crypto,
            bridge_url,
            wallet_public_key,
            gateway,
            listen_task,
        });

        Ok(())
    }

    async fn close_gateway(&self) {
        if let Some(session) = self.session.lock().await.take() {
            session.gateway.close().await;
            session.listen_task.abort();
        }
    }

    async fn remove_session(&self) {
        self.close_gateway().await;
        self.pending.lock().await.table.clear();
        self.session_store.remove_connection().await;
    }
}

async fn handle_incoming(
    session_store: &SessionStore,
    pending: &Arc<Mutex<PendingRequests>>,
    events_tx: &broadcast::Sender<WalletEvent>,
    session_crypto: &SessionCrypto,
    wallet_public_key: &Arc<Mutex<Option<String>>>,
    incoming: BridgeIncomingMessage,
) -> bool {
    let decrypted = match session_crypto.decrypt(&incoming.message, &incoming.from) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "failed to decrypt bridge message");
            return false;
        }
    };

    let message: serde_json::Value = match serde_json::from_str(&decrypted) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "failed to parse decrypted bridge message");
            return false;
        }
    };

    let Some(event_name) = message.get("event").and_then(|e| e.as_str()) else {
        // No `event` field: this is an RPC response, matched by id.
        if let Some(id) = message.get("id").and_then(|v| v.as_str()).and_then(|s| s.parse::<u64>().ok()) {
            if let Some(sender) = pending.lock().await.table.remove(&id) {
                let _ = sender.send(message);
            } else {
                tracing::debug!(id, "response id doesn't match any pending request");
            }
        }
        return false;
    };

    if let Some(id) = message.get("id").and_then(parse_event_id) {
        let last_id = session_store.get_last_wallet_event_id().await;
        if last_id != 0 && id <= last_id {
            tracing::error!(id, last_id, "received wallet event id is not greater than the stored cursor");
            return false;
        }
        if event_name != "connect" {
            session_store.set_last_wallet_event_id(id).await;
        }
    }

    match event_name {
        "connect" => {
            let from_key = incoming.from.clone();
            match ConnectEventParser::parse_response(message.get("payload").unwrap_or(&serde_json::Value::Null)) {
                Ok(wallet_info) => {
                    update_session(session_store, &message, from_key.clone()).await;
                    *wallet_public_key.lock().await = Some(from_key);
                    let _ = events_tx.send(WalletEvent::Connect(wallet_info));
                }
                Err(e) => {
                    let error = ConnectEventParser::parse_error(message.get("payload").unwrap_or(&serde_json::Value::Null));
                    tracing::warn!(error = %e, "failed to parse connect event payload");
                    let _ = events_tx.send(WalletEvent::Error {
                        event: "connect".to_string(),
                        error,
                    });
                }
            }
        }
        "disconnect" => {
            session_store.remove_connection().await;
            let _ = events_tx.send(WalletEvent::Disconnect);
            return true;
        }
        "connect_error" => {
            let error = ConnectEventParser::parse_error(message.get("payload").unwrap_or(&serde_json::Value::Null));
            tracing::warn!(error = %error, "wallet reported a connect_error event");
            let _ = events_tx.send(WalletEvent::Error {
                event: "connect_error".to_string(),
                error,
            });
        }
        other => {
            tracing::debug!(event = other, "ignoring unrecognized wallet event");
        }
    }
    false
}

/// Wallet event ids arrive on the wire as a decimal string, same convention
/// as outgoing RPC ids; accept a bare number too for leniency.
fn parse_event_id(value: &serde_json::Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

async fn update_session(session_store: &SessionStore, connect_event: &serde_json::Value, wallet_public_key: String) {
    let mut connection = session_store.get_connection().await;
    if let Some(session) = connection.session.as_mut() {
        session.wallet_public_key = Some(wallet_public_key);
    }
    connection.last_wallet_event_id = connect_event.get("id").cloned();
    connection.connect_event = Some(connect_event.clone());
    connection.next_rpc_request_id = Some(0);
    session_store.set_connection(&connection).await;
}
