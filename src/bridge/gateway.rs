//! SSE transport to one bridge endpoint.
//!
//! Mirrors `BridgeMonitor`'s shape: a background task drives the actual
//! socket and reports back over an unbounded channel, so the owner (the
//! provider) never blocks on network I/O and can freely pause/resume or
//! drop the gateway without tearing down anything but that one task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use reqwest_eventsource::{Event as SseEvent, EventSource};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::storage::{BridgeCursorStore, Storage};

const SSE_PATH: &str = "events";
const POST_PATH: &str = "message";
const DEFAULT_TTL_SECS: u64 = 300;

/// A decrypted-envelope-pending message as delivered by the bridge: still
/// base64 ciphertext in `message`, identified by the wallet's session id in
/// `from`.
#[derive(Debug, Clone)]
pub struct BridgeIncomingMessage {
    pub from: String,
    pub message: String,
}

/// What the gateway's background task reports back to its owner.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Opened,
    Message(BridgeIncomingMessage),
    Error(String),
    Closed,
}

/// Drives one bridge's SSE stream and exposes a one-shot HTTP POST to send.
pub struct BridgeGateway {
    http: reqwest::Client,
    bridge_url: String,
    session_id: String,
    api_token: Option<String>,
    cursor: BridgeCursorStore,
    events_tx: mpsc::UnboundedSender<GatewayEvent>,
    listen_task: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl BridgeGateway {
    /// Build a gateway for `bridge_url`/`session_id`, matching `api_tokens`
    /// by substring against the bridge host the same way the reference
    /// client does. Returns the gateway and the channel its events arrive
    /// on; the caller is expected to poll that channel for the gateway's
    /// lifetime.
    pub fn new(
        storage: Arc<dyn Storage>,
        bridge_url: String,
        session_id: String,
        api_tokens: &HashMap<String, String>,
    ) -> (Self, mpsc::UnboundedReceiver<GatewayEvent>) {
        let api_token = api_tokens
            .iter()
            .find(|(host, _)| bridge_url.contains(host.as_str()))
            .map(|(_, token)| token.clone());

        let cursor = BridgeCursorStore::new(storage, &bridge_url);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        (
            Self {
                http: reqwest::Client::new(),
                bridge_url,
                session_id,
                api_token,
                cursor,
                events_tx,
                listen_task: Mutex::new(None),
                closed: AtomicBool::new(false),
            },
            events_rx,
        )
    }

    /// (Re)open the SSE subscription, resuming from the last stored event
    /// id if one is on file. Returns `false` if the gateway has been
    /// closed.
    pub async fn register_session(&self) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }

        let mut url = format!(
            "{}/{SSE_PATH}?client_id={}",
            self.bridge_url.trim_end_matches('/'),
            self.session_id
        );
        if let Some(last_event_id) = self.cursor.get_last_event_id().await {
            url.push_str(&format!("&last_event_id={last_event_id}"));
        }

        let mut request = self.http.get(&url);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let event_source = match EventSource::new(request) {
            Ok(es) => es,
            Err(e) => {
                let _ = self.events_tx.send(GatewayEvent::Error(e.to_string()));
                return false;
            }
        };

        if let Some(previous) = self.listen_task.lock().await.take() {
            previous.abort();
        }

        let cursor = self.cursor.clone();
        let events_tx = self.events_tx.clone();
        let handle = tokio::spawn(listen_loop(event_source, cursor, events_tx));
        *self.listen_task.lock().await = Some(handle);

        true
    }

    /// POST an already-encrypted request body to the wallet.
    pub async fn send(
        &self,
        encrypted_request: &str,
        receiver_public_key: &str,
        topic: &str,
        ttl: Option<u64>,
    ) -> Result<(), crate::errors::TonConnectError> {
        let url = format!(
            "{}/{POST_PATH}?client_id={}&to={receiver_public_key}&ttl={}&topic={topic}",
            self.bridge_url.trim_end_matches('/'),
            self.session_id,
            ttl.unwrap_or(DEFAULT_TTL_SECS),
        );

        let mut request = self
            .http
            .post(&url)
            .header("Content-Type", "text/plain;charset=UTF-8")
            .body(encrypted_request.to_string());
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        request
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| crate::errors::TonConnectError::Transport(e.to_string()))?;

        Ok(())
    }

    /// Stop listening without marking the gateway closed; `register_session`
    /// can resume it later.
    pub async fn pause(&self) {
        if let Some(task) = self.listen_task.lock().await.take() {
            task.abort();
        }
    }

    /// Resume a paused gateway.
    pub async fn unpause(&self) -> bool {
        self.register_session().await
    }

    /// Permanently stop this gateway; `register_session` will refuse to
    /// reopen it afterward.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.pause().await;
    }
}

async fn listen_loop(
    mut event_source: EventSource,
    cursor: BridgeCursorStore,
    events_tx: mpsc::UnboundedSender<GatewayEvent>,
) {
    while let Some(event) = event_source.next().await {
        match event {
            Ok(SseEvent::Open) => {
                let _ = events_tx.send(GatewayEvent::Opened);
            }
            Ok(SseEvent::Message(message)) => {
                if message.event == "heartbeat" {
                    continue;
                }
                cursor.set_last_event_id(&message.id).await;

                match serde_json::from_str::<RawIncomingMessage>(&message.data) {
                    Ok(raw) => {
                        let _ = events_tx.send(GatewayEvent::Message(BridgeIncomingMessage {
                            from: raw.from,
                            message: raw.message,
                        }));
                    }
                    Err(e) => {
                        let _ = events_tx.send(GatewayEvent::Error(format!("malformed bridge message: {e}")));
                    }
                }
            }
            Err(e) => {
                let _ = events_tx.send(GatewayEvent::Error(e.to_string()));
                event_source.close();
                break;
            }
        }
    }
    let _ = events_tx.send(GatewayEvent::Closed);
}

#[derive(Debug, serde::Deserialize)]
struct RawIncomingMessage {
    from: String,
    message: String,
}
