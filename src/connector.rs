//! The façade most callers use: connect, send a transaction, disconnect.
//!
//! Wraps one [`BridgeProvider`] at a time and republishes its wallet events
//! as connector-level state (`connected()`/`wallet()`) plus subscribable
//! `on_status_change` channels, the way the reference client's `TonConnect`
//! sits on top of `BridgeProvider`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use crate::bridge::BridgeProvider;
use crate::config::ConnectorOptions;
use crate::errors::{TonConnectError, TonConnectResult};
use crate::model::{Account, Chain, WalletDescriptor, WalletEvent, WalletInfo};
use crate::parsers::send_transaction::{SendTransactionParser, SendTransactionRequest, SendTransactionResponse, TransactionMessage};
use crate::parsers::RpcParser;
use crate::wallets::WalletsListManager;

const STATUS_CHANNEL_CAPACITY: usize = 16;

/// A `sendTransaction` request as the caller builds it; `from`/`network`
/// default to the connected account's address/chain when omitted.
#[derive(Debug, Clone, Default)]
pub struct TransactionRequest {
    pub valid_until: Option<u64>,
    pub messages: Vec<TransactionMessage>,
    pub from: Option<String>,
    pub network: Option<Chain>,
}

/// Top-level entry point: manages one wallet connection at a time.
pub struct Connector {
    options: ConnectorOptions,
    wallets_list: WalletsListManager,
    provider: Mutex<Option<Arc<BridgeProvider>>>,
    wallet: Arc<Mutex<Option<WalletInfo>>>,
    status_tx: broadcast::Sender<Option<WalletInfo>>,
    error_tx: broadcast::Sender<TonConnectError>,
    forward_task: Mutex<Option<JoinHandle<()>>>,
}

impl Connector {
    pub fn new(options: ConnectorOptions) -> Self {
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        let (error_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        let wallets_list = WalletsListManager::new(
            options.wallets_list.source.clone(),
            options.wallets_list.cache_ttl_secs.map(Duration::from_secs),
        );
        Self {
            wallets_list,
            options,
            provider: Mutex::new(None),
            wallet: Arc::new(Mutex::new(None)),
            status_tx,
            error_tx,
            forward_task: Mutex::new(None),
        }
    }

    /// Whether a wallet is currently connected.
    pub async fn connected(&self) -> bool {
        self.wallet.lock().await.is_some()
    }

    /// The connected account, if any.
    pub async fn account(&self) -> Option<Account> {
        self.wallet.lock().await.as_ref().map(|w| w.account.clone())
    }

    /// The full connected wallet, if any.
    pub async fn wallet(&self) -> Option<WalletInfo> {
        self.wallet.lock().await.clone()
    }

    /// Subscribe to wallet connect/disconnect notifications.
    pub fn on_status_change(&self) -> broadcast::Receiver<Option<WalletInfo>> {
        self.status_tx.subscribe()
    }

    /// Subscribe to protocol-level connect errors (e.g. manifest problems).
    pub fn on_status_error(&self) -> broadcast::Receiver<TonConnectError> {
        self.error_tx.subscribe()
    }

    /// Return the public wallets directory, fetching/caching as needed.
    pub async fn get_wallets(&self) -> Vec<WalletDescriptor> {
        self.wallets_list.get_wallets().await
    }

    /// Begin connecting to `wallet`, returning the universal link to show
    /// the user. `ton_proof_payload`, if given, is included as a
    /// `ton_proof` connect item.
    pub async fn connect(&self, wallet: &WalletDescriptor, ton_proof_payload: Option<&str>) -> TonConnectResult<String> {
        if self.connected().await {
            return Err(TonConnectError::WalletAlreadyConnected);
        }

        if let Some(old) = self.provider.lock().await.take() {
            old.close_connection().await;
        }

        let provider = Arc::new(BridgeProvider::with_config(
            self.options.storage.clone(),
            Some(wallet.clone()),
            self.options.api_tokens.clone(),
            self.options.retry.clone(),
            self.options.default_ttl_secs,
        ));
        self.spawn_forwarder(provider.clone()).await;
        *self.provider.lock().await = Some(provider.clone());

        let request = build_connect_request(&self.options.manifest_url, ton_proof_payload);
        provider.connect(&request).await
    }

    /// Try to restore a previously persisted session.
    pub async fn restore_connection(&self) -> TonConnectResult<bool> {
        let provider = Arc::new(BridgeProvider::with_config(
            self.options.storage.clone(),
            None,
            self.options.api_tokens.clone(),
            self.options.retry.clone(),
            self.options.default_ttl_secs,
        ));
        self.spawn_forwarder(provider.clone()).await;
        *self.provider.lock().await = Some(provider.clone());

        provider.restore_connection().await
    }

    /// Ask the connected wallet to sign and broadcast a transaction.
    pub async fn send_transaction(&self, transaction: TransactionRequest) -> TonConnectResult<SendTransactionResponse> {
        let wallet = self.wallet.lock().await.clone().ok_or(TonConnectError::WalletNotConnected)?;
        check_send_transaction_support(&wallet, transaction.messages.len())?;

        let provider = self.provider.lock().await.clone().ok_or(TonConnectError::NoSession)?;

        let request = SendTransactionRequest {
            valid_until: transaction.valid_until.unwrap_or(0),
            messages: transaction.messages,
            network: Some(chain_wire_value(transaction.network.unwrap_or(wallet.account.chain))),
            from: Some(transaction.from.unwrap_or(wallet.account.address)),
        };
        let parser = SendTransactionParser { request };

        let response = provider.send_request(&parser.convert_to_rpc_request()).await?;

        if crate::parsers::is_error(&response) {
            Err(parser.parse_error(&response))
        } else {
            parser.convert_from_rpc_response(&response)
        }
    }

    /// Disconnect from the connected wallet and drop the session.
    pub async fn disconnect(&self) -> TonConnectResult<()> {
        let provider = self.provider.lock().await.clone().ok_or(TonConnectError::WalletNotConnected)?;
        provider.disconnect().await;
        *self.wallet.lock().await = None;
        let _ = self.status_tx.send(None);
        Ok(())
    }

    /// Pause the bridge's SSE connection without forgetting the session.
    pub async fn pause_connection(&self) {
        if let Some(provider) = self.provider.lock().await.as_ref() {
            provider.pause().await;
        }
    }

    /// Resume a previously paused bridge connection.
    pub async fn unpause_connection(&self) {
        if let Some(provider) = self.provider.lock().await.as_ref() {
            provider.unpause().await;
        }
    }

    /// Resolve once a wallet connects (immediately, if already connected).
    pub async fn wait_for_connection(&self) -> TonConnectResult<WalletInfo> {
        if let Some(wallet) = self.wallet().await {
            return Ok(wallet);
        }

        let mut status_rx = self.on_status_change();
        let mut error_rx = self.on_status_error();
        tokio::select! {
            status = status_rx.recv() => match status {
                Ok(Some(wallet)) => Ok(wallet),
                _ => Err(TonConnectError::WalletNotConnected),
            },
            error = error_rx.recv() => Err(error.unwrap_or(TonConnectError::Unknown(None))),
        }
    }

    async fn spawn_forwarder(&self, provider: Arc<BridgeProvider>) {
        if let Some(previous) = self.forward_task.lock().await.take() {
            previous.abort();
        }

        let events_rx = provider.listen();
        let status_tx = self.status_tx.clone();
        let error_tx = self.error_tx.clone();
        let wallet = self.wallet.clone();
        let task = tokio::spawn(forward_events(events_rx, wallet, status_tx, error_tx));
        *self.forward_task.lock().await = Some(task);
    }
}

async fn forward_events(
    mut events_rx: broadcast::Receiver<WalletEvent>,
    wallet: Arc<Mutex<Option<WalletInfo>>>,
    status_tx: broadcast::Sender<Option<WalletInfo>>,
    error_tx: broadcast::Sender<TonConnectError>,
) {
    while let Ok(event) = events_rx.recv().await {
        match event {
            WalletEvent::Connect(wallet_info) => {
                *wallet.lock().await = Some(wallet_info.clone());
                let _ = status_tx.send(Some(wallet_info));
            }
            WalletEvent::Disconnect => {
                *wallet.lock().await = None;
                let _ = status_tx.send(None);
            }
            WalletEvent::Error { error, .. } => {
                let _ = error_tx.send(error);
            }
        }
    }
}

fn chain_wire_value(chain: Chain) -> String {
    match chain {
        Chain::Mainnet => "-239".to_string(),
        Chain::Testnet => "-3".to_string(),
    }
}

fn build_connect_request(manifest_url: &str, ton_proof_payload: Option<&str>) -> serde_json::Value {
    let mut items = vec![serde_json::json!({"name": "ton_addr"})];
    if let Some(payload) = ton_proof_payload {
        items.push(serde_json::json!({"name": "ton_proof", "payload": payload}));
    }

    serde_json::json!({
        "manifestUrl": manifest_url,
        "items": items,
    })
}

fn check_send_transaction_support(wallet: &WalletInfo, required_messages: usize) -> TonConnectResult<()> {
    let feature = wallet
        .device
        .features
        .iter()
        .find(|f| f.get("name").and_then(|n| n.as_str()) == Some("SendTransaction"));

    let supports_deprecated = wallet
        .device
        .features
        .iter()
        .any(|f| f.as_str() == Some("SendTransaction"));

    let Some(feature) = feature else {
        if supports_deprecated {
            return Ok(());
        }
        return Err(TonConnectError::WalletNotSupportFeature("SendTransaction".to_string()));
    };

    if let Some(max_messages) = feature.get("maxMessages").and_then(|v| v.as_u64()) {
        if (max_messages as usize) < required_messages {
            return Err(TonConnectError::WalletNotSupportFeature(format!(
                "wallet supports at most {max_messages} messages per request, {required_messages} were requested"
            )));
        }
    } else {
        tracing::warn!("connected wallet did not report maxMessages for SendTransaction; request may be rejected");
    }

    Ok(())
}
