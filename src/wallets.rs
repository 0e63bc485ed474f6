//! Fetches and caches the public directory of TON Connect-compatible
//! wallets (supplement module; not part of the core connect/send/disconnect
//! surface, but needed by any dApp presenting a wallet picker).

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::errors::{TonConnectError, TonConnectResult};
use crate::model::WalletDescriptor;

/// Upstream source for the canonical wallets directory.
pub const DEFAULT_WALLETS_LIST_SOURCE: &str =
    "https://raw.githubusercontent.com/ton-blockchain/wallets-list/main/wallets-v2.json";

/// Used whenever the directory can't be fetched or parsed, so a dApp never
/// shows an empty wallet list just because GitHub is unreachable.
pub fn fallback_wallets() -> Vec<WalletDescriptor> {
    vec![
        WalletDescriptor {
            name: "Wallet".to_string(),
            app_name: "telegram-wallet".to_string(),
            image_url: "https://wallet.tg/images/logo-288.png".to_string(),
            about_url: "https://wallet.tg/".to_string(),
            universal_url: "https://t.me/wallet?attach=wallet".to_string(),
            bridge_url: "https://bridge.tonapi.io/bridge".to_string(),
            platforms: vec!["ios", "android", "macos", "windows", "linux"]
                .into_iter()
                .map(String::from)
                .collect(),
        },
        WalletDescriptor {
            name: "Tonkeeper".to_string(),
            app_name: "Tonkeeper".to_string(),
            image_url: "https://tonkeeper.com/assets/tonconnect-icon.png".to_string(),
            about_url: "https://tonkeeper.com".to_string(),
            universal_url: "https://app.tonkeeper.com/ton-connect".to_string(),
            bridge_url: "https://bridge.tonapi.io/bridge".to_string(),
            platforms: vec![],
        },
        WalletDescriptor {
            name: "Tonhub".to_string(),
            app_name: "Tonhub".to_string(),
            image_url: "https://tonhub.com/tonconnect_logo.png".to_string(),
            about_url: "https://tonhub.com".to_string(),
            universal_url: "https://tonhub.com/ton-connect".to_string(),
            bridge_url: "https://connect.tonhubapi.com/tonconnect".to_string(),
            platforms: vec![],
        },
    ]
}

#[derive(Debug, Deserialize)]
struct RawBridgeEntry {
    #[serde(rename = "type")]
    kind: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawWalletEntry {
    name: String,
    image: String,
    about_url: String,
    app_name: Option<String>,
    universal_url: Option<String>,
    #[serde(default)]
    bridge: Vec<RawBridgeEntry>,
    #[serde(default)]
    platforms: Vec<String>,
}

fn supported_wallet(raw: RawWalletEntry) -> Option<WalletDescriptor> {
    let bridge_url = raw.bridge.iter().find(|b| b.kind == "sse").and_then(|b| b.url.clone())?;

    Some(WalletDescriptor {
        app_name: raw.app_name.unwrap_or_else(|| raw.name.clone()),
        name: raw.name,
        image_url: raw.image,
        about_url: raw.about_url,
        universal_url: raw.universal_url.unwrap_or_default(),
        bridge_url,
        platforms: raw.platforms,
    })
}

struct Cache {
    wallets: Vec<WalletDescriptor>,
    fetched_at: Instant,
}

/// Fetches, filters, and caches the wallets directory.
pub struct WalletsListManager {
    source: String,
    cache_ttl: Option<Duration>,
    http: reqwest::Client,
    cache: Mutex<Option<Cache>>,
}

impl WalletsListManager {
    pub fn new(source: impl Into<String>, cache_ttl: Option<Duration>) -> Self {
        Self {
            source: source.into(),
            cache_ttl,
            http: reqwest::Client::new(),
            cache: Mutex::new(None),
        }
    }

    pub fn with_default_source() -> Self {
        Self::new(DEFAULT_WALLETS_LIST_SOURCE, None)
    }

    /// Return the cached wallets list if still fresh, otherwise fetch and
    /// filter the upstream directory, falling back to the hard-coded list
    /// on any network or parse error.
    pub async fn get_wallets(&self) -> Vec<WalletDescriptor> {
        if let Some(cached) = self.cached_if_fresh() {
            return cached;
        }

        let wallets = match self.fetch_remote().await {
            Ok(raw_list) => raw_list.into_iter().filter_map(supported_wallet).collect(),
            Err(e) => {
                tracing::warn!(error = %e, source = %self.source, "failed to fetch wallets list, using fallback");
                fallback_wallets()
            }
        };

        *self.cache.lock().expect("wallets cache poisoned") = Some(Cache {
            wallets: wallets.clone(),
            fetched_at: Instant::now(),
        });

        wallets
    }

    fn cached_if_fresh(&self) -> Option<Vec<WalletDescriptor>> {
        let guard = self.cache.lock().expect("wallets cache poisoned");
        let cache = guard.as_ref()?;
        match self.cache_ttl {
            Some(ttl) if cache.fetched_at.elapsed() > ttl => None,
            _ => Some(cache.wallets.clone()),
        }
    }

    async fn fetch_remote(&self) -> TonConnectResult<Vec<RawWalletEntry>> {
        let response = self
            .http
            .get(&self.source)
            .send()
            .await
            .map_err(|e| TonConnectError::FetchWallets(e.to_string()))?
            .error_for_status()
            .map_err(|e| TonConnectError::FetchWallets(e.to_string()))?;

        response
            .json()
            .await
            .map_err(|e| TonConnectError::FetchWallets(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_list_has_sse_bridges() {
        let wallets = fallback_wallets();
        assert_eq!(wallets.len(), 3);
        assert!(wallets.iter().all(|w| !w.bridge_url.is_empty()));
    }

    #[test]
    fn skips_wallet_with_no_sse_bridge() {
        let raw = RawWalletEntry {
            name: "JsOnly".to_string(),
            image: "img".to_string(),
            about_url: "about".to_string(),
            app_name: None,
            universal_url: None,
            bridge: vec![RawBridgeEntry {
                kind: "js".to_string(),
                url: None,
            }],
            platforms: vec![],
        };
        assert!(supported_wallet(raw).is_none());
    }

    #[test]
    fn picks_first_sse_bridge_and_defaults_app_name() {
        let raw = RawWalletEntry {
            name: "Tonkeeper".to_string(),
            image: "img".to_string(),
            about_url: "about".to_string(),
            app_name: None,
            universal_url: Some("https://app.tonkeeper.com/ton-connect".to_string()),
            bridge: vec![
                RawBridgeEntry {
                    kind: "sse".to_string(),
                    url: Some("https://bridge.tonapi.io/bridge".to_string()),
                },
                RawBridgeEntry {
                    kind: "js".to_string(),
                    url: None,
                },
            ],
            platforms: vec![],
        };
        let wallet = supported_wallet(raw).unwrap();
        assert_eq!(wallet.app_name, "Tonkeeper");
        assert_eq!(wallet.bridge_url, "https://bridge.tonapi.io/bridge");
    }
}
