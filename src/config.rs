//! Configuration types for the connector.
//!
//! Bundles the manifest URL, storage backend, wallet-directory source/TTL,
//! per-host bridge API tokens, and gateway retry tuning behind a builder,
//! following the same shape as a typical client configuration: small
//! `*Config` value types with `Default` impls, assembled by a builder that
//! validates required fields at `build()` time.

use std::collections::HashMap;
use std::sync::Arc;

use crate::storage::Storage;

/// Retry configuration for the bridge gateway's implicit re-registration.
///
/// The protocol does not mandate backoff (see `BridgeGateway` state machine);
/// these defaults amount to a single immediate retry, matching the reference
/// behavior. Callers who want backoff around reconnects raise `max_retries`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first failure.
    pub max_retries: u32,
    /// Initial delay between retries in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Configuration for the wallet directory fetcher (§4.7, supplement module).
#[derive(Debug, Clone)]
pub struct WalletsListConfig {
    /// Source URL for the wallets-v2.json style directory.
    pub source: String,
    /// Cache TTL in seconds; `None` means cache forever once fetched.
    pub cache_ttl_secs: Option<u64>,
}

impl Default for WalletsListConfig {
    fn default() -> Self {
        Self {
            source: crate::wallets::DEFAULT_WALLETS_LIST_SOURCE.to_string(),
            cache_ttl_secs: None,
        }
    }
}

/// Main configuration for the [`crate::Connector`].
#[derive(Clone)]
pub struct ConnectorOptions {
    /// URL of this dApp's `tonconnect-manifest.json`.
    pub manifest_url: String,
    /// Durable session storage backend.
    pub storage: Arc<dyn Storage>,
    /// Per-bridge-host `Authorization: Bearer` tokens. Matched by substring
    /// against the bridge URL, same as the reference implementation.
    pub api_tokens: HashMap<String, String>,
    /// Retry tuning for the bridge gateway's reconnection path.
    pub retry: RetryConfig,
    /// Default TTL (seconds) for outgoing bridge POSTs.
    pub default_ttl_secs: u64,
    /// Wallet-directory fetch source and cache TTL.
    pub wallets_list: WalletsListConfig,
}

impl ConnectorOptions {
    /// Start a builder requiring only the manifest URL and storage backend.
    pub fn builder(manifest_url: impl Into<String>, storage: Arc<dyn Storage>) -> ConnectorOptionsBuilder {
        ConnectorOptionsBuilder {
            manifest_url: manifest_url.into(),
            storage,
            api_tokens: HashMap::new(),
            retry: None,
            default_ttl_secs: None,
            wallets_list: None,
        }
    }
}

impl std::fmt::Debug for ConnectorOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorOptions")
            .field("manifest_url", &self.manifest_url)
            .field("api_tokens", &self.api_tokens.keys().collect::<Vec<_>>())
            .field("retry", &self.retry)
            .field("default_ttl_secs", &self.default_ttl_secs)
            .field("wallets_list", &self.wallets_list)
            .finish()
    }
}

/// Builder for [`ConnectorOptions`].
pub struct ConnectorOptionsBuilder {
    manifest_url: String,
    storage: Arc<dyn Storage>,
    api_tokens: HashMap<String, String>,
    retry: Option<RetryConfig>,
    default_ttl_secs: Option<u64>,
    wallets_list: Option<WalletsListConfig>,
}

impl ConnectorOptionsBuilder {
    /// Register a bearer token for bridge hosts matching `host_substring`.
    pub fn api_token(mut self, host_substring: impl Into<String>, token: impl Into<String>) -> Self {
        self.api_tokens.insert(host_substring.into(), token.into());
        self
    }

    /// Set the gateway retry configuration.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Set the default outgoing message TTL in seconds.
    pub fn default_ttl_secs(mut self, ttl: u64) -> Self {
        self.default_ttl_secs = Some(ttl);
        self
    }

    /// Override the wallet-directory fetch source and cache TTL.
    pub fn wallets_list(mut self, wallets_list: WalletsListConfig) -> Self {
        self.wallets_list = Some(wallets_list);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ConnectorOptions {
        ConnectorOptions {
            manifest_url: self.manifest_url,
            storage: self.storage,
            api_tokens: self.api_tokens,
            retry: self.retry.unwrap_or_default(),
            default_ttl_secs: self.default_ttl_secs.unwrap_or(300),
            wallets_list: self.wallets_list.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn defaults() {
        let retry = RetryConfig::default();
        assert_eq!(retry.max_retries, 0);
        assert_eq!(retry.backoff_multiplier, 2.0);
    }

    #[test]
    fn builder_applies_overrides() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let options = ConnectorOptions::builder("https://dapp.example/manifest.json", storage)
            .api_token("bridge.tonapi.io", "secret-token")
            .default_ttl_secs(60)
            .build();

        assert_eq!(options.default_ttl_secs, 60);
        assert_eq!(
            options.api_tokens.get("bridge.tonapi.io").map(String::as_str),
            Some("secret-token")
        );
    }

    #[test]
    fn builder_defaults_wallets_list_to_the_public_directory() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let options = ConnectorOptions::builder("https://dapp.example/manifest.json", storage).build();

        assert_eq!(options.wallets_list.source, crate::wallets::DEFAULT_WALLETS_LIST_SOURCE);
        assert_eq!(options.wallets_list.cache_ttl_secs, None);
    }

    #[test]
    fn builder_overrides_wallets_list() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let options = ConnectorOptions::builder("https://dapp.example/manifest.json", storage)
            .wallets_list(WalletsListConfig {
                source: "https://mirror.example/wallets.json".to_string(),
                cache_ttl_secs: Some(3600),
            })
            .build();

        assert_eq!(options.wallets_list.source, "https://mirror.example/wallets.json");
        assert_eq!(options.wallets_list.cache_ttl_secs, Some(3600));
    }
}
