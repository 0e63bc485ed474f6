//! TON Connect client
//!
//! A Rust client implementing the TON Connect v2 protocol: the bridge-relayed,
//! end-to-end encrypted handshake between a dApp and a TON wallet.
//!
//! # Features
//!
//! - **Bridge transport**: resumable SSE subscription plus HTTP POST, with a
//!   per-bridge cursor so a dropped connection picks up where it left off
//! - **Session crypto**: `X25519`/`XSalsa20Poly1305` sealed boxes between
//!   dApp and wallet, matching the reference client's wire format exactly
//! - **`ton_proof` verification**: checks the wallet's `Ed25519` signature
//!   over its address without trusting the bridge
//! - **Pluggable storage**: in-memory or JSON-file session persistence behind
//!   one small async trait
//! - **Wallet directory**: fetches and caches the public wallets-v2.json list
//!   with a hard-coded fallback when the network is unavailable
//!
//! # Example
//!
//! ```ignore
//! use ton_connect::{Connector, ConnectorOptions, MemoryStorage};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let options = ConnectorOptions::builder(
//!         "https://myapp.example/tonconnect-manifest.json",
//!         Arc::new(MemoryStorage::new()),
//!     )
//!     .build();
//!
//!     let connector = Connector::new(options);
//!     if !connector.restore_connection().await? {
//!         let wallets = connector.get_wallets().await;
//!         let link = connector.connect(&wallets[0], None).await?;
//!         println!("Open this link in your wallet: {link}");
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod connector;
pub mod crypto;
pub mod errors;
pub mod model;
pub mod parsers;
pub mod rpc;
pub mod storage;
pub mod universal_link;
pub mod wallets;

pub use config::{ConnectorOptions, ConnectorOptionsBuilder, RetryConfig, WalletsListConfig};
pub use connector::{Connector, TransactionRequest};
pub use errors::{TonConnectError, TonConnectResult};
pub use model::{Account, Chain, DeviceInfo, TonProof, WalletDescriptor, WalletEvent, WalletInfo};
pub use storage::{FileStorage, MemoryStorage, Storage};
