//! Wire and session data types shared across the crate.

use serde::{Deserialize, Serialize};

/// TON chain a wallet account is connected on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Chain {
    #[serde(rename = "-239")]
    Mainnet,
    #[serde(rename = "-3")]
    Testnet,
}

/// Static capability description reported by a wallet device, e.g.
/// `{"name": "SendTransaction", "maxMessages": 4}`.
pub type DeviceFeature = serde_json::Value;

/// Describes the wallet app and platform behind an open session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub platform: String,
    #[serde(rename = "appName")]
    pub app_name: String,
    #[serde(rename = "appVersion")]
    pub app_version: String,
    #[serde(rename = "maxProtocolVersion")]
    pub max_protocol_version: u32,
    pub features: Vec<DeviceFeature>,
}

/// The wallet account returned in a `ton_addr` connect item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub address: String,
    pub chain: Chain,
    #[serde(rename = "walletStateInit")]
    pub wallet_state_init: String,
    #[serde(rename = "publicKey")]
    pub public_key: Option<String>,
}

/// The wallet's response to a requested `ton_proof` connect item, carrying
/// an `Ed25519` signature over the session's address and payload.
#[derive(Debug, Clone)]
pub struct TonProof {
    pub timestamp: u64,
    pub domain_len: u32,
    pub domain_val: String,
    pub payload: String,
    pub signature: Vec<u8>,
}

/// Everything the wallet handed back in a successful `connect` event.
#[derive(Debug, Clone)]
pub struct WalletInfo {
    pub device: DeviceInfo,
    pub provider: String,
    pub account: Account,
    pub ton_proof: Option<TonProof>,
}

/// One entry in the public wallets directory (supplement module).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletDescriptor {
    pub name: String,
    #[serde(rename = "appName")]
    pub app_name: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    #[serde(rename = "aboutUrl")]
    pub about_url: String,
    #[serde(rename = "universalUrl")]
    pub universal_url: String,
    #[serde(rename = "bridgeUrl")]
    pub bridge_url: String,
    pub platforms: Vec<String>,
}

/// An asynchronously delivered event pushed from the wallet, handed to
/// status-change listeners registered on the connector.
#[derive(Debug, Clone)]
pub enum WalletEvent {
    Connect(WalletInfo),
    Disconnect,
    /// An event the wallet sent that carries an error code instead of a
    /// payload, e.g. a failed `connect` attempt.
    Error {
        event: String,
        error: crate::errors::TonConnectError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_serializes_to_wire_codes() {
        assert_eq!(serde_json::to_string(&Chain::Mainnet).unwrap(), "\"-239\"");
        assert_eq!(serde_json::to_string(&Chain::Testnet).unwrap(), "\"-3\"");
    }
}
