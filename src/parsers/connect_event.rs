//! Decodes the wallet's `connect` event payload into a [`WalletInfo`].

use base64::Engine;

use crate::errors::TonConnectError;
use crate::model::{Account, Chain, DeviceInfo, TonProof, WalletInfo};

/// Maps a `connect` event's numeric error code to a typed error, per the
/// wire taxonomy (see `crate::errors::TonConnectError::from_wire_code`).
pub struct ConnectEventParser;

impl ConnectEventParser {
    /// Parse a successful `connect` event's `payload` into a [`WalletInfo`].
    pub fn parse_response(payload: &serde_json::Value) -> Result<WalletInfo, TonConnectError> {
        let items = payload
            .get("items")
            .and_then(|v| v.as_array())
            .ok_or_else(|| TonConnectError::Parse("connect event payload has no items".into()))?;

        let mut account = None;
        let mut ton_proof = None;

        for item in items {
            match item.get("name").and_then(|v| v.as_str()) {
                Some("ton_addr") => account = Some(parse_account(item)?),
                Some("ton_proof") => ton_proof = Some(parse_ton_proof(item)?),
                _ => {}
            }
        }

        let account = account.ok_or_else(|| TonConnectError::Parse("ton_addr missing from connect items".into()))?;
        let device = payload
            .get("device")
            .ok_or_else(|| TonConnectError::Parse("connect event payload has no device".into()))
            .and_then(parse_device)?;

        Ok(WalletInfo {
            device,
            provider: "http".to_string(),
            account,
            ton_proof,
        })
    }

    /// Parse a failed `connect` event's `payload` into a typed error.
    pub fn parse_error(payload: &serde_json::Value) -> TonConnectError {
        let code = payload.get("error").and_then(|e| e.get("code")).and_then(|c| c.as_i64());
        let message = payload
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .map(String::from);

        match code {
            Some(code) => TonConnectError::from_wire_code(code, message),
            None => TonConnectError::Unknown(message),
        }
    }
}

fn parse_device(device: &serde_json::Value) -> Result<DeviceInfo, TonConnectError> {
    serde_json::from_value(device.clone()).map_err(|e| TonConnectError::Parse(e.to_string()))
}

fn parse_account(item: &serde_json::Value) -> Result<Account, TonConnectError> {
    if item.get("address").is_none() {
        return Err(TonConnectError::Parse("ton_addr item has no address".into()));
    }
    Ok(Account {
        address: item["address"].as_str().unwrap_or_default().to_string(),
        chain: match item.get("network").and_then(|n| n.as_str()) {
            Some("-239") => Chain::Mainnet,
            _ => Chain::Testnet,
        },
        wallet_state_init: item
            .get("walletStateInit")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        public_key: item.get("publicKey").and_then(|v| v.as_str()).map(String::from),
    })
}

fn parse_ton_proof(item: &serde_json::Value) -> Result<TonProof, TonConnectError> {
    let proof = item
        .get("proof")
        .ok_or_else(|| TonConnectError::Parse("ton_proof item has no proof".into()))?;

    let signature_b64 = proof
        .get("signature")
        .and_then(|v| v.as_str())
        .ok_or_else(|| TonConnectError::Parse("ton_proof has no signature".into()))?;
    let signature = base64::engine::general_purpose::STANDARD
        .decode(signature_b64)
        .map_err(|e| TonConnectError::Parse(e.to_string()))?;

    Ok(TonProof {
        timestamp: proof.get("timestamp").and_then(|v| v.as_u64()).unwrap_or_default(),
        domain_len: proof
            .get("domain")
            .and_then(|d| d.get("lengthBytes"))
            .and_then(|v| v.as_u64())
            .unwrap_or_default() as u32,
        domain_val: proof
            .get("domain")
            .and_then(|d| d.get("value"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        payload: proof.get("payload").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_connect_items_into_wallet_info() {
        let payload = serde_json::json!({
            "items": [
                {"name": "ton_addr", "address": "0:abcd", "network": "-239", "walletStateInit": "te6==", "publicKey": "deadbeef"},
                {"name": "ton_proof", "proof": {"timestamp": 1, "domain": {"lengthBytes": 4, "value": "test"}, "payload": "nonce", "signature": "AAAA"}},
            ],
            "device": {"platform": "iphone", "appName": "Tonkeeper", "appVersion": "1.0", "maxProtocolVersion": 2, "features": []},
        });

        let wallet = ConnectEventParser::parse_response(&payload).unwrap();
        assert_eq!(wallet.account.address, "0:abcd");
        assert!(wallet.ton_proof.is_some());
    }

    #[test]
    fn missing_ton_addr_is_an_error() {
        let payload = serde_json::json!({"items": [], "device": {}});
        assert!(ConnectEventParser::parse_response(&payload).is_err());
    }

    #[test]
    fn parse_error_maps_wire_code() {
        let payload = serde_json::json!({"error": {"code": 300, "message": "User declined"}});
        assert!(matches!(ConnectEventParser::parse_error(&payload), TonConnectError::UserRejects(_)));
    }
}
