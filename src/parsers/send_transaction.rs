//! Typed parser for the `sendTransaction` RPC method.

use serde::{Deserialize, Serialize};

use crate::errors::{TonConnectError, TonConnectResult};
use super::RpcParser;

/// A single outgoing message within a `sendTransaction` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionMessage {
    pub address: String,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "stateInit")]
    pub state_init: Option<String>,
}

/// A `sendTransaction` request: up to the wallet's advertised
/// `maxMessages`, sent for wallet-side approval and broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendTransactionRequest {
    #[serde(rename = "validUntil")]
    pub valid_until: u64,
    pub messages: Vec<TransactionMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

/// The wallet's confirmation: a signed, broadcastable BOC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendTransactionResponse {
    pub boc: String,
}

pub struct SendTransactionParser {
    pub request: SendTransactionRequest,
}

impl RpcParser for SendTransactionParser {
    type Response = SendTransactionResponse;

    fn convert_to_rpc_request(&self) -> serde_json::Value {
        let params = serde_json::to_string(&self.request).expect("SendTransactionRequest always serializes");
        serde_json::json!({
            "method": "sendTransaction",
            "params": [params],
        })
    }

    fn convert_from_rpc_response(&self, response: &serde_json::Value) -> TonConnectResult<Self::Response> {
        let boc = response
            .get("result")
            .and_then(|v| v.as_str())
            .ok_or_else(|| TonConnectError::Parse("sendTransaction response has no result".into()))?;
        Ok(SendTransactionResponse { boc: boc.to_string() })
    }

    fn parse_error(&self, response: &serde_json::Value) -> TonConnectError {
        let code = response.get("error").and_then(|e| e.get("code")).and_then(|c| c.as_i64());
        let message = response
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .map(String::from);

        // sendTransaction only ever returns this subset of the wire taxonomy;
        // anything else collapses to Unknown same as the reference client.
        match code {
            Some(1) => TonConnectError::BadRequest(message),
            Some(100) => TonConnectError::UnknownApp(message),
            Some(300) => TonConnectError::UserRejects(message),
            _ => TonConnectError::Unknown(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> SendTransactionParser {
        SendTransactionParser {
            request: SendTransactionRequest {
                valid_until: 1_700_000_600,
                messages: vec![TransactionMessage {
                    address: "0:abcd".into(),
                    amount: "1000000".into(),
                    payload: None,
                    state_init: None,
                }],
                network: None,
                from: None,
            },
        }
    }

    #[test]
    fn builds_rpc_request_body() {
        let request = parser().convert_to_rpc_request();
        assert_eq!(request["method"], "sendTransaction");
        assert!(request["params"][0].as_str().unwrap().contains("validUntil"));
    }

    #[test]
    fn decodes_successful_response() {
        let response = serde_json::json!({"result": "te6ccgEB..."});
        let decoded = parser().convert_from_rpc_response(&response).unwrap();
        assert_eq!(decoded.boc, "te6ccgEB...");
    }

    #[test]
    fn maps_user_rejects_error() {
        let response = serde_json::json!({"error": {"code": 300, "message": "declined"}});
        assert!(matches!(parser().parse_error(&response), TonConnectError::UserRejects(_)));
    }
}
