//! Common shape every typed RPC method parser implements.

use crate::errors::{TonConnectError, TonConnectResult};

/// Converts between a typed request/response pair and the raw JSON the
/// bridge carries. Implementors own one RPC method (`sendTransaction`,
/// `signData`, ...); the provider only knows how to send bytes and match
/// responses by request id.
pub trait RpcParser {
    /// The decoded success type for this method's response.
    type Response;

    /// Build the `method`/`params` body to send over the bridge.
    fn convert_to_rpc_request(&self) -> serde_json::Value;

    /// Decode a successful RPC response payload.
    fn convert_from_rpc_response(&self, response: &serde_json::Value) -> TonConnectResult<Self::Response>;

    /// Decode an error RPC response into the matching typed error.
    fn parse_error(&self, response: &serde_json::Value) -> TonConnectError;
}

/// True if a decoded RPC response carries an `error` field.
pub fn is_error(response: &serde_json::Value) -> bool {
    response.get("error").is_some()
}
