//! Error types for the TON Connect client.
//!
//! Mirrors the wire error taxonomy the bridge and the wallet use, plus the
//! connector-lifecycle errors a caller can trigger locally.

use thiserror::Error;

/// Main error type for connector operations.
#[derive(Error, Debug, Clone)]
pub enum TonConnectError {
    // Lifecycle errors
    #[error("wallet connection called but wallet already connected")]
    WalletAlreadyConnected,

    #[error("operation requires a connected wallet")]
    WalletNotConnected,

    #[error("wallet doesn't support requested feature: {0}")]
    WalletNotSupportFeature(String),

    #[error("failed to fetch the wallets list: {0}")]
    FetchWallets(String),

    #[error("trying to send a bridge request without an open session")]
    NoSession,

    // Wire errors (mirroring the wallet's CONNECT_EVENT / RPC error codes)
    #[error("request to the wallet contains errors{}", opt_msg(.0))]
    BadRequest(Option<String>),

    #[error("app tries to send rpc request to the injected wallet while not connected{}", opt_msg(.0))]
    UnknownApp(Option<String>),

    #[error("user rejected the action in the wallet{}", opt_msg(.0))]
    UserRejects(Option<String>),

    #[error("manifest not found, make sure tonconnect-manifest.json is reachable at the configured url{}", opt_msg(.0))]
    ManifestNotFound(Option<String>),

    #[error("tonconnect-manifest.json contains errors{}", opt_msg(.0))]
    ManifestContent(Option<String>),

    #[error("method not supported by the wallet{}", opt_msg(.0))]
    MethodNotSupported(Option<String>),

    #[error("unknown wallet error{}", opt_msg(.0))]
    Unknown(Option<String>),

    // Transport / crypto / parsing
    #[error("bridge transport error: {0}")]
    Transport(String),

    #[error("failed to decrypt bridge message")]
    Decrypt,

    #[error("failed to parse bridge message: {0}")]
    Parse(String),
}

fn opt_msg(m: &Option<String>) -> String {
    match m {
        Some(m) => format!(": {m}"),
        None => String::new(),
    }
}

impl TonConnectError {
    /// Map a wire error code (see `CONNECT_EVENT_ERROR_CODES` / `SEND_TRANSACTION_ERROR_CODES`
    /// in the protocol) to the corresponding typed error.
    pub fn from_wire_code(code: i64, message: Option<String>) -> Self {
        match code {
            1 => TonConnectError::BadRequest(message),
            2 => TonConnectError::ManifestNotFound(message),
            3 => TonConnectError::ManifestContent(message),
            100 => TonConnectError::UnknownApp(message),
            300 => TonConnectError::UserRejects(message),
            400 => TonConnectError::MethodNotSupported(message),
            _ => TonConnectError::Unknown(message),
        }
    }

    /// Fatal errors indicate a configuration bug no retry can fix; they are
    /// dispatched to error subscribers *and* re-raised to the caller.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TonConnectError::ManifestNotFound(_) | TonConnectError::ManifestContent(_)
        )
    }
}

/// Result type alias for connector operations.
pub type TonConnectResult<T> = Result<T, TonConnectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_code_mapping() {
        assert!(matches!(
            TonConnectError::from_wire_code(300, Some("no".into())),
            TonConnectError::UserRejects(_)
        ));
        assert!(matches!(
            TonConnectError::from_wire_code(2, None),
            TonConnectError::ManifestNotFound(_)
        ));
        assert!(matches!(
            TonConnectError::from_wire_code(9999, None),
            TonConnectError::Unknown(_)
        ));
    }

    #[test]
    fn fatal_errors() {
        assert!(TonConnectError::ManifestNotFound(None).is_fatal());
        assert!(TonConnectError::ManifestContent(None).is_fatal());
        assert!(!TonConnectError::UserRejects(None).is_fatal());
        assert!(!TonConnectError::WalletNotConnected.is_fatal());
    }
}
