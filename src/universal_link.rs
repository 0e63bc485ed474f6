//! Builds the deep link a dApp shows the user to open their wallet.
//!
//! Two shapes: a regular `?v=2&id=...&r=...` query string, and a Telegram
//! Mini App variant that re-packs the same query into a `startattach`
//! payload (Telegram's deep-link format forbids most of the characters a
//! URL-encoded JSON blob contains).

const PROTOCOL_VERSION: u32 = 2;

/// Build the universal link for `request`, routing to the Telegram
/// `startattach` form when `universal_url` points at `t.me` or `tg://`.
pub fn generate_universal_url(universal_url: &str, session_id: &str, request: &serde_json::Value) -> String {
    if universal_url.contains("tg://") || universal_url.contains("t.me/") {
        generate_telegram_universal_url(universal_url, session_id, request)
    } else {
        generate_regular_universal_url(universal_url, session_id, request)
    }
}

fn generate_regular_universal_url(universal_url: &str, session_id: &str, request: &serde_json::Value) -> String {
    let request_encoded: String = url::form_urlencoded::byte_serialize(request.to_string().as_bytes()).collect();
    let base = universal_url.trim_end_matches('/');
    format!("{base}?v={PROTOCOL_VERSION}&id={session_id}&r={request_encoded}")
}

fn generate_telegram_universal_url(universal_url: &str, session_id: &str, request: &serde_json::Value) -> String {
    let regular = generate_regular_universal_url("about:blank", session_id, request);
    let query = regular.splitn(2, '?').nth(1).unwrap_or_default();

    let start_attach = query
        .replace('.', "%2E")
        .replace('-', "%2D")
        .replace('_', "%5F")
        .replace('&', "-")
        .replace('=', "__")
        .replace('%', "--")
        .replace('+', "");

    format!("{universal_url}&startattach=tonconnect-{start_attach}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_link_carries_version_id_and_request() {
        let request = serde_json::json!({"method": "connect"});
        let link = generate_universal_url("https://app.tonkeeper.com/ton-connect/", "deadbeef", &request);
        assert!(link.starts_with("https://app.tonkeeper.com/ton-connect?v=2&id=deadbeef&r="));
    }

    #[test]
    fn telegram_link_uses_startattach() {
        let request = serde_json::json!({"method": "connect"});
        let link = generate_universal_url("https://t.me/wallet?attach=wallet", "deadbeef", &request);
        assert!(link.starts_with("https://t.me/wallet?attach=wallet&startattach=tonconnect-"));
        let attach_payload = link.split("tonconnect-").nth(1).unwrap();
        assert!(!attach_payload.contains('.'));
    }
}
