//! End-to-end session encryption between this client and a wallet.
//!
//! Each session owns an X25519 keypair; its hex-encoded public key is the
//! protocol's `session_id`. Messages to and from the wallet are NaCl-style
//! sealed boxes (`X25519` key agreement + `XSalsa20Poly1305` AEAD), built
//! here on the `crypto_box` crate, with a random 24-byte nonce prefixed to
//! the ciphertext and the whole thing base64-encoded for the wire.

pub mod proof;

use base64::Engine;
use crypto_box::aead::{Aead, AeadCore, OsRng};
use crypto_box::{PublicKey, SalsaBox, SecretKey};

use crate::errors::TonConnectError;

const NONCE_LEN: usize = 24;

/// Owns this side's session keypair and performs box encryption/decryption
/// against a peer's public key, supplied hex-encoded per-call (the peer
/// changes exactly once: from none, to the wallet's key on `connect`).
#[derive(Clone)]
pub struct SessionCrypto {
    secret_key: SecretKey,
    /// Hex-encoded `X25519` public key; doubles as the bridge `client_id`.
    pub session_id: String,
}

impl SessionCrypto {
    /// Generate a fresh session keypair.
    pub fn new() -> Self {
        let secret_key = SecretKey::generate(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    /// Restore a session keypair from its hex-encoded private scalar, as
    /// read back from storage.
    pub fn from_hex_private_key(hex_key: &str) -> Result<Self, TonConnectError> {
        let bytes = hex::decode(hex_key).map_err(|e| TonConnectError::Parse(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TonConnectError::Parse("session private key must be 32 bytes".into()))?;
        Ok(Self::from_secret_key(SecretKey::from(arr)))
    }

    fn from_secret_key(secret_key: SecretKey) -> Self {
        let session_id = hex::encode(secret_key.public_key().as_bytes());
        Self { secret_key, session_id }
    }

    /// Hex-encoded private scalar, for persistence in a `ConnectionRecord`.
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.to_bytes())
    }

    fn salsa_box(&self, peer_public_key_hex: &str) -> Result<SalsaBox, TonConnectError> {
        let bytes = hex::decode(peer_public_key_hex).map_err(|e| TonConnectError::Parse(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TonConnectError::Parse("peer public key must be 32 bytes".into()))?;
        Ok(SalsaBox::new(&PublicKey::from(arr), &self.secret_key))
    }

    /// Encrypt `message` for the wallet at `receiver_public_key_hex`,
    /// returning base64 `nonce || ciphertext`.
    pub fn encrypt(&self, message: &str, receiver_public_key_hex: &str) -> Result<String, TonConnectError> {
        let sbox = self.salsa_box(receiver_public_key_hex)?;
        let nonce = SalsaBox::generate_nonce(&mut OsRng);
        let ciphertext = sbox
            .encrypt(&nonce, message.as_bytes())
            .map_err(|_| TonConnectError::Decrypt)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(base64::engine::general_purpose::STANDARD.encode(out))
    }

    /// Decrypt a base64 `nonce || ciphertext` payload sent by
    /// `sender_public_key_hex`.
    pub fn decrypt(&self, message_b64: &str, sender_public_key_hex: &str) -> Result<String, TonConnectError> {
        let raw = base64::engine::general_purpose::STANDARD
            .decode(message_b64)
            .map_err(|_| TonConnectError::Decrypt)?;
        if raw.len() < NONCE_LEN {
            return Err(TonConnectError::Decrypt);
        }
        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);

        let sbox = self.salsa_box(sender_public_key_hex)?;
        let plaintext = sbox
            .decrypt(nonce.into(), ciphertext)
            .map_err(|_| TonConnectError::Decrypt)?;
        String::from_utf8(plaintext).map_err(|_| TonConnectError::Decrypt)
    }
}

impl Default for SessionCrypto {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_between_two_sessions() {
        let app = SessionCrypto::new();
        let wallet = SessionCrypto::new();

        let encrypted = app.encrypt("hello wallet", &wallet.session_id).unwrap();
        let decrypted = wallet.decrypt(&encrypted, &app.session_id).unwrap();
        assert_eq!(decrypted, "hello wallet");
    }

    #[test]
    fn restoring_from_hex_preserves_session_id() {
        let original = SessionCrypto::new();
        let restored = SessionCrypto::from_hex_private_key(&original.private_key_hex()).unwrap();
        assert_eq!(original.session_id, restored.session_id);
    }

    #[test]
    fn decrypt_rejects_truncated_payload() {
        let session = SessionCrypto::new();
        let other = SessionCrypto::new();
        let err = session.decrypt("AA==", &other.session_id).unwrap_err();
        assert!(matches!(err, TonConnectError::Decrypt));
    }
}
