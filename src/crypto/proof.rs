//! Verification of a wallet's `ton_proof` signature.
//!
//! The wallet signs a payload binding the dApp-issued `payload` string to
//! its own address and the verification domain, so the dApp's backend can
//! confirm the address really belongs to whoever holds its private key. The
//! exact byte layout (two rounds of SHA-256 over a fixed-prefix message) is
//! part of the wire protocol, not an implementation detail, so it is
//! reproduced here verbatim rather than simplified.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::model::{Account, TonProof};

const PROOF_PREFIX: &[u8] = b"ton-proof-item-v2/";
const SIGNATURE_PREFIX: &[u8] = b"\xff\xff";
const SIGNATURE_DOMAIN: &[u8] = b"ton-connect";

/// Verify `proof` was produced by the holder of `account`'s public key.
///
/// `src_payload`, when given, overrides `proof.payload` in the signed
/// message — used when the caller wants to check against a payload it
/// issued itself rather than trust the one echoed back by the wallet.
pub fn check_proof(account: &Account, proof: &TonProof, src_payload: Option<&str>) -> bool {
    match try_check_proof(account, proof, src_payload) {
        Ok(valid) => valid,
        Err(e) => {
            tracing::debug!(error = %e, "ton_proof verification failed");
            false
        }
    }
}

fn try_check_proof(account: &Account, proof: &TonProof, src_payload: Option<&str>) -> Result<bool, ProofError> {
    let (wc_str, whash_hex) = account
        .address
        .split_once(':')
        .ok_or(ProofError::MalformedAddress)?;
    let wc: i32 = wc_str.parse().map_err(|_| ProofError::MalformedAddress)?;
    let whash = hex::decode(whash_hex).map_err(|_| ProofError::MalformedAddress)?;

    let payload = src_payload.unwrap_or(&proof.payload);

    let mut message = Vec::new();
    message.extend_from_slice(PROOF_PREFIX);
    message.extend_from_slice(&wc.to_le_bytes());
    message.extend_from_slice(&whash);
    message.extend_from_slice(&proof.domain_len.to_le_bytes());
    message.extend_from_slice(proof.domain_val.as_bytes());
    message.extend_from_slice(&proof.timestamp.to_le_bytes());
    message.extend_from_slice(payload.as_bytes());

    let h1 = Sha256::digest(&message);

    let mut signature_message = Vec::new();
    signature_message.extend_from_slice(SIGNATURE_PREFIX);
    signature_message.extend_from_slice(SIGNATURE_DOMAIN);
    signature_message.extend_from_slice(&h1);

    let h2 = Sha256::digest(&signature_message);

    let public_key_hex = account.public_key.as_deref().ok_or(ProofError::MissingPublicKey)?;
    let public_key_bytes = hex::decode(public_key_hex).map_err(|_| ProofError::MalformedKey)?;
    let public_key_arr: [u8; 32] = public_key_bytes.try_into().map_err(|_| ProofError::MalformedKey)?;
    let verifying_key = VerifyingKey::from_bytes(&public_key_arr).map_err(|_| ProofError::MalformedKey)?;

    let signature_arr: [u8; 64] = proof
        .signature
        .clone()
        .try_into()
        .map_err(|_| ProofError::MalformedSignature)?;
    let signature = Signature::from_bytes(&signature_arr);

    Ok(verifying_key.verify(&h2, &signature).is_ok())
}

#[derive(Debug, thiserror::Error)]
enum ProofError {
    #[error("account address is not in <wc>:<hex> form")]
    MalformedAddress,
    #[error("account has no public key to verify against")]
    MissingPublicKey,
    #[error("account public key is not a valid ed25519 key")]
    MalformedKey,
    #[error("proof signature is not 64 bytes")]
    MalformedSignature,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn sign_proof(signing_key: &SigningKey, wc: i32, whash: &[u8; 32], domain: &str, timestamp: u64, payload: &str) -> TonProof {
        let mut message = Vec::new();
        message.extend_from_slice(PROOF_PREFIX);
        message.extend_from_slice(&wc.to_le_bytes());
        message.extend_from_slice(whash);
        message.extend_from_slice(&(domain.len() as u32).to_le_bytes());
        message.extend_from_slice(domain.as_bytes());
        message.extend_from_slice(&timestamp.to_le_bytes());
        message.extend_from_slice(payload.as_bytes());
        let h1 = Sha256::digest(&message);

        let mut signature_message = Vec::new();
        signature_message.extend_from_slice(SIGNATURE_PREFIX);
        signature_message.extend_from_slice(SIGNATURE_DOMAIN);
        signature_message.extend_from_slice(&h1);
        let h2 = Sha256::digest(&signature_message);

        let signature = signing_key.sign(&h2);
        TonProof {
            timestamp,
            domain_len: domain.len() as u32,
            domain_val: domain.to_string(),
            payload: payload.to_string(),
            signature: signature.to_bytes().to_vec(),
        }
    }

    #[test]
    fn valid_proof_verifies() {
        let signing_key = SigningKey::from_bytes(&[7u8; 32]);
        let whash = [42u8; 32];
        let proof = sign_proof(&signing_key, 0, &whash, "dapp.example", 1_700_000_000, "nonce-123");

        let account = Account {
            address: format!("0:{}", hex::encode(whash)),
            chain: crate::model::Chain::Mainnet,
            wallet_state_init: String::new(),
            public_key: Some(hex::encode(signing_key.verifying_key().to_bytes())),
        };

        assert!(check_proof(&account, &proof, None));
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let signing_key = SigningKey::from_bytes(&[7u8; 32]);
        let whash = [42u8; 32];
        let proof = sign_proof(&signing_key, 0, &whash, "dapp.example", 1_700_000_000, "nonce-123");

        let account = Account {
            address: format!("0:{}", hex::encode(whash)),
            chain: crate::model::Chain::Mainnet,
            wallet_state_init: String::new(),
            public_key: Some(hex::encode(signing_key.verifying_key().to_bytes())),
        };

        assert!(!check_proof(&account, &proof, Some("different-nonce")));
    }
}
