//! Property-based checks for the universal invariants called out in the
//! protocol design: crypto round-tripping, universal-link purity, and
//! ton_proof verification, each checked against arbitrary inputs rather
//! than a handful of hand-picked examples.

use proptest::prelude::*;

use ton_connect::crypto::proof::check_proof;
use ton_connect::crypto::SessionCrypto;
use ton_connect::model::{Account, Chain, TonProof};
use ton_connect::universal_link::generate_universal_url;

use ed25519_dalek::{Signer, SigningKey};
use sha2::{Digest, Sha256};

const PROOF_PREFIX: &[u8] = b"ton-proof-item-v2/";
const SIGNATURE_PREFIX: &[u8] = b"\xff\xff";
const SIGNATURE_DOMAIN: &[u8] = b"ton-connect";

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

proptest! {
    /// `decrypt(encrypt(m)) == m` for every UTF-8 string and every valid
    /// session keypair, regardless of message content or length.
    #[test]
    fn encrypt_decrypt_round_trips(message in ".*") {
        let sender = SessionCrypto::new();
        let receiver = SessionCrypto::new();

        let encrypted = sender.encrypt(&message, &receiver.session_id).expect("encrypt never fails for valid peer key");
        let decrypted = receiver.decrypt(&encrypted, &sender.session_id).expect("decrypt of a freshly encrypted message always succeeds");

        prop_assert_eq!(decrypted, message);
    }

    /// `generate_universal_url` is a pure function of its inputs: calling
    /// it twice with the same arguments always produces the same link.
    #[test]
    fn universal_url_generation_is_pure(
        host in "[a-z]{3,10}\\.(com|org)",
        session_id in "[0-9a-f]{8,16}",
        method in "[a-zA-Z]{3,12}",
    ) {
        let universal_url = format!("https://{host}/ton-connect");
        let request = serde_json::json!({"method": method});

        let first = generate_universal_url(&universal_url, &session_id, &request);
        let second = generate_universal_url(&universal_url, &session_id, &request);

        prop_assert_eq!(first, second);
    }

    /// A ton_proof built with `build_proof`'s own message layout verifies
    /// against the signer's public key, for any workchain/hash/domain/
    /// timestamp/payload combination.
    #[test]
    fn proof_verifies_for_any_keypair_and_message(
        seed in prop::array::uniform32(any::<u8>()),
        whash in prop::array::uniform32(any::<u8>()),
        domain in "[a-z]{1,20}\\.[a-z]{2,5}",
        timestamp in 0u64..2_000_000_000,
        payload in "[ -~]{0,40}",
    ) {
        let signing_key = SigningKey::from_bytes(&seed);
        let proof = sign_proof(&signing_key, 0, &whash, &domain, timestamp, &payload);

        let account = Account {
            address: format!("0:{}", hex::encode(whash)),
            chain: Chain::Mainnet,
            wallet_state_init: String::new(),
            public_key: Some(hex::encode(signing_key.verifying_key().to_bytes())),
        };

        prop_assert!(check_proof(&account, &proof, None));
    }
}
