//src/crypto.rs

use sha2::{Digest, Sha256};
use ed25519_dalek::{Signature, SigningKey, VerifyingKey, Verifier};

use crate::types::Hash;

pub fn verify_ed25519(pubkey: &[u8; 32], sig_bytes: &[u8; 64], msg: &[u8]) -> bool {
    // VerifyingKey is fallible
    let pk = match VerifyingKey::from_bytes(pubkey) {
        Ok(pk) => pk,
        Err(_) => return false,
    };

    // Signature::from_bytes is infallible in v2 (takes [u8; 64])
    let sig = Signature::from_bytes(sig_bytes);

    pk.verify(msg, &sig).is_ok()
}

pub fn hash_bytes_sha256(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Last 20 bytes of SHA-256(pubkey).
pub fn addr_from_pubkey(pubkey: &[u8; 32]) -> [u8; 20] {
    let h = hash_bytes_sha256(pubkey);
    let mut out = [0u8; 20];
    out.copy_from_slice(&h[12..]);
    out
}

pub fn addr_hex(addr: &[u8; 20]) -> String {
    format!("0x{}", hex::encode(addr))
}

/// Address controlled by a signing key.
pub fn address_of_key(sk: &SigningKey) -> String {
    addr_hex(&addr_from_pubkey(&sk.verifying_key().to_bytes()))
}
