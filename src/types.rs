// src/types.rs

use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Serialize};

use crate::codec::tx_bytes;
use crate::crypto::{addr_from_pubkey, addr_hex, address_of_key, hash_bytes_sha256, verify_ed25519};
use crate::state::Balances;

pub type Address = String;

/// Hex encoded SHA-256 of the transaction's canonical bytes.
pub type TxId = String;

pub type Amount = u64;

pub type Hash = [u8; 32];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub amount: Amount,
    pub address: Address,
}

impl Output {
    pub fn new(amount: Amount, address: impl Into<Address>) -> Self {
        Self { amount, address: address.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: TxId,
    pub from: Address,
    pub nonce: u64,
    pub pubkey: [u8; 32],
    pub sig: Option<[u8; 64]>,
    pub outputs: Vec<Output>,
}

impl Transaction {
    /// Build an unsigned transaction. `id` is derived from the other fields.
    pub fn new(
        from: impl Into<Address>,
        nonce: u64,
        pubkey: [u8; 32],
        outputs: Vec<Output>,
    ) -> Self {
        let mut tx = Self {
            id: String::new(),
            from: from.into(),
            nonce,
            pubkey,
            sig: None,
            outputs,
        };
        tx.id = tx.content_id();
        tx
    }

    /// Build a transaction paying `outputs` from the key's own address and sign it.
    pub fn signed(sk: &SigningKey, nonce: u64, outputs: Vec<Output>) -> Self {
        let mut tx = Self::new(address_of_key(sk), nonce, sk.verifying_key().to_bytes(), outputs);
        tx.sign(sk);
        tx
    }

    pub fn sign(&mut self, sk: &SigningKey) {
        self.sig = Some(sk.sign(self.id.as_bytes()).to_bytes());
    }

    /// Sum of all outputs. `None` on overflow, which no balance can cover.
    pub fn total_output(&self) -> Option<Amount> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, o| acc.checked_add(o.amount))
    }

    /// Id recomputed from the current field values.
    pub fn content_id(&self) -> TxId {
        hex::encode(hash_bytes_sha256(&tx_bytes(self)))
    }

    /// Signature present, `id` matches the content, `from` derived from
    /// `pubkey`, and the signature verifies over the recomputed id.
    pub fn valid_signature(&self) -> bool {
        let Some(sig) = self.sig.as_ref() else {
            return false;
        };
        let id = self.content_id();
        if id != self.id {
            return false;
        }
        if self.from != addr_hex(&addr_from_pubkey(&self.pubkey)) {
            return false;
        }
        verify_ed25519(&self.pubkey, sig, id.as_bytes())
    }

    pub fn sufficient_funds(&self, balances: &Balances) -> bool {
        let available = *balances.get(&self.from).unwrap_or(&0);
        matches!(self.total_output(), Some(total) if total <= available)
    }

    /// Total amount this transaction pays to `address` across all of its outputs.
    pub fn amount_to(&self, address: &str) -> Amount {
        self.outputs
            .iter()
            .filter(|o| o.address == address)
            .map(|o| o.amount)
            .sum()
    }
}

/// Summary of a committed transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub id: TxId,
    pub debited: Amount,
    pub cyclic_receivers: Vec<Address>,
}
