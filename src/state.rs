// src/state.rs

use std::collections::HashMap;

use crate::types::{Address, Amount, Transaction, TxId};

pub type Balances = HashMap<Address, Amount>;
pub type Nonces = HashMap<Address, u64>;
pub type Transactions = HashMap<TxId, Transaction>;

/// Balances, expected nonces and committed transactions of one block.
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    pub balances: Balances,
    pub next_nonce: Nonces,
    pub transactions: Transactions,
}

impl LedgerState {
    pub fn new(balances: Balances) -> Self {
        Self { balances, ..Default::default() }
    }

    pub fn balance_of(&self, who: &str) -> Amount {
        *self.balances.get(who).unwrap_or(&0)
    }

    pub fn next_nonce(&self, who: &str) -> u64 {
        *self.next_nonce.get(who).unwrap_or(&0)
    }

    pub fn contains_tx(&self, id: &str) -> bool {
        self.transactions.contains_key(id)
    }

    pub fn total_supply(&self) -> u128 {
        self.balances.values().map(|b| *b as u128).sum()
    }
}
