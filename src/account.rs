// src/account.rs

use std::collections::HashMap;

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};

use crate::crypto::{addr_from_pubkey, addr_hex};
use crate::provenance::{Pile, UsageState};
use crate::types::Address;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum AccountKind {
    Client,
    Miner,
}

/// Identity of a participant. Signing itself lives with the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub address: Address,
    pub pubkey: [u8; 32],
    pub kind: AccountKind,
}

impl Account {
    pub fn from_key(name: impl Into<String>, kind: AccountKind, vk: &VerifyingKey) -> Self {
        let pubkey = vk.to_bytes();
        Self {
            name: name.into(),
            address: addr_hex(&addr_from_pubkey(&pubkey)),
            pubkey,
            kind,
        }
    }

    pub fn client(name: impl Into<String>, vk: &VerifyingKey) -> Self {
        Self::from_key(name, AccountKind::Client, vk)
    }

    pub fn miner(name: impl Into<String>, vk: &VerifyingKey) -> Self {
        Self::from_key(name, AccountKind::Miner, vk)
    }
}

/// Read access to the Proof of Usage fields attached to an account.
pub trait UsageTracked {
    fn usage(&self) -> &UsageState;

    fn usage_index(&self) -> f64 {
        self.usage().usage_index()
    }

    fn incoming_piles(&self) -> Vec<&Pile> {
        self.usage().incoming_piles().iter().collect()
    }

    fn outgoing_counts(&self) -> &HashMap<Address, u32> {
        self.usage().outgoing_counts()
    }
}

/// An account identity together with its usage state.
#[derive(Clone, Debug)]
pub struct PouAccount {
    pub identity: Account,
    usage: UsageState,
}

impl PouAccount {
    pub fn new(identity: Account) -> Self {
        Self { identity, usage: UsageState::new() }
    }

    pub fn with_usage(identity: Account, usage: UsageState) -> Self {
        Self { identity, usage }
    }

    pub fn address(&self) -> &str {
        &self.identity.address
    }
}

impl UsageTracked for PouAccount {
    fn usage(&self) -> &UsageState {
        &self.usage
    }
}

/// Known accounts keyed by address. The only owner of usage state.
#[derive(Clone, Debug, Default)]
pub struct AccountTable {
    entries: HashMap<Address, PouAccount>,
}

impl AccountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account. An existing entry for the same address is replaced.
    pub fn register(&mut self, account: PouAccount) {
        self.entries.insert(account.identity.address.clone(), account);
    }

    pub fn resolve(&self, address: &str) -> Option<&PouAccount> {
        self.entries.get(address)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.entries.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PouAccount> {
        self.entries.values()
    }

    pub(crate) fn usage_mut(&mut self, address: &str) -> Option<&mut UsageState> {
        self.entries.get_mut(address).map(|a| &mut a.usage)
    }
}

impl FromIterator<Account> for AccountTable {
    fn from_iter<I: IntoIterator<Item = Account>>(iter: I) -> Self {
        let mut table = AccountTable::new();
        for a in iter {
            table.register(PouAccount::new(a));
        }
        table
    }
}
