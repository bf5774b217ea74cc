// src/block.rs

use serde::Serialize;

use crate::account::{Account, AccountTable, PouAccount, UsageTracked};
use crate::config::PouParams;
use crate::provenance::Pile;
use crate::state::{Balances, LedgerState};
use crate::types::{Address, Amount};

/// A block under construction: ledger state plus the usage state of every
/// known account. Each block owns an independent copy of both.
#[derive(Debug, Clone)]
pub struct PouBlock {
    pub chain_length: u64,
    pub params: PouParams,
    pub(crate) ledger: LedgerState,
    pub(crate) accounts: AccountTable,
}

/// Serializable per-account snapshot for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct UsageReport {
    pub name: String,
    pub address: Address,
    pub balance: Amount,
    pub usage_index: f64,
    pub incoming: Vec<Pile>,
    pub outgoing: Vec<(Address, u32)>,
}

impl PouBlock {
    pub fn genesis(params: PouParams, accounts: AccountTable, balances: Balances) -> Self {
        Self {
            chain_length: 0,
            params,
            ledger: LedgerState::new(balances),
            accounts,
        }
    }

    /// Genesis block funding each account with its paired amount.
    pub fn genesis_with(
        params: PouParams,
        allocation: impl IntoIterator<Item = (Account, Amount)>,
    ) -> Self {
        let mut accounts = AccountTable::new();
        let mut balances = Balances::new();
        for (account, amount) in allocation {
            balances.insert(account.address.clone(), amount);
            accounts.register(PouAccount::new(account));
        }
        Self::genesis(params, accounts, balances)
    }

    /// Next block on top of this one: same balances, nonces and usage state,
    /// no transactions.
    pub fn child(&self) -> Self {
        Self {
            chain_length: self.chain_length + 1,
            params: self.params,
            ledger: LedgerState {
                balances: self.ledger.balances.clone(),
                next_nonce: self.ledger.next_nonce.clone(),
                transactions: Default::default(),
            },
            accounts: self.accounts.clone(),
        }
    }

    pub fn ledger(&self) -> &LedgerState {
        &self.ledger
    }

    pub fn accounts(&self) -> &AccountTable {
        &self.accounts
    }

    pub fn balance_of(&self, who: &str) -> Amount {
        self.ledger.balance_of(who)
    }

    pub fn next_nonce(&self, who: &str) -> u64 {
        self.ledger.next_nonce(who)
    }

    pub fn contains_tx(&self, id: &str) -> bool {
        self.ledger.contains_tx(id)
    }

    pub fn resolve(&self, address: &str) -> Option<&PouAccount> {
        self.accounts.resolve(address)
    }

    /// Register an account after genesis, e.g. a late miner.
    pub fn register(&mut self, account: PouAccount) {
        self.accounts.register(account);
    }

    pub fn usage_index(&self, who: &str) -> Option<f64> {
        self.resolve(who).map(|a| a.usage_index())
    }

    pub fn report(&self, who: &str) -> Option<UsageReport> {
        let account = self.resolve(who)?;
        let mut outgoing: Vec<(Address, u32)> = account
            .outgoing_counts()
            .iter()
            .map(|(a, n)| (a.clone(), *n))
            .collect();
        outgoing.sort();
        Some(UsageReport {
            name: account.identity.name.clone(),
            address: account.identity.address.clone(),
            balance: self.balance_of(who),
            usage_index: account.usage_index(),
            incoming: account.incoming_piles().into_iter().cloned().collect(),
            outgoing,
        })
    }

    /// Reports for all known accounts, ordered by name.
    pub fn reports(&self) -> Vec<UsageReport> {
        let mut out: Vec<UsageReport> = self
            .accounts
            .iter()
            .filter_map(|a| self.report(a.address()))
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}
