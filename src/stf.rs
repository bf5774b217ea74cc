// src/stf.rs

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::account::UsageTracked;
use crate::block::PouBlock;
use crate::cheating::{find_cycles, handle_cheating};
use crate::error::Rejection;
use crate::types::{Address, Amount, Applied, Transaction};
use crate::usage::update_index;

/// Receives a human readable reason for every rejected transaction.
pub trait RejectionLog {
    fn log(&self, msg: &str);
}

/// A log that can travel with a command to another task.
pub type SharedLog = Arc<dyn RejectionLog + Send + Sync>;

/// Keeps rejection messages in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryLog {
    lines: Mutex<Vec<String>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(l) => l.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl RejectionLog for MemoryLog {
    fn log(&self, msg: &str) {
        // A poisoned log only loses diagnostics.
        if let Ok(mut l) = self.lines.lock() {
            l.push(msg.to_string());
        }
    }
}

/// Admission checks in order; the first failure wins. Returns the nonce the
/// transaction consumes. Never mutates the block.
pub fn validate(tx: &Transaction, block: &PouBlock) -> Result<u64, Rejection> {
    if block.contains_tx(&tx.id) {
        return Err(Rejection::DuplicateTransaction(tx.id.clone()));
    }
    if tx.sig.is_none() {
        return Err(Rejection::Unsigned(tx.id.clone()));
    }
    if !tx.valid_signature() {
        return Err(Rejection::InvalidSignature(tx.id.clone()));
    }
    if !tx.sufficient_funds(&block.ledger.balances) {
        return Err(Rejection::InsufficientFunds {
            id: tx.id.clone(),
            required: tx.total_output(),
            available: block.balance_of(&tx.from),
        });
    }

    let expected = block.next_nonce(&tx.from);
    if tx.nonce < expected {
        return Err(Rejection::ReplayedNonce { id: tx.id.clone(), expected, got: tx.nonce });
    }
    if tx.nonce > expected {
        return Err(Rejection::OutOfOrderNonce { id: tx.id.clone(), expected, got: tx.nonce });
    }
    Ok(expected)
}

/// Validate `tx` and, if admissible, apply it to `block`.
///
/// On `Err` the block is untouched. On `Ok` the nonce, usage state of the
/// known parties, transaction set and balances have all been updated.
pub fn try_apply(tx: &Transaction, block: &mut PouBlock) -> Result<Applied, Rejection> {
    let nonce = validate(tx, block)?;
    let debited = tx.total_output().unwrap_or_default();

    block.ledger.next_nonce.insert(tx.from.clone(), nonce + 1);

    let cyclic_receivers = if block.accounts.contains(&tx.from) {
        apply_usage(tx, block)
    } else {
        Vec::new()
    };

    // Commit.
    block.ledger.transactions.insert(tx.id.clone(), tx.clone());

    let sender_bal = block.ledger.balances.entry(tx.from.clone()).or_insert(0);
    let remaining = sender_bal.checked_sub(debited);
    debug_assert!(remaining.is_some(), "debit exceeds validated balance");
    *sender_bal = remaining.unwrap_or(0);

    for out in &tx.outputs {
        let bal = block.ledger.balances.entry(out.address.clone()).or_insert(0);
        let credited = bal.checked_add(out.amount);
        debug_assert!(credited.is_some(), "balance overflow crediting {}", out.address);
        *bal = credited.unwrap_or(Amount::MAX);
    }

    debug!(id = %tx.id, from = %tx.from, nonce, debited, "transaction applied");
    Ok(Applied { id: tx.id.clone(), debited, cyclic_receivers })
}

/// Route every known receiver through the cheating handler or the plain
/// index update. Returns the receivers that closed a cycle.
fn apply_usage(tx: &Transaction, block: &mut PouBlock) -> Vec<Address> {
    let params = block.params;
    let sender = tx.from.as_str();

    // One pass per distinct receiver, first-appearance order.
    let mut receivers: Vec<&str> = Vec::with_capacity(tx.outputs.len());
    for o in &tx.outputs {
        if !receivers.contains(&o.address.as_str()) {
            receivers.push(&o.address);
        }
    }

    let mut cyclic = Vec::new();
    for receiver in receivers {
        if !block.accounts.contains(receiver) {
            debug!(receiver, "receiver outside the known accounts, balance only");
            continue;
        }

        let sending = tx.amount_to(receiver) as f64;
        let chains = match block.accounts.resolve(sender) {
            Some(s) => find_cycles(s.usage(), receiver),
            None => Vec::new(),
        };

        if !chains.is_empty() && sending > 0.0 {
            handle_cheating(&mut block.accounts, sender, receiver, sending, chains, &params);
            cyclic.push(receiver.to_string());
        } else {
            update_index(&mut block.accounts, sender, receiver, sending, &params);
        }
    }
    cyclic
}

/// Boolean admission contract: `true` once fully committed, `false` with the
/// reason sent to `log` otherwise.
pub fn apply(tx: &Transaction, block: &mut PouBlock, log: Option<&dyn RejectionLog>) -> bool {
    match try_apply(tx, block) {
        Ok(_) => true,
        Err(rejection) => {
            info!(id = %tx.id, reason = %rejection, "transaction rejected");
            if let Some(log) = log {
                log.log(&rejection.to_string());
            }
            false
        }
    }
}

impl PouBlock {
    pub fn add_transaction(&mut self, tx: &Transaction, log: Option<&dyn RejectionLog>) -> bool {
        apply(tx, self, log)
    }
}
