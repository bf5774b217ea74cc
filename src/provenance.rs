// src/provenance.rs

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::types::Address;

/// A quantum of value and the accounts it passed through before reaching its holder.
///
/// `chain[0]` is the account that forwarded the value most recently,
/// `chain[last]` is the earliest known source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pile {
    pub chain: Vec<Address>,
    pub amount: f64,
}

impl Pile {
    pub fn new(chain: Vec<Address>, amount: f64) -> Self {
        Self { chain, amount }
    }

    /// Pile as seen by the receiver after `sender` forwards `amount` of it.
    pub fn forwarded_by(&self, sender: &str, amount: f64) -> Pile {
        let mut chain = Vec::with_capacity(self.chain.len() + 1);
        chain.push(sender.to_string());
        chain.extend(self.chain.iter().cloned());
        Pile { chain, amount }
    }

    /// First position of `who` in the chain.
    pub fn position_of(&self, who: &str) -> Option<usize> {
        self.chain.iter().position(|a| a == who)
    }

    pub fn passes_through(&self, who: &str) -> bool {
        self.position_of(who).is_some()
    }
}

/// Proof of Usage state carried by every known account.
///
/// Incoming piles form a FIFO: new piles are appended at the tail and
/// change is drawn from the head.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UsageState {
    usage_index: f64,
    incoming: VecDeque<Pile>,
    outgoing: HashMap<Address, u32>,
}

impl UsageState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn usage_index(&self) -> f64 {
        self.usage_index
    }

    pub fn incoming_piles(&self) -> &VecDeque<Pile> {
        &self.incoming
    }

    pub fn outgoing_counts(&self) -> &HashMap<Address, u32> {
        &self.outgoing
    }

    pub fn outgoing_count(&self, receiver: &str) -> u32 {
        *self.outgoing.get(receiver).unwrap_or(&0)
    }

    /// Seed provenance directly, e.g. from a genesis allocation.
    pub fn with_piles(piles: impl IntoIterator<Item = Pile>) -> Self {
        Self { incoming: piles.into_iter().collect(), ..Default::default() }
    }

    pub(crate) fn adjust_index(&mut self, delta: f64) {
        self.usage_index += delta;
    }

    pub(crate) fn bump_outgoing(&mut self, receiver: &str) -> u32 {
        let n = self.outgoing.entry(receiver.to_string()).or_insert(0);
        *n += 1;
        *n
    }

    pub(crate) fn push_pile(&mut self, pile: Pile) {
        debug_assert!(pile.amount >= 0.0, "negative pile amount {}", pile.amount);
        self.incoming.push_back(pile);
    }

    pub(crate) fn piles_mut(&mut self) -> &mut VecDeque<Pile> {
        &mut self.incoming
    }

    /// Remove every pile whose chain contains `who`. Returns the removed piles in order.
    pub(crate) fn remove_through(&mut self, who: &str) -> Vec<Pile> {
        let (removed, kept): (VecDeque<Pile>, VecDeque<Pile>) =
            self.incoming.drain(..).partition(|p| p.passes_through(who));
        self.incoming = kept;
        removed.into()
    }

    /// Take `amount` worth of value from the head of the FIFO.
    ///
    /// Whole piles are consumed while they fit; the next pile is split to
    /// cover the remainder. Returns the drawn piles and whatever part of
    /// `amount` the piles could not cover.
    pub(crate) fn draw_from_head(&mut self, amount: f64, epsilon: f64) -> (Vec<Pile>, f64) {
        let mut remaining = amount;
        let mut drawn = Vec::new();

        while let Some(front) = self.incoming.front() {
            if remaining + epsilon < front.amount {
                break;
            }
            remaining -= front.amount;
            if let Some(p) = self.incoming.pop_front() {
                drawn.push(p);
            }
        }

        if remaining > epsilon {
            if let Some(front) = self.incoming.front_mut() {
                front.amount -= remaining;
                drawn.push(Pile::new(front.chain.clone(), remaining));
                remaining = 0.0;
            }
        }

        (drawn, remaining.max(0.0))
    }
}
