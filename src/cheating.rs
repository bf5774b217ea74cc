// src/cheating.rs

//! Detection and handling of laundering cycles.
//!
//! A transfer is cyclic when the receiver already appears in the provenance
//! of the sender's piles: the value is being routed back to a prior holder
//! instead of circulating. Cyclic value earns no reward and the receiver is
//! punished in proportion to how much of the returned value passed through it.

use tracing::info;

use crate::account::AccountTable;
use crate::config::PouParams;
use crate::provenance::{Pile, UsageState};
use crate::types::Address;
use crate::usage::decayed_reward;

/// Suffix of a sender pile's chain starting at the receiver, with the full pile amount.
#[derive(Debug, Clone, PartialEq)]
pub struct CheatingChain {
    /// Index of the implicated pile in the sender's incoming FIFO at detection time.
    pub pile_index: usize,
    pub chain: Vec<Address>,
    pub coins: f64,
}

/// A cheating chain and its fraction of all cheating coins for one (sender, receiver) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CheatingShare {
    pub chain: CheatingChain,
    pub percent: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleCase {
    /// Sending exactly the cyclic total.
    Exact,
    /// Sending more than the cyclic total; the excess is genuine circulation.
    Oversend,
    /// Sending part of the cyclic total.
    Partial,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheatingOutcome {
    pub case: CycleCase,
    pub total_cheating: f64,
    pub reward: f64,
    pub penalty: f64,
    /// Piles appended to the receiver.
    pub forwarded: Vec<Pile>,
}

/// Collect every sub-chain of the sender's piles that starts at `receiver`.
pub fn find_cycles(sender: &UsageState, receiver: &str) -> Vec<CheatingChain> {
    sender
        .incoming_piles()
        .iter()
        .enumerate()
        .filter_map(|(pile_index, pile)| {
            pile.position_of(receiver).map(|i| CheatingChain {
                pile_index,
                chain: pile.chain[i..].to_vec(),
                coins: pile.amount,
            })
        })
        .collect()
}

pub fn total_coins(chains: &[CheatingChain]) -> f64 {
    chains.iter().map(|c| c.coins).sum()
}

/// Fraction of the cheating total carried by each chain.
///
/// Callers must not pass an empty set. A set whose coins sum to zero is
/// split evenly.
pub fn percentage_map(chains: Vec<CheatingChain>) -> Vec<CheatingShare> {
    debug_assert!(!chains.is_empty(), "percentage map over no cheating chains");
    let total = total_coins(&chains);
    let n = chains.len() as f64;
    let shares: Vec<CheatingShare> = chains
        .into_iter()
        .map(|chain| {
            let percent = if total > 0.0 { chain.coins / total } else { 1.0 / n };
            CheatingShare { chain, percent }
        })
        .collect();
    debug_assert!(
        (shares.iter().map(|s| s.percent).sum::<f64>() - 1.0).abs() < 1e-6,
        "cheating percentages must sum to 1"
    );
    shares
}

/// Every account of `subset` also appears in `chain`.
fn is_member_subset(subset: &[Address], chain: &[Address]) -> bool {
    subset.iter().all(|a| chain.contains(a))
}

/// Apply a cyclic transfer of `sending` from `sender` to `receiver`.
///
/// `chains` must be the non-empty result of [`find_cycles`] on the sender's
/// current piles.
pub fn handle_cheating(
    accounts: &mut AccountTable,
    sender: &str,
    receiver: &str,
    sending: f64,
    chains: Vec<CheatingChain>,
    params: &PouParams,
) -> CheatingOutcome {
    let total_cheating = total_coins(&chains);
    let shares = percentage_map(chains);

    let case = if (sending - total_cheating).abs() <= params.epsilon {
        CycleCase::Exact
    } else if sending > total_cheating {
        CycleCase::Oversend
    } else {
        CycleCase::Partial
    };

    let mut reward = 0.0;
    let mut forwarded = Vec::new();

    if let Some(s) = accounts.usage_mut(sender) {
        match case {
            CycleCase::Exact => {
                s.remove_through(receiver);
            }
            CycleCase::Oversend => {
                s.remove_through(receiver);
                let change = sending - total_cheating;
                let (mut drawn, uncovered) = s.draw_from_head(change, params.epsilon);
                // Funds with no recorded provenance start a chain at the sender.
                if uncovered > params.epsilon {
                    drawn.push(Pile::new(Vec::new(), uncovered));
                }
                reward = decayed_reward(change, s.outgoing_count(receiver), params);
                s.adjust_index(reward);
                forwarded = drawn
                    .iter()
                    .map(|p| p.forwarded_by(sender, p.amount))
                    .collect();
            }
            CycleCase::Partial => {
                let piles = s.piles_mut();
                for share in &shares {
                    let Some(pile) = piles.get_mut(share.chain.pile_index) else {
                        continue;
                    };
                    if !is_member_subset(&share.chain.chain, &pile.chain) {
                        continue;
                    }
                    let portion = sending * share.percent;
                    pile.amount -= portion;
                    debug_assert!(
                        pile.amount >= -params.epsilon,
                        "pile split below zero: {}",
                        pile.amount
                    );
                    pile.amount = pile.amount.max(0.0);
                    forwarded.push(pile.forwarded_by(sender, portion));
                }
            }
        }
    }

    if let Some(r) = accounts.usage_mut(receiver) {
        for pile in &forwarded {
            if pile.amount > params.epsilon {
                r.push_pile(pile.clone());
            }
        }
    }

    let penalty = punish(accounts, receiver, &shares, sending);

    if let Some(s) = accounts.usage_mut(sender) {
        s.bump_outgoing(receiver);
    }

    info!(
        sender,
        receiver,
        sending,
        total_cheating,
        case = ?case,
        reward,
        penalty,
        "cyclic transfer detected"
    );

    CheatingOutcome { case, total_cheating, reward, penalty, forwarded }
}

/// Deduct `sending * percent` from the receiver's index for every
/// occurrence of the receiver in each cheating chain.
fn punish(
    accounts: &mut AccountTable,
    receiver: &str,
    shares: &[CheatingShare],
    sending: f64,
) -> f64 {
    let penalty: f64 = shares
        .iter()
        .map(|share| {
            let hits = share.chain.chain.iter().filter(|a| a.as_str() == receiver).count();
            sending * share.percent * hits as f64
        })
        .sum();

    if let Some(r) = accounts.usage_mut(receiver) {
        r.adjust_index(-penalty);
    }
    penalty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{Account, PouAccount, UsageTracked};
    use crate::config::POU_PARAMS;
    use ed25519_dalek::SigningKey;

    fn account(name: &str, seed: u8) -> Account {
        Account::client(name, &SigningKey::from_bytes(&[seed; 32]).verifying_key())
    }

    fn chain(addrs: &[&str]) -> Vec<Address> {
        addrs.iter().map(|s| s.to_string()).collect()
    }

    /// Sender with the given piles, plus a registered receiver.
    fn setup(piles: Vec<(Vec<&str>, f64)>) -> (AccountTable, String, String) {
        let s = account("S", 1);
        let r = account("R", 2);
        let (sa, ra) = (s.address.clone(), r.address.clone());
        let piles: Vec<Pile> = piles
            .into_iter()
            .map(|(c, amt)| {
                let c = c
                    .into_iter()
                    .map(|x| if x == "R" { ra.clone() } else { x.to_string() })
                    .collect();
                Pile::new(c, amt)
            })
            .collect();
        let mut t = AccountTable::new();
        t.register(PouAccount::with_usage(s, UsageState::with_piles(piles)));
        t.register(PouAccount::new(r));
        (t, sa, ra)
    }

    #[test]
    fn finds_suffix_from_first_receiver_position() {
        let usage = UsageState::with_piles([
            Pile::new(chain(&["X", "R", "Y", "R"]), 40.0),
            Pile::new(chain(&["Z"]), 5.0),
        ]);
        let found = find_cycles(&usage, "R");
        assert_eq!(
            found,
            vec![CheatingChain { pile_index: 0, chain: chain(&["R", "Y", "R"]), coins: 40.0 }]
        );
        assert!(find_cycles(&usage, "Q").is_empty());
    }

    #[test]
    fn percentages_follow_coins() {
        let shares = percentage_map(vec![
            CheatingChain { pile_index: 0, chain: chain(&["C", "D"]), coins: 40.0 },
            CheatingChain { pile_index: 1, chain: chain(&["C", "B"]), coins: 60.0 },
        ]);
        assert!((shares[0].percent - 0.4).abs() < 1e-12);
        assert!((shares[1].percent - 0.6).abs() < 1e-12);
    }

    #[test]
    fn exact_cycle_removes_pile_and_punishes_receiver() {
        let (mut t, s, r) = setup(vec![(vec!["X", "R", "Y"], 40.0)]);
        let chains = find_cycles(t.resolve(&s).unwrap().usage(), &r);
        let out = handle_cheating(&mut t, &s, &r, 40.0, chains, &POU_PARAMS);

        assert_eq!(out.case, CycleCase::Exact);
        assert_eq!(out.reward, 0.0);
        assert_eq!(out.penalty, 40.0);
        assert!(t.resolve(&s).unwrap().incoming_piles().is_empty());
        assert_eq!(t.resolve(&s).unwrap().usage_index(), 0.0);
        assert_eq!(t.resolve(&r).unwrap().usage_index(), -40.0);
        assert_eq!(t.resolve(&s).unwrap().usage().outgoing_count(&r), 1);
    }

    #[test]
    fn partial_cycle_splits_only_implicated_pile() {
        let (mut t, s, r) = setup(vec![(vec!["R"], 30.0), (vec!["Z"], 20.0)]);
        let chains = find_cycles(t.resolve(&s).unwrap().usage(), &r);
        assert_eq!(chains.len(), 1);
        let out = handle_cheating(&mut t, &s, &r, 10.0, chains, &POU_PARAMS);

        assert_eq!(out.case, CycleCase::Partial);
        assert_eq!(out.reward, 0.0);
        let sender = t.resolve(&s).unwrap();
        let piles = sender.incoming_piles();
        assert_eq!(piles.len(), 2);
        assert!((piles[0].amount - 20.0).abs() < 1e-9);
        assert_eq!(piles[0].chain, vec![r.clone()]);
        assert_eq!(piles[1].amount, 20.0);
        assert_eq!(sender.usage_index(), 0.0);

        let receiver = t.resolve(&r).unwrap();
        assert_eq!(receiver.incoming_piles().len(), 1);
        assert_eq!(receiver.incoming_piles()[0].chain, vec![s.clone(), r.clone()]);
        assert!((receiver.incoming_piles()[0].amount - 10.0).abs() < 1e-9);
        assert!((receiver.usage_index() + 10.0).abs() < 1e-9);
    }

    #[test]
    fn partial_cycle_apportions_across_chains() {
        let (mut t, s, r) = setup(vec![(vec!["R", "D"], 40.0), (vec!["B", "R"], 60.0)]);
        let chains = find_cycles(t.resolve(&s).unwrap().usage(), &r);
        let out = handle_cheating(&mut t, &s, &r, 50.0, chains, &POU_PARAMS);

        assert_eq!(out.case, CycleCase::Partial);
        let piles = t.resolve(&s).unwrap().incoming_piles();
        assert!((piles[0].amount - 20.0).abs() < 1e-9);
        assert!((piles[1].amount - 30.0).abs() < 1e-9);
        let forwarded: f64 = out.forwarded.iter().map(|p| p.amount).sum();
        assert!((forwarded - 50.0).abs() < 1e-9);
        assert!((out.penalty - 50.0).abs() < 1e-9);
    }

    #[test]
    fn oversend_draws_change_from_clean_piles() {
        let (mut t, s, r) = setup(vec![(vec!["R"], 30.0), (vec!["Z"], 20.0)]);
        let chains = find_cycles(t.resolve(&s).unwrap().usage(), &r);
        let out = handle_cheating(&mut t, &s, &r, 50.0, chains, &POU_PARAMS);

        assert_eq!(out.case, CycleCase::Oversend);
        assert_eq!(out.reward, 20.0);
        let sender = t.resolve(&s).unwrap();
        assert!(sender.incoming_piles().is_empty());
        assert_eq!(sender.usage_index(), 20.0);
        assert_eq!(sender.usage().outgoing_count(&r), 1);

        let receiver = t.resolve(&r).unwrap();
        assert_eq!(receiver.incoming_piles().len(), 1);
        assert_eq!(receiver.incoming_piles()[0].chain, vec![s.clone(), "Z".to_string()]);
        assert_eq!(receiver.incoming_piles()[0].amount, 20.0);
        assert_eq!(receiver.usage_index(), -50.0);
    }

    #[test]
    fn oversend_beyond_recorded_piles_starts_fresh_chain() {
        let (mut t, s, r) = setup(vec![(vec!["R"], 10.0), (vec!["Z"], 5.0)]);
        let chains = find_cycles(t.resolve(&s).unwrap().usage(), &r);
        let out = handle_cheating(&mut t, &s, &r, 25.0, chains, &POU_PARAMS);

        assert_eq!(out.forwarded.len(), 2);
        assert_eq!(out.forwarded[0].chain, vec![s.clone(), "Z".to_string()]);
        assert_eq!(out.forwarded[1].chain, vec![s.clone()]);
        assert_eq!(out.forwarded[1].amount, 10.0);
        assert_eq!(out.reward, 15.0);
    }

    #[test]
    fn oversend_reward_uses_pair_history() {
        let (mut t, s, r) = setup(vec![(vec!["R"], 10.0), (vec!["Z"], 50.0)]);
        t.usage_mut(&s).unwrap().bump_outgoing(&r);
        let chains = find_cycles(t.resolve(&s).unwrap().usage(), &r);
        let out = handle_cheating(&mut t, &s, &r, 20.0, chains, &POU_PARAMS);

        assert!((out.reward - 8.0).abs() < 1e-9);
        let sender = t.resolve(&s).unwrap();
        assert_eq!(sender.usage().outgoing_count(&r), 2);
        assert!((sender.incoming_piles()[0].amount - 40.0).abs() < 1e-9);
    }
}
