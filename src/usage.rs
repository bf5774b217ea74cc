// src/usage.rs

use tracing::debug;

use crate::account::AccountTable;
use crate::config::PouParams;
use crate::provenance::Pile;

/// Reward for sending `coins` to a receiver already paid `prior_transfers` times.
pub fn decayed_reward(coins: f64, prior_transfers: u32, params: &PouParams) -> f64 {
    coins * params.decay_factor.powi(prior_transfers as i32)
}

/// Closed form of the index gained by `k` equal transfers of `coins` to one receiver.
pub fn cumulative_reward(coins: f64, k: u32, params: &PouParams) -> f64 {
    coins * (1.0 - params.decay_factor.powi(k as i32)) / (1.0 - params.decay_factor)
}

/// Non-cyclic transfer: reward the sender, advance the pair counter and
/// record a fresh pile `[sender]` on the receiver. Returns the reward.
pub fn update_index(
    accounts: &mut AccountTable,
    sender: &str,
    receiver: &str,
    coins: f64,
    params: &PouParams,
) -> f64 {
    let Some(s) = accounts.usage_mut(sender) else {
        return 0.0;
    };
    let n = s.outgoing_count(receiver);
    let reward = decayed_reward(coins, n, params);
    s.adjust_index(reward);
    s.bump_outgoing(receiver);

    if coins > params.epsilon {
        if let Some(r) = accounts.usage_mut(receiver) {
            r.push_pile(Pile::new(vec![sender.to_string()], coins));
        }
    }

    debug!(sender, receiver, coins, prior = n, reward, "usage index updated");
    reward
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{Account, PouAccount, UsageTracked};
    use crate::config::POU_PARAMS;
    use ed25519_dalek::SigningKey;

    fn table() -> (AccountTable, String, String) {
        let a = Account::client("A", &SigningKey::from_bytes(&[1u8; 32]).verifying_key());
        let b = Account::client("B", &SigningKey::from_bytes(&[2u8; 32]).verifying_key());
        let (aa, ba) = (a.address.clone(), b.address.clone());
        let mut t = AccountTable::new();
        t.register(PouAccount::new(a));
        t.register(PouAccount::new(b));
        (t, aa, ba)
    }

    #[test]
    fn first_transfer_earns_full_amount() {
        assert_eq!(decayed_reward(50.0, 0, &POU_PARAMS), 50.0);
        assert!((decayed_reward(50.0, 2, &POU_PARAMS) - 32.0).abs() < 1e-9);
    }

    #[test]
    fn repeated_transfers_decay_geometrically() {
        let (mut t, a, b) = table();
        let mut rewards = Vec::new();
        for _ in 0..4 {
            rewards.push(update_index(&mut t, &a, &b, 10.0, &POU_PARAMS));
        }
        let expected = [10.0, 8.0, 6.4, 5.12];
        for (got, want) in rewards.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "{got} != {want}");
        }

        let sender = t.resolve(&a).unwrap();
        assert!((sender.usage_index() - cumulative_reward(10.0, 4, &POU_PARAMS)).abs() < 1e-9);
        assert_eq!(sender.outgoing_counts().get(&b), Some(&4));
    }

    #[test]
    fn receiver_gets_a_pile_per_transfer() {
        let (mut t, a, b) = table();
        update_index(&mut t, &a, &b, 7.0, &POU_PARAMS);
        let piles = t.resolve(&b).unwrap().incoming_piles();
        assert_eq!(piles.len(), 1);
        assert_eq!(piles[0].chain, vec![a.clone()]);
        assert_eq!(piles[0].amount, 7.0);
    }

    #[test]
    fn zero_amount_advances_counter_without_pile() {
        let (mut t, a, b) = table();
        assert_eq!(update_index(&mut t, &a, &b, 0.0, &POU_PARAMS), 0.0);
        assert_eq!(t.resolve(&a).unwrap().usage().outgoing_count(&b), 1);
        assert!(t.resolve(&b).unwrap().incoming_piles().is_empty());
    }
}
