// src/error.rs

use thiserror::Error;

use crate::types::{Amount, TxId};

/// Why a transaction was not admitted into a block.
///
/// Rejections never leave partial state behind; the `Display` text is the
/// message handed to a [`crate::stf::RejectionLog`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("Duplicate transaction {0}.")]
    DuplicateTransaction(TxId),

    #[error("Unsigned transaction {0}.")]
    Unsigned(TxId),

    #[error("Invalid signature for transaction {0}.")]
    InvalidSignature(TxId),

    #[error(
        "Insufficient gold for transaction {id}: required {required:?}, available {available}."
    )]
    InsufficientFunds {
        id: TxId,
        /// `None` when the outputs overflow.
        required: Option<Amount>,
        available: Amount,
    },

    #[error("Replayed transaction {id}: expected nonce {expected}, got {got}.")]
    ReplayedNonce { id: TxId, expected: u64, got: u64 },

    #[error("Out of order transaction {id}: expected nonce {expected}, got {got}.")]
    OutOfOrderNonce { id: TxId, expected: u64, got: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_transaction() {
        let r = Rejection::ReplayedNonce { id: "abc".into(), expected: 2, got: 1 };
        assert_eq!(r.to_string(), "Replayed transaction abc: expected nonce 2, got 1.");
        assert_eq!(Rejection::Unsigned("x".into()).to_string(), "Unsigned transaction x.");
    }
}
