// src/codec.rs

use crate::types::{Output, Transaction};

pub const CODEC_VERSION: u8 = 1;
pub const DOM_TX: &[u8] = b"POU_TX";

// --- helpers: write primitives deterministically ---

// append a u64 to a Vec<u8> in little-endian.
pub fn put_u64(dst: &mut Vec<u8>, x: u64) {
    dst.extend_from_slice(&x.to_le_bytes());
}

pub fn put_u32(v: &mut Vec<u8>, x: u32) {
    v.extend_from_slice(&x.to_le_bytes());
}

// append a string as length (u32 LE) + UTF-8 bytes.
fn put_str(dst: &mut Vec<u8>, s: &str) {
    put_u32(dst, s.len() as u32);
    dst.extend_from_slice(s.as_bytes());
}

fn put_outputs(dst: &mut Vec<u8>, outputs: &[Output]) {
    put_u32(dst, outputs.len() as u32);
    for o in outputs {
        put_u64(dst, o.amount);
        put_str(dst, &o.address);
    }
}

/// Canonical transaction bytes: everything except `id` and `sig`.
pub fn tx_bytes(tx: &Transaction) -> Vec<u8> {
    let mut v = vec![CODEC_VERSION];
    v.extend_from_slice(DOM_TX);
    put_str(&mut v, &tx.from);
    put_u64(&mut v, tx.nonce);
    v.extend_from_slice(&tx.pubkey);
    put_outputs(&mut v, &tx.outputs);
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(outputs: Vec<Output>) -> Transaction {
        Transaction::new("0xaa", 3, [9u8; 32], outputs)
    }

    #[test]
    fn output_order_changes_bytes() {
        let a = tx(vec![Output::new(1, "0x01"), Output::new(2, "0x02")]);
        let b = tx(vec![Output::new(2, "0x02"), Output::new(1, "0x01")]);
        assert_ne!(tx_bytes(&a), tx_bytes(&b));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn signature_is_not_part_of_preimage() {
        let mut a = tx(vec![Output::new(1, "0x01")]);
        let before = tx_bytes(&a);
        a.sig = Some([1u8; 64]);
        assert_eq!(before, tx_bytes(&a));
    }

    #[test]
    fn string_lengths_are_prefixed() {
        let a = Transaction::new("0xab", 0, [0u8; 32], vec![]);
        let b = Transaction::new("0xa", 0, [0u8; 32], vec![]);
        let bytes = tx_bytes(&a);
        assert_eq!(bytes[0], CODEC_VERSION);
        assert_eq!(&bytes[1..1 + DOM_TX.len()], DOM_TX);
        assert_ne!(tx_bytes(&a).len(), tx_bytes(&b).len());
    }
}
