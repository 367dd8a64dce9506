//! Merkle tree arithmetic shared by the proof builder and the reconstructor.
//!
//! Levels are numbered by their distance from the leaves: level 0 holds the
//! transaction IDs, level `tree_height(n)` holds the single root.

use txoutproof_primitives::chainhash::{double_hash_pair, Hash};

use crate::error::SpvError;

/// Compute the Merkle tree parent of two `Hash` values.
///
/// The hashes are in internal byte order and are concatenated without
/// reversal before double SHA-256.
pub fn merkle_tree_parent(left: &Hash, right: &Hash) -> Hash {
    double_hash_pair(left, right)
}

/// Smallest `h` with `2^h >= total_transactions`.
///
/// Zero and one transaction both give height 0.
pub fn tree_height(total_transactions: u32) -> u32 {
    if total_transactions <= 1 {
        0
    } else {
        u32::BITS - (total_transactions - 1).leading_zeros()
    }
}

/// Number of nodes at `level` (0 = leaves) of a tree over
/// `total_transactions` leaves.
pub fn tree_width(total_transactions: u32, level: u32) -> u64 {
    let total = total_transactions as u64;
    if level >= 64 {
        return u64::from(total > 0);
    }
    (total + (1u64 << level) - 1) >> level
}

/// Merkle root of a complete transaction list.
///
/// Levels with an odd number of nodes pair the last node with itself. A
/// single transaction is its own root.
pub fn merkle_root(txids: &[Hash]) -> Result<Hash, SpvError> {
    if txids.is_empty() {
        return Err(SpvError::MalformedArgument(
            "cannot compute the merkle root of an empty transaction list".to_string(),
        ));
    }
    let mut level = txids.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => merkle_tree_parent(left, right),
                [single] => merkle_tree_parent(single, single),
                _ => unreachable!("chunks(2) yields one or two items"),
            })
            .collect();
    }
    Ok(level[0])
}
