//! Hash function primitives.
//!
//! Bitcoin commits to block headers, transactions and Merkle tree nodes
//! with double SHA-256. Both the single and the double variant live here.

use sha2::{Digest, Sha256};

/// Size in bytes of a SHA-256 digest.
pub const SHA256_SIZE: usize = 32;

/// Compute SHA-256 hash of the input data.
///
/// # Arguments
/// * `data` - Byte slice to hash.
///
/// # Returns
/// A 32-byte SHA-256 digest.
pub fn sha256(data: &[u8]) -> [u8; SHA256_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute double SHA-256 (SHA-256d): SHA-256(SHA-256(data)).
///
/// Used for block hashes, transaction IDs and every internal node of a
/// block's Merkle tree.
///
/// # Arguments
/// * `data` - Byte slice to hash.
///
/// # Returns
/// A 32-byte double-SHA-256 digest.
pub fn sha256d(data: &[u8]) -> [u8; SHA256_SIZE] {
    sha256(&sha256(data))
}

/// Double SHA-256 of two 32-byte values laid out back to back.
///
/// Avoids the intermediate allocation a `[left, right].concat()` would need
/// when folding Merkle tree nodes.
pub fn sha256d_pair(left: &[u8; SHA256_SIZE], right: &[u8; SHA256_SIZE]) -> [u8; SHA256_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    let first: [u8; SHA256_SIZE] = hasher.finalize().into();
    sha256(&first)
}
