#![deny(missing_docs)]

//! txoutproof - BIP-37 partial Merkle tree proofs.
//!
//! Re-exports the txoutproof crates for single-dependency use.

pub use txoutproof_primitives as primitives;
pub use txoutproof_spv as spv;
