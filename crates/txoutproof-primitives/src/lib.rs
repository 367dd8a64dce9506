//! txoutproof primitives: hashing, chain hashes and wire integers.
//!
//! This crate holds the pieces every other txoutproof crate builds on:
//! - SHA-256 and double SHA-256
//! - the 32-byte chain `Hash` with Bitcoin's reversed display order
//! - CompactSize (`VarInt`) encoding
//! - `ByteReader` / `ByteWriter` cursors for little-endian wire data

pub mod hash;
pub mod chainhash;
pub mod util;

mod error;
pub use error::PrimitivesError;
