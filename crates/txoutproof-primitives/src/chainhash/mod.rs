//! Chain hash type for block, transaction and Merkle node identification.
//!
//! A `Hash` is 32 bytes kept in internal (wire) order. Bitcoin tooling shows
//! these bytes reversed, so `Display`, `FromStr` and the serde impls all work
//! in that reversed "display order".

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::hash::{sha256d, sha256d_pair};
use crate::PrimitivesError;

/// Size of a Hash in bytes.
pub const HASH_SIZE: usize = 32;

/// Length of a Hash in display hex (64 characters).
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;

/// A 32-byte hash stored in internal byte order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    /// Wrap 32 bytes already in internal order.
    pub const fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    /// Create a Hash from a slice of exactly 32 internal-order bytes.
    ///
    /// # Arguments
    /// * `bytes` - The raw bytes as they appear on the wire.
    ///
    /// # Returns
    /// `Ok(Hash)` if the slice is 32 bytes long, an `InvalidHash` error otherwise.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let arr: [u8; HASH_SIZE] = bytes.try_into().map_err(|_| {
            PrimitivesError::InvalidHash(format!(
                "invalid hash length of {}, want {}",
                bytes.len(),
                HASH_SIZE
            ))
        })?;
        Ok(Hash(arr))
    }

    /// Parse a 64-character display-order hex string.
    ///
    /// The string is decoded and then reversed into internal order, so
    /// `Hash::from_hex(&h.to_string()) == Ok(h)` for every hash.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        if hex_str.len() != HASH_HEX_SIZE {
            return Err(PrimitivesError::InvalidHash(format!(
                "hash hex must be {} characters, got {}",
                HASH_HEX_SIZE,
                hex_str.len()
            )));
        }
        let mut bytes = [0u8; HASH_SIZE];
        hex::decode_to_slice(hex_str, &mut bytes)?;
        bytes.reverse();
        Ok(Hash(bytes))
    }

    /// Access the internal-order bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// The bytes in display order (reversed from internal order).
    pub fn to_display_bytes(&self) -> [u8; HASH_SIZE] {
        let mut reversed = self.0;
        reversed.reverse();
        reversed
    }

    /// The first `len` characters of the display hex.
    ///
    /// Used for compact node labels. `len` is clamped to the full
    /// 64-character length.
    pub fn short_hex(&self, len: usize) -> String {
        let mut full = self.to_string();
        full.truncate(len.min(HASH_HEX_SIZE));
        full
    }

    /// True when every byte is zero, as in the genesis block's previous hash.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl From<[u8; HASH_SIZE]> for Hash {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Display-order hex, e.g. block 100000 prints as `000000000003ba27...33e506`.
impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_display_bytes()))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self)
    }
}

impl FromStr for Hash {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hash::from_hex(s)
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Double SHA-256 of `data` as a Hash (block hash, txid).
pub fn double_hash_h(data: &[u8]) -> Hash {
    Hash(sha256d(data))
}

/// Double SHA-256 of `left || right`, the Merkle parent of two nodes.
pub fn double_hash_pair(left: &Hash, right: &Hash) -> Hash {
    Hash(sha256d_pair(&left.0, &right.0))
}
