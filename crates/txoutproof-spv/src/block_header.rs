//! The fixed 80-byte Bitcoin block header.
//!
//! See <https://developer.bitcoin.org/reference/block_chain.html#block-headers>.

use serde::{Deserialize, Serialize};
use txoutproof_primitives::chainhash::{double_hash_h, Hash};
use txoutproof_primitives::util::{ByteReader, ByteWriter};

use crate::error::{truncated, SpvError};

/// Serialized size of a block header.
pub const BLOCK_HEADER_SIZE: usize = 80;

/// A decoded block header.
///
/// Hash fields keep the wire byte order; their `Display` shows the usual
/// reversed form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub version: i32,
    pub prev_block_hash: Hash,
    pub merkle_root: Hash,
    /// Unix seconds.
    pub timestamp: u32,
    /// Compact difficulty target.
    pub bits: u32,
    pub nonce: u32,
}

impl BlockHeader {
    /// Decode a header from the first 80 bytes of `data`.
    ///
    /// Extra bytes after the header are ignored; the caller decides what
    /// follows.
    pub fn from_bytes(data: &[u8]) -> Result<Self, SpvError> {
        if data.len() < BLOCK_HEADER_SIZE {
            return Err(SpvError::TruncatedInput {
                field: "block header".to_string(),
                needed: BLOCK_HEADER_SIZE,
                available: data.len(),
            });
        }
        let mut reader = ByteReader::new(&data[..BLOCK_HEADER_SIZE]);
        Self::from_reader(&mut reader)
    }

    /// Decode a header from the reader's current position.
    pub fn from_reader(reader: &mut ByteReader) -> Result<Self, SpvError> {
        Ok(BlockHeader {
            version: reader.read_i32_le().map_err(truncated("version"))?,
            prev_block_hash: reader.read_hash().map_err(truncated("previous block hash"))?,
            merkle_root: reader.read_hash().map_err(truncated("merkle root"))?,
            timestamp: reader.read_u32_le().map_err(truncated("timestamp"))?,
            bits: reader.read_u32_le().map_err(truncated("bits"))?,
            nonce: reader.read_u32_le().map_err(truncated("nonce"))?,
        })
    }

    /// Write the header in wire format.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_i32_le(self.version);
        writer.write_hash(&self.prev_block_hash);
        writer.write_hash(&self.merkle_root);
        writer.write_u32_le(self.timestamp);
        writer.write_u32_le(self.bits);
        writer.write_u32_le(self.nonce);
    }

    /// Encode to exactly 80 bytes.
    pub fn to_bytes(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let mut writer = ByteWriter::with_capacity(BLOCK_HEADER_SIZE);
        self.write_to(&mut writer);
        let mut out = [0u8; BLOCK_HEADER_SIZE];
        out.copy_from_slice(&writer.into_bytes());
        out
    }

    /// The block hash: double SHA-256 of the serialized header.
    pub fn hash(&self) -> Hash {
        double_hash_h(&self.to_bytes())
    }
}
