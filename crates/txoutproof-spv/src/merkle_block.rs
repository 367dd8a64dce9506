//! `merkleblock` proofs: a block header followed by a partial Merkle tree.
//!
//! This is the byte format returned by `gettxoutproof`:
//!
//! ```text
//! header          80 bytes
//! total_txs       u32 LE
//! hash_count      CompactSize
//! hashes          32 bytes * hash_count
//! flag_byte_count CompactSize
//! flags           flag_byte_count bytes, bits read LSB first
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;
use txoutproof_primitives::chainhash::{Hash, HASH_SIZE};
use txoutproof_primitives::util::{ByteReader, ByteWriter, VarInt};

use crate::block_header::{BlockHeader, BLOCK_HEADER_SIZE};
use crate::error::{truncated, SpvError};
use crate::merkle_tree::{merkle_tree_parent, tree_height, tree_width};
use crate::partial_merkle_tree::{PartialMerkleTree, TraversalPolicy};

/// Unpack flag bytes into bits, least significant bit of each byte first.
pub fn unpack_flags(bytes: &[u8]) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|b| (0..8).map(move |i| (b >> i) & 1 == 1))
        .collect()
}

/// Pack bits into bytes, LSB first, zero-padding the final byte.
pub fn pack_flags(bits: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (i, bit) in bits.iter().enumerate() {
        if *bit {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    bytes
}

/// The part of a proof after the header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleProofBody {
    pub total_transactions: u32,
    /// Depth-first leaf hashes, internal byte order.
    pub hashes: Vec<Hash>,
    /// Raw flag bytes as they appeared on the wire.
    #[serde(with = "hex_bytes")]
    pub flag_bytes: Vec<u8>,
}

impl MerkleProofBody {
    /// Decode a body from the reader's current position.
    ///
    /// A hash count larger than the remaining input is reported as a
    /// truncated hash rather than allocated up front.
    pub fn from_reader(reader: &mut ByteReader) -> Result<Self, SpvError> {
        let total_transactions = reader
            .read_u32_le()
            .map_err(truncated("total transaction count"))?;

        let hash_count = reader.read_varint().map_err(truncated("hash count"))?.value();
        let capacity = (reader.remaining() / HASH_SIZE).min(hash_count as usize);
        let mut hashes = Vec::with_capacity(capacity);
        for i in 0..hash_count {
            let hash = reader
                .read_hash()
                .map_err(truncated(format!("hash #{}", i + 1)))?;
            hashes.push(hash);
        }

        let flag_byte_count = reader
            .read_varint()
            .map_err(truncated("flag byte count"))?
            .value();
        let flag_len = usize::try_from(flag_byte_count).unwrap_or(usize::MAX);
        let flag_bytes = reader
            .read_bytes(flag_len)
            .map_err(truncated("flag bytes"))?
            .to_vec();

        Ok(MerkleProofBody {
            total_transactions,
            hashes,
            flag_bytes,
        })
    }

    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_u32_le(self.total_transactions);
        writer.write_varint(VarInt::from(self.hashes.len()));
        for hash in &self.hashes {
            writer.write_hash(hash);
        }
        writer.write_varint(VarInt::from(self.flag_bytes.len()));
        writer.write_bytes(&self.flag_bytes);
    }

    /// The flag bits, `8 * flag_bytes.len()` of them.
    pub fn flags(&self) -> Vec<bool> {
        unpack_flags(&self.flag_bytes)
    }

    /// Rebuild the partial Merkle tree this body describes.
    pub fn reconstruct(&self, policy: TraversalPolicy) -> Result<PartialMerkleTree, SpvError> {
        PartialMerkleTree::reconstruct(self.total_transactions, &self.hashes, &self.flags(), policy)
    }

    /// Build the proof body for a block's full transaction list.
    ///
    /// Produces the canonical BIP 37 encoding: branches without a match are
    /// pruned to one hash, and a node with no right child in its level
    /// hashes its left child twice. The result reconstructs with
    /// `TraversalPolicy::LevelWidth`, and with `FullHeight` too whenever the
    /// transaction count is a power of two.
    ///
    /// # Arguments
    /// * `txids` - Every transaction of the block, in block order.
    /// * `matches` - Same length as `txids`; `true` marks a transaction to prove.
    pub fn from_txids(txids: &[Hash], matches: &[bool]) -> Result<Self, SpvError> {
        if txids.is_empty() {
            return Err(SpvError::MalformedArgument(
                "cannot build a proof for an empty transaction list".to_string(),
            ));
        }
        if txids.len() != matches.len() {
            return Err(SpvError::MalformedArgument(format!(
                "{} txids but {} match flags",
                txids.len(),
                matches.len()
            )));
        }
        let total_transactions = u32::try_from(txids.len()).map_err(|_| {
            SpvError::MalformedArgument(format!("{} transactions do not fit in u32", txids.len()))
        })?;

        let mut builder = ProofBuilder {
            txids,
            matches,
            total_transactions,
            bits: Vec::new(),
            hashes: Vec::new(),
        };
        builder.traverse(tree_height(total_transactions), 0);
        debug!(
            total_transactions,
            hashes = builder.hashes.len(),
            flag_bits = builder.bits.len(),
            "built partial merkle tree proof"
        );
        Ok(MerkleProofBody {
            total_transactions,
            hashes: builder.hashes,
            flag_bytes: pack_flags(&builder.bits),
        })
    }
}

/// Depth-first encoder for `MerkleProofBody::from_txids`. Levels count up
/// from the leaves.
struct ProofBuilder<'a> {
    txids: &'a [Hash],
    matches: &'a [bool],
    total_transactions: u32,
    bits: Vec<bool>,
    hashes: Vec<Hash>,
}

impl ProofBuilder<'_> {
    fn traverse(&mut self, level: u32, position: u64) {
        let start = (position << level) as usize;
        let end = ((position + 1) << level).min(self.txids.len() as u64) as usize;
        let has_match = self.matches[start..end].iter().any(|m| *m);
        self.bits.push(has_match);

        if level == 0 || !has_match {
            let hash = self.subtree_hash(level, position);
            self.hashes.push(hash);
            return;
        }
        self.traverse(level - 1, position * 2);
        if position * 2 + 1 < tree_width(self.total_transactions, level - 1) {
            self.traverse(level - 1, position * 2 + 1);
        }
    }

    fn subtree_hash(&self, level: u32, position: u64) -> Hash {
        if level == 0 {
            return self.txids[position as usize];
        }
        let left = self.subtree_hash(level - 1, position * 2);
        let right = if position * 2 + 1 < tree_width(self.total_transactions, level - 1) {
            self.subtree_hash(level - 1, position * 2 + 1)
        } else {
            left
        };
        merkle_tree_parent(&left, &right)
    }
}

/// A decoded `merkleblock` proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleBlock {
    pub header: BlockHeader,
    pub body: MerkleProofBody,
}

impl MerkleBlock {
    /// Decode a proof from its hex encoding. Whitespace is not stripped and
    /// is rejected like any other non-hex character.
    pub fn from_hex(hex_data: &str) -> Result<Self, SpvError> {
        let bytes = hex::decode(hex_data)?;
        Self::from_bytes(&bytes)
    }

    /// Decode a proof from raw bytes.
    ///
    /// Fails with `TruncatedInput` below 80 bytes, `EmptyProofBody` when
    /// nothing follows the header, and `TrailingBytes` when something
    /// follows the flags.
    pub fn from_bytes(data: &[u8]) -> Result<Self, SpvError> {
        let header = BlockHeader::from_bytes(data)?;
        if data.len() == BLOCK_HEADER_SIZE {
            return Err(SpvError::EmptyProofBody);
        }
        let mut reader = ByteReader::new(&data[BLOCK_HEADER_SIZE..]);
        let body = MerkleProofBody::from_reader(&mut reader)?;
        if reader.remaining() > 0 {
            return Err(SpvError::TrailingBytes { count: reader.remaining() });
        }
        debug!(
            block = %header.hash(),
            total_transactions = body.total_transactions,
            hashes = body.hashes.len(),
            flag_bytes = body.flag_bytes.len(),
            "decoded merkle block"
        );
        Ok(MerkleBlock { header, body })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(
            BLOCK_HEADER_SIZE + 4 + 9 + self.body.hashes.len() * HASH_SIZE + 9 + self.body.flag_bytes.len(),
        );
        self.header.write_to(&mut writer);
        self.body.write_to(&mut writer);
        writer.into_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Rebuild the partial Merkle tree. Does not compare against the header.
    pub fn reconstruct(&self, policy: TraversalPolicy) -> Result<PartialMerkleTree, SpvError> {
        self.body.reconstruct(policy)
    }

    /// Whether a reconstructed tree's root matches the header's Merkle root.
    pub fn verify(&self, tree: &PartialMerkleTree) -> bool {
        tree.verify_root(&self.header.merkle_root)
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
