//! `//`-prefixed diagnostic lines printed ahead of the DOT graph.
//!
//! DOT treats `//` lines as comments, so the whole stdout stream stays a
//! valid graph file.

use std::fmt::Write;

use chrono::{DateTime, SecondsFormat};
use txoutproof_spv::{BlockHeader, MerkleBlock, MerkleProofBody, PartialMerkleTree};

/// RFC 3339 UTC rendering of a header timestamp.
pub fn format_timestamp(timestamp: u32) -> String {
    DateTime::from_timestamp(i64::from(timestamp), 0)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "out of range".to_string())
}

/// Hex with a leading sign, so negative versions read as `-0x1` rather than
/// their two's complement.
pub fn signed_hex(value: i32) -> String {
    let sign = if value < 0 { "-" } else { "" };
    format!("{}0x{:x}", sign, value.unsigned_abs())
}

pub fn describe_header(out: &mut String, header: &BlockHeader) -> std::fmt::Result {
    writeln!(out, "//Decoded Block Header (first 80 bytes):")?;
    writeln!(out, "//  Version:         {} ({})", header.version, signed_hex(header.version))?;
    writeln!(out, "//  Prev Block Hash: {}", header.prev_block_hash)?;
    writeln!(out, "//  Merkle Root:     {}", header.merkle_root)?;
    writeln!(
        out,
        "//  Timestamp:       {} ({})",
        header.timestamp,
        format_timestamp(header.timestamp)
    )?;
    writeln!(out, "//  Bits (Target):   {} (0x{:x})", header.bits, header.bits)?;
    writeln!(out, "//  Nonce:           {} (0x{:x})", header.nonce, header.nonce)?;
    writeln!(out, "//  Block Hash:      {}", header.hash())
}

pub fn describe_body(out: &mut String, body: &MerkleProofBody) -> std::fmt::Result {
    writeln!(out, "//Decoded Merkle Proof Data (following header):")?;
    writeln!(out, "//  Total Transactions: {}", body.total_transactions)?;
    writeln!(out, "//  Hash Count: {}", body.hashes.len())?;
    writeln!(out, "//  Hashes:")?;
    for (i, hash) in body.hashes.iter().enumerate() {
        writeln!(out, "//    {}: {}", i + 1, hash)?;
    }
    writeln!(out, "//  Flag Byte Count: {}", body.flag_bytes.len())?;
    writeln!(out, "//  Flag Bytes: {}", hex::encode(&body.flag_bytes))
}

pub fn describe_tree(
    out: &mut String,
    block: &MerkleBlock,
    tree: &PartialMerkleTree,
) -> std::fmt::Result {
    writeln!(out, "//Reconstructed Partial Merkle Tree ({} traversal):", tree.policy())?;
    writeln!(out, "//  Transactions:    {}", tree.total_transactions())?;
    writeln!(out, "//  Height:          {}", tree.height())?;
    writeln!(
        out,
        "//  Nodes:           {} ({} leaves, {} matched)",
        tree.nodes().len(),
        tree.leaves().count(),
        tree.matched().count()
    )?;
    writeln!(
        out,
        "//  Consumed:        {} hashes, {} flag bits",
        tree.hashes_consumed(),
        tree.flags_consumed()
    )?;
    for (index, txid) in tree.matched_transactions() {
        writeln!(out, "//  Matched Tx #{}: {}", index, txid)?;
    }
    writeln!(out, "//Calculated Merkle Root: {}", tree.root())?;
    if block.verify(tree) {
        writeln!(out, "//Merkle Root Check: OK")
    } else {
        writeln!(
            out,
            "//Merkle Root Check: MISMATCH (header has {})",
            block.header.merkle_root
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txoutproof_spv::TraversalPolicy;

    const GENESIS_PROOF_HEX: &str = "0100000000000000000000000000000000000000000000000000000000000000000000003ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a29ab5f49ffff001d1dac2b7c01000000013ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a0101";

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(1231006505), "2009-01-03T18:15:05Z");
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_signed_hex() {
        assert_eq!(signed_hex(1), "0x1");
        assert_eq!(signed_hex(0x20000000), "0x20000000");
        assert_eq!(signed_hex(-1), "-0x1");
        assert_eq!(signed_hex(i32::MIN), "-0x80000000");
    }

    #[test]
    fn test_describe_negative_version() {
        let mut block = MerkleBlock::from_hex(GENESIS_PROOF_HEX).unwrap();
        block.header.version = -1;
        let mut out = String::new();
        describe_header(&mut out, &block.header).unwrap();
        assert!(out.contains("//  Version:         -1 (-0x1)"));
    }

    #[test]
    fn test_describe_genesis() {
        let block = MerkleBlock::from_hex(GENESIS_PROOF_HEX).unwrap();
        let tree = block.reconstruct(TraversalPolicy::FullHeight).unwrap();
        let mut out = String::new();
        describe_header(&mut out, &block.header).unwrap();
        describe_body(&mut out, &block.body).unwrap();
        describe_tree(&mut out, &block, &tree).unwrap();

        assert!(out.lines().all(|l| l.starts_with("//")));
        assert!(out.contains("//  Version:         1 (0x1)"));
        assert!(out.contains("//  Bits (Target):   486604799 (0x1d00ffff)"));
        assert!(out.contains("//  Timestamp:       1231006505 (2009-01-03T18:15:05Z)"));
        assert!(out.contains(
            "//    1: 4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b"
        ));
        assert!(out.contains("//  Flag Bytes: 01"));
        assert!(out.contains("//  Transactions:    1"));
        assert!(out.contains("//  Matched Tx #0: 4a5e1e4b"));
        assert!(out.contains("//Merkle Root Check: OK"));
    }

    #[test]
    fn test_describe_mismatch() {
        let mut block = MerkleBlock::from_hex(GENESIS_PROOF_HEX).unwrap();
        let tree = block.reconstruct(TraversalPolicy::FullHeight).unwrap();
        block.header.merkle_root = txoutproof_primitives::chainhash::Hash::default();
        let mut out = String::new();
        describe_tree(&mut out, &block, &tree).unwrap();
        assert!(out.contains("//Merkle Root Check: MISMATCH"));
    }
}
