use proptest::prelude::*;

use txoutproof_primitives::chainhash::Hash;
use txoutproof_spv::{
    merkle_root, BlockHeader, MerkleBlock, MerkleProofBody, SpvError, TraversalPolicy,
};

/// A block's txids together with a random match mask of the same length.
fn arb_block(max_txs: usize) -> impl Strategy<Value = (Vec<Hash>, Vec<bool>)> {
    prop::collection::vec(prop::array::uniform32(any::<u8>()).prop_map(Hash::new), 1..=max_txs)
        .prop_flat_map(|txids| {
            let n = txids.len();
            (Just(txids), prop::collection::vec(any::<bool>(), n))
        })
}

/// Like `arb_block` but with a power-of-two transaction count.
fn arb_power_of_two_block() -> impl Strategy<Value = (Vec<Hash>, Vec<bool>)> {
    (0u32..=6).prop_flat_map(|exp| {
        let n = 1usize << exp;
        (
            prop::collection::vec(prop::array::uniform32(any::<u8>()).prop_map(Hash::new), n),
            prop::collection::vec(any::<bool>(), n),
        )
    })
}

fn arb_header() -> impl Strategy<Value = BlockHeader> {
    (
        any::<i32>(),
        prop::array::uniform32(any::<u8>()),
        prop::array::uniform32(any::<u8>()),
        any::<u32>(),
        any::<u32>(),
        any::<u32>(),
    )
        .prop_map(|(version, prev, root, timestamp, bits, nonce)| BlockHeader {
            version,
            prev_block_hash: Hash::new(prev),
            merkle_root: Hash::new(root),
            timestamp,
            bits,
            nonce,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn level_width_reconstructs_block_root((txids, matches) in arb_block(100)) {
        let body = MerkleProofBody::from_txids(&txids, &matches).unwrap();
        let tree = body.reconstruct(TraversalPolicy::LevelWidth).unwrap();

        prop_assert_eq!(tree.root(), merkle_root(&txids).unwrap());
        prop_assert_eq!(tree.hashes_consumed(), body.hashes.len());
        prop_assert_eq!(tree.leaves().count(), body.hashes.len());
        prop_assert_eq!(tree.flags_consumed(), tree.nodes().len());
        prop_assert!(body.flag_bytes.len() * 8 - tree.flags_consumed() < 8);

        let expected: Vec<(u64, Hash)> = matches
            .iter()
            .enumerate()
            .filter(|(_, m)| **m)
            .map(|(i, _)| (i as u64, txids[i]))
            .collect();
        prop_assert_eq!(tree.matched_transactions(), expected);
    }

    #[test]
    fn full_height_agrees_on_power_of_two((txids, matches) in arb_power_of_two_block()) {
        let body = MerkleProofBody::from_txids(&txids, &matches).unwrap();
        let full = body.reconstruct(TraversalPolicy::FullHeight).unwrap();
        let width = body.reconstruct(TraversalPolicy::LevelWidth).unwrap();

        prop_assert_eq!(full.root(), merkle_root(&txids).unwrap());
        prop_assert_eq!(full.nodes().len(), width.nodes().len());
        prop_assert_eq!(full.matched_transactions(), width.matched_transactions());
    }

    #[test]
    fn reconstruction_is_deterministic((txids, matches) in arb_block(40)) {
        let body = MerkleProofBody::from_txids(&txids, &matches).unwrap();
        let a = body.reconstruct(TraversalPolicy::LevelWidth).unwrap();
        let b = body.reconstruct(TraversalPolicy::LevelWidth).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn dropping_last_hash_exhausts_hash_stream((txids, matches) in arb_block(40)) {
        let mut body = MerkleProofBody::from_txids(&txids, &matches).unwrap();
        let consumed = body.hashes.len() - 1;
        body.hashes.pop();
        prop_assert_eq!(
            body.reconstruct(TraversalPolicy::LevelWidth),
            Err(SpvError::HashStreamExhausted { consumed })
        );
    }

    #[test]
    fn dropping_flag_byte_fails((txids, matches) in arb_block(40)) {
        let mut body = MerkleProofBody::from_txids(&txids, &matches).unwrap();
        body.flag_bytes.pop();
        let err = body.reconstruct(TraversalPolicy::LevelWidth).unwrap_err();
        prop_assert!(
            matches!(err, SpvError::FlagStreamExhausted { .. } | SpvError::IncompleteProof { .. }),
            "unexpected error {:?}", err
        );
    }

    #[test]
    fn header_bytes_roundtrip(header in arb_header()) {
        let bytes = header.to_bytes();
        prop_assert_eq!(BlockHeader::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn merkle_block_decodes_what_it_encodes(header in arb_header(), (txids, matches) in arb_block(20)) {
        let body = MerkleProofBody::from_txids(&txids, &matches).unwrap();
        let block = MerkleBlock { header, body };
        prop_assert_eq!(MerkleBlock::from_bytes(&block.to_bytes()).unwrap(), block);
    }
}
