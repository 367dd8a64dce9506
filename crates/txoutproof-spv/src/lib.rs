//! txoutproof SPV: `merkleblock` proof decoding and partial Merkle tree
//! reconstruction.
//!
//! A proof is decoded into a [`MerkleBlock`] (header plus flag/hash streams),
//! then [`PartialMerkleTree::reconstruct`] rebuilds the tree and folds it up
//! to a root that callers compare against the header.

pub mod error;
pub mod block_header;
pub mod merkle_tree;
pub mod merkle_block;
pub mod partial_merkle_tree;

pub use error::SpvError;
pub use block_header::{BlockHeader, BLOCK_HEADER_SIZE};
pub use merkle_tree::{merkle_root, merkle_tree_parent, tree_height, tree_width};
pub use merkle_block::{pack_flags, unpack_flags, MerkleBlock, MerkleProofBody};
pub use partial_merkle_tree::{MerkleNode, NodeId, PartialMerkleTree, TraversalPolicy};
