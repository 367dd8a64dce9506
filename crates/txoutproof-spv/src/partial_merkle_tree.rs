//! Partial Merkle tree reconstruction (BIP 37).
//!
//! A `merkleblock` proof carries a depth-first list of flag bits and a list of
//! hashes. Walking the tree from the root, each visited node consumes one
//! flag: a 0 (or reaching the bottom level) makes the node a leaf that takes
//! the next hash, a 1 above the bottom level expands it into two children.
//! Internal hashes are then folded upward with double SHA-256.
//!
//! The walk below is iterative. Nodes live in an arena owned by the tree and
//! point at their parent by index, which is only used to climb back up.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use txoutproof_primitives::chainhash::Hash;

use crate::error::SpvError;
use crate::merkle_tree::{merkle_tree_parent, tree_height, tree_width};

/// Index of a node inside a [`PartialMerkleTree`].
///
/// Ids are assigned in depth-first pre-order, so the root is always 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

/// How far the walk expands a branch whose flag bit is 1.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraversalPolicy {
    /// Every internal node has two children and branches go down to the
    /// computed tree height. Only flag bits end a branch early.
    #[default]
    FullHeight,
    /// Canonical BIP 37: a node whose right child would fall past the end of
    /// its level has no right child and hashes its left child with itself.
    LevelWidth,
}

impl TraversalPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraversalPolicy::FullHeight => "full-height",
            TraversalPolicy::LevelWidth => "level-width",
        }
    }
}

impl fmt::Display for TraversalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TraversalPolicy {
    type Err = SpvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full-height" => Ok(TraversalPolicy::FullHeight),
            "level-width" => Ok(TraversalPolicy::LevelWidth),
            other => Err(SpvError::MalformedArgument(format!(
                "unknown traversal policy '{}', expected full-height or level-width",
                other
            ))),
        }
    }
}

/// A node of a reconstructed tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleNode {
    id: NodeId,
    hash: Hash,
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    depth: u32,
    position: u64,
    matched: bool,
    duplicated_right: bool,
}

impl MerkleNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The leaf's input hash, or the folded hash of an internal node.
    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn left(&self) -> Option<NodeId> {
        self.left
    }

    /// Absent for leaves and for nodes whose right child was implied by
    /// duplicating the left one.
    pub fn right(&self) -> Option<NodeId> {
        self.right
    }

    /// Distance from the root.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Index of the node within its depth, counting from the left. For a
    /// leaf at full tree height this is the transaction's index in the block.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// A leaf flagged 1 at full tree height: a transaction the proof is about.
    pub fn is_matched(&self) -> bool {
        self.matched
    }

    /// True when the node's hash was folded from `left || left`.
    pub fn has_duplicated_right(&self) -> bool {
        self.duplicated_right
    }
}

/// A fully reconstructed partial Merkle tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartialMerkleTree {
    nodes: Vec<MerkleNode>,
    total_transactions: u32,
    height: u32,
    policy: TraversalPolicy,
    hashes_consumed: usize,
    flags_consumed: usize,
}

impl PartialMerkleTree {
    /// Rebuild the tree described by `flags` and `hashes`.
    ///
    /// # Arguments
    /// * `total_transactions` - Transactions in the block; fixes the height.
    /// * `hashes` - Leaf hashes in depth-first order.
    /// * `flags` - One bit per visited node, depth-first. Up to seven trailing
    ///   bits may be left over as byte padding.
    /// * `policy` - Branch expansion rule, applied to every node.
    ///
    /// # Returns
    /// The tree with every node hashed, or the first malformation found.
    pub fn reconstruct(
        total_transactions: u32,
        hashes: &[Hash],
        flags: &[bool],
        policy: TraversalPolicy,
    ) -> Result<Self, SpvError> {
        if total_transactions == 0 {
            return Err(SpvError::ZeroTransactions);
        }
        let height = tree_height(total_transactions);
        debug!(
            total_transactions,
            height,
            hashes = hashes.len(),
            flags = flags.len(),
            %policy,
            "reconstructing partial merkle tree"
        );
        let walk = Walk {
            nodes: Vec::new(),
            hashes,
            flags,
            next_hash: 0,
            next_flag: 0,
            total_transactions,
            height,
            policy,
        };
        walk.run()
    }

    /// The computed Merkle root.
    pub fn root(&self) -> Hash {
        self.nodes[0].hash
    }

    pub fn root_id(&self) -> NodeId {
        NodeId(0)
    }

    /// Whether the computed root equals `expected`, usually the header's root.
    pub fn verify_root(&self, expected: &Hash) -> bool {
        self.root() == *expected
    }

    /// Full tree height: the depth at which leaves can be matched.
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn total_transactions(&self) -> u32 {
        self.total_transactions
    }

    pub fn policy(&self) -> TraversalPolicy {
        self.policy
    }

    /// All nodes in depth-first pre-order.
    pub fn nodes(&self) -> &[MerkleNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&MerkleNode> {
        self.nodes.get(id.0)
    }

    pub fn leaves(&self) -> impl Iterator<Item = &MerkleNode> {
        self.nodes.iter().filter(|n| n.is_leaf())
    }

    /// Matched leaves, left to right.
    pub fn matched(&self) -> impl Iterator<Item = &MerkleNode> {
        self.nodes.iter().filter(|n| n.matched)
    }

    /// `(transaction index, txid)` of every matched leaf.
    pub fn matched_transactions(&self) -> Vec<(u64, Hash)> {
        self.matched().map(|n| (n.position, n.hash)).collect()
    }

    pub fn hashes_consumed(&self) -> usize {
        self.hashes_consumed
    }

    pub fn flags_consumed(&self) -> usize {
        self.flags_consumed
    }
}

/// Working state of a node whose hash may not be known yet.
struct PendingNode {
    hash: Option<Hash>,
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    depth: u32,
    position: u64,
    matched: bool,
    duplicated_right: bool,
}

enum Step {
    Continue(NodeId),
    Finished,
}

struct Walk<'a> {
    nodes: Vec<PendingNode>,
    hashes: &'a [Hash],
    flags: &'a [bool],
    next_hash: usize,
    next_flag: usize,
    total_transactions: u32,
    height: u32,
    policy: TraversalPolicy,
}

impl<'a> Walk<'a> {
    fn run(mut self) -> Result<PartialMerkleTree, SpvError> {
        let mut current = self.push(None, 0, 0);
        loop {
            let step = if self.nodes[current.0].left.is_some() {
                self.visit_internal(current)?
            } else {
                self.visit_fresh(current)?
            };
            match step {
                Step::Continue(next) => current = next,
                Step::Finished => return self.finish(),
            }
        }
    }

    /// A node with no children yet: read its flag and either store a leaf
    /// hash or open its left child.
    fn visit_fresh(&mut self, id: NodeId) -> Result<Step, SpvError> {
        let flag = self.next_flag()?;
        let depth = self.nodes[id.0].depth;
        if !flag || depth == self.height {
            let hash = self.next_hash()?;
            let matched = flag && depth == self.height;
            let node = &mut self.nodes[id.0];
            node.hash = Some(hash);
            node.matched = matched;
            trace!(node = id.0, depth, matched, %hash, "leaf");
            return Ok(self.ascend(id));
        }
        let position = self.nodes[id.0].position;
        let left = self.push(Some(id), depth + 1, position * 2);
        self.nodes[id.0].left = Some(left);
        Ok(Step::Continue(left))
    }

    /// A node whose left subtree is done: open the right child, or fold.
    fn visit_internal(&mut self, id: NodeId) -> Result<Step, SpvError> {
        let node = &self.nodes[id.0];
        if node.right.is_none() && !node.duplicated_right {
            if self.has_right_child(node.depth, node.position) {
                let (depth, position) = (node.depth, node.position);
                let right = self.push(Some(id), depth + 1, position * 2 + 1);
                self.nodes[id.0].right = Some(right);
                return Ok(Step::Continue(right));
            }
            self.nodes[id.0].duplicated_right = true;
        }
        self.fold(id)?;
        Ok(self.ascend(id))
    }

    fn has_right_child(&self, depth: u32, position: u64) -> bool {
        match self.policy {
            TraversalPolicy::FullHeight => true,
            TraversalPolicy::LevelWidth => {
                let child_level = self.height - depth - 1;
                position * 2 + 1 < tree_width(self.total_transactions, child_level)
            }
        }
    }

    /// Set an internal node's hash from its children, once.
    fn fold(&mut self, id: NodeId) -> Result<(), SpvError> {
        if self.nodes[id.0].hash.is_some() {
            return Ok(());
        }
        let node = &self.nodes[id.0];
        let left = node.left.and_then(|l| self.nodes[l.0].hash);
        let right = match node.right {
            Some(r) => self.nodes[r.0].hash,
            None if node.duplicated_right => left,
            None => None,
        };
        match (left, right) {
            (Some(l), Some(r)) => {
                let hash = merkle_tree_parent(&l, &r);
                trace!(node = id.0, depth = node.depth, %hash, "fold");
                self.nodes[id.0].hash = Some(hash);
                Ok(())
            }
            _ => Err(self.incomplete()),
        }
    }

    fn ascend(&self, id: NodeId) -> Step {
        match self.nodes[id.0].parent {
            Some(parent) => Step::Continue(parent),
            None => Step::Finished,
        }
    }

    /// The root is hashed; every hash must be used and at most the padding
    /// of the final flag byte may remain.
    fn finish(self) -> Result<PartialMerkleTree, SpvError> {
        if self.next_hash != self.hashes.len() {
            return Err(SpvError::UnconsumedHashes {
                remaining: self.hashes.len() - self.next_hash,
                total: self.hashes.len(),
            });
        }
        if self.flags.len() - self.next_flag >= 8 {
            return Err(SpvError::UnconsumedFlags {
                used: self.next_flag,
                available: self.flags.len(),
            });
        }

        let mut nodes = Vec::with_capacity(self.nodes.len());
        for (index, pending) in self.nodes.into_iter().enumerate() {
            let hash = pending.hash.ok_or(SpvError::IncompleteProof {
                hashes: self.next_hash,
                nodes: index,
            })?;
            nodes.push(MerkleNode {
                id: NodeId(index),
                hash,
                parent: pending.parent,
                left: pending.left,
                right: pending.right,
                depth: pending.depth,
                position: pending.position,
                matched: pending.matched,
                duplicated_right: pending.duplicated_right,
            });
        }
        debug!(
            nodes = nodes.len(),
            hashes_consumed = self.next_hash,
            flags_consumed = self.next_flag,
            root = %nodes[0].hash,
            "partial merkle tree reconstructed"
        );
        Ok(PartialMerkleTree {
            nodes,
            total_transactions: self.total_transactions,
            height: self.height,
            policy: self.policy,
            hashes_consumed: self.next_hash,
            flags_consumed: self.next_flag,
        })
    }

    fn push(&mut self, parent: Option<NodeId>, depth: u32, position: u64) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(PendingNode {
            hash: None,
            parent,
            left: None,
            right: None,
            depth,
            position,
            matched: false,
            duplicated_right: false,
        });
        id
    }

    /// Next flag bit. Running out of flags after every hash has been used
    /// means the proof stopped short of closing the tree.
    fn next_flag(&mut self) -> Result<bool, SpvError> {
        match self.flags.get(self.next_flag) {
            Some(flag) => {
                self.next_flag += 1;
                Ok(*flag)
            }
            None if self.next_hash == self.hashes.len() => Err(self.incomplete()),
            None => Err(SpvError::FlagStreamExhausted { consumed: self.next_flag }),
        }
    }

    fn next_hash(&mut self) -> Result<Hash, SpvError> {
        let hash = self
            .hashes
            .get(self.next_hash)
            .copied()
            .ok_or(SpvError::HashStreamExhausted { consumed: self.next_hash })?;
        self.next_hash += 1;
        Ok(hash)
    }

    fn incomplete(&self) -> SpvError {
        SpvError::IncompleteProof {
            hashes: self.next_hash,
            nodes: self.nodes.len(),
        }
    }
}
