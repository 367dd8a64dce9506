//! Graphviz DOT rendering of a reconstructed tree.
//!
//! Leaves are boxes (matched ones light coral, pruned ones light blue),
//! internal nodes are white ellipses. Edges leave the south-west corner for
//! left children and the south-east corner for right children so Graphviz
//! keeps siblings in order.

use std::fmt;

use txoutproof_spv::{MerkleNode, PartialMerkleTree};

use crate::config::RenderConfig;

pub const MATCHED_FILL: &str = "lightcoral";
pub const PRUNED_FILL: &str = "lightblue";
pub const INTERNAL_FILL: &str = "white";

/// A tree paired with its render options; `Display` writes the DOT source.
pub struct DotGraph<'a> {
    tree: &'a PartialMerkleTree,
    config: &'a RenderConfig,
}

impl<'a> DotGraph<'a> {
    pub fn new(tree: &'a PartialMerkleTree, config: &'a RenderConfig) -> Self {
        DotGraph { tree, config }
    }

    fn label(&self, node: &MerkleNode) -> String {
        if node.is_root() {
            node.hash().to_string()
        } else {
            format!("{}...", node.hash().short_hex(self.config.label_len))
        }
    }

    fn write_node(&self, f: &mut fmt::Formatter<'_>, node: &MerkleNode) -> fmt::Result {
        let (shape, fill) = match (node.is_leaf(), node.is_matched()) {
            (true, true) => ("box", MATCHED_FILL),
            (true, false) => ("box", PRUNED_FILL),
            (false, _) => ("ellipse", INTERNAL_FILL),
        };
        writeln!(
            f,
            "\t{} [ fillcolor={}, label=\"{}\", shape={}, style=filled ];",
            node.id(),
            fill,
            self.label(node),
            shape
        )
    }
}

impl fmt::Display for DotGraph<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "digraph G {{")?;
        for node in self.tree.nodes() {
            self.write_node(f, node)?;
        }
        for node in self.tree.nodes() {
            if let Some(left) = node.left() {
                writeln!(f, "\t{}->{} [ tailport=sw ];", node.id(), left)?;
            }
            if let Some(right) = node.right() {
                writeln!(f, "\t{}->{} [ tailport=se ];", node.id(), right)?;
            }
        }
        writeln!(f, "}}")
    }
}

/// Render `tree` as a complete DOT document.
pub fn render_dot(tree: &PartialMerkleTree, config: &RenderConfig) -> String {
    DotGraph::new(tree, config).to_string()
}
