/// Error types for proof decoding and partial Merkle tree reconstruction.
///
/// Every variant is terminal for the proof being processed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpvError {
    /// The input ended before `field` could be read.
    #[error("truncated input reading {field}: needed {needed} bytes, {available} available")]
    TruncatedInput {
        field: String,
        needed: usize,
        available: usize,
    },

    /// Nothing follows the 80-byte block header.
    #[error("no proof data follows the block header")]
    EmptyProofBody,

    /// Bytes remain after the flag bytes.
    #[error("{count} unexpected bytes after the flag bytes")]
    TrailingBytes { count: usize },

    /// A node needed a flag bit but all of them were consumed.
    #[error("ran out of flag bits after consuming {consumed}")]
    FlagStreamExhausted { consumed: usize },

    /// A leaf needed a hash but all of them were consumed.
    #[error("ran out of hashes after consuming {consumed}")]
    HashStreamExhausted { consumed: usize },

    /// All hashes were consumed but the tree is not complete.
    #[error("all {hashes} hashes consumed but the tree is incomplete ({nodes} nodes built)")]
    IncompleteProof { hashes: usize, nodes: usize },

    /// The tree closed at the root with hashes left over.
    #[error("tree complete but {remaining} of {total} hashes were not consumed")]
    UnconsumedHashes { remaining: usize, total: usize },

    /// Whole flag bytes were left over after the tree closed.
    #[error("tree complete after {used} flag bits but {available} were supplied")]
    UnconsumedFlags { used: usize, available: usize },

    /// The proof claims a block with no transactions.
    #[error("total transaction count is zero")]
    ZeroTransactions,

    /// Bad caller input (hex encoding, argument shape, builder arguments).
    #[error("malformed argument: {0}")]
    MalformedArgument(String),

    /// An underlying primitives error.
    #[error("primitives error: {0}")]
    Primitives(#[from] txoutproof_primitives::PrimitivesError),
}

impl From<hex::FromHexError> for SpvError {
    fn from(e: hex::FromHexError) -> Self {
        SpvError::MalformedArgument(format!("invalid hex: {}", e))
    }
}

/// Map a reader error to `TruncatedInput` tagged with the field being read.
///
/// Used as `reader.read_u32_le().map_err(truncated("nonce"))?`.
pub(crate) fn truncated(
    field: impl Into<String>,
) -> impl FnOnce(txoutproof_primitives::PrimitivesError) -> SpvError {
    let field = field.into();
    move |e| match e {
        txoutproof_primitives::PrimitivesError::UnexpectedEof { needed, available } => {
            SpvError::TruncatedInput { field, needed, available }
        }
        other => SpvError::Primitives(other),
    }
}
