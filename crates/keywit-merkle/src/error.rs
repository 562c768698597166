//! Error types for the Merkle map crate.

/// Errors that can occur during Merkle map operations and proof checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MerkleError {
    /// Label was not exactly one hash long.
    #[error("label must be {expected} bytes, got {actual}")]
    BadLabelLength {
        /// Required length.
        expected: usize,
        /// Length supplied.
        actual: usize,
    },

    /// Label is already present. Map writes are insert-only.
    #[error("label already present in map")]
    DuplicateLabel,

    /// Proof has more siblings than the label has bits.
    #[error("proof too deep: {depth} siblings")]
    ProofTooDeep {
        /// Number of siblings in the proof.
        depth: usize,
    },

    /// Non-membership proof ends at a leaf carrying the queried label.
    #[error("non-membership proof terminates at the queried label")]
    OtherLeafIsTarget,

    /// Non-membership proof ends at a leaf that is off the label's path.
    #[error("other leaf does not share the {depth}-bit path prefix")]
    OtherLeafOffPath {
        /// Depth at which the other leaf sits.
        depth: usize,
    },

    /// Recomputed root did not match the expected digest.
    #[error("proof does not match digest")]
    DigestMismatch,
}
