//! Error types for the protocol core.

use keywit_hashchain::ChainError;
use keywit_merkle::MerkleError;

/// Errors from checking signatures, VRF proofs, evidence and server replies.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Public key bytes do not decode to a valid point.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// Signature does not verify under the given key.
    #[error("bad signature on {0}")]
    BadSignature(&'static str),

    /// VRF proof does not verify for the given input.
    #[error("bad VRF proof")]
    BadVrfProof,

    /// Merkle proof failed.
    #[error("merkle: {0}")]
    Merkle(#[from] MerkleError),

    /// Hashchain proof failed.
    #[error("hashchain: {0}")]
    Chain(#[from] ChainError),

    /// A start reply extended the chain by nothing.
    #[error("start reply does not reach any epoch")]
    EmptyStart,

    /// Epoch arithmetic overflowed.
    #[error("epoch overflow")]
    EpochOverflow,

    /// A committed value was recorded at an impossible epoch.
    #[error("version {ver} added at epoch {added}, which is not in [{min}, {max}]")]
    BadEpochAdded {
        /// Version number.
        ver: u64,
        /// Claimed epoch.
        added: u64,
        /// Lowest acceptable epoch.
        min: u64,
        /// Highest acceptable epoch.
        max: u64,
    },

    /// A replayed update did not start from the expected digest.
    #[error("update {index} does not extend the previous digest")]
    UpdateOutOfOrder {
        /// Position of the update within its batch.
        index: usize,
    },

    /// Evidence whose two statements are the same.
    #[error("evidence statements do not contradict")]
    NotContradictory,
}
