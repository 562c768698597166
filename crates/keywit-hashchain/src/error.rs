//! Error types for the hashchain crate.

/// Errors from building or verifying a hashchain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// Appended value was not exactly one hash long.
    #[error("chain value must be {expected} bytes, got {actual}")]
    BadValueLength {
        /// Required length.
        expected: usize,
        /// Length supplied.
        actual: usize,
    },

    /// Asked for a proof from a prefix longer than the chain.
    #[error("prefix length {prev_len} exceeds chain length {len}")]
    PrefixTooLong {
        /// Requested prefix length.
        prev_len: u64,
        /// Current chain length.
        len: u64,
    },

    /// Chain has no values yet.
    #[error("chain is empty")]
    Empty,

    /// Proof bytes are not a whole number of hashes.
    #[error("proof length {0} is not a multiple of the hash length")]
    MalformedProof(usize),
}
