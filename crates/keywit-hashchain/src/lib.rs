//! Append-only hashchain over hash-length values.
//!
//! Each link commits to every value appended so far:
//! `link_i = H(link_{i-1} ‖ val_i)`, starting from `link_{-1} = H(empty)`.
//! keywit appends one map digest per epoch, so the chain's length is the
//! number of sealed epochs and link `e` commits to every digest up to epoch
//! `e`.
//!
//! A party that knows the link at some prefix can catch up to the tip with
//! [`HashChain::prove`] + [`verify`]; a party that knows nothing can start
//! at the tip with [`HashChain::bootstrap`].

mod error;

pub use error::ChainError;

use keywit_types::{HASH_LEN, Hash, hash, hash_parts, to_hash};

type Result<T> = std::result::Result<T, ChainError>;

/// Link that precedes the first value.
pub fn initial_link() -> Hash {
    hash(&[])
}

/// Link following `prev` once `val` is appended.
pub fn next_link(prev: &Hash, val: &Hash) -> Hash {
    hash_parts(&[prev, val])
}

/// An append-only chain of hash-length values.
///
/// Values are kept pre-flattened so that a proof is a single slice copy.
#[derive(Debug, Clone)]
pub struct HashChain {
    /// `links[i]` is the link after `i` values; `links[0]` is the initial link.
    links: Vec<Hash>,
    vals: Vec<u8>,
}

impl Default for HashChain {
    fn default() -> Self {
        Self::new()
    }
}

impl HashChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self {
            links: vec![initial_link()],
            vals: Vec::new(),
        }
    }

    /// Number of values appended.
    pub fn len(&self) -> u64 {
        (self.links.len() - 1) as u64
    }

    /// Whether nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.links.len() == 1
    }

    /// Current tip link.
    pub fn last_link(&self) -> Hash {
        self.links[self.links.len() - 1]
    }

    /// Link after the first `len` values, if the chain is that long.
    pub fn link_at(&self, len: u64) -> Option<Hash> {
        self.links.get(usize::try_from(len).ok()?).copied()
    }

    /// Append `val` and return the new tip link.
    pub fn append(&mut self, val: &[u8]) -> Result<Hash> {
        let val = to_hash(val).ok_or(ChainError::BadValueLength {
            expected: HASH_LEN,
            actual: val.len(),
        })?;
        let link = next_link(&self.last_link(), &val);
        self.links.push(link);
        self.vals.extend_from_slice(&val);
        Ok(link)
    }

    /// Every value appended after the first `prev_len`, concatenated.
    ///
    /// `prev_len == len()` yields an empty proof.
    pub fn prove(&self, prev_len: u64) -> Result<Vec<u8>> {
        if prev_len > self.len() {
            return Err(ChainError::PrefixTooLong {
                prev_len,
                len: self.len(),
            });
        }
        let start = prev_len as usize * HASH_LEN;
        Ok(self.vals[start..].to_vec())
    }

    /// The link before the last value, and the last value.
    ///
    /// Verifying `last_val` as a one-value proof from the returned link
    /// yields the current tip.
    pub fn bootstrap(&self) -> Result<(Hash, Hash)> {
        if self.is_empty() {
            return Err(ChainError::Empty);
        }
        let n = self.links.len();
        let start = self.vals.len() - HASH_LEN;
        let last = to_hash(&self.vals[start..]).ok_or(ChainError::Empty)?;
        Ok((self.links[n - 2], last))
    }
}

/// Result of replaying a proof on top of a known link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extension {
    /// Number of values the proof added.
    pub len: u64,
    /// Last value added, if any.
    pub last_val: Option<Hash>,
    /// Link after the last value (equal to the starting link if none).
    pub link: Hash,
}

/// Replay `proof` from `prev_link`.
pub fn verify(prev_link: &Hash, proof: &[u8]) -> Result<Extension> {
    if proof.len() % HASH_LEN != 0 {
        return Err(ChainError::MalformedProof(proof.len()));
    }
    let mut ext = Extension {
        len: 0,
        last_val: None,
        link: *prev_link,
    };
    for chunk in proof.chunks_exact(HASH_LEN) {
        let val = to_hash(chunk).ok_or(ChainError::MalformedProof(proof.len()))?;
        ext.link = next_link(&ext.link, &val);
        ext.last_val = Some(val);
        ext.len += 1;
    }
    Ok(ext)
}
