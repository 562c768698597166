//! Proof types and stateless verification.
//!
//! Verification never touches a [`Map`](crate::Map): it recomputes a root
//! bottom-up from the claimed terminal (leaf, other leaf, or empty slot) and
//! the sibling hashes, and the caller compares that root to a digest it
//! trusts.

use keywit_types::{HASH_LEN, Hash, hash, hash_parts};
use serde::{Deserialize, Serialize};

use crate::error::MerkleError;

type Result<T> = std::result::Result<T, MerkleError>;

/// Maximum number of siblings in a proof (one per label bit).
pub const MAX_DEPTH: usize = HASH_LEN * 8;

const EMPTY_TAG: u8 = 0;
const INTERIOR_TAG: u8 = 1;
const LEAF_TAG: u8 = 2;

/// A proof about one label against one digest.
///
/// Membership and non-membership are distinct variants so a proof can never
/// claim both at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Proof {
    /// The label is present with `val`.
    Membership {
        /// Value stored under the label.
        val: Vec<u8>,
        /// Path to the leaf.
        proof: MembershipProof,
    },
    /// The label is absent.
    NonMembership(NonMembershipProof),
}

impl Proof {
    /// Whether this proof claims the label is present.
    pub fn is_member(&self) -> bool {
        matches!(self, Proof::Membership { .. })
    }

    /// Recompute the root this proof commits to for `label`.
    pub fn root(&self, label: &Hash) -> Result<Hash> {
        match self {
            Proof::Membership { val, proof } => proof.root(label, val),
            Proof::NonMembership(proof) => proof.root(label),
        }
    }
}

/// Sibling path from the root down to the leaf holding a label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipProof {
    /// Sibling hash at each interior node on the path, root first.
    pub siblings: Vec<Hash>,
}

/// Sibling path from the root down to where a label would live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonMembershipProof {
    /// Sibling hash at each interior node on the path, root first.
    pub siblings: Vec<Hash>,
    /// The leaf found in the label's slot, if the slot is not empty.
    pub other_leaf: Option<OtherLeaf>,
}

/// A different leaf occupying the slot a missing label would take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherLeaf {
    /// Full label of the leaf.
    pub label: Hash,
    /// Value stored at that leaf.
    pub val: Vec<u8>,
}

impl MembershipProof {
    /// Root of a tree that holds `(label, val)` at the end of this path.
    pub fn root(&self, label: &Hash, val: &[u8]) -> Result<Hash> {
        check_depth(self.siblings.len())?;
        Ok(fold_path(label, leaf_hash(label, val), &self.siblings))
    }

    /// Check that `(label, val)` is in the tree with root `digest`.
    pub fn verify(&self, label: &Hash, val: &[u8], digest: &Hash) -> Result<()> {
        if self.root(label, val)? == *digest {
            Ok(())
        } else {
            Err(MerkleError::DigestMismatch)
        }
    }
}

impl NonMembershipProof {
    /// Root of a tree where `label`'s slot is empty or holds the other leaf.
    pub fn root(&self, label: &Hash) -> Result<Hash> {
        Ok(fold_path(label, self.terminal_hash(label)?, &self.siblings))
    }

    /// Check that `label` is absent from the tree with root `digest`.
    pub fn verify(&self, label: &Hash, digest: &Hash) -> Result<()> {
        if self.root(label)? == *digest {
            Ok(())
        } else {
            Err(MerkleError::DigestMismatch)
        }
    }

    /// Roots before and after inserting `(label, val)` into the proven slot.
    ///
    /// The first element is the digest this proof commits to; the second is
    /// the digest the map would have right after the insertion. This lets a
    /// replica replay insertions knowing nothing but the previous digest.
    pub fn insert_roots(&self, label: &Hash, val: &[u8]) -> Result<(Hash, Hash)> {
        let prev = self.root(label)?;
        let depth = self.siblings.len();
        let new_leaf = leaf_hash(label, val);

        let subtree = match &self.other_leaf {
            None => new_leaf,
            Some(other) => {
                // The two labels share the first `depth` bits; split where they
                // first differ and pad the gap with single-child interiors.
                let split = first_diff_bit(label, &other.label, depth)
                    .ok_or(MerkleError::OtherLeafIsTarget)?;
                let other_hash = leaf_hash(&other.label, &other.val);
                let mut node = if bit(label, split) {
                    interior_hash(&other_hash, &new_leaf)
                } else {
                    interior_hash(&new_leaf, &other_hash)
                };
                let empty = empty_hash();
                for d in (depth..split).rev() {
                    node = if bit(label, d) {
                        interior_hash(&empty, &node)
                    } else {
                        interior_hash(&node, &empty)
                    };
                }
                node
            }
        };

        Ok((prev, fold_path(label, subtree, &self.siblings)))
    }

    fn terminal_hash(&self, label: &Hash) -> Result<Hash> {
        let depth = self.siblings.len();
        check_depth(depth)?;
        match &self.other_leaf {
            None => Ok(empty_hash()),
            Some(other) => {
                if other.label == *label {
                    return Err(MerkleError::OtherLeafIsTarget);
                }
                if !shares_prefix(label, &other.label, depth) {
                    return Err(MerkleError::OtherLeafOffPath { depth });
                }
                Ok(leaf_hash(&other.label, &other.val))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Node hashing
// ---------------------------------------------------------------------------

/// Hash of an empty subtree.
pub(crate) fn empty_hash() -> Hash {
    hash(&[EMPTY_TAG])
}

/// Hash of a leaf. Binds the full label, not just the path prefix.
pub(crate) fn leaf_hash(label: &Hash, val: &[u8]) -> Hash {
    let len = (val.len() as u64).to_le_bytes();
    hash_parts(&[label, &len, val, &[LEAF_TAG]])
}

pub(crate) fn interior_hash(child0: &Hash, child1: &Hash) -> Hash {
    hash_parts(&[child0, child1, &[INTERIOR_TAG]])
}

/// Bit `n` of `label`, MSB-first within each byte.
pub(crate) fn bit(label: &Hash, n: usize) -> bool {
    (label[n / 8] >> (7 - n % 8)) & 1 == 1
}

fn shares_prefix(a: &Hash, b: &Hash, bits: usize) -> bool {
    (0..bits).all(|n| bit(a, n) == bit(b, n))
}

fn first_diff_bit(a: &Hash, b: &Hash, from: usize) -> Option<usize> {
    (from..MAX_DEPTH).find(|&n| bit(a, n) != bit(b, n))
}

fn check_depth(depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(MerkleError::ProofTooDeep { depth });
    }
    Ok(())
}

/// Hash `node` up through `siblings`, deepest sibling first.
fn fold_path(label: &Hash, node: Hash, siblings: &[Hash]) -> Hash {
    siblings
        .iter()
        .enumerate()
        .rev()
        .fold(node, |acc, (depth, sib)| {
            if bit(label, depth) {
                interior_hash(sib, &acc)
            } else {
                interior_hash(&acc, sib)
            }
        })
}
