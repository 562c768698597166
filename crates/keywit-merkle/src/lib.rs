//! Verifiable key-value map over pseudorandom labels.
//!
//! The [`Map`] is a compressed binary Merkle trie keyed by the bits of a
//! hash-length label. Each leaf stores a label and an opaque value; each
//! interior node hashes its two children, and missing subtrees collapse to a
//! single cached empty hash.
//!
//! Proofs come in two shapes, modelled as the [`Proof`] sum type:
//!
//! - [`MembershipProof`]: the sibling path down to the label's leaf.
//! - [`NonMembershipProof`]: the sibling path down to the label's slot,
//!   which is either empty or occupied by a different leaf ([`OtherLeaf`]).
//!
//! A non-membership proof doubles as an insertion proof:
//! [`NonMembershipProof::insert_roots`] yields the digest before and after
//! inserting a new leaf into the proven slot, which is how auditors replay
//! a server's updates without holding the map.

mod error;
mod map;
mod proof;

#[cfg(test)]
mod tests;

pub use error::MerkleError;
pub use map::Map;
pub use proof::{MAX_DEPTH, MembershipProof, NonMembershipProof, OtherLeaf, Proof};
