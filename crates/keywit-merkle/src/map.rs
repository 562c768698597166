//! In-memory compressed binary trie.

use keywit_types::{HASH_LEN, Hash};

use crate::error::MerkleError;
use crate::proof::{
    MembershipProof, NonMembershipProof, OtherLeaf, Proof, bit, empty_hash, interior_hash,
    leaf_hash,
};

type Result<T> = std::result::Result<T, MerkleError>;

/// Trie depth in bits from the root.
type Depth = usize;

enum Node {
    Leaf {
        hash: Hash,
        label: Hash,
        val: Vec<u8>,
    },
    Interior {
        hash: Hash,
        children: [Option<Box<Node>>; 2],
    },
}

impl Node {
    fn new_leaf(label: Hash, val: Vec<u8>) -> Self {
        Node::Leaf {
            hash: leaf_hash(&label, &val),
            label,
            val,
        }
    }

    fn hash(&self) -> Hash {
        match self {
            Node::Leaf { hash, .. } | Node::Interior { hash, .. } => *hash,
        }
    }
}

fn child_hash(child: &Option<Box<Node>>, empty: &Hash) -> Hash {
    child.as_ref().map_or(*empty, |n| n.hash())
}

/// Verifiable map from hash-length labels to byte-string values.
///
/// A leaf sits at the shallowest depth where its label's bit prefix is
/// unique, so the shape of the trie depends only on the set of labels, not
/// on insertion order. Writes are insert-only: a label can be put once.
pub struct Map {
    root: Option<Box<Node>>,
    empty: Hash,
    len: usize,
}

impl Default for Map {
    fn default() -> Self {
        Self::new()
    }
}

impl Map {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            root: None,
            empty: empty_hash(),
            len: 0,
        }
    }

    /// Number of labels stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the map holds no labels.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Root digest of the map.
    pub fn digest(&self) -> Hash {
        child_hash(&self.root, &self.empty)
    }

    /// Insert `(label, val)` and return the new digest.
    ///
    /// Errors if `label` is not hash-length or is already present.
    pub fn put(&mut self, label: &[u8], val: Vec<u8>) -> Result<Hash> {
        let label = check_label(label)?;
        if self.get(&label)?.is_some() {
            return Err(MerkleError::DuplicateLabel);
        }
        put_at(&mut self.root, 0, label, val, &self.empty);
        self.len += 1;
        Ok(self.digest())
    }

    /// Look up `label` without building a proof.
    pub fn get(&self, label: &[u8]) -> Result<Option<&[u8]>> {
        let label = check_label(label)?;
        let mut node = self.root.as_deref();
        let mut depth: Depth = 0;
        while let Some(Node::Interior { children, .. }) = node {
            node = children[bit(&label, depth) as usize].as_deref();
            depth += 1;
        }
        match node {
            Some(Node::Leaf { label: l, val, .. }) if *l == label => Ok(Some(val.as_slice())),
            _ => Ok(None),
        }
    }

    /// Prove whether `label` is in the map, against [`Map::digest`].
    pub fn prove(&self, label: &[u8]) -> Result<Proof> {
        let label = check_label(label)?;
        let mut siblings = Vec::new();
        let mut node = self.root.as_deref();
        let mut depth: Depth = 0;
        loop {
            match node {
                Some(Node::Interior { children, .. }) => {
                    let b = bit(&label, depth) as usize;
                    siblings.push(child_hash(&children[1 - b], &self.empty));
                    node = children[b].as_deref();
                    depth += 1;
                }
                None => {
                    return Ok(Proof::NonMembership(NonMembershipProof {
                        siblings,
                        other_leaf: None,
                    }));
                }
                Some(Node::Leaf { label: l, val, .. }) if *l == label => {
                    return Ok(Proof::Membership {
                        val: val.clone(),
                        proof: MembershipProof { siblings },
                    });
                }
                Some(Node::Leaf { label: l, val, .. }) => {
                    return Ok(Proof::NonMembership(NonMembershipProof {
                        siblings,
                        other_leaf: Some(OtherLeaf {
                            label: *l,
                            val: val.clone(),
                        }),
                    }));
                }
            }
        }
    }
}

fn check_label(label: &[u8]) -> Result<Hash> {
    label.try_into().map_err(|_| MerkleError::BadLabelLength {
        expected: HASH_LEN,
        actual: label.len(),
    })
}

/// Insert below `slot`, which sits at `depth`. The caller has already
/// checked that `label` is absent.
fn put_at(slot: &mut Option<Box<Node>>, depth: Depth, label: Hash, val: Vec<u8>, empty: &Hash) {
    if slot.is_none() {
        *slot = Some(Box::new(Node::new_leaf(label, val)));
        return;
    }
    let Some(node) = slot.as_mut() else {
        return;
    };

    if let Node::Leaf { label: existing, .. } = node.as_ref() {
        // Push the existing leaf one level down under a fresh interior node.
        let existing_bit = bit(existing, depth) as usize;
        let leaf = std::mem::replace(
            node,
            Box::new(Node::Interior {
                hash: [0u8; HASH_LEN],
                children: [None, None],
            }),
        );
        if let Node::Interior { children, .. } = node.as_mut() {
            children[existing_bit] = Some(leaf);
        }
    }

    if let Node::Interior { hash, children } = node.as_mut() {
        let b = bit(&label, depth) as usize;
        put_at(&mut children[b], depth + 1, label, val, empty);
        *hash = interior_hash(&child_hash(&children[0], empty), &child_hash(&children[1], empty));
    }
}
