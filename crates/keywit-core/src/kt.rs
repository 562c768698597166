//! Hidden directory encoding.
//!
//! The plain directory maps a uid to its list of public keys. The hidden
//! directory, which is what the Merkle map stores, maps
//! `label = VRF(uid ‖ ver)` to `val = H(epoch_added ‖ commit)`, where
//! `commit = H(pk ‖ rand)` hides the key until its opening is revealed.

use keywit_types::{Epoch, Hash, Preimage, Uid, hash_parts};
use serde::{Deserialize, Serialize};

use crate::vrf::{VrfProof, VrfSecretKey};

/// VRF input for version `ver` of `uid`.
pub fn label_input(uid: Uid, ver: u64) -> Vec<u8> {
    Preimage::new().u64(uid).u64(ver).finish()
}

/// Map label and its VRF proof.
pub fn prove_label(sk: &VrfSecretKey, uid: Uid, ver: u64) -> (Hash, VrfProof) {
    sk.prove(&label_input(uid, ver))
}

/// Map label without a proof.
pub fn eval_label(sk: &VrfSecretKey, uid: Uid, ver: u64) -> Hash {
    sk.evaluate(&label_input(uid, ver))
}

/// Commitment randomness, reproducible from the server's secret and the
/// label so openings never need to be stored.
pub fn commit_rand(commit_secret: &Hash, label: &Hash) -> Hash {
    hash_parts(&[commit_secret, label])
}

/// Opening of a key commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOpen {
    /// The committed public key.
    pub pk: Vec<u8>,
    /// Commitment randomness.
    pub rand: Hash,
}

impl CommitOpen {
    pub fn commit(&self) -> Hash {
        Preimage::new().bytes(&self.pk).raw(&self.rand).hash()
    }
}

/// Value stored in the map for a key added at `epoch`.
pub fn map_val(epoch: Epoch, open: &CommitOpen) -> Hash {
    Preimage::new().u64(epoch).raw(&open.commit()).hash()
}
