//! Protocol messages exchanged between servers, auditors and clients.
//!
//! Every request and reply is a plain serde struct; the transport layer
//! frames and encodes them. Replies travel as `Result<T, RemoteError>`.

use keywit_merkle::{MembershipProof, NonMembershipProof};
use keywit_types::{Epoch, Hash, Uid};
use serde::{Deserialize, Serialize};

use crate::kt::CommitOpen;
use crate::sig::Signature;
use crate::vrf::{VrfProof, VrfPublicKey};

// ---------------------------------------------------------------------------
// Method IDs
// ---------------------------------------------------------------------------

pub const SERVER_START: u64 = 0;
pub const SERVER_PUT: u64 = 1;
pub const SERVER_HISTORY: u64 = 2;
pub const SERVER_AUDIT: u64 = 3;
pub const AUDITOR_UPDATE: u64 = 4;
pub const AUDITOR_GET: u64 = 5;

// ---------------------------------------------------------------------------
// Proof payloads
// ---------------------------------------------------------------------------

/// One map insertion, provable from the digest that preceded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapUpdate {
    pub label: Hash,
    pub val: Hash,
    /// Proof that `label` was absent just before this insertion.
    pub non_memb: NonMembershipProof,
}

/// Everything an auditor needs to replay one epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProof {
    /// Insertions in the order they were applied.
    pub updates: Vec<MapUpdate>,
    /// Server's signature on the resulting link.
    pub link_sig: Signature,
}

/// Proof that version `ver` of a uid maps to a particular key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memb {
    pub label_proof: VrfProof,
    /// Epoch in which the version was added.
    pub epoch_added: Epoch,
    pub pk_open: CommitOpen,
    pub merkle: MembershipProof,
}

/// Proof that version `ver` of a uid is not registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonMemb {
    pub label_proof: VrfProof,
    pub merkle: NonMembershipProof,
}

/// A signed epoch: the digest, the link committing to it, and the
/// signature over `(epoch, link)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigDig {
    pub epoch: Epoch,
    pub dig: Hash,
    pub link: Hash,
    pub sig: Signature,
}

// ---------------------------------------------------------------------------
// Server RPCs
// ---------------------------------------------------------------------------

/// Reply to `Start`: enough to trust the chain tip and the VRF key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartReply {
    /// Number of epochs before the one carried in `chain_proof`.
    pub prev_epoch_len: u64,
    /// Link after `prev_epoch_len` epochs.
    pub prev_link: Hash,
    /// Digest of the latest epoch.
    pub chain_proof: Vec<u8>,
    /// Server's signature on the latest link.
    pub link_sig: Signature,
    pub vrf_pk: VrfPublicKey,
    pub vrf_sig: Signature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutArgs {
    pub uid: Uid,
    pub pk: Vec<u8>,
    /// Version the key should land at.
    pub ver: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryArgs {
    pub uid: Uid,
    /// Latest epoch the caller has verified.
    pub prev_epoch: Epoch,
    /// Number of versions the caller already knows.
    pub prev_ver_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryReply {
    /// Chain values after `prev_epoch`.
    pub chain_proof: Vec<u8>,
    /// Signature on the latest link.
    pub link_sig: Signature,
    /// Membership proofs for versions `prev_ver_len..`.
    pub hist: Vec<Memb>,
    /// Non-membership proof for the next unassigned version.
    pub bound: NonMemb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditArgs {
    /// Latest epoch the caller has replayed.
    pub prev_epoch: Epoch,
}

// ---------------------------------------------------------------------------
// Auditor RPCs
// ---------------------------------------------------------------------------

/// Pushed epochs for an auditor to replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditorUpdateArgs {
    /// Epoch of `proofs[0]`.
    pub first_epoch: Epoch,
    pub proofs: Vec<UpdateProof>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditorGetArgs {
    pub epoch: Epoch,
}

/// An auditor's record for one epoch, plus the VRF key attestations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditorGetReply {
    pub link: Hash,
    pub serv_link_sig: Signature,
    pub adtr_link_sig: Signature,
    pub vrf_pk: VrfPublicKey,
    pub serv_vrf_sig: Signature,
    pub adtr_vrf_sig: Signature,
}

// ---------------------------------------------------------------------------
// Remote errors
// ---------------------------------------------------------------------------

/// Error returned by a remote party in place of a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum RemoteError {
    #[error("epoch {epoch} is past the latest epoch {latest}")]
    EpochOutOfRange { epoch: Epoch, latest: Epoch },

    #[error("caller knows {ver_len} versions but only {versions} exist")]
    VersionOutOfRange { ver_len: u64, versions: u64 },

    #[error("epoch {epoch} is outside the synced range [{start}, {end})")]
    NotSynced { epoch: Epoch, start: Epoch, end: Epoch },

    #[error("update rejected: {0}")]
    Rejected(String),

    #[error("malformed request: {0}")]
    BadRequest(String),

    #[error("unknown method {0}")]
    UnknownMethod(u64),

    #[error("service unavailable")]
    Unavailable,
}
