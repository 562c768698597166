//! Key transparency protocol core.
//!
//! Everything the server, auditor and client must agree on bit-for-bit:
//!
//! - [`sig`]: ed25519 keys and the two domain-separated signed statements
//!   (VRF key attestations and hashchain link attestations).
//! - [`vrf`]: the ristretto255 VRF that turns `(uid, ver)` into a map label.
//! - [`kt`]: labels, commitments and map values of the hidden directory.
//! - [`msg`]: RPC method IDs, request / reply structs and [`RemoteError`].
//! - [`verify`]: the checks every consumer of server replies performs.
//! - [`Evidence`]: portable proof that a key signed contradictory statements.
//! - [`Suspects`]: which parties a failure implicates.

mod blame;
mod error;
mod evidence;
pub mod kt;
pub mod msg;
mod secrets;
pub mod sig;
pub mod verify;
pub mod vrf;

pub use blame::{Party, Suspects};
pub use error::CoreError;
pub use evidence::{Evidence, LinkEvidence, VrfEvidence};
pub use kt::CommitOpen;
pub use msg::{
    AuditArgs, AuditorGetArgs, AuditorGetReply, AuditorUpdateArgs, HistoryArgs, HistoryReply,
    MapUpdate, Memb, NonMemb, PutArgs, RemoteError, SigDig, StartReply, UpdateProof,
};
pub use secrets::{Secrets, random_seed, signing_key_from_seed};
pub use sig::{PublicKey, Signature};
pub use verify::ServerKeys;
pub use vrf::{VrfProof, VrfPublicKey, VrfSecretKey};

/// Re-exported so dependents name the same signing key type.
pub use ed25519_dalek::SigningKey;
