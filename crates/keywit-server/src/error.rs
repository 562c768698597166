//! Error types for the key transparency server.

use keywit_core::{CoreError, RemoteError};
use keywit_hashchain::ChainError;
use keywit_merkle::MerkleError;
use keywit_types::{Epoch, Uid};

/// Errors from server operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServerError {
    /// A put named a version other than the uid's next one.
    #[error("uid {uid}: put for version {ver}, next version is {expected}")]
    StaleVersion { uid: Uid, ver: u64, expected: u64 },

    /// Another put for the same uid won within this batch.
    #[error("uid {uid}: duplicate put in batch")]
    DuplicateUid { uid: Uid },

    /// Requested epoch is newer than the latest epoch.
    #[error("epoch {epoch} is past the latest epoch {latest}")]
    EpochOutOfRange { epoch: Epoch, latest: Epoch },

    /// Caller claims to know more versions than exist.
    #[error("caller knows {ver_len} versions but only {versions} exist")]
    VersionOutOfRange { ver_len: u64, versions: u64 },

    /// The batch engine has stopped.
    #[error("work queue stopped")]
    Stopped,

    /// An internal invariant failed. Fatal for the batch engine.
    #[error("internal invariant violated: {0}")]
    Internal(String),

    #[error("merkle: {0}")]
    Merkle(#[from] MerkleError),

    #[error("hashchain: {0}")]
    Chain(#[from] ChainError),

    #[error("core: {0}")]
    Core(#[from] CoreError),
}

impl From<&ServerError> for RemoteError {
    fn from(e: &ServerError) -> Self {
        match e {
            ServerError::EpochOutOfRange { epoch, latest } => RemoteError::EpochOutOfRange {
                epoch: *epoch,
                latest: *latest,
            },
            ServerError::VersionOutOfRange { ver_len, versions } => {
                RemoteError::VersionOutOfRange {
                    ver_len: *ver_len,
                    versions: *versions,
                }
            }
            ServerError::StaleVersion { .. } | ServerError::DuplicateUid { .. } => {
                RemoteError::Rejected(e.to_string())
            }
            _ => RemoteError::Unavailable,
        }
    }
}

impl From<ServerError> for RemoteError {
    fn from(e: ServerError) -> Self {
        RemoteError::from(&e)
    }
}
