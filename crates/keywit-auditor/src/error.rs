//! Error types for the auditor.

use keywit_core::{CoreError, RemoteError};
use keywit_server::CallError;
use keywit_types::Epoch;

/// Errors from auditor operations.
#[derive(Debug, thiserror::Error)]
pub enum AuditorError {
    /// Talking to the server failed.
    #[error("server call: {0}")]
    Call(#[from] CallError),

    /// A server reply or update failed to verify.
    #[error("verification: {0}")]
    Verify(#[from] CoreError),

    /// An update skips epochs the auditor has not seen.
    #[error("update starts at epoch {got}, expected at most {expected}")]
    Gap { expected: Epoch, got: Epoch },

    /// Requested epoch is outside what the auditor has verified.
    #[error("epoch {epoch} is outside the synced range [{start}, {end})")]
    NotSynced { epoch: Epoch, start: Epoch, end: Epoch },
}

impl From<&AuditorError> for RemoteError {
    fn from(e: &AuditorError) -> Self {
        match e {
            AuditorError::NotSynced { epoch, start, end } => RemoteError::NotSynced {
                epoch: *epoch,
                start: *start,
                end: *end,
            },
            AuditorError::Verify(_) | AuditorError::Gap { .. } => RemoteError::Rejected(e.to_string()),
            AuditorError::Call(_) => RemoteError::Unavailable,
        }
    }
}

impl From<AuditorError> for RemoteError {
    fn from(e: AuditorError) -> Self {
        RemoteError::from(&e)
    }
}
