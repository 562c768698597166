//! Client error taxonomy.
//!
//! Every failure says who could be at fault ([`ClientError::suspects`]).
//! Only [`ClientError::Evidence`] is portable: it carries two signed
//! statements that any third party can check.

use keywit_core::{Evidence, Party, RemoteError, Suspects};
use keywit_net::NetError;
use keywit_server::CallError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Delivery failed or the reply could not be decoded. Retryable.
    #[error("transport: {0}")]
    Transport(#[from] NetError),

    /// The remote party refused the request.
    #[error("{party:?} refused: {error}")]
    Remote { party: Party, error: RemoteError },

    /// A reply failed to verify and there is no signed contradiction.
    #[error("verification failed (suspects {suspects}): {reason}")]
    Verification { suspects: Suspects, reason: String },

    /// A party signed two contradictory statements.
    #[error("caught misbehavior: {0:?}")]
    Evidence(Box<Evidence>),

    /// `put` was called with a different key while another is pending.
    #[error("a different key is already pending for this uid")]
    PendingMismatch,
}

impl ClientError {
    /// Parties that may be responsible for this error.
    pub fn suspects(&self) -> Suspects {
        match self {
            ClientError::Transport(_) => Party::Unknown.into(),
            ClientError::Remote { party, .. } => (*party).into(),
            ClientError::Verification { suspects, .. } => *suspects,
            // Evidence only ever convicts the server's signing key.
            ClientError::Evidence(_) => Party::ServerSig.into(),
            ClientError::PendingMismatch => Suspects::NONE,
        }
    }

    /// The evidence, if this error carries any.
    pub fn evidence(&self) -> Option<&Evidence> {
        match self {
            ClientError::Evidence(e) => Some(e),
            _ => None,
        }
    }

    pub(crate) fn call(party: Party, err: CallError) -> Self {
        match err {
            CallError::Net(e) => ClientError::Transport(e),
            CallError::Remote(error) => ClientError::Remote { party, error },
        }
    }

    pub(crate) fn blame(suspects: impl Into<Suspects>, reason: impl ToString) -> Self {
        ClientError::Verification {
            suspects: suspects.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<Evidence> for ClientError {
    fn from(e: Evidence) -> Self {
        ClientError::Evidence(Box::new(e))
    }
}
