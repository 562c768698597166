//! Work queue feeding the batch engine.
//!
//! Each submission is a `Vec<WorkItem>` on a bounded channel so that a
//! multi-put submission lands in a single batch. Each item carries a
//! oneshot sender that the engine completes exactly once.

use keywit_core::{Memb, NonMemb, PutArgs, SigDig};
use tokio::sync::{mpsc, oneshot};

use crate::config::ServerConfig;
use crate::error::ServerError;

/// What a put produced once its epoch sealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOutcome {
    /// The epoch the key landed in.
    pub sig_dig: SigDig,
    /// Proof of the new version against `sig_dig.dig`.
    pub memb: Memb,
    /// Proof that the following version is still free.
    pub bound: NonMemb,
}

pub(crate) type Completion = oneshot::Sender<Result<PutOutcome, ServerError>>;

pub(crate) struct WorkItem {
    pub(crate) args: PutArgs,
    pub(crate) done: Completion,
}

/// Handle to a submitted put. Resolves once the put's batch is processed.
#[derive(Debug)]
pub struct PutTicket {
    rx: oneshot::Receiver<Result<PutOutcome, ServerError>>,
}

impl PutTicket {
    pub(crate) fn new() -> (Completion, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// Wait for the outcome. A stopped engine yields [`ServerError::Stopped`].
    pub async fn wait(self) -> Result<PutOutcome, ServerError> {
        self.rx.await.unwrap_or(Err(ServerError::Stopped))
    }
}

/// Wait for at least one submission, then drain whatever else is queued.
pub(crate) async fn next_batch(
    rx: &mut mpsc::Receiver<Vec<WorkItem>>,
    config: &ServerConfig,
) -> Option<Vec<WorkItem>> {
    let mut batch = rx.recv().await?;
    if !config.batch_window.is_zero() {
        tokio::time::sleep(config.batch_window).await;
    }
    while batch.len() < config.max_batch {
        match rx.try_recv() {
            Ok(more) => batch.extend(more),
            Err(_) => break,
        }
    }
    Some(batch)
}
