//! Key transparency server.
//!
//! A [`Server`] owns the hidden directory (a Merkle map of VRF labels to
//! key commitments), the plain directory (uid to key versions), and the
//! hashchain of per-epoch digests with one signed link per epoch.
//!
//! Writes go through a work queue: [`Server::submit`] enqueues a put and
//! returns a [`PutTicket`]; a background batch engine drains the queue and
//! seals one epoch per batch. Reads ([`Server::start`],
//! [`Server::history`], [`Server::audit`]) run concurrently against the
//! latest sealed epoch.
//!
//! [`ServerRpc`] exposes the server over any [`keywit_net::Transport`];
//! the `call_*` stubs are the matching client side.

mod batch;
mod config;
mod error;
pub mod rpc;
mod server;
mod workq;

#[cfg(test)]
mod tests;

pub use config::ServerConfig;
pub use error::ServerError;
pub use rpc::{CallError, ServerRpc, call_audit, call_history, call_put, call_start};
pub use server::Server;
pub use workq::{PutOutcome, PutTicket};
