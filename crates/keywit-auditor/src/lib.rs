//! Key transparency auditor.
//!
//! An [`Auditor`] follows one server. It bootstraps from the server's
//! signed tip, then pulls (or is pushed) each epoch's update proof, replays
//! the insertions to derive the digest itself, and countersigns the link
//! only once the server's own signature on that link checks out. Clients
//! fetch the countersigned links with [`call_get`] and compare them with
//! what the server showed them.

mod auditor;
mod config;
mod error;
mod rpc;


pub use auditor::Auditor;
pub use config::AuditorConfig;
pub use error::AuditorError;
pub use rpc::{AuditorRpc, call_get, call_update};
