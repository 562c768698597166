//! Verifying key transparency client.
//!
//! A [`Client`] owns one uid. It registers keys for that uid, looks up
//! other uids, monitors its own uid for versions it did not submit, and
//! cross-checks the epochs it has seen against auditors and peers. Every
//! server reply is verified before any local state changes.

mod client;
mod config;
mod error;


pub use client::{Client, Lookup, MonStatus};
pub use config::ClientConfig;
pub use error::ClientError;
