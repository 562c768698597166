//! RPC transport seam for keywit.
//!
//! Parties talk through a single call primitive,
//! `call(addr, method, args) -> reply`, modelled by the [`Transport`]
//! trait. The receiving side implements [`RpcHandler`]. Neither side
//! assumes exactly-once delivery: calls may be lost or repeated, and every
//! protocol built on top tolerates that.
//!
//! - [`LocalNetwork`]: in-memory routing with fault injection.
//! - [`TcpTransport`] / [`serve_tcp`]: length-prefixed frames over TCP.
//! - [`encode`] / [`decode`]: the postcard codec for message structs.

mod codec;
mod error;
mod local;
mod tcp;
#[cfg(test)]
mod tests;

pub use codec::{MAX_MESSAGE_SIZE, decode, encode, read_frame, write_frame};
pub use error::NetError;
pub use local::{LocalNetwork, NetStats};
pub use tcp::{TcpTransport, serve_tcp};

/// Outgoing half of an RPC: deliver `args` to `method` at `addr`.
///
/// Trait so tests can swap in [`LocalNetwork`] or a fault-injecting
/// wrapper instead of sockets.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, addr: &str, method: u64, args: Vec<u8>) -> Result<Vec<u8>, NetError>;
}

/// Incoming half of an RPC. Always produces reply bytes; application
/// errors are encoded inside the reply.
#[async_trait::async_trait]
pub trait RpcHandler: Send + Sync {
    async fn handle(&self, method: u64, args: Vec<u8>) -> Vec<u8>;
}
