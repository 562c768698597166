//! RPC glue: the server's [`RpcHandler`] and typed call stubs.

use std::sync::Arc;

use keywit_core::msg::{SERVER_AUDIT, SERVER_HISTORY, SERVER_PUT, SERVER_START};
use keywit_core::{AuditArgs, HistoryArgs, HistoryReply, PutArgs, RemoteError, StartReply, UpdateProof};
use keywit_net::{NetError, RpcHandler, Transport, decode, encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{error, trace};

use crate::server::Server;

/// Failure of a typed RPC call.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// Delivery or decoding failed.
    #[error("network: {0}")]
    Net(#[from] NetError),

    /// The remote party answered with an error.
    #[error("remote: {0}")]
    Remote(#[from] RemoteError),
}

/// Encode `args`, call `method` at `addr`, and decode a
/// `Result<R, RemoteError>` reply.
pub async fn call<A, R>(net: &dyn Transport, addr: &str, method: u64, args: &A) -> Result<R, CallError>
where
    A: Serialize + Sync,
    R: DeserializeOwned,
{
    let reply = net.call(addr, method, encode(args)?).await?;
    let reply: Result<R, RemoteError> = decode(&reply)?;
    Ok(reply?)
}

/// Encode a reply for the wire.
pub fn encode_reply<T: Serialize>(reply: Result<T, RemoteError>) -> Vec<u8> {
    encode(&reply).unwrap_or_else(|e| {
        error!(error = %e, "failed to encode reply");
        Vec::new()
    })
}

fn decode_args<T: DeserializeOwned>(args: &[u8]) -> Result<T, RemoteError> {
    decode(args).map_err(|e| RemoteError::BadRequest(e.to_string()))
}

/// Serves a [`Server`] over any transport.
pub struct ServerRpc {
    server: Arc<Server>,
}

impl ServerRpc {
    pub fn new(server: Arc<Server>) -> Self {
        Self { server }
    }
}

#[async_trait::async_trait]
impl RpcHandler for ServerRpc {
    async fn handle(&self, method: u64, args: Vec<u8>) -> Vec<u8> {
        trace!(method, len = args.len(), "server rpc");
        match method {
            SERVER_START => encode_reply(self.server.start().map_err(RemoteError::from)),
            SERVER_PUT => {
                let res = match decode_args::<PutArgs>(&args) {
                    // The ticket is dropped: callers learn the outcome via History.
                    Ok(put) => self
                        .server
                        .submit(put)
                        .await
                        .map(|_| ())
                        .map_err(RemoteError::from),
                    Err(e) => Err(e),
                };
                encode_reply(res)
            }
            SERVER_HISTORY => encode_reply(
                decode_args::<HistoryArgs>(&args)
                    .and_then(|a| self.server.history(a).map_err(RemoteError::from)),
            ),
            SERVER_AUDIT => encode_reply(
                decode_args::<AuditArgs>(&args)
                    .and_then(|a| self.server.audit(a.prev_epoch).map_err(RemoteError::from)),
            ),
            other => encode_reply::<()>(Err(RemoteError::UnknownMethod(other))),
        }
    }
}

// ---------------------------------------------------------------------------
// Call stubs
// ---------------------------------------------------------------------------

pub async fn call_start(net: &dyn Transport, addr: &str) -> Result<StartReply, CallError> {
    call(net, addr, SERVER_START, &()).await
}

/// Fire-and-forget put. Success only means the put was queued.
pub async fn call_put(net: &dyn Transport, addr: &str, args: &PutArgs) -> Result<(), CallError> {
    call(net, addr, SERVER_PUT, args).await
}

pub async fn call_history(
    net: &dyn Transport,
    addr: &str,
    args: &HistoryArgs,
) -> Result<HistoryReply, CallError> {
    call(net, addr, SERVER_HISTORY, args).await
}

pub async fn call_audit(
    net: &dyn Transport,
    addr: &str,
    prev_epoch: u64,
) -> Result<Vec<UpdateProof>, CallError> {
    call(net, addr, SERVER_AUDIT, &AuditArgs { prev_epoch }).await
}
