//! RPC glue for the auditor.

use std::sync::Arc;

use keywit_core::msg::{AUDITOR_GET, AUDITOR_UPDATE};
use keywit_core::{AuditorGetArgs, AuditorGetReply, AuditorUpdateArgs, RemoteError};
use keywit_net::{RpcHandler, Transport, decode};
use keywit_server::rpc::{CallError, call, encode_reply};
use keywit_types::Epoch;
use tracing::trace;

use crate::auditor::Auditor;

/// Serves an [`Auditor`] over any transport.
pub struct AuditorRpc {
    auditor: Arc<Auditor>,
}

impl AuditorRpc {
    pub fn new(auditor: Arc<Auditor>) -> Self {
        Self { auditor }
    }
}

fn decode_args<T: serde::de::DeserializeOwned>(args: &[u8]) -> Result<T, RemoteError> {
    decode(args).map_err(|e| RemoteError::BadRequest(e.to_string()))
}

#[async_trait::async_trait]
impl RpcHandler for AuditorRpc {
    async fn handle(&self, method: u64, args: Vec<u8>) -> Vec<u8> {
        trace!(method, len = args.len(), "auditor rpc");
        match method {
            AUDITOR_UPDATE => encode_reply(
                decode_args::<AuditorUpdateArgs>(&args)
                    .and_then(|a| self.auditor.apply(a).map_err(RemoteError::from)),
            ),
            AUDITOR_GET => encode_reply(
                decode_args::<AuditorGetArgs>(&args)
                    .and_then(|a| self.auditor.get(a.epoch).map_err(RemoteError::from)),
            ),
            other => encode_reply::<()>(Err(RemoteError::UnknownMethod(other))),
        }
    }
}

/// Push update proofs to an auditor. Returns how many epochs were new.
pub async fn call_update(
    net: &dyn Transport,
    addr: &str,
    args: &AuditorUpdateArgs,
) -> Result<u64, CallError> {
    call(net, addr, AUDITOR_UPDATE, args).await
}

pub async fn call_get(net: &dyn Transport, addr: &str, epoch: Epoch) -> Result<AuditorGetReply, CallError> {
    call(net, addr, AUDITOR_GET, &AuditorGetArgs { epoch }).await
}
