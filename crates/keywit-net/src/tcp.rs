//! RPC over tokio TCP.
//!
//! Each call writes one request frame and reads one reply frame on a
//! pooled connection. A request frame is a postcard [`WireRequest`]; the
//! reply frame is the handler's reply bytes unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::codec::{decode, encode, read_frame, write_frame};
use crate::error::NetError;
use crate::{RpcHandler, Transport};

#[derive(Debug, Serialize, Deserialize)]
struct WireRequest {
    method: u64,
    args: Vec<u8>,
}

/// Client side of the TCP transport.
///
/// Idle connections are pooled per address. A connection is checked out
/// for the duration of a call, so concurrent calls to one address open
/// extra connections rather than interleave frames.
#[derive(Default)]
pub struct TcpTransport {
    idle: Mutex<HashMap<String, Vec<TcpStream>>>,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    async fn checkout(&self, addr: &str) -> Result<TcpStream, NetError> {
        if let Some(stream) = self.idle.lock().await.get_mut(addr).and_then(Vec::pop) {
            return Ok(stream);
        }
        debug!(addr, "connecting");
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| NetError::Connect(format!("{addr}: {e}")))?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    async fn checkin(&self, addr: &str, stream: TcpStream) {
        self.idle
            .lock()
            .await
            .entry(addr.to_string())
            .or_default()
            .push(stream);
    }

    async fn call_on(stream: &mut TcpStream, req: &[u8]) -> Result<Vec<u8>, NetError> {
        write_frame(stream, req).await?;
        read_frame(stream).await?.ok_or(NetError::StreamClosed)
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn call(&self, addr: &str, method: u64, args: Vec<u8>) -> Result<Vec<u8>, NetError> {
        let req = encode(&WireRequest { method, args })?;
        let mut stream = self.checkout(addr).await?;
        // A broken stream is dropped rather than returned to the pool.
        let reply = Self::call_on(&mut stream, &req).await?;
        self.checkin(addr, stream).await;
        Ok(reply)
    }
}

/// Serve `handler` on `listener` until the listener fails.
pub async fn serve_tcp(listener: TcpListener, handler: Arc<dyn RpcHandler>) -> Result<(), NetError> {
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!(%peer, "accepted connection");
        let handler = handler.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_conn(stream, handler).await {
                warn!(%peer, error = %e, "connection closed with error");
            }
        });
    }
}

async fn serve_conn(mut stream: TcpStream, handler: Arc<dyn RpcHandler>) -> Result<(), NetError> {
    stream.set_nodelay(true)?;
    while let Some(frame) = read_frame(&mut stream).await? {
        let req: WireRequest = decode(&frame)?;
        let reply = handler.handle(req.method, req.args).await;
        write_frame(&mut stream, &reply).await?;
    }
    Ok(())
}
