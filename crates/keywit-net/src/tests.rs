//! Tests for the keywit-net crate.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::{
    LocalNetwork, NetError, NetStats, RpcHandler, TcpTransport, Transport, decode, encode,
    read_frame, serve_tcp, write_frame,
};

/// Echoes args back with the method prepended, and counts calls.
#[derive(Default)]
struct Echo {
    calls: AtomicU64,
}

#[async_trait::async_trait]
impl RpcHandler for Echo {
    async fn handle(&self, method: u64, args: Vec<u8>) -> Vec<u8> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut out = vec![method as u8];
        out.extend_from_slice(&args);
        out
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Msg {
    a: u64,
    b: Vec<u8>,
}

#[test]
fn test_codec_roundtrip_and_truncation() {
    let msg = Msg {
        a: 42,
        b: b"hello".to_vec(),
    };
    let bytes = encode(&msg).unwrap();
    assert_eq!(decode::<Msg>(&bytes).unwrap(), msg);
    let truncated = &bytes[..bytes.len() - 2];
    assert!(matches!(
        decode::<Msg>(truncated),
        Err(NetError::Serialization(_))
    ));
}

#[test]
fn test_integers_encode_as_varints() {
    assert_eq!(encode(&(1u64, 300u64)).unwrap(), vec![0x01, 0xac, 0x02]);
    assert_eq!(encode(&vec![7u8; 3]).unwrap(), vec![3, 7, 7, 7]);
}

#[tokio::test]
async fn test_frames_over_duplex() {
    let (mut a, mut b) = tokio::io::duplex(1024);
    write_frame(&mut a, b"one").await.unwrap();
    write_frame(&mut a, b"").await.unwrap();
    drop(a);
    assert_eq!(read_frame(&mut b).await.unwrap(), Some(b"one".to_vec()));
    assert_eq!(read_frame(&mut b).await.unwrap(), Some(Vec::new()));
    assert_eq!(read_frame(&mut b).await.unwrap(), None);
}

#[tokio::test]
async fn test_oversized_frame_rejected() {
    let (mut a, mut b) = tokio::io::duplex(64);
    tokio::spawn(async move {
        use tokio::io::AsyncWriteExt;
        let _ = a.write_all(&u32::MAX.to_be_bytes()).await;
    });
    assert!(matches!(
        read_frame(&mut b).await,
        Err(NetError::MessageTooLarge { .. })
    ));
}

#[tokio::test]
async fn test_local_routes_by_address() {
    let net = LocalNetwork::new();
    net.register("a", Arc::new(Echo::default()));
    assert_eq!(net.call("a", 3, b"xy".to_vec()).await.unwrap(), b"\x03xy");
    assert!(matches!(
        net.call("b", 0, vec![]).await,
        Err(NetError::Unreachable(_))
    ));
}

#[tokio::test]
async fn test_local_fault_injection() {
    let net = LocalNetwork::new();
    let echo = Arc::new(Echo::default());
    net.register("srv", echo.clone());

    net.set_down("srv", true);
    assert!(net.call("srv", 0, vec![]).await.is_err());
    net.set_down("srv", false);

    net.drop_next(2);
    assert!(matches!(net.call("srv", 0, vec![]).await, Err(NetError::Dropped)));
    assert!(matches!(net.call("srv", 0, vec![]).await, Err(NetError::Dropped)));
    assert!(net.call("srv", 0, vec![]).await.is_ok());
    assert_eq!(echo.calls.load(Ordering::SeqCst), 1);

    net.duplicate_next(1);
    net.call("srv", 0, vec![]).await.unwrap();
    assert_eq!(echo.calls.load(Ordering::SeqCst), 3);

    assert_eq!(
        net.stats(),
        NetStats {
            delivered: 2,
            dropped: 2,
            unreachable: 1,
        }
    );
}

#[tokio::test]
async fn test_lossy_network_is_seeded() {
    async fn pattern(seed: u64) -> Vec<bool> {
        let net = LocalNetwork::lossy(0.5, seed);
        net.register("srv", Arc::new(Echo::default()));
        let mut out = Vec::new();
        for _ in 0..32 {
            out.push(net.call("srv", 0, vec![]).await.is_ok());
        }
        out
    }
    let a = pattern(7).await;
    assert_eq!(a, pattern(7).await);
    assert!(a.iter().any(|ok| *ok));
    assert!(a.iter().any(|ok| !*ok));
}

#[tokio::test]
async fn test_tcp_roundtrip() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let echo = Arc::new(Echo::default());
    tokio::spawn(serve_tcp(listener, echo.clone()));

    let transport = TcpTransport::new();
    for i in 0..5u8 {
        let reply = transport.call(&addr, 9, vec![i]).await.unwrap();
        assert_eq!(reply, vec![9, i]);
    }
    assert_eq!(echo.calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_tcp_connect_failure() {
    // Bind then drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);
    let transport = TcpTransport::new();
    assert!(matches!(
        transport.call(&addr, 0, vec![]).await,
        Err(NetError::Connect(_))
    ));
}
