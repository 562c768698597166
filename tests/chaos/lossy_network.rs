//! Chaos test: dropped, duplicated and undeliverable calls.
//!
//! Every protocol step tolerates a network that loses or repeats calls.
//! Faults surface as retryable transport errors, never as blame.

use std::sync::Arc;

use keywit_client::ClientError;
use keywit_integration_tests::{Deployment, SERVER, SERVER_SEED, auditor_addr, retry_transport};
use keywit_net::LocalNetwork;

/// 20% of calls are dropped. Puts, lookups and audits still converge.
#[tokio::test]
#[ntest::timeout(60000)]
async fn test_lossy_network_converges() {
    let net = Arc::new(LocalNetwork::lossy(0.2, 7));
    let d = Deployment::on(net, SERVER, SERVER_SEED, 1).await;

    let mut clients = Vec::new();
    for uid in 0..5u64 {
        let mut c = d.client(uid).await;
        c.put(format!("k{uid}").into_bytes()).await.unwrap();
        clients.push(c);
    }

    let mut reader = d.client(100).await;
    for uid in 0..5u64 {
        let lookup = retry_transport!(reader.get(uid).await).unwrap();
        assert_eq!(lookup.pk(), Some(format!("k{uid}").as_bytes()));
    }

    d.sync_auditors().await;
    let addr = auditor_addr(SERVER, 0);
    let pk = d.auditor(0).public_key();
    retry_transport!(reader.audit(&addr, &pk).await).unwrap();
    assert!(d.stats().dropped > 0);
}

/// Duplicated puts are idempotent: each version lands exactly once.
#[tokio::test]
#[ntest::timeout(30000)]
async fn test_duplicated_calls() {
    let d = Deployment::new(0).await;
    let mut alice = d.client(7).await;
    d.net.duplicate_next(1000);

    for ver in 0..3u8 {
        alice.put(vec![ver]).await.unwrap();
    }
    let lookup = alice.get(7).await.unwrap();
    assert_eq!(lookup.history, vec![vec![0], vec![1], vec![2]]);
}

/// A server that is down yields unattributed errors until it returns.
#[tokio::test]
#[ntest::timeout(30000)]
async fn test_server_outage() {
    let d = Deployment::new(0).await;
    let mut alice = d.client(7).await;
    d.net.set_down(SERVER, true);

    let err = alice.get(7).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert!(err.evidence().is_none());

    d.net.set_down(SERVER, false);
    alice.put(b"back".to_vec()).await.unwrap();
    assert_eq!(alice.get(7).await.unwrap().pk(), Some(&b"back"[..]));
}

/// Calls dropped right after a put leave the client pending, not confused.
#[tokio::test]
#[ntest::timeout(30000)]
async fn test_dropped_put_is_resubmitted() {
    let d = Deployment::new(0).await;
    let mut alice = d.client(7).await;
    d.net.drop_next(3);
    let epoch = alice.put(b"persist".to_vec()).await.unwrap();
    assert!(d.server.epoch() >= epoch);
    let lookup = alice.get(7).await.unwrap();
    assert_eq!(lookup.history, vec![b"persist".to_vec()]);
}
