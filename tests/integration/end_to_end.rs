//! Integration test: the full register / look up / audit flow.
//!
//! One server, two auditors, a handful of clients on a reliable network.

use keywit_core::sig::verify_link_sig;
use keywit_core::verify::replay_updates;
use keywit_integration_tests::{Deployment, SERVER, auditor_addr};

/// uid 7 registers two keys; another client sees both versions; auditors
/// replay both epochs to the server's exact links; every audit is clean.
#[tokio::test]
async fn test_register_lookup_audit() {
    let d = Deployment::new(2).await;
    assert_eq!(d.server.epoch(), 0);

    let mut alice = d.client(7).await;
    let mut bob = d.client(8).await;

    let first = alice.put(b"pk0".to_vec()).await.unwrap();
    let lookup = bob.get(7).await.unwrap();
    assert!(lookup.epoch >= first);
    assert_eq!(lookup.pk(), Some(&b"pk0"[..]));

    let second = alice.put(b"pk1".to_vec()).await.unwrap();
    assert!(second > first);
    let lookup = bob.get(7).await.unwrap();
    assert_eq!(lookup.pk(), Some(&b"pk1"[..]));
    assert_eq!(lookup.history[0], b"pk0");

    // Queued behind any resubmitted puts, so the tip is stable afterwards.
    d.server.put(99, b"pk99".to_vec(), 0).await.unwrap();
    alice.get(7).await.unwrap();
    d.sync_auditors().await;
    let tip = d.server.latest();
    assert_eq!(alice.last(), tip);
    for (i, auditor) in d.auditors().iter().enumerate() {
        assert_eq!(auditor.epoch(), tip.epoch);
        let reply = auditor.get(tip.epoch).unwrap();
        assert_eq!(reply.link, tip.link, "auditor {i} diverged");
        verify_link_sig(&auditor.public_key(), tip.epoch, &reply.link, &reply.adtr_link_sig)
            .unwrap();

        alice
            .audit(&auditor_addr(SERVER, i), &auditor.public_key())
            .await
            .unwrap();
        bob.audit(&auditor_addr(SERVER, i), &auditor.public_key())
            .await
            .unwrap();
    }
}

/// Replaying the server's own update proofs reproduces its digest.
#[tokio::test]
async fn test_update_proofs_replay_to_digest() {
    let d = Deployment::new(0).await;
    let genesis = d.server.digest();
    for uid in 0..10 {
        let mut c = d.client(uid).await;
        c.put(format!("key-{uid}").into_bytes()).await.unwrap();
    }

    let mut dig = genesis;
    for proof in d.server.audit(0).unwrap() {
        dig = replay_updates(&dig, &proof.updates).unwrap();
    }
    assert_eq!(dig, d.server.digest());
}

/// Clients that only ever saw honest epochs agree when they compare notes.
#[tokio::test]
async fn test_peers_agree() {
    let d = Deployment::new(0).await;
    let mut alice = d.client(1).await;
    let mut bob = d.client(2).await;
    alice.put(b"a".to_vec()).await.unwrap();
    bob.put(b"b".to_vec()).await.unwrap();
    alice.get(2).await.unwrap();

    alice.compare(&bob.last()).unwrap();
    bob.compare(&alice.last()).unwrap();
}

/// Self-monitoring stays quiet while other uids change.
#[tokio::test]
async fn test_self_monitoring_across_epochs() {
    let d = Deployment::new(0).await;
    let mut alice = d.client(1).await;
    alice.put(b"a0".to_vec()).await.unwrap();
    for uid in 10..15 {
        d.server.put(uid, b"noise".to_vec(), 0).await.unwrap();
    }
    let status = alice.self_mon().await.unwrap();
    assert!(!status.changed);
    assert_eq!(status.epoch, d.server.epoch());

    alice.put(b"a1".to_vec()).await.unwrap();
    let lookup = alice.get(1).await.unwrap();
    assert_eq!(lookup.history, vec![b"a0".to_vec(), b"a1".to_vec()]);
}
