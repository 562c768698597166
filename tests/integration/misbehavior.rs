//! Integration test: a server that shows different histories to different
//! parties is caught with portable evidence.
//!
//! The "forked" server is modelled as two honest servers sharing one set of
//! secrets, each fed different puts.

use std::sync::Arc;

use keywit_client::ClientError;
use keywit_core::{Evidence, Party, Suspects};
use keywit_integration_tests::{Deployment, SERVER_SEED, auditor_addr};
use keywit_net::LocalNetwork;

async fn forked() -> (Deployment, Deployment) {
    let net = Arc::new(LocalNetwork::new());
    let left = Deployment::on(net.clone(), "left", SERVER_SEED, 1).await;
    let right = Deployment::on(net, "right", SERVER_SEED, 1).await;
    assert_eq!(left.server.public_key(), right.server.public_key());
    (left, right)
}

fn expect_link_evidence(err: &ClientError) -> &Evidence {
    match err.evidence() {
        Some(e @ Evidence::Link(_)) => e,
        _ => panic!("expected link evidence, got {err}"),
    }
}

/// Two clients on different branches compare tips and convict the server.
#[tokio::test]
async fn test_peer_comparison_yields_evidence() {
    let (left, right) = forked().await;
    let mut alice = left.client_at(7, "left").await;
    let mut bob = right.client_at(8, "right").await;

    alice.put(b"real".to_vec()).await.unwrap();
    right.server.put(7, b"forged".to_vec(), 0).await.unwrap();
    let seen_by_bob = bob.get(7).await.unwrap();
    assert_eq!(seen_by_bob.pk(), Some(&b"forged"[..]));

    let err = bob.compare(&alice.last()).unwrap_err();
    let evidence = expect_link_evidence(&err);
    assert_eq!(err.suspects(), Suspects::from(Party::ServerSig));

    // A third party holding only the server's public key is convinced.
    evidence.check(&left.server.public_key()).unwrap();
    // It does not convict anyone else.
    assert!(evidence.check(&left.auditor(0).public_key()).is_err());
}

/// An auditor following the other branch exposes the fork on audit.
#[tokio::test]
async fn test_cross_branch_audit_yields_evidence() {
    let (left, right) = forked().await;
    let mut alice = left.client_at(7, "left").await;
    alice.put(b"real".to_vec()).await.unwrap();
    right.server.put(7, b"forged".to_vec(), 0).await.unwrap();
    right.sync_auditors().await;

    let auditor = right.auditor(0);
    let err = alice
        .audit(&auditor_addr("right", 0), &auditor.public_key())
        .await
        .unwrap_err();
    expect_link_evidence(&err)
        .check(&left.server.public_key())
        .unwrap();

    // Alice's own branch auditor has no complaint.
    left.sync_auditors().await;
    alice
        .audit(&auditor_addr("left", 0), &left.auditor(0).public_key())
        .await
        .unwrap();
}

/// Branches that only diverge later still agree on their shared prefix.
#[tokio::test]
async fn test_shared_prefix_is_not_evidence() {
    let (left, right) = forked().await;
    for d in [&left, &right] {
        d.server.put(1, b"common".to_vec(), 0).await.unwrap();
    }
    let mut alice = left.client_at(7, "left").await;
    let mut bob = right.client_at(8, "right").await;
    bob.compare(&alice.last()).unwrap();

    alice.put(b"diverge".to_vec()).await.unwrap();
    right.server.put(9, b"other".to_vec(), 0).await.unwrap();
    bob.get(9).await.unwrap();
    assert!(bob.compare(&alice.last()).is_err());
}

/// Equivocating about a client's own key is caught by self-monitoring,
/// but without a second signature it only narrows down the suspects.
#[tokio::test]
async fn test_foreign_key_on_own_uid() {
    let d = Deployment::new(0).await;
    let mut alice = d.client(7).await;
    d.server.put(7, b"mallory".to_vec(), 0).await.unwrap();

    let err = alice.self_mon().await.unwrap_err();
    assert!(err.evidence().is_none());
    assert!(
        err.suspects()
            .is_within(Suspects::of(&[Party::ServerFull, Party::Clients]))
    );
}
