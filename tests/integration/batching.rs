//! Integration test: concurrent puts and epoch batching.

use std::sync::Arc;
use std::time::Duration;

use keywit_core::{PutArgs, Secrets};
use keywit_integration_tests::{Deployment, SERVER_SEED};
use keywit_server::{Server, ServerConfig};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// 20 clients register at once. Every key lands and auditors agree.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_clients() {
    let d = Deployment::new(1).await;
    let mut tasks = Vec::new();
    for uid in 0..20u64 {
        let mut client = d.client(uid).await;
        tasks.push(tokio::spawn(async move {
            client.put(format!("key-{uid}").into_bytes()).await.unwrap();
            client
        }));
    }
    let mut clients = Vec::new();
    for t in tasks {
        clients.push(t.await.unwrap());
    }
    assert!(d.server.epoch() >= 1);

    d.sync_auditors().await;
    assert_eq!(d.auditor(0).get(d.server.epoch()).unwrap().link, d.server.latest().link);
    for (uid, client) in clients.iter_mut().enumerate() {
        let lookup = client.get(uid as u64).await.unwrap();
        assert_eq!(lookup.pk(), Some(format!("key-{uid}").as_bytes()));
    }
}

/// With a batch window, puts arriving together share one epoch.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batch_window_groups_puts() {
    let config = ServerConfig {
        batch_window: Duration::from_millis(100),
        ..ServerConfig::default()
    };
    let server = Arc::new(Server::new(Secrets::from_seed(&SERVER_SEED), config).unwrap());
    let tasks: Vec<_> = (0..10u64)
        .map(|uid| {
            let server = server.clone();
            tokio::spawn(async move { server.put(uid, vec![uid as u8], 0).await })
        })
        .collect();
    for t in tasks {
        assert_eq!(t.await.unwrap().unwrap().sig_dig.epoch, 1);
    }
    assert_eq!(server.epoch(), 1);
}

/// `max_batch` caps how many separate submissions one epoch drains.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_max_batch_splits_epochs() {
    let config = ServerConfig {
        max_batch: 4,
        batch_window: Duration::from_millis(100),
        ..ServerConfig::default()
    };
    let server = Arc::new(Server::new(Secrets::from_seed(&SERVER_SEED), config).unwrap());
    let tasks: Vec<_> = (0..10u64)
        .map(|uid| {
            let server = server.clone();
            tokio::spawn(async move { server.put(uid, vec![uid as u8], 0).await })
        })
        .collect();
    for t in tasks {
        t.await.unwrap().unwrap();
    }
    assert!(server.epoch() >= 3, "10 puts in batches of 4 need 3 epochs");
    for p in server.audit(0).unwrap() {
        assert!(p.updates.len() <= 4);
    }
}

/// The digest an epoch seals depends on its set of puts, not their order.
#[tokio::test]
async fn test_batch_order_does_not_matter() {
    let mut rng = StdRng::seed_from_u64(0x6b77);
    for round in 0..8 {
        let puts: Vec<PutArgs> = (0..24u64)
            .map(|uid| PutArgs {
                uid: uid * 31 + round,
                pk: format!("pk-{uid}").into_bytes(),
                ver: 0,
            })
            .collect();
        let mut shuffled = puts.clone();
        shuffled.shuffle(&mut rng);

        let mut links = Vec::new();
        for order in [puts, shuffled] {
            let server =
                Server::new(Secrets::from_seed(&SERVER_SEED), ServerConfig::default()).unwrap();
            for t in server.submit_batch(order).await.unwrap() {
                t.wait().await.unwrap();
            }
            assert_eq!(server.epoch(), 1);
            links.push(server.latest().link);
        }
        assert_eq!(links[0], links[1], "round {round}");
    }
}
