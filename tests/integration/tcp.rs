//! Integration test: server, auditor and client over real TCP sockets.

use std::sync::Arc;

use ed25519_dalek::SigningKey;
use keywit_auditor::{Auditor, AuditorConfig, AuditorRpc};
use keywit_client::{Client, ClientConfig};
use keywit_core::Secrets;
use keywit_integration_tests::SERVER_SEED;
use keywit_net::{TcpTransport, serve_tcp};
use keywit_server::{Server, ServerConfig, ServerRpc};
use tokio::net::TcpListener;

async fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    (listener, addr)
}

#[tokio::test]
async fn test_full_flow_over_tcp() {
    let server = Arc::new(
        Server::new(Secrets::from_seed(&SERVER_SEED), ServerConfig::default()).unwrap(),
    );
    let (listener, server_addr) = listen().await;
    tokio::spawn(serve_tcp(listener, Arc::new(ServerRpc::new(server.clone()))));

    let net = Arc::new(TcpTransport::new());
    let auditor = Arc::new(
        Auditor::new(
            net.clone(),
            server_addr.clone(),
            server.public_key(),
            SigningKey::from_bytes(&[9; 32]),
            AuditorConfig::default(),
        )
        .await
        .unwrap(),
    );
    let (listener, auditor_addr) = listen().await;
    tokio::spawn(serve_tcp(listener, Arc::new(AuditorRpc::new(auditor.clone()))));

    let mut alice = Client::new(
        7,
        net.clone(),
        server_addr.clone(),
        server.public_key(),
        ClientConfig::default(),
    )
    .await
    .unwrap();
    let mut bob = Client::new(8, net, server_addr, server.public_key(), ClientConfig::default())
        .await
        .unwrap();

    alice.put(b"pk0".to_vec()).await.unwrap();
    assert_eq!(bob.get(7).await.unwrap().pk(), Some(&b"pk0"[..]));

    auditor.update().await.unwrap();
    alice.audit(&auditor_addr, &auditor.public_key()).await.unwrap();
    bob.audit(&auditor_addr, &auditor.public_key()).await.unwrap();
}
