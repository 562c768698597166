//! Shared test harness for keywit integration tests.
//!
//! Provides [`Deployment`]: one server and N auditors wired onto a
//! [`LocalNetwork`], plus helpers to spin up clients and bring auditors up
//! to date. Helpers retry transport failures so the same tests run on a
//! lossy network.

use std::sync::Arc;

use ed25519_dalek::SigningKey;
use keywit_auditor::{Auditor, AuditorConfig, AuditorError, AuditorRpc};
use keywit_client::{Client, ClientConfig, ClientError};
use keywit_core::Secrets;
use keywit_net::LocalNetwork;
use keywit_server::{Server, ServerConfig, ServerRpc};

pub use keywit_net::NetStats;

/// Address the server is registered under.
pub const SERVER: &str = "server";

/// Seed every test server derives its secrets from, unless overridden.
pub const SERVER_SEED: [u8; 32] = [1; 32];

/// Upper bound on retries of a call that keeps failing in transport.
pub const MAX_ATTEMPTS: usize = 1000;

/// Retry an async client call while it fails with a transport error.
///
/// The expression is re-evaluated on every attempt.
#[macro_export]
macro_rules! retry_transport {
    ($call:expr) => {{
        let mut attempts = 0;
        loop {
            match $call {
                Err(::keywit_client::ClientError::Transport(_))
                    if attempts < $crate::MAX_ATTEMPTS =>
                {
                    attempts += 1;
                    ::tokio::task::yield_now().await;
                }
                other => break other,
            }
        }
    }};
}

/// A server with its auditors on one in-memory network.
pub struct Deployment {
    pub net: Arc<LocalNetwork>,
    pub server: Arc<Server>,
    auditors: Vec<Arc<Auditor>>,
}

impl Deployment {
    /// Reliable network, default server seed.
    pub async fn new(n_auditors: usize) -> Self {
        Self::on(Arc::new(LocalNetwork::new()), SERVER, SERVER_SEED, n_auditors).await
    }

    /// Build on an existing network, registering the server under
    /// `server_addr`. Auditors are registered as `"{server_addr}/auditor-{i}"`.
    pub async fn on(
        net: Arc<LocalNetwork>,
        server_addr: &str,
        seed: [u8; 32],
        n_auditors: usize,
    ) -> Self {
        let server = Arc::new(
            Server::new(Secrets::from_seed(&seed), ServerConfig::default())
                .expect("server starts"),
        );
        net.register(server_addr, Arc::new(ServerRpc::new(server.clone())));

        let mut auditors = Vec::with_capacity(n_auditors);
        for i in 0..n_auditors {
            let auditor = Arc::new(bootstrap_auditor(&net, server_addr, &server, i).await);
            net.register(auditor_addr(server_addr, i), Arc::new(AuditorRpc::new(auditor.clone())));
            auditors.push(auditor);
        }
        Self {
            net,
            server,
            auditors,
        }
    }

    pub fn auditor(&self, i: usize) -> &Arc<Auditor> {
        &self.auditors[i]
    }

    pub fn auditors(&self) -> &[Arc<Auditor>] {
        &self.auditors
    }

    /// A client for `uid` talking to the server at `server_addr`.
    pub async fn client_at(&self, uid: u64, server_addr: &str) -> Client {
        let config = ClientConfig {
            poll_interval: std::time::Duration::from_millis(2),
            ..ClientConfig::default()
        };
        retry_transport!(
            Client::new(
                uid,
                self.net.clone(),
                server_addr,
                self.server.public_key(),
                config.clone(),
            )
            .await
        )
        .expect("client connects")
    }

    pub async fn client(&self, uid: u64) -> Client {
        self.client_at(uid, SERVER).await
    }

    /// Pull updates into every auditor until each reaches the server's
    /// latest epoch.
    pub async fn sync_auditors(&self) {
        let target = self.server.epoch();
        for auditor in &self.auditors {
            let mut attempts = 0;
            while auditor.epoch() < target {
                match auditor.update().await {
                    Ok(_) | Err(AuditorError::Call(_)) if attempts < MAX_ATTEMPTS => attempts += 1,
                    res => panic!("auditor failed to sync: {res:?}"),
                }
            }
        }
    }

    pub fn stats(&self) -> NetStats {
        self.net.stats()
    }
}

/// Address of auditor `i` of the server at `server_addr`.
pub fn auditor_addr(server_addr: &str, i: usize) -> String {
    format!("{server_addr}/auditor-{i}")
}

/// Signing key of auditor `i`. Distinct per index, stable across runs.
pub fn auditor_key(i: usize) -> SigningKey {
    let mut seed = [0xa0; 32];
    seed[0] = i as u8;
    SigningKey::from_bytes(&seed)
}

async fn bootstrap_auditor(net: &Arc<LocalNetwork>, server_addr: &str, server: &Server, i: usize) -> Auditor {
    for _ in 0..MAX_ATTEMPTS {
        match Auditor::new(
            net.clone(),
            server_addr,
            server.public_key(),
            auditor_key(i),
            AuditorConfig::default(),
        )
        .await
        {
            Ok(a) => return a,
            Err(AuditorError::Call(_)) => tokio::task::yield_now().await,
            Err(e) => panic!("auditor {i} failed to bootstrap: {e}"),
        }
    }
    panic!("auditor {i} never reached the server");
}

/// Whether a client error is transport noise rather than a finding.
pub fn is_transport(e: &ClientError) -> bool {
    matches!(e, ClientError::Transport(_))
}
