//! `keywitd`: the keywit daemon.
//!
//! Runs a key transparency server or an auditor over TCP.
//!
//! # Usage
//!
//! ```text
//! keywitd keygen                                   # print a fresh seed and its keys
//! keywitd server --seed <hex>                      # serve the directory
//! keywitd server -c keywit.toml -l 127.0.0.1:4830  # with a config file
//! keywitd auditor --server-addr 127.0.0.1:4830 --server-pk <hex>
//! ```

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use keywit_auditor::{Auditor, AuditorRpc};
use keywit_core::{PublicKey, Secrets, random_seed, signing_key_from_seed};
use keywit_net::{TcpTransport, serve_tcp};
use keywit_server::{Server, ServerRpc};
use tokio::net::TcpListener;
use tracing::{info, warn};

use config::{CliConfig, parse_public_key, parse_seed};

// -----------------------------------------------------------------------
// CLI definition
// -----------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "keywitd", version, about = "keywit key transparency daemon")]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the key directory.
    Server {
        /// Override the listen address (e.g. "127.0.0.1:4830").
        #[arg(short = 'l', long)]
        listen_addr: Option<String>,

        /// Hex secret seed. Without one the server's keys are ephemeral.
        #[arg(long, env = "KEYWIT_SEED")]
        seed: Option<String>,
    },

    /// Follow a server, countersign its epochs and serve them.
    Auditor {
        #[arg(short = 'l', long)]
        listen_addr: Option<String>,

        /// Address of the server to follow.
        #[arg(long)]
        server_addr: Option<String>,

        /// Hex public key of the server.
        #[arg(long, env = "KEYWIT_SERVER_PK")]
        server_pk: Option<String>,

        /// Hex secret seed for the auditor's signing key.
        #[arg(long, env = "KEYWIT_AUDITOR_SEED")]
        seed: Option<String>,
    },

    /// Print a fresh seed and the public keys derived from it.
    Keygen {
        /// Derive from this seed instead of a random one.
        #[arg(long)]
        seed: Option<String>,
    },
}

// -----------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;

    setup_tracing(&config.log.level);

    match cli.command {
        Commands::Server { listen_addr, seed } => {
            // CLI args override config file values.
            if let Some(addr) = listen_addr {
                config.server.listen_addr = addr;
            }
            if seed.is_some() {
                config.server.seed = seed;
            }
            cmd_server(config).await
        }
        Commands::Auditor {
            listen_addr,
            server_addr,
            server_pk,
            seed,
        } => {
            if let Some(addr) = listen_addr {
                config.auditor.listen_addr = addr;
            }
            if let Some(addr) = server_addr {
                config.auditor.server_addr = addr;
            }
            if server_pk.is_some() {
                config.auditor.server_pk = server_pk;
            }
            if seed.is_some() {
                config.auditor.seed = seed;
            }
            cmd_auditor(config).await
        }
        Commands::Keygen { seed } => cmd_keygen(seed.as_deref()),
    }
}

/// Initialize the `tracing` subscriber with the given level filter.
///
/// Respects `RUST_LOG` env var if set, otherwise uses the config value.
fn setup_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn seed_or_random(seed: Option<&str>, role: &str) -> Result<[u8; 32]> {
    match seed {
        Some(s) => parse_seed(s),
        None => {
            warn!(role, "no seed configured, using ephemeral keys");
            Ok(random_seed())
        }
    }
}

// -----------------------------------------------------------------------
// keywitd server
// -----------------------------------------------------------------------

async fn cmd_server(config: CliConfig) -> Result<()> {
    let seed = seed_or_random(config.server.seed.as_deref(), "server")?;
    let secrets = Secrets::from_seed(&seed);
    let pk = secrets.public_key();

    let server = Arc::new(
        Server::new(secrets, config.server.server_config()).context("failed to start server")?,
    );
    let listener = TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen_addr))?;

    info!(
        addr = %config.server.listen_addr,
        pk = %hex::encode(pk.0),
        "server ready"
    );
    serve_tcp(listener, Arc::new(ServerRpc::new(server)))
        .await
        .context("server listener failed")?;
    Ok(())
}

// -----------------------------------------------------------------------
// keywitd auditor
// -----------------------------------------------------------------------

async fn cmd_auditor(config: CliConfig) -> Result<()> {
    let section = &config.auditor;
    let server_pk: PublicKey = section
        .server_pk
        .as_deref()
        .context("auditor needs the server's public key (--server-pk)")
        .and_then(parse_public_key)?;
    let seed = seed_or_random(section.seed.as_deref(), "auditor")?;

    let net = Arc::new(TcpTransport::new());
    let auditor = Arc::new(
        Auditor::new(
            net,
            section.server_addr.clone(),
            server_pk,
            signing_key_from_seed(&seed),
            section.auditor_config(),
        )
        .await
        .context("failed to bootstrap auditor")?,
    );

    let runner = auditor.clone();
    tokio::spawn(async move { runner.run().await });

    let listener = TcpListener::bind(&section.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", section.listen_addr))?;
    info!(
        addr = %section.listen_addr,
        server = %section.server_addr,
        pk = %hex::encode(auditor.public_key().0),
        epoch = auditor.epoch(),
        "auditor ready"
    );
    serve_tcp(listener, Arc::new(AuditorRpc::new(auditor)))
        .await
        .context("auditor listener failed")?;
    Ok(())
}

// -----------------------------------------------------------------------
// keywitd keygen
// -----------------------------------------------------------------------

fn cmd_keygen(seed: Option<&str>) -> Result<()> {
    let seed = match seed {
        Some(s) => parse_seed(s)?,
        None => random_seed(),
    };
    let secrets = Secrets::from_seed(&seed);
    println!("seed:       {}", hex::encode(seed));
    println!("public key: {}", hex::encode(secrets.public_key().0));
    println!("vrf key:    {}", hex::encode(secrets.vrf.public().0));
    Ok(())
}
