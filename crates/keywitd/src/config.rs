//! TOML configuration for the keywit daemon.
//!
//! Every field has a default, so an empty file (or no file) is valid.
//! CLI flags override file values in `main.rs`.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use keywit_auditor::AuditorConfig;
use keywit_core::PublicKey;
use keywit_server::ServerConfig;
use serde::Deserialize;

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub server: ServerSection,
    pub auditor: AuditorSection,
    pub log: LogSection,
}

/// `[server]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Address the RPC listener binds to.
    pub listen_addr: String,
    /// Hex secret seed. Random (and so ephemeral) if unset.
    pub seed: Option<String>,
    pub queue_capacity: usize,
    pub max_batch: usize,
    /// Milliseconds to wait for more puts after the first of a batch.
    pub batch_window_ms: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self {
            listen_addr: "0.0.0.0:4830".to_string(),
            seed: None,
            queue_capacity: defaults.queue_capacity,
            max_batch: defaults.max_batch,
            batch_window_ms: defaults.batch_window.as_millis() as u64,
        }
    }
}

impl ServerSection {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            queue_capacity: self.queue_capacity,
            max_batch: self.max_batch,
            batch_window: Duration::from_millis(self.batch_window_ms),
        }
    }
}

/// `[auditor]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AuditorSection {
    pub listen_addr: String,
    /// Address of the server to follow.
    pub server_addr: String,
    /// Hex ed25519 public key of the server.
    pub server_pk: Option<String>,
    /// Hex secret seed for the auditor's signing key.
    pub seed: Option<String>,
    pub poll_interval_ms: u64,
}

impl Default for AuditorSection {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:4831".to_string(),
            server_addr: "127.0.0.1:4830".to_string(),
            server_pk: None,
            seed: None,
            poll_interval_ms: AuditorConfig::default().poll_interval.as_millis() as u64,
        }
    }
}

impl AuditorSection {
    pub fn auditor_config(&self) -> AuditorConfig {
        AuditorConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level filter (e.g. `"info"`, `"debug"`, `"warn"`).
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CliConfig {
    /// Load config from a TOML file, or use defaults if no path given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("failed to read {}", p.display()))?;
                Ok(toml::from_str(&content)?)
            }
            None => Ok(Self::default()),
        }
    }

    #[cfg(test)]
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

/// Parse 32 hex-encoded bytes.
fn parse_32(s: &str, what: &str) -> anyhow::Result<[u8; 32]> {
    let bytes = hex::decode(s.trim()).with_context(|| format!("{what} is not valid hex"))?;
    let Ok(arr) = <[u8; 32]>::try_from(bytes.as_slice()) else {
        bail!("{what} must be 32 bytes, got {}", bytes.len());
    };
    Ok(arr)
}

pub fn parse_seed(s: &str) -> anyhow::Result<[u8; 32]> {
    parse_32(s, "seed")
}

pub fn parse_public_key(s: &str) -> anyhow::Result<PublicKey> {
    Ok(PublicKey(parse_32(s, "public key")?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
listen_addr = "127.0.0.1:5830"
seed = "0101010101010101010101010101010101010101010101010101010101010101"
queue_capacity = 16
max_batch = 8
batch_window_ms = 5

[auditor]
listen_addr = "127.0.0.1:5831"
server_addr = "10.0.0.1:5830"
server_pk = "abababababababababababababababababababababababababababababababab"
poll_interval_ms = 250

[log]
level = "debug"
"#;
        let config = CliConfig::from_toml(toml).unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:5830");
        let server = config.server.server_config();
        assert_eq!(server.queue_capacity, 16);
        assert_eq!(server.max_batch, 8);
        assert_eq!(server.batch_window, Duration::from_millis(5));
        assert_eq!(parse_seed(config.server.seed.as_deref().unwrap()).unwrap(), [1; 32]);

        assert_eq!(config.auditor.server_addr, "10.0.0.1:5830");
        assert_eq!(
            parse_public_key(config.auditor.server_pk.as_deref().unwrap()).unwrap(),
            PublicKey([0xab; 32])
        );
        assert_eq!(
            config.auditor.auditor_config().poll_interval,
            Duration::from_millis(250)
        );
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = CliConfig::from_toml("").unwrap();
        assert_eq!(config.server.listen_addr, "0.0.0.0:4830");
        assert!(config.server.seed.is_none());
        assert_eq!(config.server.server_config().max_batch, 1024);
        assert_eq!(config.server.server_config().batch_window, Duration::ZERO);
        assert_eq!(config.auditor.auditor_config().poll_interval, Duration::from_secs(1));
        assert!(config.auditor.server_pk.is_none());
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_parse_partial_config() {
        let config = CliConfig::from_toml("[auditor]\npoll_interval_ms = 10\n").unwrap();
        assert_eq!(config.auditor.poll_interval_ms, 10);
        // Unspecified fields and sections get defaults.
        assert_eq!(config.auditor.listen_addr, "0.0.0.0:4831");
        assert_eq!(config.server.queue_capacity, 1024);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keywit.toml");
        std::fs::write(&path, "[server]\nlisten_addr = \"127.0.0.1:9999\"\n").unwrap();
        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:9999");
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CliConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
        assert!(CliConfig::load(None).is_ok());
    }

    #[test]
    fn test_parse_seed_rejects_bad_input() {
        assert!(parse_seed("zz").is_err());
        assert!(parse_seed("0102").is_err());
        assert_eq!(parse_seed(&"00".repeat(32)).unwrap(), [0; 32]);
    }
}
