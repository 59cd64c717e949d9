use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::{Error, Result};

/// Top-level node configuration, loaded from a TOML file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// This node's identity and protocol parameters.
    pub tss: TssConfig,
    /// UDP peer-to-peer transport settings.
    pub p2p: P2pConfig,
    /// HTTP RPC server settings.
    pub http: HttpConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            tss: TssConfig::default(),
            p2p: P2pConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

/// Key generation and signing parameters for this node.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TssConfig {
    /// This node's decimal-digit party identity.
    pub pubkey: String,
    /// Total number of parties `n`.
    pub parties: u16,
    /// Key generation threshold `t`.
    pub threshold: u16,
    /// Signing quorum `q`.
    pub quorum: u16,
    /// Path to persist the completed key share to.
    pub key_file: PathBuf,
}

impl Default for TssConfig {
    fn default() -> Self {
        Self {
            pubkey: String::new(),
            parties: 3,
            threshold: 1,
            quorum: 2,
            key_file: PathBuf::from("key.json"),
        }
    }
}

/// Peer-to-peer transport settings.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct P2pConfig {
    /// Address to bind the UDP socket to.
    pub bind_addr: SocketAddr,
    /// Payloads larger than this many bytes are chunked.
    pub udp_buffer_size: usize,
    /// How long, in seconds, a delivered message's hash is remembered
    /// for duplicate suppression.
    pub cache_ttl_secs: u64,
    /// Known peer addresses to announce a handshake to on startup.
    pub bootstrap_peers: Vec<SocketAddr>,
}

impl Default for P2pConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:32100".parse().unwrap(),
            udp_buffer_size: 1200,
            cache_ttl_secs: 600,
            bootstrap_peers: Vec::new(),
        }
    }
}

/// HTTP RPC server settings.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HttpConfig {
    /// Address to bind the RPC server to.
    pub bind_addr: SocketAddr,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".parse().unwrap(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file at `path`.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !fs::try_exists(path).await? {
            return Err(Error::NotFile(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path).await?;
        let config: NodeConfig = toml::from_str(&contents)?;
        if config.tss.quorum <= config.tss.threshold {
            return Err(Error::QuorumTooLow);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_a_valid_threshold_quorum_relationship() {
        let config = NodeConfig::default();
        assert!(config.tss.quorum > config.tss.threshold);
    }
}
