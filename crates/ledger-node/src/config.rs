//! Node configuration: defaults, optional TOML file, then command-line overrides.

use crate::constants::{DEFAULT_LISTEN, DEFAULT_PEER_TIMEOUT_SECS, NODE_ID_BYTES};
use anyhow::{bail, Context, Result};
use ledger_core::constants::{HASH_HEX_SIZE, POW_DIFFICULTY};
use serde::{Deserialize, Serialize};
use std::{fs, net::SocketAddr, path::Path, time::Duration};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub listen: SocketAddr,
    /// Recipient of mining rewards. Generated at start-up when absent.
    pub node_id: Option<String>,
    pub difficulty: u32,
    /// Registered before the server starts accepting requests.
    pub peers: Vec<String>,
    pub peer_timeout_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.parse().expect("default listen addr"),
            node_id: None,
            difficulty: POW_DIFFICULTY,
            peers: Vec::new(),
            peer_timeout_secs: DEFAULT_PEER_TIMEOUT_SECS,
        }
    }
}

impl NodeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.difficulty as usize > HASH_HEX_SIZE {
            bail!(
                "difficulty {} exceeds the {} hex characters of a digest",
                self.difficulty,
                HASH_HEX_SIZE
            );
        }
        if self.peer_timeout_secs == 0 {
            bail!("peer_timeout_secs must be positive");
        }
        if matches!(&self.node_id, Some(id) if id.trim().is_empty()) {
            bail!("node_id must not be blank");
        }
        Ok(())
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_timeout_secs)
    }

    pub fn node_id_or_generate(&self) -> String {
        self.node_id.clone().unwrap_or_else(generate_node_id)
    }
}

/// Random 32-character hex identifier.
pub fn generate_node_id() -> String {
    hex::encode(rand::random::<[u8; NODE_ID_BYTES]>())
}
