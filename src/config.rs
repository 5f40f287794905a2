//! Configuration management for PebbleChain

use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub miner: MinerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Per-peer timeout applied to chain fetches during consensus.
    #[serde(default = "default_peer_timeout_secs")]
    pub peer_timeout_secs: u64,
    /// Peers registered at startup, as `host:port` strings.
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MinerConfig {
    /// Address credited by the coinbase transaction of every mined block.
    #[serde(default = "default_reward_address")]
    pub reward_address: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            peer_timeout_secs: default_peer_timeout_secs(),
            bootstrap_peers: Vec::new(),
        }
    }
}

impl Default for MinerConfig {
    fn default() -> Self {
        MinerConfig {
            reward_address: default_reward_address(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            network: NetworkConfig::default(),
            miner: MinerConfig::default(),
        }
    }
}

fn default_peer_timeout_secs() -> u64 {
    5
}

fn default_reward_address() -> String {
    "0000000000000000000000000000000000000000000000000000000000000000".to_string()
}

/// Load `config.toml` from the working directory, falling back to defaults
/// when the file is absent.
pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    let config_str = fs::read_to_string("config.toml").unwrap_or_default();
    let config: Config = if config_str.is_empty() {
        Config::default()
    } else {
        toml::from_str(&config_str)?
    };

    if config.miner.reward_address.is_empty() {
        return Err("miner.reward_address must be set in config.toml".into());
    }

    Ok(config)
}
