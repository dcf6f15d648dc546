//! Application configuration (can-net.toml)

use anyhow::{Context, Result};
use can_net_codec::network::schema::Hex;
use can_net_codec::KeyMapping;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "can-net.toml";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Network description, relative to the config file
    pub network: Option<PathBuf>,
    /// Node id the monitor transmits as
    #[serde(default)]
    pub own_node_id: Hex<u8>,
    #[serde(default)]
    pub transport: TransportConfig,
    /// Key symbol to frames sent when it is pressed
    #[serde(default)]
    pub keys: KeyMapping,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
    /// Serial device, a recorded capture file, or `-` for stdin
    pub port: Option<String>,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default)]
    pub parity: ParityConfig,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    /// Read timeout after which a pending line read is retried
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: default_baud_rate(),
            parity: ParityConfig::default(),
            stop_bits: default_stop_bits(),
            data_bits: default_data_bits(),
            timeout_ms: default_timeout(),
        }
    }
}

fn default_baud_rate() -> u32 {
    19200
}

fn default_stop_bits() -> u8 {
    2
}

fn default_data_bits() -> u8 {
    8
}

fn default_timeout() -> u64 {
    100
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParityConfig {
    None,
    Odd,
    #[default]
    Even,
}

impl AppConfig {
    /// Network path resolved against the directory of `config_path`
    pub fn network_path(&self, config_path: &Path) -> Option<PathBuf> {
        let network = self.network.as_ref()?;
        let base = config_path.parent().unwrap_or_else(|| Path::new("."));
        Some(base.join(network))
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    log::debug!(
        "Config: own node 0x{:02X}, {} key binding(s)",
        config.own_node_id.0,
        config.keys.len()
    );

    Ok(config)
}

/// Load `path` if given, else `can-net.toml` in the working directory if it
/// exists, else defaults
pub fn load_or_default(path: Option<&Path>) -> Result<(AppConfig, PathBuf)> {
    match path {
        Some(path) => Ok((load_config(path)?, path.to_path_buf())),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default.is_file() {
                Ok((load_config(&default)?, default))
            } else {
                Ok((AppConfig::default(), default))
            }
        }
    }
}
