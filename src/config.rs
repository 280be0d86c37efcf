use alloy::primitives::Address;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use std::time::Duration;

use crate::tokens::registry::TokenLists;
use crate::tracker::types::BridgeDirection;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    pub networks: Vec<NetworkConfig>,
    pub bridges: Vec<BridgeConfig>,
    pub price: Option<PriceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

// ============================================================
// Networks
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    pub name: String,
    pub rpc_http: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_rpc_retries")]
    pub rpc_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_rpc_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    500
}

impl NetworkConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ============================================================
// Bridges & directions
// ============================================================

/// One side of a bridge: the token lists, safe and cashiers deployed on a single network.
#[derive(Debug, Deserialize, Clone)]
pub struct BridgeConfig {
    pub name: String,
    pub network: String,
    pub standard_token_list: String,
    pub proxy_token_list: String,
    pub safe: String,
    #[serde(default = "default_token_page_size")]
    pub token_page_size: u8,
    #[serde(default = "default_tvl_interval_secs")]
    pub tvl_interval_secs: u64,
    pub directions: Vec<DirectionConfig>,
}

fn default_token_page_size() -> u8 {
    10
}

fn default_tvl_interval_secs() -> u64 {
    600
}

#[derive(Debug, Deserialize, Clone)]
pub struct DirectionConfig {
    pub name: String,
    pub destination: String,
    pub cashier: String,
    pub start_block: u64,
    #[serde(default = "default_window_size")]
    pub window_size: u64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub confirmations: u64,
}

fn default_window_size() -> u64 {
    2000
}

fn default_poll_interval_secs() -> u64 {
    20
}

impl BridgeConfig {
    pub fn token_lists(&self) -> eyre::Result<TokenLists> {
        Ok(TokenLists {
            standard: parse_address(&self.standard_token_list, &self.name)?,
            proxy: parse_address(&self.proxy_token_list, &self.name)?,
            page_size: self.token_page_size,
        })
    }

    pub fn safe_address(&self) -> eyre::Result<Address> {
        parse_address(&self.safe, &self.name)
    }

    pub fn tvl_interval(&self) -> Duration {
        Duration::from_secs(self.tvl_interval_secs)
    }

    /// Build the immutable direction records scanned on this bridge's network.
    pub fn directions(&self) -> eyre::Result<Vec<BridgeDirection>> {
        self.directions
            .iter()
            .map(|d| {
                Ok(BridgeDirection {
                    name: d.name.clone(),
                    bridge: self.name.clone(),
                    source: self.network.clone(),
                    destination: d.destination.clone(),
                    cashier: parse_address(&d.cashier, &d.name)?,
                    start_block: d.start_block,
                    window_size: d.window_size,
                    confirmations: d.confirmations,
                    poll_interval: Duration::from_secs(d.poll_interval_secs),
                })
            })
            .collect()
    }
}

// ============================================================
// Price Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct PriceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub endpoint: String,
    #[serde(default = "default_price_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Symbol -> quote API id, e.g. `IOTX = "iotex"`.
    #[serde(default)]
    pub symbols: BTreeMap<String, String>,
}

fn default_price_interval_secs() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

// ============================================================
// API Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_port")]
    pub port: u16,
    #[serde(default = "default_api_host")]
    pub host: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

fn default_api_port() -> u16 {
    3000
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn parse_address(value: &str, owner: &str) -> eyre::Result<Address> {
    if !value.starts_with("0x") || value.len() != 42 {
        return Err(eyre::eyre!("Invalid address '{}' in '{}'", value, owner));
    }
    Address::from_str(value)
        .map_err(|e| eyre::eyre!("Invalid address '{}' in '{}': {}", value, owner, e))
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn network(&self, name: &str) -> Option<&NetworkConfig> {
        self.networks.iter().find(|n| n.name == name)
    }

    fn validate(&self) -> eyre::Result<()> {
        if self.bridges.is_empty() {
            return Err(eyre::eyre!("At least one bridge must be configured"));
        }

        let mut direction_names = HashSet::new();
        for bridge in &self.bridges {
            if self.network(&bridge.network).is_none() {
                return Err(eyre::eyre!(
                    "Bridge '{}' references unknown network '{}'",
                    bridge.name,
                    bridge.network
                ));
            }
            if bridge.token_page_size == 0 {
                return Err(eyre::eyre!(
                    "Bridge '{}' must have a non-zero token_page_size",
                    bridge.name
                ));
            }
            if bridge.tvl_interval_secs == 0 {
                return Err(eyre::eyre!(
                    "Bridge '{}' must have a non-zero tvl_interval_secs",
                    bridge.name
                ));
            }
            bridge.token_lists()?;
            bridge.safe_address()?;

            for direction in &bridge.directions {
                if !direction_names.insert(direction.name.as_str()) {
                    return Err(eyre::eyre!(
                        "Direction name '{}' is configured more than once",
                        direction.name
                    ));
                }
                if direction.window_size == 0 {
                    return Err(eyre::eyre!(
                        "Direction '{}' must have a non-zero window_size",
                        direction.name
                    ));
                }
                if direction.poll_interval_secs == 0 {
                    return Err(eyre::eyre!(
                        "Direction '{}' must have a non-zero poll_interval_secs",
                        direction.name
                    ));
                }
            }
            bridge.directions()?;
        }

        if let Some(price) = &self.price {
            if price.enabled && price.interval_secs == 0 {
                return Err(eyre::eyre!("price.interval_secs must be non-zero"));
            }
        }
        Ok(())
    }
}
