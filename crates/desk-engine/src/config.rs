//! Engine configuration.
//!
//! Loaded from a TOML file named by `DESK_CONFIG` (default
//! `config/default.toml`), falling back to defaults when the file is
//! absent. The encryption passphrase is never written to the config file
//! in production; `DESK_PASSPHRASE` overrides whatever the file holds.

use crate::error::{EngineError, EngineResult};
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Network selector for the perp venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
}

impl Network {
    pub fn is_mainnet(&self) -> bool {
        matches!(self, Network::Mainnet)
    }

    /// Perp venue REST base URL for this network.
    pub fn perps_api_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://api.hyperliquid.xyz",
            Network::Testnet => "https://api.hyperliquid-testnet.xyz",
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Vault passphrase for key-blob encryption. Minimum 32 characters.
    #[serde(default)]
    pub passphrase: String,

    /// Which perp venue network to trade on.
    #[serde(default)]
    pub network: Network,

    /// CLOB venue trading API base URL.
    #[serde(default = "default_clob_api_url")]
    pub clob_api_url: String,

    /// CLOB venue market metadata API base URL.
    #[serde(default = "default_gamma_api_url")]
    pub gamma_api_url: String,

    /// Settlement-chain JSON-RPC endpoint.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// One-shot aggregator base URL.
    #[serde(default = "default_oneinch_url")]
    pub oneinch_url: String,

    /// API key for the one-shot aggregator, if required by the deployment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oneinch_api_key: Option<String>,

    /// Two-phase aggregator base URL.
    #[serde(default = "default_kyber_url")]
    pub kyber_url: String,

    /// Native settlement stablecoin (swap input).
    #[serde(default = "default_usdc_native")]
    pub usdc_native: String,

    /// Bridged stablecoin variant (swap output; CLOB settlement token).
    #[serde(default = "default_usdc_bridged")]
    pub usdc_bridged: String,

    /// CLOB exchange contract, the allowance spender for BUY orders.
    #[serde(default = "default_ctf_exchange")]
    pub ctf_exchange: String,

    /// Minimum priority fee floor in gwei.
    #[serde(default = "default_min_priority_gwei")]
    pub min_priority_gwei: u64,
}

fn default_clob_api_url() -> String {
    "https://clob.polymarket.com".to_string()
}

fn default_gamma_api_url() -> String {
    "https://gamma-api.polymarket.com".to_string()
}

fn default_rpc_url() -> String {
    "https://polygon-rpc.com".to_string()
}

fn default_oneinch_url() -> String {
    "https://api.1inch.dev/swap/v6.0/137".to_string()
}

fn default_kyber_url() -> String {
    "https://aggregator-api.kyberswap.com/polygon/api/v1".to_string()
}

fn default_usdc_native() -> String {
    "0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359".to_string()
}

fn default_usdc_bridged() -> String {
    "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174".to_string()
}

fn default_ctf_exchange() -> String {
    "0x4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E".to_string()
}

fn default_min_priority_gwei() -> u64 {
    desk_chain::DEFAULT_MIN_PRIORITY_GWEI
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            passphrase: String::new(),
            network: Network::default(),
            clob_api_url: default_clob_api_url(),
            gamma_api_url: default_gamma_api_url(),
            rpc_url: default_rpc_url(),
            oneinch_url: default_oneinch_url(),
            oneinch_api_key: None,
            kyber_url: default_kyber_url(),
            usdc_native: default_usdc_native(),
            usdc_bridged: default_usdc_bridged(),
            ctf_exchange: default_ctf_exchange(),
            min_priority_gwei: default_min_priority_gwei(),
        }
    }
}

impl EngineConfig {
    /// Load configuration, preferring `DESK_CONFIG` over the default path,
    /// and `DESK_PASSPHRASE` over the file's passphrase field.
    pub fn load() -> EngineResult<Self> {
        let config_path =
            std::env::var("DESK_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            Self::from_file(&config_path)?
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Self::default()
        };

        if let Ok(passphrase) = std::env::var("DESK_PASSPHRASE") {
            config.passphrase = passphrase;
        }
        Ok(config)
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {e}")))
    }

    fn parse_address(&self, field: &str, value: &str) -> EngineResult<Address> {
        Address::from_str(value)
            .map_err(|e| EngineError::Config(format!("invalid {field} address {value}: {e}")))
    }

    pub fn usdc_native_address(&self) -> EngineResult<Address> {
        self.parse_address("usdc_native", &self.usdc_native)
    }

    pub fn usdc_bridged_address(&self) -> EngineResult<Address> {
        self.parse_address("usdc_bridged", &self.usdc_bridged)
    }

    pub fn ctf_exchange_address(&self) -> EngineResult<Address> {
        self.parse_address("ctf_exchange", &self.ctf_exchange)
    }

    pub fn rpc_url_parsed(&self) -> EngineResult<reqwest::Url> {
        reqwest::Url::parse(&self.rpc_url)
            .map_err(|e| EngineError::Config(format!("invalid rpc_url {}: {e}", self.rpc_url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_addresses_parse() {
        let config = EngineConfig::default();
        assert!(config.usdc_native_address().is_ok());
        assert!(config.usdc_bridged_address().is_ok());
        assert!(config.ctf_exchange_address().is_ok());
        assert!(config.rpc_url_parsed().is_ok());
    }

    #[test]
    fn test_network_urls() {
        assert!(Network::Mainnet.is_mainnet());
        assert!(!Network::Testnet.is_mainnet());
        assert_ne!(
            Network::Mainnet.perps_api_url(),
            Network::Testnet.perps_api_url()
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            passphrase = "a-sufficiently-long-deployment-passphrase"
            network = "mainnet"
            "#,
        )
        .unwrap();

        assert_eq!(config.network, Network::Mainnet);
        assert_eq!(config.min_priority_gwei, 35);
        assert_eq!(config.clob_api_url, default_clob_api_url());
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = EngineConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("network"));
        assert!(toml_str.contains("rpc_url"));
    }
}
