//! config.rs - Runtime configuration
//!
//! Defaults, optionally overlaid by a JSON file, then by `PRICING_*` environment variables.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::registry;

/// Default quote refresh interval in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Default bound on each provider or price-source call
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_PRICE_SOURCE_URL: &str = "https://api.coinbase.com/v2/prices";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub poll_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    pub price_source_url: String,
    /// JSON-RPC endpoint standing in for the wallet; None means no provider
    pub wallet_rpc_url: Option<String>,
    pub default_token: String,
    pub purchase_store_path: PathBuf,
    /// Wallet whose purchase history is shown at startup
    pub wallet_address: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            price_source_url: DEFAULT_PRICE_SOURCE_URL.to_string(),
            wallet_rpc_url: None,
            default_token: registry::default_token().symbol.to_string(),
            purchase_store_path: PathBuf::from("purchases.json"),
            wallet_address: None,
        }
    }
}

impl Config {
    /// Load from an optional JSON file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay values from a variable lookup (the process environment in production)
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("PRICING_POLL_INTERVAL_SECS") {
            self.poll_interval_secs = parse_secs("PRICING_POLL_INTERVAL_SECS", value)?;
        }
        if let Some(value) = lookup("PRICING_FETCH_TIMEOUT_SECS") {
            self.fetch_timeout_secs = parse_secs("PRICING_FETCH_TIMEOUT_SECS", value)?;
        }
        if let Some(value) = lookup("PRICING_PRICE_SOURCE_URL") {
            self.price_source_url = value;
        }
        if let Some(value) = lookup("PRICING_WALLET_RPC_URL") {
            self.wallet_rpc_url = if value.trim().is_empty() { None } else { Some(value) };
        }
        if let Some(value) = lookup("PRICING_DEFAULT_TOKEN") {
            self.default_token = value;
        }
        if let Some(value) = lookup("PRICING_PURCHASE_STORE") {
            self.purchase_store_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("PRICING_WALLET_ADDRESS") {
            self.wallet_address = if value.trim().is_empty() { None } else { Some(value) };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid("poll_interval_secs must be positive".into()));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid("fetch_timeout_secs must be positive".into()));
        }
        if registry::token(&self.default_token).is_none() {
            return Err(ConfigError::Invalid(format!(
                "default_token {:?} is not a supported token",
                self.default_token
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn parse_secs(key: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.default_token, "XRP/USD");
        assert!(config.wallet_rpc_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PRICING_POLL_INTERVAL_SECS", "5"),
            ("PRICING_WALLET_RPC_URL", "http://localhost:8545"),
            ("PRICING_DEFAULT_TOKEN", "BTC/USD"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.wallet_rpc_url.as_deref(), Some("http://localhost:8545"));
        assert_eq!(config.default_token, "BTC/USD");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = Config::default();
        let err = config
            .apply_env(|key| (key == "PRICING_FETCH_TIMEOUT_SECS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: "PRICING_FETCH_TIMEOUT_SECS", .. }));
    }

    #[test]
    fn test_validation() {
        let config = Config { poll_interval_secs: 0, ..Config::default() };
        assert!(config.validate().is_err());

        let config = Config { default_token: "DOGE/USD".into(), ..Config::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"poll_interval_secs": 60, "default_token": "ETH/USD"}}"#).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.default_token, "ETH/USD");
        assert_eq!(config.fetch_timeout_secs, DEFAULT_FETCH_TIMEOUT_SECS);
    }
}
