//! error.rs - Error types raised at the provider, price-source, config and store boundaries
//!
//! None of these reach the converter: the watcher and feed absorb them into state flags.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures talking to the wallet provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned an RPC error: {0}")]
    Rpc(String),

    #[error("provider returned a malformed chain id: {0:?}")]
    MalformedChainId(String),

    #[error("provider did not answer within {0:?}")]
    Timeout(Duration),
}

/// Failures fetching a single token quote
#[derive(Debug, Error)]
pub enum QuoteFetchError {
    #[error("request for {symbol} failed: {source}")]
    Transport {
        symbol: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("price source returned status {status} for {symbol}")]
    Status { symbol: String, status: u16 },

    #[error("invalid price {raw:?} for {symbol}")]
    InvalidPrice { symbol: String, raw: String },

    #[error("no quote available for {0}")]
    Missing(String),

    #[error("request for {symbol} timed out after {timeout:?}")]
    Timeout { symbol: String, timeout: Duration },
}

impl QuoteFetchError {
    pub fn symbol(&self) -> &str {
        match self {
            QuoteFetchError::Transport { symbol, .. }
            | QuoteFetchError::Status { symbol, .. }
            | QuoteFetchError::InvalidPrice { symbol, .. }
            | QuoteFetchError::Timeout { symbol, .. } => symbol,
            QuoteFetchError::Missing(symbol) => symbol,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("purchase store I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("purchase store {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
