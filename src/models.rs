//! models.rs - Core data structures for the pricing subsystem
//!
//! Defines chain identifiers, network and token descriptors, quote snapshots
//! and the derived conversion result.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::QuoteFetchError;

/// Identifies a blockchain network, rendered in `0x`-prefixed lowercase hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct ChainId(pub u64);

impl ChainId {
    /// Parse a hex chain identifier such as `0xaa36a7`.
    /// Returns None for anything that is not `0x` followed by hex digits.
    pub fn from_hex(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let digits = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))?;
        if digits.is_empty() {
            return None;
        }
        u64::from_str_radix(digits, 16).ok().map(ChainId)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl From<ChainId> for String {
    fn from(id: ChainId) -> Self {
        id.to_string()
    }
}

impl FromStr for ChainId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChainId::from_hex(s).ok_or_else(|| format!("malformed chain id: {:?}", s))
    }
}

/// Static metadata for a supported network
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkDescriptor {
    pub chain_id: ChainId,
    pub name: &'static str,
    pub native_symbol: &'static str,
    /// Token pair that prices the native asset (e.g. "ETH/USD")
    pub native_quote: &'static str,
    pub rpc_endpoints: &'static [&'static str],
    pub block_explorer_urls: &'static [&'static str],
}

impl fmt::Display for NetworkDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.chain_id)
    }
}

/// A quotable token in pair form ("BASE/QUOTE") plus its presentation metadata
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TokenDescriptor {
    pub symbol: &'static str,
    pub display_name: &'static str,
    pub icon: &'static str,
    pub gradient: &'static str,
    pub icon_class: &'static str,
}

impl TokenDescriptor {
    /// Returns the base leg of the pair (e.g. "BTC" for "BTC/USD")
    pub fn base_symbol(&self) -> &'static str {
        self.symbol.split('/').next().unwrap_or(self.symbol)
    }
}

impl fmt::Display for TokenDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// Prices for every configured token taken at one poll instant.
///
/// Built once and never mutated; a newer poll produces a whole new snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteSnapshot {
    quotes: BTreeMap<String, Decimal>,
    pub fetched_at: DateTime<Utc>,
}

impl QuoteSnapshot {
    /// Build a snapshot, rejecting negative prices
    pub fn new(
        quotes: BTreeMap<String, Decimal>,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self, QuoteFetchError> {
        if let Some((symbol, price)) = quotes.iter().find(|(_, p)| **p < Decimal::ZERO) {
            return Err(QuoteFetchError::InvalidPrice {
                symbol: symbol.clone(),
                raw: price.to_string(),
            });
        }
        Ok(QuoteSnapshot { quotes, fetched_at })
    }

    pub fn get(&self, symbol: &str) -> Option<Decimal> {
        self.quotes.get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.quotes.iter().map(|(s, p)| (s.as_str(), *p))
    }

    /// Check if the snapshot is stale (older than max_age_seconds)
    pub fn is_stale(&self, max_age_seconds: i64) -> bool {
        let age = Utc::now().signed_duration_since(self.fetched_at);
        age.num_seconds() > max_age_seconds
    }
}

/// Non-fatal condition raised by the last network refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NetworkCondition {
    /// No wallet provider, or the provider failed to answer
    ProviderUnavailable,
    /// The provider is on a chain the registry does not know
    UnsupportedNetwork(ChainId),
    /// The provider answered with something that is not a chain id
    MalformedChainId(String),
}

impl fmt::Display for NetworkCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkCondition::ProviderUnavailable => write!(f, "wallet provider unavailable"),
            NetworkCondition::UnsupportedNetwork(id) => write!(f, "unsupported network {}", id),
            NetworkCondition::MalformedChainId(raw) => write!(f, "malformed chain id {:?}", raw),
        }
    }
}

/// The network the wallet is on, or the fallback default
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkState {
    pub network: &'static NetworkDescriptor,
    /// True once a provider has reported a supported chain
    pub detected: bool,
}

impl NetworkState {
    pub fn fallback(network: &'static NetworkDescriptor) -> Self {
        NetworkState {
            network,
            detected: false,
        }
    }

    pub fn detected(network: &'static NetworkDescriptor) -> Self {
        NetworkState {
            network,
            detected: true,
        }
    }
}

/// Derived output of the converter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionResult {
    /// Converted amount with six decimal places, absent when not computable
    pub display_value: Option<String>,
    pub target_symbol: String,
}

impl ConversionResult {
    pub fn is_computable(&self) -> bool {
        self.display_value.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_chain_id_parsing() {
        assert_eq!(ChainId::from_hex("0x1"), Some(ChainId(1)));
        assert_eq!(ChainId::from_hex("0xAA36A7"), Some(ChainId(11155111)));
        assert_eq!(ChainId::from_hex(" 0x72 "), Some(ChainId(114)));
        assert_eq!(ChainId::from_hex("0x"), None);
        assert_eq!(ChainId::from_hex("114"), None);
        assert_eq!(ChainId::from_hex("0xzz"), None);
        assert_eq!(ChainId::from_hex(""), None);
    }

    #[test]
    fn test_chain_id_display() {
        assert_eq!(ChainId(11155111).to_string(), "0xaa36a7");
        assert_eq!("0x72".parse::<ChainId>().unwrap(), ChainId(114));
    }

    #[test]
    fn test_snapshot_rejects_negative_price() {
        let mut quotes = BTreeMap::new();
        quotes.insert("ETH/USD".to_string(), dec!(-1));

        let err = QuoteSnapshot::new(quotes, Utc::now()).unwrap_err();
        assert!(matches!(err, QuoteFetchError::InvalidPrice { .. }));
    }

    #[test]
    fn test_snapshot_staleness() {
        let mut quotes = BTreeMap::new();
        quotes.insert("ETH/USD".to_string(), dec!(2000));
        let snapshot =
            QuoteSnapshot::new(quotes, Utc::now() - chrono::Duration::seconds(120)).unwrap();

        assert!(snapshot.is_stale(60)); // 120s old > 60s max
        assert!(!snapshot.is_stale(180)); // 120s old < 180s max
        assert_eq!(snapshot.get("ETH/USD"), Some(dec!(2000)));
        assert_eq!(snapshot.get("BTC/USD"), None);
    }

    #[test]
    fn test_token_base_symbol() {
        let token = TokenDescriptor {
            symbol: "BTC/USD",
            display_name: "Bitcoin",
            icon: "",
            gradient: "",
            icon_class: "",
        };
        assert_eq!(token.base_symbol(), "BTC");
    }
}
