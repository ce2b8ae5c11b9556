//! Collectible Storefront Pricing Core
//!
//! Network awareness and price conversion for a wallet-driven collectible storefront
//!
//! # Components
//! - NetworkWatcher: detects the wallet's chain and follows chain changes
//! - QuoteFeed: polls token quotes on a fixed interval
//! - Converter: prices a native-currency amount in a selected token
//!
//! # Architecture
//! ```text
//! ┌──────────────────┐                 ┌──────────────────┐
//! │  WalletProvider  │                 │   PriceSource    │
//! │ (RPC / Mock)     │                 │ (HTTP / Static)  │
//! └────────┬─────────┘                 └────────┬─────────┘
//!          │ chain id, chainChanged             │ one quote per token
//!          ▼                                    ▼
//! ┌──────────────────┐                 ┌──────────────────┐
//! │  NetworkWatcher  │                 │    QuoteFeed     │
//! │  NetworkState    │                 │  QuoteSnapshot   │
//! └────────┬─────────┘                 └────────┬─────────┘
//!          └─────────────────┬──────────────────┘
//!                            ▼
//!              ┌───────────────────────────┐
//!              │ ConversionTracker         │
//!              │ amount + selected token   │
//!              │ → converter::convert      │
//!              └─────────────┬─────────────┘
//!                            ▼
//!                     ConversionView
//! ```

pub mod config;
pub mod converter;
pub mod error;
pub mod models;
pub mod network_watcher;
pub mod price_feed;
pub mod provider;
pub mod quote_feed;
pub mod registry;
pub mod storefront;
pub mod subsystem;
pub mod view;

// Re-export commonly used types
pub use config::Config;
pub use converter::convert;
pub use error::{ConfigError, ProviderError, QuoteFetchError, StoreError};
pub use models::{
    ChainId,
    ConversionResult,
    NetworkCondition,
    NetworkDescriptor,
    NetworkState,
    QuoteSnapshot,
    TokenDescriptor,
};
pub use network_watcher::{NetworkWatcher, RefreshOutcome};
pub use price_feed::{HttpPriceSource, PriceSource, StaticPriceSource};
pub use provider::{MockWalletProvider, RpcWalletProvider, WalletProvider};
pub use quote_feed::{FeedStatus, PollOutcome, QuoteFeed};
pub use storefront::{CartItem, JsonPurchaseStore, PurchaseRecord, PurchaseStore};
pub use subsystem::{ConversionTracker, PricingSubsystem};
pub use view::ConversionView;

/// Version of the pricing core
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the package
pub const NAME: &str = env!("CARGO_PKG_NAME");
