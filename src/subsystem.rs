//! subsystem.rs - The owned pricing subsystem
//!
//! Starts the network watcher and the quote feed, exposes their latest state
//! through read accessors, and hands out conversion trackers that recompute
//! whenever the network or the quotes change. Dropping or shutting down the
//! subsystem stops both background activities.

use log::{debug, info};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::watch;

use crate::config::Config;
use crate::converter;
use crate::error::ConfigError;
use crate::models::{ConversionResult, NetworkCondition, NetworkState, TokenDescriptor};
use crate::network_watcher::{NetworkWatcher, RefreshOutcome, WatcherHandle};
use crate::price_feed::PriceSource;
use crate::provider::WalletProvider;
use crate::quote_feed::{FeedHandle, FeedStatus, PollOutcome, PollStats, QuoteFeed};
use crate::registry;
use crate::view::ConversionView;

pub struct PricingSubsystem {
    watcher: Arc<NetworkWatcher>,
    feed: Arc<QuoteFeed>,
    watcher_handle: WatcherHandle,
    feed_handle: FeedHandle,
    default_token: &'static TokenDescriptor,
}

impl PricingSubsystem {
    /// Start watching the wallet network and polling quotes for every supported token.
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: &Config,
        provider: Option<Arc<dyn WalletProvider>>,
        source: Arc<dyn PriceSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let default_token = registry::token(&config.default_token).ok_or_else(|| {
            ConfigError::Invalid(format!("unknown default token {:?}", config.default_token))
        })?;

        if provider.is_none() {
            info!("No wallet provider configured, using {}", registry::fallback_network());
        }

        let watcher = Arc::new(NetworkWatcher::new(provider, config.fetch_timeout()));
        let symbols = registry::supported_tokens().iter().map(|t| t.symbol);
        let feed = Arc::new(QuoteFeed::new(source, symbols, config.fetch_timeout()));

        let watcher_handle = Arc::clone(&watcher).start();
        let feed_handle = Arc::clone(&feed).start(config.poll_interval());

        info!(
            "Pricing subsystem started: {} tokens, polling every {}s",
            feed.symbols().len(),
            config.poll_interval_secs
        );

        Ok(PricingSubsystem {
            watcher,
            feed,
            watcher_handle,
            feed_handle,
            default_token,
        })
    }

    pub fn network(&self) -> NetworkState {
        self.watcher.state()
    }

    pub fn network_condition(&self) -> Option<NetworkCondition> {
        self.watcher.last_condition()
    }

    pub fn quotes(&self) -> FeedStatus {
        self.feed.status()
    }

    pub fn poll_stats(&self) -> PollStats {
        self.feed.stats()
    }

    pub fn default_token(&self) -> &'static TokenDescriptor {
        self.default_token
    }

    /// Re-query the wallet outside of a chain-change notification
    pub async fn refresh_network(&self) -> RefreshOutcome {
        self.watcher.refresh().await
    }

    /// Poll quotes outside of the schedule; skipped if a poll is running
    pub async fn poll_quotes(&self) -> PollOutcome {
        self.feed.poll().await
    }

    /// One-off conversion against the current state
    pub fn convert(&self, amount: Decimal, token: &TokenDescriptor) -> ConversionResult {
        let network = self.watcher.state();
        let snapshot = self.feed.snapshot();
        converter::convert(amount, snapshot.as_deref(), token, &network)
    }

    /// A conversion of `amount` into the default token that follows state changes
    pub fn track(&self, amount: Decimal) -> ConversionTracker {
        ConversionTracker::new(
            amount,
            self.default_token,
            self.watcher.subscribe(),
            self.feed.subscribe(),
        )
    }

    /// Stop both background activities; nothing mutates state afterwards
    pub async fn shutdown(self) {
        debug!("Shutting down pricing subsystem");
        self.watcher_handle.shutdown().await;
        self.feed_handle.shutdown().await;
        info!("Pricing subsystem stopped");
    }
}

/// Live conversion of one amount into a selectable token
pub struct ConversionTracker {
    amount: Decimal,
    token: &'static TokenDescriptor,
    network: watch::Receiver<NetworkState>,
    feed: watch::Receiver<FeedStatus>,
    result: ConversionResult,
}

impl ConversionTracker {
    fn new(
        amount: Decimal,
        token: &'static TokenDescriptor,
        network: watch::Receiver<NetworkState>,
        feed: watch::Receiver<FeedStatus>,
    ) -> Self {
        let mut tracker = ConversionTracker {
            amount,
            token,
            network,
            feed,
            result: ConversionResult {
                display_value: None,
                target_symbol: token.base_symbol().to_string(),
            },
        };
        tracker.recompute();
        tracker
    }

    fn recompute(&mut self) {
        let network = self.network.borrow_and_update().clone();
        let snapshot = self.feed.borrow_and_update().snapshot.clone();
        self.result = converter::convert(self.amount, snapshot.as_deref(), self.token, &network);
    }

    pub fn result(&self) -> &ConversionResult {
        &self.result
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn token(&self) -> &'static TokenDescriptor {
        self.token
    }

    pub fn set_amount(&mut self, amount: Decimal) -> &ConversionResult {
        self.amount = amount;
        self.recompute();
        &self.result
    }

    /// Switch target token; unknown symbols leave the selection unchanged
    pub fn select_token(&mut self, symbol: &str) -> Option<&ConversionResult> {
        let token = registry::token(symbol)?;
        self.token = token;
        self.recompute();
        Some(&self.result)
    }

    /// Wait for the network or the quotes to change, then recompute.
    /// Returns None once the subsystem has shut down.
    pub async fn changed(&mut self) -> Option<&ConversionResult> {
        let upstream = tokio::select! {
            r = self.network.changed() => r,
            r = self.feed.changed() => r,
        };
        if upstream.is_err() {
            return None;
        }
        self.recompute();
        Some(&self.result)
    }

    /// Snapshot of everything the price panel renders
    pub fn view(&self) -> ConversionView {
        let network = self.network.borrow().clone();
        let feed = self.feed.borrow().clone();
        ConversionView::new(self.amount, self.token, &network, &feed, &self.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChainId;
    use crate::price_feed::StaticPriceSource;
    use crate::provider::MockWalletProvider;
    use crate::registry::{COSTON2, ETHEREUM};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn prices() -> Arc<StaticPriceSource> {
        Arc::new(StaticPriceSource::with_prices([
            ("FLR/USD", dec!(0.02)),
            ("XRP/USD", dec!(0.5)),
            ("BTC/USD", dec!(50000.00)),
            ("ETH/USD", dec!(2000.00)),
        ]))
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_provider_uses_fallback() {
        let source: Arc<dyn PriceSource> = prices();
        let subsystem = PricingSubsystem::start(&Config::default(), None, source).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(*subsystem.network().network, COSTON2);
        assert_eq!(
            subsystem.network_condition(),
            Some(NetworkCondition::ProviderUnavailable)
        );
        // 100 C2FLR at $0.02 priced in XRP at $0.5
        let xrp = registry::token("XRP/USD").unwrap();
        assert_eq!(
            subsystem.convert(dec!(100), xrp).display_value.as_deref(),
            Some("4.000000")
        );
        subsystem.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_tracker_follows_network_and_token() {
        let provider = Arc::new(MockWalletProvider::new(COSTON2.chain_id));
        let wallet: Arc<dyn WalletProvider> = provider.clone();
        let source: Arc<dyn PriceSource> = prices();
        let subsystem = PricingSubsystem::start(&Config::default(), Some(wallet), source).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let mut tracker = subsystem.track(dec!(1));
        assert_eq!(tracker.token().symbol, "XRP/USD");
        assert_eq!(tracker.result().display_value.as_deref(), Some("0.040000"));

        provider.switch_chain(ETHEREUM.chain_id);
        let result = tracker.changed().await.unwrap().clone();
        assert_eq!(result.display_value.as_deref(), Some("4000.000000"));

        let result = tracker.select_token("BTC/USD").unwrap();
        assert_eq!(result.display_value.as_deref(), Some("0.040000"));
        assert!(tracker.select_token("DOGE/USD").is_none());
        assert_eq!(tracker.token().symbol, "BTC/USD");

        assert_eq!(tracker.set_amount(dec!(2.5)).display_value.as_deref(), Some("0.100000"));
        assert!(tracker.view().to_string().contains("0.100000 BTC"));

        subsystem.shutdown().await;
        assert!(tracker.changed().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tracker_follows_scheduled_quotes() {
        let source = prices();
        let feed_source: Arc<dyn PriceSource> = source.clone();
        let subsystem = PricingSubsystem::start(&Config::default(), None, feed_source).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let mut tracker = subsystem.track(dec!(1));
        assert_eq!(tracker.result().display_value.as_deref(), Some("0.040000"));

        // Next scheduled poll at 30s picks up the new FLR price
        source.set_price("FLR/USD", dec!(0.05));
        let updated = tokio::time::timeout(Duration::from_secs(60), async {
            loop {
                let result = tracker.changed().await.unwrap();
                if result.display_value.as_deref() != Some("0.040000") {
                    return result.clone();
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(updated.display_value.as_deref(), Some("0.100000"));
        assert_eq!(*subsystem.network().network, COSTON2);
        assert_eq!(subsystem.poll_stats().completed, 2);
        assert!(tracker.view().to_string().contains("0.100000 XRP"));

        subsystem.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_chain_keeps_conversion() {
        let provider = Arc::new(MockWalletProvider::new(ETHEREUM.chain_id));
        let wallet: Arc<dyn WalletProvider> = provider.clone();
        let source: Arc<dyn PriceSource> = prices();
        let subsystem = PricingSubsystem::start(&Config::default(), Some(wallet), source).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let btc = registry::token("BTC/USD").unwrap();
        let before = subsystem.convert(dec!(1), btc);

        provider.switch_chain(ChainId(56));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(*subsystem.network().network, ETHEREUM);
        assert_eq!(subsystem.convert(dec!(1), btc), before);
        subsystem.shutdown().await;
    }
}
