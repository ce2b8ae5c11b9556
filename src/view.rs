//! view.rs - Text rendering of a conversion

use rust_decimal::Decimal;
use std::fmt;

use crate::models::{ConversionResult, NetworkState, TokenDescriptor};
use crate::quote_feed::FeedStatus;

/// Everything needed to render one price panel
#[derive(Debug, Clone)]
pub struct ConversionView {
    pub amount: Decimal,
    pub token: &'static TokenDescriptor,
    pub network: NetworkState,
    pub loading: bool,
    pub error: Option<String>,
    pub result: ConversionResult,
}

impl ConversionView {
    pub fn new(
        amount: Decimal,
        token: &'static TokenDescriptor,
        network: &NetworkState,
        feed: &FeedStatus,
        result: &ConversionResult,
    ) -> Self {
        ConversionView {
            amount,
            token,
            network: network.clone(),
            loading: feed.loading,
            error: feed.error.clone(),
            result: result.clone(),
        }
    }

    /// The headline value, or the placeholder shown in its place
    pub fn headline(&self) -> String {
        if self.loading {
            return "Loading prices...".to_string();
        }
        if let Some(error) = &self.error {
            return error.clone();
        }
        match &self.result.display_value {
            Some(value) => format!("{} {}", value, self.result.target_symbol),
            None => "Loading...".to_string(),
        }
    }
}

impl fmt::Display for ConversionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} Price in {}  |  Current Network: {}",
            self.token.icon, self.token.display_name, self.network.network.name
        )?;
        writeln!(f, "  {}", self.headline())?;
        write!(
            f,
            "  Original price: {} {}",
            self.amount, self.network.network.native_symbol
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;
    use rust_decimal_macros::dec;

    fn view(feed: FeedStatus, value: Option<&str>) -> ConversionView {
        let token = registry::token("BTC/USD").unwrap();
        let network = NetworkState::fallback(registry::fallback_network());
        let result = ConversionResult {
            display_value: value.map(str::to_string),
            target_symbol: "BTC".to_string(),
        };
        ConversionView::new(dec!(1.5), token, &network, &feed, &result)
    }

    #[test]
    fn test_renders_value() {
        let rendered = view(FeedStatus::default(), Some("0.040000")).to_string();
        assert!(rendered.contains("Price in Bitcoin"));
        assert!(rendered.contains("Current Network: Flare Testnet Coston2"));
        assert!(rendered.contains("0.040000 BTC"));
        assert!(rendered.contains("Original price: 1.5 C2FLR"));
    }

    #[test]
    fn test_amount_labelled_with_network_coin() {
        let token = registry::token("XRP/USD").unwrap();
        let result = ConversionResult {
            display_value: Some("0.040000".to_string()),
            target_symbol: "XRP".to_string(),
        };

        let fallback = NetworkState::fallback(registry::fallback_network());
        let rendered = ConversionView::new(dec!(1), token, &fallback, &FeedStatus::default(), &result)
            .to_string();
        assert!(rendered.ends_with("Original price: 1 C2FLR"), "{}", rendered);

        let ethereum = NetworkState::detected(registry::lookup(registry::ETHEREUM.chain_id).unwrap());
        let rendered = ConversionView::new(dec!(1), token, &ethereum, &FeedStatus::default(), &result)
            .to_string();
        assert!(rendered.ends_with("Original price: 1 ETH"), "{}", rendered);
    }

    #[test]
    fn test_headline_states() {
        let loading = FeedStatus { loading: true, ..FeedStatus::default() };
        assert_eq!(view(loading, Some("1.000000")).headline(), "Loading prices...");

        let failed = FeedStatus {
            error: Some("Failed to fetch price data".to_string()),
            ..FeedStatus::default()
        };
        assert_eq!(view(failed, None).headline(), "Failed to fetch price data");

        assert_eq!(view(FeedStatus::default(), None).headline(), "Loading...");
    }
}
