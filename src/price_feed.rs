//! price_feed.rs - Price sources the quote feed polls
//!
//! A source answers one request per token pair. The production source reads
//! spot prices over HTTP; `StaticPriceSource` serves fixed prices for tests and demos.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::QuoteFetchError;

/// Trait defining the interface for price sources
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Fetch the current price for a pair such as "BTC/USD"
    async fn fetch_quote(&self, symbol: &str) -> Result<Decimal, QuoteFetchError>;
}

/// Parse a decimal price string, rejecting negatives and garbage
pub fn parse_price(symbol: &str, raw: &str) -> Result<Decimal, QuoteFetchError> {
    let invalid = || QuoteFetchError::InvalidPrice {
        symbol: symbol.to_string(),
        raw: raw.to_string(),
    };
    let price = Decimal::from_str(raw.trim()).map_err(|_| invalid())?;
    if price < Decimal::ZERO {
        return Err(invalid());
    }
    Ok(price)
}

// ============================================================================
// Spot price API response structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct SpotResponse {
    data: SpotData,
}

#[derive(Debug, Deserialize)]
struct SpotData {
    amount: String,
}

// ============================================================================
// HttpPriceSource - spot prices over HTTP
// ============================================================================

/// Reads `GET {base_url}/{BASE}-{QUOTE}/spot` returning `{"data":{"amount":"..."}}`
#[derive(Debug, Clone)]
pub struct HttpPriceSource {
    client: Client,
    base_url: String,
}

impl HttpPriceSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(HttpPriceSource {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn spot_url(&self, symbol: &str) -> String {
        format!("{}/{}/spot", self.base_url, symbol.replace('/', "-"))
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    fn name(&self) -> &str {
        "http-spot"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Decimal, QuoteFetchError> {
        let url = self.spot_url(symbol);
        debug!("Fetching from: {}", url);

        let transport = |source| QuoteFetchError::Transport {
            symbol: symbol.to_string(),
            source,
        };

        let response = self.client.get(&url).send().await.map_err(transport)?;

        if !response.status().is_success() {
            return Err(QuoteFetchError::Status {
                symbol: symbol.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body: SpotResponse = response.json().await.map_err(transport)?;
        parse_price(symbol, &body.data.amount)
    }
}

// ============================================================================
// StaticPriceSource - For testing purposes
// ============================================================================

/// Price source serving prices set in memory
#[derive(Debug, Default)]
pub struct StaticPriceSource {
    prices: Mutex<HashMap<String, Decimal>>,
    failing: Mutex<HashSet<String>>,
    delay: Mutex<Duration>,
    requests: AtomicUsize,
}

impl StaticPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prices<'a, I>(prices: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Decimal)>,
    {
        let source = Self::new();
        for (symbol, price) in prices {
            source.set_price(symbol, price);
        }
        source
    }

    pub fn set_price(&self, symbol: &str, price: Decimal) {
        self.prices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(symbol.to_string(), price);
    }

    /// Make requests for `symbol` fail until `recover` is called
    pub fn fail(&self, symbol: &str) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(symbol.to_string());
    }

    pub fn recover(&self, symbol: &str) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(symbol);
    }

    /// Delay applied to every request after its answer is decided
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap_or_else(|e| e.into_inner()) = delay;
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Decimal, QuoteFetchError> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        // Answer is fixed when the request is made, as a remote source would
        let failing = self
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(symbol);
        let price = self
            .prices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(symbol)
            .copied();

        let delay = *self.delay.lock().unwrap_or_else(|e| e.into_inner());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if failing {
            return Err(QuoteFetchError::Status {
                symbol: symbol.to_string(),
                status: 503,
            });
        }
        price.ok_or_else(|| QuoteFetchError::Missing(symbol.to_string()))
    }
}
