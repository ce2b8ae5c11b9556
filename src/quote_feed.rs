//! quote_feed.rs - Periodic polling of token quotes
//!
//! Each poll requests every configured token concurrently. The published
//! snapshot is only ever replaced by a complete set of quotes; a failed poll
//! keeps the previous snapshot and raises the error flag instead.

use chrono::Utc;
use log::{debug, error, info};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

use crate::error::QuoteFetchError;
use crate::models::QuoteSnapshot;
use crate::price_feed::PriceSource;

/// What the view layer sees of the feed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedStatus {
    /// Last good snapshot; None until the first successful poll
    pub snapshot: Option<Arc<QuoteSnapshot>>,
    pub loading: bool,
    /// Set by a failed poll, cleared by the next successful one
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Updated(Arc<QuoteSnapshot>),
    Failed(String),
    /// Another poll was already in flight
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
}

pub struct QuoteFeed {
    source: Arc<dyn PriceSource>,
    symbols: Vec<String>,
    status: watch::Sender<FeedStatus>,
    in_flight: tokio::sync::Mutex<()>,
    timeout: Duration,
    completed: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

impl QuoteFeed {
    pub fn new<I, S>(source: Arc<dyn PriceSource>, symbols: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (status, _) = watch::channel(FeedStatus::default());

        QuoteFeed {
            source,
            symbols: symbols.into_iter().map(Into::into).collect(),
            status,
            in_flight: tokio::sync::Mutex::new(()),
            timeout,
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn status(&self) -> FeedStatus {
        self.status.borrow().clone()
    }

    pub fn snapshot(&self) -> Option<Arc<QuoteSnapshot>> {
        self.status.borrow().snapshot.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedStatus> {
        self.status.subscribe()
    }

    pub fn stats(&self) -> PollStats {
        PollStats {
            completed: self.completed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
        }
    }

    /// Fetch every configured quote and publish them as one snapshot.
    ///
    /// Returns `Skipped` without touching anything if a poll is already running.
    pub async fn poll(&self) -> PollOutcome {
        let _in_flight = match self.in_flight.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Quote poll already in flight, skipping");
                self.skipped.fetch_add(1, Ordering::SeqCst);
                return PollOutcome::Skipped;
            }
        };

        let _loading = LoadingFlag::raise(&self.status);
        debug!("Polling {} quotes from {}", self.symbols.len(), self.source.name());

        let fetches = self.symbols.iter().map(|symbol| self.fetch_one(symbol));
        let result = futures::future::try_join_all(fetches)
            .await
            .and_then(|prices| {
                let quotes: BTreeMap<String, Decimal> = prices.into_iter().collect();
                QuoteSnapshot::new(quotes, Utc::now())
            });

        match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.status.send_modify(|status| {
                    status.snapshot = Some(Arc::clone(&snapshot));
                    status.loading = false;
                    status.error = None;
                });
                self.completed.fetch_add(1, Ordering::SeqCst);
                info!("✓ Quotes refreshed: {} entries", snapshot.len());
                PollOutcome::Updated(snapshot)
            }
            Err(e) => {
                let message = format!("Failed to fetch price data: {}", e);
                error!("✗ {}", message);
                self.status.send_modify(|status| {
                    status.loading = false;
                    status.error = Some(message.clone());
                });
                self.failed.fetch_add(1, Ordering::SeqCst);
                PollOutcome::Failed(message)
            }
        }
    }

    async fn fetch_one(&self, symbol: &str) -> Result<(String, Decimal), QuoteFetchError> {
        match tokio::time::timeout(self.timeout, self.source.fetch_quote(symbol)).await {
            Ok(price) => price.map(|p| (symbol.to_string(), p)),
            Err(_) => Err(QuoteFetchError::Timeout {
                symbol: symbol.to_string(),
                timeout: self.timeout,
            }),
        }
    }

    /// Poll now and then every `interval` until the handle is shut down.
    ///
    /// Ticks landing while a poll is still running are skipped, not queued.
    pub fn start(self: Arc<Self>, interval: Duration) -> FeedHandle {
        let feed = self;
        let stop = Arc::new(Notify::new());
        let stopped = Arc::clone(&stop);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut polls = JoinSet::new();
            let mut tick_count: u64 = 0;

            loop {
                tokio::select! {
                    _ = stopped.notified() => break,
                    _ = ticker.tick() => {
                        tick_count += 1;
                        debug!("Quote tick #{}", tick_count);
                        let feed = Arc::clone(&feed);
                        polls.spawn(async move {
                            feed.poll().await;
                        });
                    }
                    Some(_) = polls.join_next() => {}
                }
            }

            // Cancelled polls are dropped before the schedule reports stopped
            polls.shutdown().await;
        });

        FeedHandle {
            stop,
            task: Some(task),
        }
    }
}

/// Holds `loading` up for the life of one poll and lowers it however the poll ends
struct LoadingFlag<'a> {
    status: &'a watch::Sender<FeedStatus>,
}

impl<'a> LoadingFlag<'a> {
    fn raise(status: &'a watch::Sender<FeedStatus>) -> Self {
        status.send_modify(|status| status.loading = true);
        LoadingFlag { status }
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        self.status
            .send_if_modified(|status| std::mem::replace(&mut status.loading, false));
    }
}

/// Owned handle for the polling schedule
pub struct FeedHandle {
    stop: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl FeedHandle {
    /// Cancel the schedule along with any poll still in flight.
    /// Once this returns no poll is running and `loading` is down.
    pub async fn shutdown(mut self) {
        self.stop.notify_one();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        debug!("Quote feed stopped");
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
