//! network_watcher.rs - Tracks which network the wallet is connected to
//!
//! The watcher owns the published `NetworkState`. Only `refresh()` writes it,
//! and every write replaces the whole value through a watch channel.

use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::ProviderError;
use crate::models::{ChainId, NetworkCondition, NetworkDescriptor, NetworkState};
use crate::provider::{ChainSubscription, WalletProvider};
use crate::registry;

/// What a single refresh concluded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Detected(&'static NetworkDescriptor),
    ProviderUnavailable,
    UnsupportedNetwork(ChainId),
    /// Treated like an unsupported network: state is kept
    MalformedChainId(String),
}

impl RefreshOutcome {
    fn condition(&self) -> Option<NetworkCondition> {
        match self {
            RefreshOutcome::Detected(_) => None,
            RefreshOutcome::ProviderUnavailable => Some(NetworkCondition::ProviderUnavailable),
            RefreshOutcome::UnsupportedNetwork(id) => Some(NetworkCondition::UnsupportedNetwork(*id)),
            RefreshOutcome::MalformedChainId(raw) => {
                Some(NetworkCondition::MalformedChainId(raw.clone()))
            }
        }
    }
}

pub struct NetworkWatcher {
    provider: Option<Arc<dyn WalletProvider>>,
    state: watch::Sender<NetworkState>,
    last_condition: Mutex<Option<NetworkCondition>>,
    // FIFO: tokio's mutex hands the lock out in request order
    refresh_lock: tokio::sync::Mutex<()>,
    refreshes: AtomicU64,
    timeout: Duration,
}

impl NetworkWatcher {
    /// Create a watcher starting on the fallback network
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, timeout: Duration) -> Self {
        let (state, _) = watch::channel(NetworkState::fallback(registry::fallback_network()));

        NetworkWatcher {
            provider,
            state,
            last_condition: Mutex::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
            refreshes: AtomicU64::new(0),
            timeout,
        }
    }

    pub fn state(&self) -> NetworkState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<NetworkState> {
        self.state.subscribe()
    }

    /// Condition reported by the most recent refresh, if any
    pub fn last_condition(&self) -> Option<NetworkCondition> {
        self.last_condition
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of refreshes that have run to completion
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Ask the provider for its chain and publish the matching network.
    ///
    /// Concurrent callers are served one at a time in call order. Provider
    /// failures are logged and leave the published state untouched.
    pub async fn refresh(&self) -> RefreshOutcome {
        let _serial = self.refresh_lock.lock().await;

        let outcome = match self.query_chain().await {
            Ok(chain_id) => match registry::lookup(chain_id) {
                Some(network) => {
                    let next = NetworkState::detected(network);
                    let changed = self.state.send_if_modified(|current| {
                        if *current == next {
                            false
                        } else {
                            *current = next;
                            true
                        }
                    });
                    if changed {
                        info!("✓ Network detected: {}", network);
                    } else {
                        debug!("Network unchanged: {}", network);
                    }
                    RefreshOutcome::Detected(network)
                }
                None => {
                    warn!(
                        "Unsupported network detected: {} (keeping {})",
                        chain_id,
                        self.state.borrow().network.name
                    );
                    RefreshOutcome::UnsupportedNetwork(chain_id)
                }
            },
            Err(None) => {
                warn!("No wallet provider available, showing {}", self.state.borrow().network.name);
                RefreshOutcome::ProviderUnavailable
            }
            Err(Some(ProviderError::MalformedChainId(raw))) => {
                warn!(
                    "Unsupported network detected: malformed chain id {:?} (keeping {})",
                    raw,
                    self.state.borrow().network.name
                );
                RefreshOutcome::MalformedChainId(raw)
            }
            Err(Some(e)) => {
                warn!("Error getting network: {}", e);
                RefreshOutcome::ProviderUnavailable
            }
        };

        *self.last_condition.lock().unwrap_or_else(|e| e.into_inner()) = outcome.condition();
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        outcome
    }

    /// `Err(None)` means there is no provider at all
    async fn query_chain(&self) -> Result<ChainId, Option<ProviderError>> {
        let provider = self.provider.as_ref().ok_or(None)?;
        match tokio::time::timeout(self.timeout, provider.chain_id()).await {
            Ok(result) => result.map_err(Some),
            Err(_) => Err(Some(ProviderError::Timeout(self.timeout))),
        }
    }

    /// Run an initial refresh, then one refresh per chain-change notification
    /// until the returned handle is shut down.
    pub fn start(self: Arc<Self>) -> WatcherHandle {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        let subscription = self.provider.as_ref().map(|provider| {
            ChainSubscription::register(
                Arc::clone(provider),
                Arc::new(move || {
                    // Receiver gone means we are shutting down
                    let _ = tx.send(());
                }),
            )
        });

        let watcher = Arc::clone(&self);
        let task = tokio::spawn(async move {
            watcher.refresh().await;
            while rx.recv().await.is_some() {
                debug!("Chain change notification received");
                watcher.refresh().await;
            }
        });

        WatcherHandle {
            subscription,
            task: Some(task),
        }
    }
}

/// Owned handle for a running watcher
pub struct WatcherHandle {
    subscription: Option<ChainSubscription>,
    task: Option<JoinHandle<()>>,
}

impl WatcherHandle {
    /// Release the subscription and stop the refresh task.
    /// No refresh can publish state once this returns.
    pub async fn shutdown(mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.release();
        }
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        debug!("Network watcher stopped");
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
