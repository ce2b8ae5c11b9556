//! provider.rs - Wallet provider interface and implementations
//!
//! A provider answers "which chain are you on?" and notifies subscribers when
//! the chain changes. Absence of a provider is a normal state, represented by
//! the watcher holding `None`, not by an implementation of this trait.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use crate::error::ProviderError;
use crate::models::ChainId;

/// Callback fired on every chain change
pub type ChainChangedHandler = Arc<dyn Fn() + Send + Sync>;

/// Token identifying a registered handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Trait defining the interface for wallet providers
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask the wallet for its active chain
    async fn chain_id(&self) -> Result<ChainId, ProviderError>;

    /// Register a chain-change handler
    fn subscribe(&self, handler: ChainChangedHandler) -> SubscriptionId;

    /// Release a handler; unknown ids are ignored
    fn unsubscribe(&self, id: SubscriptionId);
}

/// Registered chain-change handlers, shared by the provider implementations
#[derive(Default)]
pub struct HandlerRegistry {
    inner: Mutex<HandlerSlots>,
}

#[derive(Default)]
struct HandlerSlots {
    next_id: u64,
    handlers: Vec<(SubscriptionId, ChainChangedHandler)>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, handler: ChainChangedHandler) -> SubscriptionId {
        let mut slots = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let id = SubscriptionId(slots.next_id);
        slots.next_id += 1;
        slots.handlers.push((id, handler));
        id
    }

    pub fn remove(&self, id: SubscriptionId) {
        let mut slots = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        slots.handlers.retain(|(existing, _)| *existing != id);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every handler; the lock is released before calling out
    pub fn notify_all(&self) {
        let handlers: Vec<ChainChangedHandler> = {
            let slots = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            slots.handlers.iter().map(|(_, h)| Arc::clone(h)).collect()
        };
        debug!("Notifying {} chain-change handler(s)", handlers.len());
        for handler in handlers {
            handler();
        }
    }
}

/// Registration that unsubscribes its handler when dropped
pub struct ChainSubscription {
    provider: Arc<dyn WalletProvider>,
    id: Option<SubscriptionId>,
}

impl ChainSubscription {
    pub fn register(provider: Arc<dyn WalletProvider>, handler: ChainChangedHandler) -> Self {
        let id = provider.subscribe(handler);
        ChainSubscription {
            provider,
            id: Some(id),
        }
    }

    /// Release the handler now rather than at drop
    pub fn release(mut self) {
        self.unsubscribe();
    }

    fn unsubscribe(&mut self) {
        if let Some(id) = self.id.take() {
            self.provider.unsubscribe(id);
            debug!("Chain-change subscription released");
        }
    }
}

impl Drop for ChainSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

// ============================================================================
// RpcWalletProvider - asks a JSON-RPC node for eth_chainId
// ============================================================================

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'a str,
    method: &'a str,
    params: [(); 0],
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Wallet provider backed by a JSON-RPC endpoint
///
/// Switching the endpoint is the equivalent of the user switching networks in
/// their wallet, and fires the chain-change handlers.
pub struct RpcWalletProvider {
    client: Client,
    endpoint: RwLock<String>,
    handlers: HandlerRegistry,
}

impl RpcWalletProvider {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(RpcWalletProvider {
            client,
            endpoint: RwLock::new(endpoint.to_string()),
            handlers: HandlerRegistry::new(),
        })
    }

    pub fn endpoint(&self) -> String {
        self.endpoint.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn switch_endpoint(&self, endpoint: &str) {
        *self.endpoint.write().unwrap_or_else(|e| e.into_inner()) = endpoint.to_string();
        self.handlers.notify_all();
    }
}

#[async_trait]
impl WalletProvider for RpcWalletProvider {
    async fn chain_id(&self) -> Result<ChainId, ProviderError> {
        let endpoint = self.endpoint();
        debug!("Querying eth_chainId from {}", endpoint);

        let request = RpcRequest {
            jsonrpc: "2.0",
            method: "eth_chainId",
            params: [],
            id: 1,
        };

        let response: RpcResponse = self
            .client
            .post(&endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_chain_response(response)
    }

    fn subscribe(&self, handler: ChainChangedHandler) -> SubscriptionId {
        self.handlers.add(handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.handlers.remove(id)
    }
}

fn parse_chain_response(response: RpcResponse) -> Result<ChainId, ProviderError> {
    if let Some(err) = response.error {
        return Err(ProviderError::Rpc(format!("{} (code {})", err.message, err.code)));
    }
    let raw = response
        .result
        .ok_or_else(|| ProviderError::Rpc("response carried no result".to_string()))?;
    ChainId::from_hex(&raw).ok_or(ProviderError::MalformedChainId(raw))
}

// ============================================================================
// MockWalletProvider - For testing purposes
// ============================================================================

/// In-memory wallet provider for tests and demos
pub struct MockWalletProvider {
    chain: Mutex<Option<ChainId>>,
    malformed: Mutex<Option<String>>,
    delay: Mutex<Duration>,
    queries: AtomicUsize,
    handlers: HandlerRegistry,
}

impl MockWalletProvider {
    pub fn new(chain: ChainId) -> Self {
        MockWalletProvider {
            chain: Mutex::new(Some(chain)),
            malformed: Mutex::new(None),
            delay: Mutex::new(Duration::ZERO),
            queries: AtomicUsize::new(0),
            handlers: HandlerRegistry::new(),
        }
    }

    /// A provider whose every query fails
    pub fn failing() -> Self {
        let provider = Self::new(ChainId(0));
        *provider.chain.lock().unwrap_or_else(|e| e.into_inner()) = None;
        provider
    }

    /// Move to another chain and fire the chain-change handlers
    pub fn switch_chain(&self, chain: ChainId) {
        *self.malformed.lock().unwrap_or_else(|e| e.into_inner()) = None;
        *self.chain.lock().unwrap_or_else(|e| e.into_inner()) = Some(chain);
        self.handlers.notify_all();
    }

    /// Answer queries with `raw` as the chain id until the next `switch_chain`
    pub fn report_malformed(&self, raw: &str) {
        *self.malformed.lock().unwrap_or_else(|e| e.into_inner()) = Some(raw.to_string());
        self.handlers.notify_all();
    }

    /// Fire the chain-change handlers without changing chain
    pub fn emit_chain_changed(&self) {
        self.handlers.notify_all();
    }

    /// Delay applied to every query after the chain has been read
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap_or_else(|e| e.into_inner()) = delay;
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.len()
    }
}

#[async_trait]
impl WalletProvider for MockWalletProvider {
    async fn chain_id(&self) -> Result<ChainId, ProviderError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let chain = *self.chain.lock().unwrap_or_else(|e| e.into_inner());
        let malformed = self.malformed.lock().unwrap_or_else(|e| e.into_inner()).clone();
        let delay = *self.delay.lock().unwrap_or_else(|e| e.into_inner());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(raw) = malformed {
            return Err(ProviderError::MalformedChainId(raw));
        }
        chain.ok_or_else(|| ProviderError::Rpc("wallet is locked".to_string()))
    }

    fn subscribe(&self, handler: ChainChangedHandler) -> SubscriptionId {
        self.handlers.add(handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.handlers.remove(id)
    }
}
