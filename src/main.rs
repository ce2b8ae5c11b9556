//! main.rs - Entry point for the collectible storefront pricing core
//!
//! - Detects the wallet network (JSON-RPC endpoint standing in for the wallet)
//! - Polls token quotes on a fixed interval
//! - Prints the converted price of an amount whenever network or quotes change
//!
//! Usage: collectible-pricing [PRICE...]   (config file path in PRICING_CONFIG)
//! Each PRICE is one cart item in native currency; the cart total is converted.

use collectible_pricing::{registry, storefront};
use collectible_pricing::{
    CartItem, Config, HttpPriceSource, JsonPurchaseStore, PriceSource, PricingSubsystem, PurchaseStore,
    RpcWalletProvider, WalletProvider, NAME, VERSION,
};
use log::{info, warn};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    println!();
    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║     Collectible Pricing Core v{:<27}║", VERSION);
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();

    info!("Starting {} v{}", NAME, VERSION);

    let config_path = std::env::var("PRICING_CONFIG").ok().map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;

    let cart = parse_cart(std::env::args().skip(1))?;
    let amount = if cart.is_empty() {
        Decimal::ONE
    } else {
        storefront::cart_total(&cart)
    };

    let provider: Option<Arc<dyn WalletProvider>> = match &config.wallet_rpc_url {
        Some(url) => {
            info!("✓ Wallet provider: JSON-RPC at {}", url);
            Some(Arc::new(RpcWalletProvider::new(url, config.fetch_timeout())?))
        }
        None => {
            warn!("No wallet provider configured");
            None
        }
    };

    let source: Arc<dyn PriceSource> =
        Arc::new(HttpPriceSource::new(&config.price_source_url, config.fetch_timeout())?);
    info!("✓ Price source: {}", config.price_source_url);

    if let Some(address) = &config.wallet_address {
        show_purchases(&config, address);
    }

    let subsystem = PricingSubsystem::start(&config, provider, source)?;
    let mut tracker = subsystem.track(amount);
    info!(
        "Pricing {} cart item(s), total {} {}",
        cart.len(),
        amount,
        tracker.view().network.network.native_symbol
    );

    println!("{}", tracker.view());
    println!();

    loop {
        let running = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received");
                false
            }
            changed = tracker.changed() => changed.is_some(),
        };
        if !running {
            break;
        }
        println!("{}", tracker.view());
        println!();
    }

    let stats = subsystem.poll_stats();
    info!(
        "📈 Stats: {} polls completed, {} failed, {} skipped",
        stats.completed, stats.failed, stats.skipped
    );
    subsystem.shutdown().await;
    Ok(())
}

fn parse_cart<I>(args: I) -> anyhow::Result<Vec<CartItem>>
where
    I: Iterator<Item = String>,
{
    args.enumerate()
        .map(|(index, raw)| {
            let price = Decimal::from_str(&raw)
                .map_err(|e| anyhow::anyhow!("invalid price {:?}: {}", raw, e))?;
            Ok(CartItem {
                id: (index + 1).to_string(),
                display_name: format!("Item #{}", index + 1),
                price,
            })
        })
        .collect()
}

/// Print the purchase history recorded for a wallet
fn show_purchases(config: &Config, address: &str) {
    let store = JsonPurchaseStore::new(&config.purchase_store_path);
    let purchases = match store.purchases(address) {
        Ok(purchases) => purchases,
        Err(e) => {
            warn!("Could not read purchase history: {}", e);
            return;
        }
    };

    if purchases.is_empty() {
        println!("You haven't purchased any NFTs yet.");
        println!();
        return;
    }

    println!("Your Purchased NFTs ({})", purchases.len());
    for purchase in &purchases {
        let coin = registry::lookup_hex(&purchase.network_id)
            .map(|network| network.native_symbol)
            .unwrap_or("ETH");
        println!(
            "  {:<24} {:>10} {:<6} {:<24} {}",
            purchase.display_name,
            purchase.price,
            coin,
            registry::network_display_name(&purchase.network_id),
            purchase.purchase_timestamp.format("%Y-%m-%d"),
        );
        println!(
            "    {}",
            registry::explorer_tx_url(&purchase.network_id, &purchase.transaction_id)
        );
    }
    println!();
}
