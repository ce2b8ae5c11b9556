//! storefront.rs - Cart totals and the purchase history store
//!
//! Purchases are kept in a single JSON document shaped like the browser store:
//! `{"purchasedNFTs": {"<lowercase address>": [record, ...]}}`.

use chrono::{DateTime, Utc};
use log::{debug, info};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StoreError;

/// An item waiting in the cart, priced in native currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub display_name: String,
    pub price: Decimal,
}

pub fn cart_total(items: &[CartItem]) -> Decimal {
    items.iter().map(|item| item.price).sum()
}

/// A completed purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    pub id: String,
    pub display_name: String,
    pub price: Decimal,
    /// Hex chain id the purchase was made on
    pub network_id: String,
    pub purchase_timestamp: DateTime<Utc>,
    pub transaction_id: String,
}

/// Key-value purchase history keyed by wallet address
pub trait PurchaseStore: Send + Sync {
    /// Purchases for an address in the order they were recorded
    fn purchases(&self, address: &str) -> Result<Vec<PurchaseRecord>, StoreError>;

    fn record_purchase(&self, address: &str, record: PurchaseRecord) -> Result<(), StoreError>;
}

fn normalize(address: &str) -> String {
    address.trim().to_lowercase()
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(rename = "purchasedNFTs", default)]
    purchased: BTreeMap<String, Vec<PurchaseRecord>>,
}

/// Purchase store persisted to a JSON file
pub struct JsonPurchaseStore {
    path: PathBuf,
    // Serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl JsonPurchaseStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonPurchaseStore {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<StoreDocument, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No purchase store at {}, starting empty", self.path.display());
                return Ok(StoreDocument::default());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, document: &StoreDocument) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(document).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, raw).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl PurchaseStore for JsonPurchaseStore {
    fn purchases(&self, address: &str) -> Result<Vec<PurchaseRecord>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut document = self.load()?;
        Ok(document
            .purchased
            .remove(&normalize(address))
            .unwrap_or_default())
    }

    fn record_purchase(&self, address: &str, record: PurchaseRecord) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut document = self.load()?;
        let key = normalize(address);
        info!("Recording purchase {} for {}", record.id, key);
        document.purchased.entry(key).or_default().push(record);
        self.save(&document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(id: &str) -> PurchaseRecord {
        PurchaseRecord {
            id: id.to_string(),
            display_name: format!("NFT #{}", id),
            price: dec!(0.05),
            network_id: "0xaa36a7".to_string(),
            purchase_timestamp: Utc::now(),
            transaction_id: format!("0xtx{}", id),
        }
    }

    #[test]
    fn test_cart_total() {
        let items = vec![
            CartItem { id: "1".into(), display_name: "Ape".into(), price: dec!(0.1) },
            CartItem { id: "2".into(), display_name: "Punk".into(), price: dec!(0.25) },
        ];
        assert_eq!(cart_total(&items), dec!(0.35));
        assert_eq!(cart_total(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_unknown_address_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonPurchaseStore::new(dir.path().join("purchases.json"));

        assert!(store.purchases("0xABC").unwrap().is_empty());
    }

    #[test]
    fn test_records_keyed_by_lowercase_address() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonPurchaseStore::new(dir.path().join("purchases.json"));

        store.record_purchase("0xAbCdEf", record("1")).unwrap();
        store.record_purchase("0xabcdef", record("2")).unwrap();

        let history = store.purchases("0XABCDEF").unwrap();
        let ids: Vec<&str> = history.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("purchasedNFTs"));
        assert!(raw.contains("\"0xabcdef\""));
        assert!(raw.contains("transactionId"));
    }

    #[test]
    fn test_corrupt_store_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("purchases.json");
        std::fs::write(&path, "not json").unwrap();

        let store = JsonPurchaseStore::new(path);
        assert!(matches!(store.purchases("0x1"), Err(StoreError::Corrupt { .. })));
    }
}
