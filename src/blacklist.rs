use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::address::Address;

pub const DEFAULT_CHAIN: &str = "ethereum";
pub const DEFAULT_CATEGORY: &str = "internal";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub chain: String,
    pub address: Address,
    pub category: String,
    pub note: Option<String>,
}

/// Row shape of the blacklist file. Everything but `address` is optional.
#[derive(Debug, Deserialize)]
struct BlacklistRow {
    #[serde(default)]
    chain: Option<String>,
    address: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    note: Option<String>,
}

/// Read-only view of the curated blacklist.
///
/// Store failures must surface as errors: an unreachable blacklist is never "no match".
#[async_trait]
pub trait BlacklistStore: Send + Sync {
    async fn find_direct(&self, chain: &str, address: &Address) -> Result<Option<BlacklistEntry>, StoreError>;

    /// Batch lookup in a single round trip. Matches come back in `addresses` order.
    async fn find_any(&self, chain: &str, addresses: &[Address]) -> Result<Vec<BlacklistEntry>, StoreError>;
}

/// In-memory blacklist keyed by `(chain, address)`.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlacklist {
    entries: HashMap<(String, Address), BlacklistEntry>,
}

impl MemoryBlacklist {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let content = fs::read_to_string(path)
            .map_err(|e| StoreError::FileReadError(format!("Failed to read blacklist file: {}", e)))?;

        Self::load_from_string(&content)
    }

    pub fn load_from_string(content: &str) -> Result<Self, StoreError> {
        let rows: Vec<BlacklistRow> = serde_json::from_str(content)
            .map_err(|e| StoreError::ParseError(format!("Failed to parse blacklist JSON: {}", e)))?;

        let mut blacklist = Self::empty();
        for row in rows {
            let address = match Address::parse(&row.address) {
                Ok(address) => address,
                Err(e) => {
                    tracing::warn!("Skipping blacklist entry: {}", e);
                    continue;
                }
            };

            blacklist.insert(BlacklistEntry {
                chain: normalize_chain(row.chain.as_deref().unwrap_or(DEFAULT_CHAIN)),
                address,
                category: row
                    .category
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
                note: row.note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            });
        }

        tracing::info!("Loaded blacklist: {} addresses", blacklist.len());

        Ok(blacklist)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = BlacklistEntry>) -> Self {
        let mut blacklist = Self::empty();
        for entry in entries {
            blacklist.insert(entry);
        }
        blacklist
    }

    /// Inserts or replaces the entry for `(chain, address)`.
    pub fn insert(&mut self, mut entry: BlacklistEntry) {
        entry.chain = normalize_chain(&entry.chain);
        self.entries.insert((entry.chain.clone(), entry.address.clone()), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get(&self, chain: &str, address: &Address) -> Option<&BlacklistEntry> {
        self.entries.get(&(normalize_chain(chain), address.clone()))
    }
}

#[async_trait]
impl BlacklistStore for MemoryBlacklist {
    async fn find_direct(&self, chain: &str, address: &Address) -> Result<Option<BlacklistEntry>, StoreError> {
        Ok(self.get(chain, address).cloned())
    }

    async fn find_any(&self, chain: &str, addresses: &[Address]) -> Result<Vec<BlacklistEntry>, StoreError> {
        let chain = normalize_chain(chain);
        Ok(addresses
            .iter()
            .filter_map(|address| self.entries.get(&(chain.clone(), address.clone())).cloned())
            .collect())
    }
}

pub fn normalize_chain(chain: &str) -> String {
    chain.trim().to_lowercase()
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("File read error: {0}")]
    FileReadError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const BAD: &str = "0x1234567890123456789012345678901234567890";
    const OTHER: &str = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd";

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_empty_blacklist() {
        let blacklist = MemoryBlacklist::empty();
        assert!(blacklist.is_empty());
        assert!(blacklist.find_direct("ethereum", &addr(BAD)).await.unwrap().is_none());
        assert!(blacklist.find_any("ethereum", &[addr(BAD)]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_from_string_applies_defaults() {
        let json = r#"[
            { "address": "0x1234567890123456789012345678901234567890" },
            {
                "chain": "Polygon",
                "address": "0xABCDEFabcdefabcdefabcdefabcdefabcdefabcd",
                "category": "SANCTIONS",
                "note": "demo-seed"
            },
            { "address": "ABC123", "note": "not an evm address" }
        ]"#;

        let blacklist = MemoryBlacklist::load_from_string(json).unwrap();
        assert_eq!(blacklist.len(), 2);

        let entry = blacklist.find_direct("ethereum", &addr(BAD)).await.unwrap().unwrap();
        assert_eq!(entry.category, DEFAULT_CATEGORY);
        assert_eq!(entry.note, None);

        let entry = blacklist.find_direct("polygon", &addr(OTHER)).await.unwrap().unwrap();
        assert_eq!(entry.category, "SANCTIONS");
        assert_eq!(entry.note.as_deref(), Some("demo-seed"));
    }

    #[tokio::test]
    async fn test_lookup_is_chain_scoped() {
        let blacklist = MemoryBlacklist::from_entries([BlacklistEntry {
            chain: "ethereum".into(),
            address: addr(BAD),
            category: "internal".into(),
            note: None,
        }]);

        assert!(blacklist.find_direct(" Ethereum ", &addr(BAD)).await.unwrap().is_some());
        assert!(blacklist.find_direct("polygon", &addr(BAD)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_any_preserves_input_order() {
        let third = addr("0x3333333333333333333333333333333333333333");
        let blacklist = MemoryBlacklist::from_entries([addr(BAD), addr(OTHER)].map(|address| BlacklistEntry {
            chain: "ethereum".into(),
            address,
            category: "internal".into(),
            note: None,
        }));

        let hits = blacklist
            .find_any("ethereum", &[addr(OTHER), third, addr(BAD)])
            .await
            .unwrap();
        let hit_addresses: Vec<_> = hits.iter().map(|e| e.address.clone()).collect();
        assert_eq!(hit_addresses, vec![addr(OTHER), addr(BAD)]);
    }

    #[test]
    fn test_rejects_invalid_json() {
        assert!(matches!(
            MemoryBlacklist::load_from_string("{}"),
            Err(StoreError::ParseError(_))
        ));
    }
}
