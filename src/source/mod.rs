//! Transaction history providers.
//!
//! The screener only sees the [`TransactionSource`] trait. Two implementations exist:
//!
//! - [`etherscan::EtherscanSource`] queries the Etherscan v2 account API
//! - [`static_graph::StaticGraphSource`] answers from a precomputed adjacency graph
//!
//! ```text
//! Screener
//!    |
//!    v
//! TransactionSource (trait) <-- EtherscanSource, StaticGraphSource
//! ```
//!
//! A provider reporting "no transactions" is a success with an empty list. Rate limiting
//! is reported as [`SourceError::RateLimited`] so the screener can stop the scan without
//! treating it as a hard failure.

pub mod etherscan;
pub mod static_graph;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::address::Address;
use crate::config::SourceKind;
use crate::error::Result;
use etherscan::EtherscanSource;
use static_graph::{StaticGraph, StaticGraphSource};

/// A single transfer as seen by a provider.
///
/// `from`/`to` are kept as the provider reported them (lowercased). Malformed or empty
/// values, such as the `to` of a contract creation, are filtered later by the
/// counterparty extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: String,
    pub to: String,
    pub timestamp: u64,
}

impl Transaction {
    pub fn new(from: impl Into<String>, to: impl Into<String>, timestamp: u64) -> Self {
        Self {
            from: from.into().trim().to_lowercase(),
            to: to.into().trim().to_lowercase(),
            timestamp,
        }
    }

    pub fn is_outgoing_from(&self, subject: &Address) -> bool {
        self.from == subject.as_str()
    }

    pub fn is_incoming_to(&self, subject: &Address) -> bool {
        self.to == subject.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Provider error: {0}")]
    Provider(String),
}

impl SourceError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SourceError::RateLimited(_))
    }
}

#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Normal (native value) transactions, newest first, at most `limit`.
    async fn normal_txs(&self, address: &Address, limit: usize) -> std::result::Result<Vec<Transaction>, SourceError>;

    /// Token transfer transactions, newest first, at most `limit`.
    async fn token_txs(&self, address: &Address, limit: usize) -> std::result::Result<Vec<Transaction>, SourceError>;
}

/// Constructs the configured source. The static graph is loaded here, once.
pub fn from_kind(kind: &SourceKind) -> Result<Arc<dyn TransactionSource>> {
    match kind {
        SourceKind::Etherscan(config) => Ok(Arc::new(EtherscanSource::new(config.clone())?)),
        SourceKind::StaticGraph { path } => {
            let graph = StaticGraph::load_from_file(path)?;
            Ok(Arc::new(StaticGraphSource::new(Arc::new(graph))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScreeningError;

    #[test]
    fn test_transaction_direction() {
        let subject = Address::parse("0x1111111111111111111111111111111111111111").unwrap();
        let tx = Transaction::new(
            "0x1111111111111111111111111111111111111111",
            "0x2222222222222222222222222222222222222222",
            10,
        );
        assert!(tx.is_outgoing_from(&subject));
        assert!(!tx.is_incoming_to(&subject));
    }

    #[test]
    fn test_transaction_new_lowercases() {
        let tx = Transaction::new(" 0xAA ", "0xBB", 1);
        assert_eq!(tx.from, "0xaa");
        assert_eq!(tx.to, "0xbb");
    }

    #[test]
    fn test_missing_graph_file_is_graph_error() {
        let kind = SourceKind::StaticGraph {
            path: "does/not/exist/graph.json".into(),
        };
        assert!(matches!(
            from_kind(&kind),
            Err(ScreeningError::Graph(static_graph::GraphError::FileReadError(_)))
        ));
    }

    #[test]
    fn test_rate_limited_predicate() {
        assert!(SourceError::RateLimited("max rate".into()).is_rate_limited());
        assert!(!SourceError::Provider("boom".into()).is_rate_limited());
    }
}
