//! Offline transaction source backed by a precomputed adjacency graph.
//!
//! The graph file is a list of undirected edges:
//!
//! ```json
//! { "edges": [["0xaaa...", "0xbbb..."], ["0xbbb...", "0xccc..."]] }
//! ```
//!
//! The graph is loaded once by the caller and shared read-only through an `Arc`.
//! Each neighbour is reported as an incoming normal transaction at timestamp 0, so
//! behavioural heuristics see the counterparty set but never an outgoing burst.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::address::Address;
use crate::source::{SourceError, Transaction, TransactionSource};

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Failed to read graph file: {0}")]
    FileReadError(#[from] std::io::Error),
    #[error("Failed to parse graph JSON: {0}")]
    ParseError(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct GraphFile {
    #[serde(default)]
    edges: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct StaticGraph {
    adjacency: BTreeMap<Address, BTreeSet<Address>>,
}

impl StaticGraph {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, GraphError> {
        let content = fs::read_to_string(path.as_ref())?;

        Self::load_from_str(&content)
    }

    pub fn load_from_str(content: &str) -> Result<Self, GraphError> {
        let file: GraphFile = serde_json::from_str(content)?;

        let mut graph = Self::default();
        let mut skipped = 0usize;
        for (a, b) in &file.edges {
            match (Address::parse(a), Address::parse(b)) {
                (Ok(a), Ok(b)) => graph.add_edge(a, b),
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::warn!(skipped = skipped, "Skipped graph edges with malformed endpoints");
        }
        tracing::info!(
            nodes = graph.node_count(),
            edges = file.edges.len() - skipped,
            "Loaded static transaction graph"
        );

        Ok(graph)
    }

    pub fn add_edge(&mut self, a: Address, b: Address) {
        self.adjacency.entry(a.clone()).or_default().insert(b.clone());
        self.adjacency.entry(b).or_default().insert(a);
    }

    /// Neighbours of `address` in sorted order.
    pub fn neighbors(&self, address: &Address) -> impl Iterator<Item = &Address> {
        self.adjacency.get(address).into_iter().flatten()
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }
}

pub struct StaticGraphSource {
    graph: Arc<StaticGraph>,
}

impl StaticGraphSource {
    pub fn new(graph: Arc<StaticGraph>) -> Self {
        Self { graph }
    }
}

#[async_trait]
impl TransactionSource for StaticGraphSource {
    fn name(&self) -> &'static str {
        "static-graph"
    }

    async fn normal_txs(&self, address: &Address, limit: usize) -> Result<Vec<Transaction>, SourceError> {
        Ok(self
            .graph
            .neighbors(address)
            .take(limit)
            .map(|neighbor| Transaction::new(neighbor.as_str(), address.as_str(), 0))
            .collect())
    }

    async fn token_txs(&self, _address: &Address, _limit: usize) -> Result<Vec<Transaction>, SourceError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const B: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const C: &str = "0xcccccccccccccccccccccccccccccccccccccccc";

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    #[test]
    fn test_edges_are_undirected_and_lowercased() {
        let mixed_case_a = A.to_uppercase().replace("0X", "0x");
        let json = format!(
            r#"{{"edges": [["{}", "{}"], ["{}", "{}"]]}}"#,
            mixed_case_a, B, B, C
        );
        let graph = StaticGraph::load_from_str(&json).unwrap();

        assert_eq!(graph.node_count(), 3);
        let of_b: Vec<_> = graph.neighbors(&addr(B)).cloned().collect();
        assert_eq!(of_b, vec![addr(A), addr(C)]);
        let of_a: Vec<_> = graph.neighbors(&addr(A)).cloned().collect();
        assert_eq!(of_a, vec![addr(B)]);
    }

    #[test]
    fn test_skips_malformed_edges() {
        let json = format!(r#"{{"edges": [["{}", "garbage"], ["{}", "{}"]]}}"#, A, A, C);
        let graph = StaticGraph::load_from_str(&json).unwrap();
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_rejects_invalid_json() {
        assert!(matches!(
            StaticGraph::load_from_str("{not json"),
            Err(GraphError::ParseError(_))
        ));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        assert!(matches!(
            StaticGraph::load_from_file("does/not/exist/graph.json"),
            Err(GraphError::FileReadError(_))
        ));
    }

    #[tokio::test]
    async fn test_source_reports_neighbors_as_incoming() {
        let mut graph = StaticGraph::default();
        graph.add_edge(addr(A), addr(B));
        graph.add_edge(addr(A), addr(C));
        let source = StaticGraphSource::new(Arc::new(graph));

        let txs = source.normal_txs(&addr(A), 10).await.unwrap();
        assert_eq!(txs.len(), 2);
        assert!(txs.iter().all(|tx| tx.is_incoming_to(&addr(A))));
        assert_eq!(txs[0].from, B);

        let limited = source.normal_txs(&addr(A), 1).await.unwrap();
        assert_eq!(limited.len(), 1);

        assert!(source.token_txs(&addr(A), 10).await.unwrap().is_empty());

        let isolated = addr("0x1111111111111111111111111111111111111111");
        assert!(source.normal_txs(&isolated, 10).await.unwrap().is_empty());
    }
}
