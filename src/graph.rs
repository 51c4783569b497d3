//! Directed multigraph builder with per-node and per-edge statistics.

use crate::Transaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A single directed transfer as stored against a node's adjacency list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub partner: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate statistics for one account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStats {
    pub tx_in: usize,
    pub tx_out: usize,
    pub total_in: f64,
    pub total_out: f64,
    pub timestamps: Vec<DateTime<Utc>>,
}

impl NodeStats {
    fn new() -> Self {
        Self {
            tx_in: 0,
            tx_out: 0,
            total_in: 0.0,
            total_out: 0.0,
            timestamps: Vec::new(),
        }
    }

    pub fn degree(&self) -> usize {
        self.tx_in + self.tx_out
    }
}

/// Directed multigraph of transfers between accounts.
///
/// Built once per pipeline run and read-only thereafter: detectors borrow it,
/// nothing mutates it after [`Graph::build`] returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    pub adj: HashMap<String, HashSet<String>>,
    pub rev: HashMap<String, HashSet<String>>,
    pub edges_by_source: HashMap<String, Vec<Edge>>,
    pub edges_by_target: HashMap<String, Vec<Edge>>,
    pub node_stats: HashMap<String, NodeStats>,
}

impl Graph {
    fn empty() -> Self {
        Self {
            adj: HashMap::new(),
            rev: HashMap::new(),
            edges_by_source: HashMap::new(),
            edges_by_target: HashMap::new(),
            node_stats: HashMap::new(),
        }
    }

    /// Build the graph from an already row-validated transaction sequence.
    ///
    /// Ingest order is preserved in `edges_by_source`/`edges_by_target`; callers
    /// doing temporal analysis over a single account's edges must sort by
    /// timestamp themselves (the authoritative order is ingest order, not time
    /// order).
    pub fn build(transactions: &[Transaction]) -> Self {
        let mut graph = Self::empty();

        for tx in transactions {
            graph
                .adj
                .entry(tx.sender_id.clone())
                .or_default()
                .insert(tx.receiver_id.clone());
            graph
                .rev
                .entry(tx.receiver_id.clone())
                .or_default()
                .insert(tx.sender_id.clone());

            graph
                .edges_by_source
                .entry(tx.sender_id.clone())
                .or_default()
                .push(Edge {
                    partner: tx.receiver_id.clone(),
                    amount: tx.amount,
                    timestamp: tx.timestamp,
                });
            graph
                .edges_by_target
                .entry(tx.receiver_id.clone())
                .or_default()
                .push(Edge {
                    partner: tx.sender_id.clone(),
                    amount: tx.amount,
                    timestamp: tx.timestamp,
                });

            let sender_stats = graph
                .node_stats
                .entry(tx.sender_id.clone())
                .or_insert_with(NodeStats::new);
            sender_stats.tx_out += 1;
            sender_stats.total_out += tx.amount;
            sender_stats.timestamps.push(tx.timestamp);

            let receiver_stats = graph
                .node_stats
                .entry(tx.receiver_id.clone())
                .or_insert_with(NodeStats::new);
            receiver_stats.tx_in += 1;
            receiver_stats.total_in += tx.amount;
            receiver_stats.timestamps.push(tx.timestamp);
        }

        for stats in graph.node_stats.values_mut() {
            stats.timestamps.sort();
        }

        graph
    }

    /// Accounts sorted by the lexicographic total order the cycle detector's
    /// canonical DFS relies on.
    pub fn accounts_sorted(&self) -> Vec<String> {
        let mut accounts: Vec<String> = self.node_stats.keys().cloned().collect();
        accounts.sort();
        accounts
    }

    pub fn stats(&self, account: &str) -> Option<&NodeStats> {
        self.node_stats.get(account)
    }

    pub fn node_count(&self) -> usize {
        self.node_stats.len()
    }

    /// Outgoing edges from `account`, sorted by timestamp ascending.
    pub fn outgoing_by_time(&self, account: &str) -> Vec<&Edge> {
        let mut edges: Vec<&Edge> = self
            .edges_by_source
            .get(account)
            .map(|e| e.iter().collect())
            .unwrap_or_default();
        edges.sort_by_key(|e| e.timestamp);
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tx(id: &str, from: &str, to: &str, amount: f64, hour: u32) -> Transaction {
        Transaction {
            transaction_id: id.to_string(),
            sender_id: from.to_string(),
            receiver_id: to.to_string(),
            amount,
            timestamp: Utc.with_ymd_and_hms(2026, 1, 1, hour, 0, 0).unwrap(),
        }
    }

    #[test]
    fn build_tracks_node_stats() {
        let txs = vec![
            tx("T1", "A", "B", 100.0, 0),
            tx("T2", "A", "C", 200.0, 1),
            tx("T3", "B", "C", 50.0, 2),
        ];
        let graph = Graph::build(&txs);

        let a = graph.stats("A").unwrap();
        assert_eq!(a.tx_out, 2);
        assert_eq!(a.tx_in, 0);
        assert_eq!(a.total_out, 300.0);

        let c = graph.stats("C").unwrap();
        assert_eq!(c.tx_in, 2);
        assert_eq!(c.total_in, 250.0);

        assert_eq!(graph.node_count(), 3);
        assert!(graph.adj["A"].contains("B"));
        assert!(graph.adj["A"].contains("C"));
        assert!(graph.rev["C"].contains("A"));
    }

    #[test]
    fn timestamps_per_node_are_sorted() {
        let txs = vec![
            tx("T1", "A", "B", 10.0, 5),
            tx("T2", "C", "B", 10.0, 1),
            tx("T3", "D", "B", 10.0, 3),
        ];
        let graph = Graph::build(&txs);
        let b = graph.stats("B").unwrap();
        let hours: Vec<u32> = b
            .timestamps
            .iter()
            .map(|t| chrono::Timelike::hour(t))
            .collect();
        assert_eq!(hours, vec![1, 3, 5]);
    }

    #[test]
    fn degree_sums_in_and_out() {
        let txs = vec![tx("T1", "A", "B", 10.0, 0), tx("T2", "B", "C", 10.0, 1)];
        let graph = Graph::build(&txs);
        assert_eq!(graph.stats("B").unwrap().degree(), 2);
    }
}
