//! Per-node fan-in/fan-out analysis with a temporal sliding window.

use crate::graph::Graph;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanRole {
    FanIn,
    FanOut,
}

/// A detected fan hub: one account funnelling money in from, or scattering
/// money out to, at least `fan_threshold` distinct partners.
#[derive(Debug, Clone)]
pub struct SmurfingHit {
    pub hub: String,
    pub role: FanRole,
    pub partners: Vec<String>,
    /// Largest transaction count inside any contiguous 72h window.
    pub max_window_count_72h: usize,
    /// Largest transaction count inside any contiguous 24h window, feeding
    /// the "high velocity" contribution (§4.6) — see DESIGN.md for why this
    /// is computed here rather than via a fourth detector.
    pub max_window_count_24h: usize,
}

#[derive(Debug, Clone)]
pub struct SmurfingThresholds {
    pub fan_threshold: usize,
    pub window_72h: Duration,
    pub window_24h: Duration,
}

impl Default for SmurfingThresholds {
    fn default() -> Self {
        Self {
            fan_threshold: 10,
            window_72h: Duration::hours(72),
            window_24h: Duration::hours(24),
        }
    }
}

/// Single O(V + E) pass over non-legitimate accounts.
pub fn detect(
    graph: &Graph,
    legitimate: &HashSet<String>,
    thresholds: &SmurfingThresholds,
) -> Vec<SmurfingHit> {
    let mut hits = Vec::new();

    let mut accounts: Vec<&String> = graph.node_stats.keys().collect();
    accounts.sort();

    for account in accounts {
        if legitimate.contains(account) {
            continue;
        }

        let senders: HashSet<&String> = graph.rev.get(account).into_iter().flatten().collect();
        let receivers: HashSet<&String> = graph.adj.get(account).into_iter().flatten().collect();

        if senders.len() < thresholds.fan_threshold && receivers.len() < thresholds.fan_threshold {
            continue;
        }

        let timestamps = &graph
            .stats(account)
            .map(|s| s.timestamps.clone())
            .unwrap_or_default();
        let max_72h = max_window_count(timestamps, thresholds.window_72h);
        let max_24h = max_window_count(timestamps, thresholds.window_24h);

        if senders.len() >= thresholds.fan_threshold {
            let mut partners: Vec<String> = senders.iter().map(|s| s.to_string()).collect();
            partners.sort();
            hits.push(SmurfingHit {
                hub: account.clone(),
                role: FanRole::FanIn,
                partners,
                max_window_count_72h: max_72h,
                max_window_count_24h: max_24h,
            });
        }

        if receivers.len() >= thresholds.fan_threshold {
            let mut partners: Vec<String> = receivers.iter().map(|s| s.to_string()).collect();
            partners.sort();
            hits.push(SmurfingHit {
                hub: account.clone(),
                role: FanRole::FanOut,
                partners,
                max_window_count_72h: max_72h,
                max_window_count_24h: max_24h,
            });
        }
    }

    hits
}

/// Largest number of timestamps (already sorted ascending) that fit in any
/// contiguous window of the given duration, via a two-pointer sweep.
fn max_window_count(timestamps: &[DateTime<Utc>], window: Duration) -> usize {
    let mut best = 0;
    let mut left = 0;
    for right in 0..timestamps.len() {
        while timestamps[right] - timestamps[left] > window {
            left += 1;
        }
        best = best.max(right - left + 1);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Transaction;
    use chrono::TimeZone;

    fn tx(id: &str, from: &str, to: &str, amount: f64, hour: i64) -> Transaction {
        Transaction {
            transaction_id: id.to_string(),
            sender_id: from.to_string(),
            receiver_id: to.to_string(),
            amount,
            timestamp: Utc.timestamp_opt(hour * 3600, 0).unwrap(),
        }
    }

    #[test]
    fn detects_fan_in_hub() {
        let txs: Vec<Transaction> = (0..12)
            .map(|i| tx(&format!("T{i}"), &format!("S{i}"), "H", 100.0, i))
            .collect();
        let graph = Graph::build(&txs);
        let hits = detect(&graph, &HashSet::new(), &SmurfingThresholds::default());

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].hub, "H");
        assert_eq!(hits[0].role, FanRole::FanIn);
        assert_eq!(hits[0].partners.len(), 12);
    }

    #[test]
    fn detects_fan_out_hub() {
        let txs: Vec<Transaction> = (0..10)
            .map(|i| tx(&format!("T{i}"), "H", &format!("R{i}"), 100.0, i))
            .collect();
        let graph = Graph::build(&txs);
        let hits = detect(&graph, &HashSet::new(), &SmurfingThresholds::default());

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].role, FanRole::FanOut);
    }

    #[test]
    fn below_threshold_is_not_flagged() {
        let txs: Vec<Transaction> = (0..9)
            .map(|i| tx(&format!("T{i}"), &format!("S{i}"), "H", 100.0, i))
            .collect();
        let graph = Graph::build(&txs);
        let hits = detect(&graph, &HashSet::new(), &SmurfingThresholds::default());
        assert!(hits.is_empty());
    }

    #[test]
    fn window_count_picks_tightest_burst() {
        // 10 senders within the first hour, then one far away 10 days later.
        let mut txs: Vec<Transaction> = (0..10)
            .map(|i| tx(&format!("T{i}"), &format!("S{i}"), "H", 100.0, 0))
            .collect();
        txs.push(tx("TFAR", "S99", "H", 100.0, 24 * 10));
        let graph = Graph::build(&txs);
        let hits = detect(&graph, &HashSet::new(), &SmurfingThresholds::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].max_window_count_72h, 10);
    }

    #[test]
    fn legitimate_accounts_are_excluded() {
        let txs: Vec<Transaction> = (0..12)
            .map(|i| tx(&format!("T{i}"), &format!("S{i}"), "H", 100.0, i))
            .collect();
        let graph = Graph::build(&txs);
        let mut legit = HashSet::new();
        legit.insert("H".to_string());
        let hits = detect(&graph, &legit, &SmurfingThresholds::default());
        assert!(hits.is_empty());
    }
}
