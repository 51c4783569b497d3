//! Bounded canonical-DFS enumeration of simple directed cycles of length 3-5.

use crate::graph::Graph;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// A single detected cycle: member accounts in traversal order plus the
/// per-hop amount/timestamp selected for scoring (§4.3: largest amount and
/// earliest timestamp when a hop has parallel transfers).
#[derive(Debug, Clone)]
pub struct CycleHit {
    pub members: Vec<String>,
    pub amounts: Vec<f64>,
    pub timestamps: Vec<DateTime<Utc>>,
}

/// Tunables for the cycle detector: the 3-5 length bounds and the
/// whole-run acceptance cap.
#[derive(Debug, Clone)]
pub struct CycleThresholds {
    pub min_length: usize,
    pub max_length: usize,
    pub cap: usize,
}

impl Default for CycleThresholds {
    fn default() -> Self {
        Self {
            min_length: 3,
            max_length: 5,
            cap: 500,
        }
    }
}

/// Enumerate simple directed cycles of length 3-5, canonical-DFS style: each
/// cycle is discovered exactly once, from its lexicographically smallest
/// member, by only following edges into strictly larger account ids.
///
/// Terminates deterministically once `thresholds.cap` cycles have been
/// accepted. Legitimate accounts never start or appear inside a cycle.
pub fn detect(graph: &Graph, legitimate: &HashSet<String>, thresholds: &CycleThresholds) -> Vec<CycleHit> {
    let accounts = graph.accounts_sorted();
    let mut cycles = Vec::new();

    for start in &accounts {
        if legitimate.contains(start) {
            continue;
        }
        let mut path = vec![start.clone()];
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(start.clone());
        if !dfs(graph, legitimate, start, &mut path, &mut visited, &mut cycles, thresholds) {
            break;
        }
    }

    cycles
}

/// Returns `false` once the cap has been hit, signalling the caller to stop
/// starting new searches.
fn dfs(
    graph: &Graph,
    legitimate: &HashSet<String>,
    start: &str,
    path: &mut Vec<String>,
    visited: &mut HashSet<String>,
    cycles: &mut Vec<CycleHit>,
    thresholds: &CycleThresholds,
) -> bool {
    let current = path.last().unwrap().clone();
    let mut neighbors: Vec<String> = graph
        .adj
        .get(&current)
        .map(|s| s.iter().cloned().collect())
        .unwrap_or_default();
    neighbors.sort();

    for neighbor in neighbors {
        if legitimate.contains(&neighbor) {
            continue;
        }

        if neighbor == start {
            if (thresholds.min_length..=thresholds.max_length).contains(&path.len()) {
                cycles.push(build_hit(graph, path));
                if cycles.len() >= thresholds.cap {
                    return false;
                }
            }
            continue;
        }

        if neighbor.as_str() > start && !visited.contains(&neighbor) && path.len() < thresholds.max_length {
            visited.insert(neighbor.clone());
            path.push(neighbor.clone());
            let keep_going = dfs(graph, legitimate, start, path, visited, cycles, thresholds);
            path.pop();
            visited.remove(&neighbor);
            if !keep_going {
                return false;
            }
        }
    }

    true
}

/// Builds a `CycleHit` from a closed path, selecting the largest-amount and
/// earliest-timestamp transfer for each hop (including the closing hop back
/// to the start).
fn build_hit(graph: &Graph, path: &[String]) -> CycleHit {
    let members: Vec<String> = path.to_vec();
    let mut amounts = Vec::with_capacity(members.len());
    let mut timestamps = Vec::with_capacity(members.len());

    for i in 0..members.len() {
        let from = &members[i];
        let to = &members[(i + 1) % members.len()];
        let (largest_amount, earliest_ts) = hop_edges(graph, from, to);
        amounts.push(largest_amount);
        timestamps.push(earliest_ts);
    }

    CycleHit {
        members,
        amounts,
        timestamps,
    }
}

fn hop_edges(graph: &Graph, from: &str, to: &str) -> (f64, DateTime<Utc>) {
    let candidates = graph
        .edges_by_source
        .get(from)
        .into_iter()
        .flatten()
        .filter(|e| e.partner == to);

    let mut largest_amount = f64::MIN;
    let mut earliest_ts: Option<DateTime<Utc>> = None;

    for edge in candidates {
        if edge.amount > largest_amount {
            largest_amount = edge.amount;
        }
        earliest_ts = match earliest_ts {
            Some(ts) if ts <= edge.timestamp => Some(ts),
            _ => Some(edge.timestamp),
        };
    }

    (largest_amount, earliest_ts.expect("hop edge must exist"))
}
