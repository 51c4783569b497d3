//! Budgeted BFS chain enumeration identifying layered pass-through
//! intermediaries ("shell networks").

use crate::graph::Graph;
use std::collections::{HashSet, VecDeque};

/// A detected chain `a0 -> a1 -> ... -> ak` where at least two interior
/// accounts are low-activity pass-throughs.
#[derive(Debug, Clone)]
pub struct ShellHit {
    pub path: Vec<String>,
    /// True when every interior account (not just the required two) is
    /// low-activity — a stronger variant of the same finding.
    pub interior_low_activity: bool,
}

#[derive(Debug, Clone)]
pub struct ShellThresholds {
    pub min_length: usize,
    pub max_length: usize,
    pub interior_max_activity: usize,
    pub min_shell_interior: usize,
    pub step_budget: usize,
}

impl Default for ShellThresholds {
    fn default() -> Self {
        Self {
            min_length: 3,
            max_length: 6,
            interior_max_activity: 3,
            min_shell_interior: 2,
            step_budget: 50_000,
        }
    }
}

fn is_shell_interior(graph: &Graph, account: &str, thresholds: &ShellThresholds) -> bool {
    graph
        .stats(account)
        .map(|s| s.degree() <= thresholds.interior_max_activity)
        .unwrap_or(false)
}

fn interior_counts(graph: &Graph, path: &[String], thresholds: &ShellThresholds) -> (usize, usize) {
    let interior = &path[1..path.len() - 1];
    let shell_count = interior
        .iter()
        .filter(|a| is_shell_interior(graph, a, thresholds))
        .count();
    (shell_count, interior.len())
}

/// BFS from each non-legitimate start node, under a global step budget shared
/// across all start nodes. Once the budget is exhausted, enumeration stops
/// deterministically and returns whatever chains were accepted so far.
pub fn detect(
    graph: &Graph,
    legitimate: &HashSet<String>,
    thresholds: &ShellThresholds,
) -> Vec<ShellHit> {
    let mut hits = Vec::new();
    let mut steps_used = 0usize;

    let mut starts = graph.accounts_sorted();
    starts.retain(|a| !legitimate.contains(a));

    'starts: for start in &starts {
        let mut queue: VecDeque<Vec<String>> = VecDeque::new();
        queue.push_back(vec![start.clone()]);

        while let Some(path) = queue.pop_front() {
            if steps_used >= thresholds.step_budget {
                break 'starts;
            }
            steps_used += 1;

            if path.len() >= thresholds.min_length {
                let (shell_count, interior_len) = interior_counts(graph, &path, thresholds);
                if shell_count >= thresholds.min_shell_interior {
                    hits.push(ShellHit {
                        path: path.clone(),
                        interior_low_activity: shell_count == interior_len,
                    });
                }
            }

            if path.len() >= thresholds.max_length {
                continue;
            }

            let current = path.last().unwrap();
            let mut neighbors: Vec<String> = graph
                .adj
                .get(current)
                .map(|s| s.iter().cloned().collect())
                .unwrap_or_default();
            neighbors.sort();

            for neighbor in neighbors {
                if path.contains(&neighbor) {
                    continue;
                }
                let mut next_path = path.clone();
                next_path.push(neighbor);
                queue.push_back(next_path);
            }
        }
    }

    hits
}
