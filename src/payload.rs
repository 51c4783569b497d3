//! Graph Payload Builder: trims the full transaction graph down to a
//! visualization-sized node/edge set.

use crate::graph::Graph;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One account as surfaced to a graph rendering client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadNode {
    pub id: String,
    pub tx_in: usize,
    pub tx_out: usize,
    pub total_in: f64,
    pub total_out: f64,
    pub suspicious: bool,
}

/// One directed transfer between two included nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadEdge {
    pub source: String,
    pub target: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphPayload {
    pub nodes: Vec<PayloadNode>,
    pub edges: Vec<PayloadEdge>,
}

/// Every suspicious account is included. The remainder of the node budget is
/// filled by descending total degree, ties broken lexicographically by
/// account id. An edge is emitted only when both endpoints made the cut.
pub fn build(graph: &Graph, suspicious: &HashSet<String>, node_cap: usize) -> GraphPayload {
    let mut included: HashSet<String> = suspicious
        .iter()
        .filter(|a| graph.stats(a).is_some())
        .cloned()
        .collect();

    if included.len() < node_cap {
        let mut rest: Vec<String> = graph
            .accounts_sorted()
            .into_iter()
            .filter(|a| !included.contains(a))
            .collect();
        rest.sort_by(|a, b| {
            let deg_a = graph.stats(a).map(|s| s.degree()).unwrap_or(0);
            let deg_b = graph.stats(b).map(|s| s.degree()).unwrap_or(0);
            deg_b.cmp(&deg_a).then_with(|| a.cmp(b))
        });

        for account in rest {
            if included.len() >= node_cap {
                break;
            }
            included.insert(account);
        }
    }

    let mut nodes: Vec<PayloadNode> = included
        .iter()
        .filter_map(|account| {
            graph.stats(account).map(|stats| PayloadNode {
                id: account.clone(),
                tx_in: stats.tx_in,
                tx_out: stats.tx_out,
                total_in: stats.total_in,
                total_out: stats.total_out,
                suspicious: suspicious.contains(account),
            })
        })
        .collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));

    let mut edges = Vec::new();
    for source in &included {
        for edge in graph.edges_by_source.get(source).into_iter().flatten() {
            if included.contains(&edge.partner) {
                edges.push(PayloadEdge {
                    source: source.clone(),
                    target: edge.partner.clone(),
                    amount: edge.amount,
                });
            }
        }
    }
    edges.sort_by(|a, b| a.source.cmp(&b.source).then_with(|| a.target.cmp(&b.target)));

    GraphPayload { nodes, edges }
}
