//! Benchmarks the two budgeted detector stages against synthetic dense
//! graphs engineered to approach their hard caps.

use chrono::{TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use fraud_ring_detector::cycles::{self, CycleThresholds};
use fraud_ring_detector::graph::Graph;
use fraud_ring_detector::shell::{self, ShellThresholds};
use fraud_ring_detector::Transaction;
use std::collections::HashSet;

fn tx(id: &str, from: &str, to: &str, amount: f64, hour: i64) -> Transaction {
    Transaction {
        transaction_id: id.to_string(),
        sender_id: from.to_string(),
        receiver_id: to.to_string(),
        amount,
        timestamp: Utc.timestamp_opt(hour * 3600, 0).unwrap(),
    }
}

/// `n` disjoint triangles sharing account "A" as the smallest member, forcing
/// the cycle detector's cap to actually bind.
fn dense_cycle_graph(n: usize) -> Graph {
    let mut txs = Vec::with_capacity(n * 3);
    for i in 0..n {
        let b = format!("B{i:05}");
        let c = format!("C{i:05}");
        txs.push(tx(&format!("T{i}a"), "A", &b, 10.0, 0));
        txs.push(tx(&format!("T{i}b"), &b, &c, 10.0, 1));
        txs.push(tx(&format!("T{i}c"), &c, "A", 10.0, 2));
    }
    Graph::build(&txs)
}

/// `n` independent shell chains of length 5, each with fresh low-activity
/// intermediaries, to push the BFS step budget toward saturation.
fn dense_shell_graph(n: usize) -> Graph {
    let mut txs = Vec::with_capacity(n * 4);
    for i in 0..n {
        let start = format!("START{i:05}");
        let x1 = format!("X1-{i:05}");
        let x2 = format!("X2-{i:05}");
        let x3 = format!("X3-{i:05}");
        let end = format!("END{i:05}");
        txs.push(tx(&format!("S{i}a"), &start, &x1, 1000.0, 0));
        txs.push(tx(&format!("S{i}b"), &x1, &x2, 990.0, 1));
        txs.push(tx(&format!("S{i}c"), &x2, &x3, 980.0, 2));
        txs.push(tx(&format!("S{i}d"), &x3, &end, 970.0, 3));
    }
    Graph::build(&txs)
}

fn bench_cycle_cap(c: &mut Criterion) {
    let graph = dense_cycle_graph(1000);
    let legitimate = HashSet::new();
    let thresholds = CycleThresholds::default();
    c.bench_function("cycle_detect_capped_at_500", |b| {
        b.iter(|| cycles::detect(&graph, &legitimate, &thresholds))
    });
}

fn bench_shell_budget(c: &mut Criterion) {
    let graph = dense_shell_graph(2000);
    let legitimate = HashSet::new();
    let thresholds = ShellThresholds::default();
    c.bench_function("shell_detect_budgeted_bfs", |b| {
        b.iter(|| shell::detect(&graph, &legitimate, &thresholds))
    });
}

criterion_group!(benches, bench_cycle_cap, bench_shell_budget);
criterion_main!(benches);
