//! Fraud ring detection example
//!
//! This example demonstrates running the full detection pipeline over a
//! small synthetic batch: a laundering cycle, a smurfing fan-in hub, and a
//! shell chain, alongside an ordinary merchant that should never be flagged.

use chrono::{TimeZone, Utc};
use fraud_ring_detector::{run, PipelineConfig, Transaction};

fn tx(id: &str, from: &str, to: &str, amount: f64, hour: i64) -> Transaction {
    Transaction {
        transaction_id: id.to_string(),
        sender_id: from.to_string(),
        receiver_id: to.to_string(),
        amount,
        timestamp: Utc.timestamp_opt(hour * 3600, 0).unwrap(),
    }
}

fn main() {
    println!("=== Fraud Ring Detection Engine ===\n");

    let mut transactions = Vec::new();

    // A length-3 laundering cycle with amount decay and a tight time window.
    println!("1. Seeding a circular fund-routing cycle (A -> B -> C -> A)");
    transactions.push(tx("T1", "A", "B", 1000.0, 0));
    transactions.push(tx("T2", "B", "C", 950.0, 1));
    transactions.push(tx("T3", "C", "A", 910.0, 2));

    // A fan-in smurfing hub: 12 distinct senders into H within a tight window.
    println!("2. Seeding a fan-in smurfing hub (12 senders -> H)");
    for i in 0..12 {
        transactions.push(tx(&format!("S{i}"), &format!("SENDER{i}"), "H", 450.0, i));
    }

    // A shell chain of low-activity intermediaries.
    println!("3. Seeding a shell chain (D -> X1 -> X2 -> X3 -> E)");
    transactions.push(tx("C1", "D", "X1", 5000.0, 24));
    transactions.push(tx("C2", "X1", "X2", 4950.0, 25));
    transactions.push(tx("C3", "X2", "X3", 4900.0, 26));
    transactions.push(tx("C4", "X3", "E", 4850.0, 27));

    // An ordinary high-volume merchant that must be suppressed.
    println!("4. Seeding an ordinary merchant (20 customers -> MERCHANT)\n");
    for i in 0..20 {
        transactions.push(tx(
            &format!("M{i}"),
            &format!("CUSTOMER{i}"),
            "MERCHANT",
            75.0,
            48 + i,
        ));
    }
    transactions.push(tx("MO1", "MERCHANT", "SUPPLIER", 200.0, 72));

    let report = run(transactions, &PipelineConfig::default()).expect("pipeline should not abort");

    println!("=== Summary ===");
    println!("   Transactions processed: {}", report.summary.total_transactions);
    println!("   Accounts analyzed:      {}", report.summary.total_accounts_analyzed);
    println!("   Cycles found:           {}", report.summary.cycles_found);
    println!("   Smurfing hubs found:    {}", report.summary.smurfing_hubs_found);
    println!("   Fraud rings detected:   {}", report.summary.fraud_rings_detected);
    println!("   Suspicious accounts:    {}", report.summary.suspicious_accounts_flagged);
    println!("   Invalid rows skipped:   {}", report.summary.invalid_rows_skipped);
    println!();

    println!("=== Fraud Rings ===");
    for ring in &report.fraud_rings {
        println!(
            "   {} [{:?}] score={:.1} members={:?}",
            ring.ring_id, ring.pattern_type, ring.risk_score, ring.member_accounts
        );
    }
    println!();

    println!("=== Suspicious Accounts ===");
    for account in &report.suspicious_accounts {
        println!(
            "   {} score={} ring={:?} patterns={:?}",
            account.account_id, account.suspicion_score, account.ring_id, account.detected_patterns
        );
    }
    println!();

    println!("=== Graph Payload ===");
    println!(
        "   {} nodes, {} edges",
        report.graph.nodes.len(),
        report.graph.edges.len()
    );

    println!("\n=== Detection Capabilities ===");
    println!("✓ Circular fund-routing detection (bounded canonical DFS)");
    println!("✓ Smurfing / fan-hub detection (sliding-window cardinality)");
    println!("✓ Shell-network discovery (budgeted BFS chain enumeration)");
    println!("✓ Structural legitimacy filtering (merchant / payroll shapes)");
    println!("✓ Diminishing-returns ring scoring with deduplication");
}
