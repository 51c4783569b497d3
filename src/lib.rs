//! Fraud-ring detection engine: discovers cyclic fund routing, smurfing
//! fan-hubs, and layered shell networks in a batch of account-to-account
//! transfers, then consolidates the findings into scored rings.
//!
//! The pipeline runs in five stages, each a module of its own:
//! [`graph`] builds the transaction multigraph, [`legitimacy`] suppresses
//! structurally ordinary merchant/payroll shapes, [`cycles`], [`smurfing`]
//! and [`shell`] each hunt one pattern independently, and [`consolidate`]
//! merges their output into the final [`Report`]. [`payload`] trims the
//! graph down to something a visualization client can render.

pub mod consolidate;
pub mod cycles;
pub mod graph;
pub mod legitimacy;
pub mod payload;
pub mod shell;
pub mod smurfing;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

pub use consolidate::{PatternType, Ring, ScoringThresholds, SuspiciousAccount};
pub use cycles::{CycleHit, CycleThresholds};
pub use graph::Graph;
pub use legitimacy::LegitimacyThresholds;
pub use payload::GraphPayload;
pub use shell::{ShellHit, ShellThresholds};
pub use smurfing::{FanRole, SmurfingHit, SmurfingThresholds};

/// A single account-to-account transfer. Rows are expected to already be
/// parsed and type-checked by the caller; this crate validates only the
/// semantic constraints it depends on (see [`run`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

/// Errors surfaced by the pipeline. Cloneable and serializable so a caller
/// can forward a failure across a process boundary without losing it.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum DetectionError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("pipeline aborted: {0}")]
    PipelineAborted(String),
}

/// Every tunable across all five pipeline stages, with spec-mandated
/// defaults. Bundled into one struct so a caller retuning recall only has to
/// thread one value through [`run`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub legitimacy: LegitimacyThresholds,
    pub cycles: CycleThresholds,
    pub smurfing: SmurfingThresholds,
    pub shell: ShellThresholds,
    pub scoring: ScoringThresholds,
    pub payload_node_cap: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            legitimacy: LegitimacyThresholds::default(),
            cycles: CycleThresholds::default(),
            smurfing: SmurfingThresholds::default(),
            shell: ShellThresholds::default(),
            scoring: ScoringThresholds::default(),
            payload_node_cap: 800,
        }
    }
}

/// Per-run ingest bookkeeping: rows accepted, duplicate `transaction_id`s
/// observed, and rows rejected with the reason they were rejected for.
/// Folded into [`Summary`] at the end of [`run`] (`invalid_rows_skipped`,
/// `duplicate_transaction_ids`); kept as its own type, mirroring the
/// teacher's habit of giving each stage's bookkeeping a named struct rather
/// than loose counters, since a caller embedding this crate may want the
/// full per-row skip reasons rather than just the count.
#[derive(Debug, Clone, Default)]
pub struct IngestStats {
    pub rows_accepted: usize,
    pub duplicate_transaction_ids: usize,
    pub rows_skipped: Vec<(String, DetectionError)>,
}

/// Top-line counts summarizing a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub total_accounts_analyzed: usize,
    pub total_transactions: usize,
    pub suspicious_accounts_flagged: usize,
    pub fraud_rings_detected: usize,
    pub cycles_found: usize,
    pub smurfing_hubs_found: usize,
    pub processing_time_seconds: f64,
    pub invalid_rows_skipped: usize,
    pub duplicate_transaction_ids: usize,
}

/// The full output of one detection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub summary: Summary,
    pub suspicious_accounts: Vec<SuspiciousAccount>,
    pub fraud_rings: Vec<Ring>,
    pub graph: GraphPayload,
}

impl Report {
    pub fn to_json(&self) -> Result<String, DetectionError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DetectionError::PipelineAborted(e.to_string()))
    }
}

/// Validates a row: self-transfers and non-positive amounts carry no
/// meaningful direction or weight for any downstream detector.
fn validate_row(tx: &Transaction) -> Result<(), DetectionError> {
    if tx.sender_id == tx.receiver_id {
        return Err(DetectionError::InvalidInput(format!(
            "self-transfer rejected: account {}",
            tx.sender_id
        )));
    }
    if tx.amount <= 0.0 {
        return Err(DetectionError::InvalidInput(format!(
            "non-positive amount rejected: {}",
            tx.amount
        )));
    }
    Ok(())
}

/// Folds the row-validated transaction sequence into [`IngestStats`]:
/// duplicate `transaction_id`s are tolerated (kept in the graph) but counted
/// separately (§4.1); invalid rows are dropped and counted with their reason.
fn ingest(transactions: Vec<Transaction>) -> (Vec<Transaction>, IngestStats) {
    let mut stats = IngestStats::default();
    let mut seen_ids: HashSet<String> = HashSet::with_capacity(transactions.len());
    let mut valid = Vec::with_capacity(transactions.len());

    for tx in transactions {
        if !seen_ids.insert(tx.transaction_id.clone()) {
            stats.duplicate_transaction_ids += 1;
        }

        match validate_row(&tx) {
            Ok(()) => {
                stats.rows_accepted += 1;
                valid.push(tx);
            }
            Err(reason) => stats.rows_skipped.push((tx.transaction_id, reason)),
        }
    }

    (valid, stats)
}

/// Runs the full detection pipeline: graph build, legitimacy filter, the
/// three pattern detectors, consolidation, and payload trimming, in that
/// order.
///
/// Invalid rows (self-transfers, non-positive amounts) are dropped during
/// ingest and counted in [`Summary::invalid_rows_skipped`]; they do not
/// abort the run. [`DetectionError::PipelineAborted`] is reserved for
/// failures inside the pipeline itself (e.g. report serialization).
pub fn run(transactions: Vec<Transaction>, config: &PipelineConfig) -> Result<Report, DetectionError> {
    let started = std::time::Instant::now();

    let (valid, ingest_stats) = ingest(transactions);

    let graph = Graph::build(&valid);
    let legitimate = legitimacy::classify(&graph, &config.legitimacy);

    let cycle_hits = cycles::detect(&graph, &legitimate, &config.cycles);
    let smurfing_hits = smurfing::detect(&graph, &legitimate, &config.smurfing);
    let shell_hits = shell::detect(&graph, &legitimate, &config.shell);

    let smurfing_hubs_found: HashSet<&String> = smurfing_hits.iter().map(|h| &h.hub).collect();

    let (mut fraud_rings, suspicious_accounts) = consolidate::consolidate(
        &cycle_hits,
        &smurfing_hits,
        &shell_hits,
        &legitimate,
        &config.scoring,
    );
    fraud_rings.sort_by(|a, b| a.ring_id.cmp(&b.ring_id));

    let suspicious_ids: HashSet<String> = suspicious_accounts
        .iter()
        .map(|a| a.account_id.clone())
        .collect();
    let graph_payload = payload::build(&graph, &suspicious_ids, config.payload_node_cap);

    let summary = Summary {
        total_accounts_analyzed: graph.node_count(),
        total_transactions: valid.len(),
        suspicious_accounts_flagged: suspicious_accounts.len(),
        fraud_rings_detected: fraud_rings.len(),
        cycles_found: cycle_hits.len(),
        smurfing_hubs_found: smurfing_hubs_found.len(),
        processing_time_seconds: started.elapsed().as_secs_f64(),
        invalid_rows_skipped: ingest_stats.rows_skipped.len(),
        duplicate_transaction_ids: ingest_stats.duplicate_transaction_ids,
    };

    Ok(Report {
        summary,
        suspicious_accounts,
        fraud_rings,
        graph: graph_payload,
    })
}
