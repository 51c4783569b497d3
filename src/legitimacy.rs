//! Structural legitimacy classification: suppresses high-volume merchants and
//! payroll shapes from every downstream detector.

use crate::graph::Graph;
use std::collections::HashSet;

const EPSILON: f64 = 1e-9;

/// Thresholds driving the three legitimate-account shapes. Defaults are the
/// values this spec mandates; exposed for callers who need to retune recall
/// against a different commerce mix.
#[derive(Debug, Clone)]
pub struct LegitimacyThresholds {
    pub merchant_min_in: usize,
    pub merchant_max_out: usize,
    pub merchant_inflow_ratio: f64,
    pub payroll_min_out: usize,
    pub payroll_max_in: usize,
    pub conduit_balance_tolerance: f64,
}

impl Default for LegitimacyThresholds {
    fn default() -> Self {
        Self {
            merchant_min_in: 12,
            merchant_max_out: 5,
            merchant_inflow_ratio: 2.0,
            payroll_min_out: 15,
            payroll_max_in: 3,
            conduit_balance_tolerance: 0.15,
        }
    }
}

/// Returns the set of accounts classified as structurally legitimate.
pub fn classify(graph: &Graph, thresholds: &LegitimacyThresholds) -> HashSet<String> {
    let mut legitimate = HashSet::new();

    for (account, stats) in &graph.node_stats {
        let is_merchant = stats.tx_in >= thresholds.merchant_min_in
            && stats.tx_out <= thresholds.merchant_max_out
            && stats.total_in > thresholds.merchant_inflow_ratio * stats.total_out;

        let is_payroll_disburser =
            stats.tx_out >= thresholds.payroll_min_out && stats.tx_in <= thresholds.payroll_max_in;

        let is_payroll_conduit = stats.tx_in <= thresholds.payroll_max_in
            && stats.tx_out >= thresholds.payroll_min_out
            && (stats.total_in - stats.total_out).abs() / stats.total_in.max(EPSILON)
                < thresholds.conduit_balance_tolerance;

        if is_merchant || is_payroll_disburser || is_payroll_conduit {
            legitimate.insert(account.clone());
        }
    }

    legitimate
}
