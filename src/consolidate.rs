//! Ring Consolidator & Scorer: the only stage with global state across
//! detectors. Owns ring identity and final suspicion scoring.

use crate::cycles::CycleHit;
use crate::shell::ShellHit;
use crate::smurfing::{FanRole, SmurfingHit};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Fraud pattern a ring was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Cycle,
    Smurfing,
    ShellNetwork,
}

/// A consolidated fraud finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ring {
    pub ring_id: String,
    pub pattern_type: PatternType,
    pub member_accounts: Vec<String>,
    pub risk_score: f64,
}

/// A flagged account with its calibrated suspicion score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspiciousAccount {
    pub account_id: String,
    pub suspicion_score: u8,
    pub ring_id: Option<String>,
    pub detected_patterns: Vec<String>,
}

/// Tunables for the scoring/dedup stage.
#[derive(Debug, Clone)]
pub struct ScoringThresholds {
    pub diminishing_denominator: f64,
    pub cycle_base: [(usize, f64); 3],
    pub temporal_72h_bonus: f64,
    pub temporal_week_bonus: f64,
    pub decay_bonus: f64,
    pub decay_ratio_range: (f64, f64),
    pub velocity_min_count: usize,
    pub velocity_multiplier: f64,
    pub peripheral_multiplier: f64,
    pub shell_base: f64,
    pub shell_chain_count_weight: f64,
    pub shell_hop_weight: f64,
    pub shell_scale: f64,
    pub dedup_overlap_threshold: f64,
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self {
            diminishing_denominator: 120.0,
            cycle_base: [(3, 85.0), (4, 80.0), (5, 75.0)],
            temporal_72h_bonus: 8.0,
            temporal_week_bonus: 4.0,
            decay_bonus: 6.0,
            decay_ratio_range: (0.65, 0.98),
            velocity_min_count: 6,
            velocity_multiplier: 1.5,
            peripheral_multiplier: 0.3,
            shell_base: 55.0,
            shell_chain_count_weight: 10.0,
            shell_hop_weight: 2.0,
            shell_scale: 0.5,
            dedup_overlap_threshold: 0.85,
        }
    }
}

#[derive(Debug, Default, Clone)]
struct AccountState {
    score: f64,
    patterns: Vec<String>,
}

impl AccountState {
    fn apply(&mut self, contribution: f64, tag: &str, denominator: f64) {
        self.score = (self.score + contribution * (1.0 - self.score / denominator)).clamp(0.0, 100.0);
        if !self.patterns.iter().any(|t| t == tag) {
            self.patterns.push(tag.to_string());
        }
    }
}

struct RingCandidate {
    pattern_type: PatternType,
    members: Vec<String>,
    risk_score: f64,
    construction_order: usize,
}

/// Consolidates detector outputs into scored, deduplicated rings plus the
/// final per-account suspicion table.
pub fn consolidate(
    cycle_hits: &[CycleHit],
    smurfing_hits: &[SmurfingHit],
    shell_hits: &[ShellHit],
    legitimate: &HashSet<String>,
    thresholds: &ScoringThresholds,
) -> (Vec<Ring>, Vec<SuspiciousAccount>) {
    let mut accounts: HashMap<String, AccountState> = HashMap::new();

    // Group 1: cycle contributions.
    for hit in cycle_hits {
        score_cycle_hit(hit, &mut accounts, thresholds);
    }

    // Group 2: fan/velocity contributions (hub only).
    let mut velocity_applied: HashSet<String> = HashSet::new();
    for hit in smurfing_hits {
        score_fan_velocity(hit, &mut accounts, &mut velocity_applied, thresholds);
    }

    // Group 3: shell chain member contributions.
    let mut chain_count: HashMap<String, usize> = HashMap::new();
    for hit in shell_hits {
        for member in &hit.path {
            *chain_count.entry(member.clone()).or_insert(0) += 1;
        }
    }
    for hit in shell_hits {
        score_shell_hit(hit, &chain_count, legitimate, &mut accounts, thresholds);
    }

    // Group 4: peripheral fan contributor/receiver contributions.
    for hit in smurfing_hits {
        score_peripheral(hit, legitimate, &mut accounts, thresholds);
    }

    // Candidate ring assembly.
    let mut candidates = Vec::new();
    let mut order = 0usize;

    for hit in cycle_hits {
        let members: Vec<String> = hit
            .members
            .iter()
            .filter(|m| !legitimate.contains(*m))
            .cloned()
            .collect();
        push_candidate(&mut candidates, &mut order, PatternType::Cycle, members, &accounts);
    }
    for hit in smurfing_hits {
        if legitimate.contains(&hit.hub) {
            continue;
        }
        push_candidate(
            &mut candidates,
            &mut order,
            PatternType::Smurfing,
            vec![hit.hub.clone()],
            &accounts,
        );
    }
    for hit in shell_hits {
        let members: Vec<String> = hit
            .path
            .iter()
            .filter(|m| !legitimate.contains(*m))
            .cloned()
            .collect();
        push_candidate(
            &mut candidates,
            &mut order,
            PatternType::ShellNetwork,
            members,
            &accounts,
        );
    }

    let kept = dedup(candidates, thresholds.dedup_overlap_threshold);
    let rings = renumber(kept);

    // Assign each account's ring_id to its highest-scoring true membership.
    let mut ring_of_account: HashMap<String, (String, f64)> = HashMap::new();
    for ring in &rings {
        for member in &ring.member_accounts {
            let better = ring_of_account
                .get(member)
                .map(|(_, score)| ring.risk_score > *score)
                .unwrap_or(true);
            if better {
                ring_of_account.insert(member.clone(), (ring.ring_id.clone(), ring.risk_score));
            }
        }
    }

    let mut suspicious: Vec<SuspiciousAccount> = accounts
        .into_iter()
        .filter(|(account, state)| state.score > 0.0 && !legitimate.contains(account))
        .map(|(account, state)| SuspiciousAccount {
            ring_id: ring_of_account.get(&account).map(|(id, _)| id.clone()),
            account_id: account,
            suspicion_score: state.score.round() as u8,
            detected_patterns: state.patterns,
        })
        .collect();

    suspicious.sort_by(|a, b| {
        b.suspicion_score
            .cmp(&a.suspicion_score)
            .then_with(|| a.account_id.cmp(&b.account_id))
    });

    (rings, suspicious)
}

fn score_cycle_hit(
    hit: &CycleHit,
    accounts: &mut HashMap<String, AccountState>,
    thresholds: &ScoringThresholds,
) {
    let length = hit.members.len();
    let base = thresholds
        .cycle_base
        .iter()
        .find(|(len, _)| *len == length)
        .map(|(_, base)| *base)
        .unwrap_or(0.0);
    let tag = format!("cycle_length_{length}");

    for member in &hit.members {
        accounts
            .entry(member.clone())
            .or_default()
            .apply(base, &tag, thresholds.diminishing_denominator);
    }

    if let (Some(min_ts), Some(max_ts)) = (hit.timestamps.iter().min(), hit.timestamps.iter().max())
    {
        let span = *max_ts - *min_ts;
        if span <= Duration::hours(72) {
            for member in &hit.members {
                accounts.entry(member.clone()).or_default().apply(
                    thresholds.temporal_72h_bonus,
                    "temporal_burst_72h",
                    thresholds.diminishing_denominator,
                );
            }
        } else if span <= Duration::weeks(1) {
            for member in &hit.members {
                accounts.entry(member.clone()).or_default().apply(
                    thresholds.temporal_week_bonus,
                    "temporal_burst_week",
                    thresholds.diminishing_denominator,
                );
            }
        }
    }

    let (lo, hi) = thresholds.decay_ratio_range;
    let decays = hit.amounts.len() >= 2
        && hit.amounts.windows(2).all(|w| {
            let ratio = w[1] / w[0];
            ratio >= lo && ratio <= hi
        });
    if decays {
        for member in &hit.members {
            accounts.entry(member.clone()).or_default().apply(
                thresholds.decay_bonus,
                "amount_decay",
                thresholds.diminishing_denominator,
            );
        }
    }
}

fn hub_contribution(hit: &SmurfingHit) -> f64 {
    let p = hit.partners.len() as f64;
    let w = hit.max_window_count_72h as f64;
    (40.0 + (p - 10.0) * 3.0 + w * 2.0).min(100.0).max(0.0)
}

fn score_fan_velocity(
    hit: &SmurfingHit,
    accounts: &mut HashMap<String, AccountState>,
    velocity_applied: &mut HashSet<String>,
    thresholds: &ScoringThresholds,
) {
    let contribution = hub_contribution(hit);
    let tag = match hit.role {
        FanRole::FanIn => "fan_in_hub",
        FanRole::FanOut => "fan_out_hub",
    };
    accounts
        .entry(hit.hub.clone())
        .or_default()
        .apply(contribution, tag, thresholds.diminishing_denominator);

    if hit.max_window_count_24h >= thresholds.velocity_min_count
        && velocity_applied.insert(hit.hub.clone())
    {
        let velocity_contribution = hit.max_window_count_24h as f64 * thresholds.velocity_multiplier;
        accounts.entry(hit.hub.clone()).or_default().apply(
            velocity_contribution,
            "high_velocity",
            thresholds.diminishing_denominator,
        );
    }
}

fn score_shell_hit(
    hit: &ShellHit,
    chain_count: &HashMap<String, usize>,
    legitimate: &HashSet<String>,
    accounts: &mut HashMap<String, AccountState>,
    thresholds: &ScoringThresholds,
) {
    let hops = (hit.path.len() - 1) as f64;
    for member in &hit.path {
        if legitimate.contains(member) {
            continue;
        }
        let c = *chain_count.get(member).unwrap_or(&1) as f64;
        let contribution = thresholds.shell_scale
            * (thresholds.shell_base + thresholds.shell_chain_count_weight * c + thresholds.shell_hop_weight * hops);
        accounts.entry(member.clone()).or_default().apply(
            contribution,
            "shell_chain_member",
            thresholds.diminishing_denominator,
        );
    }
}

fn score_peripheral(
    hit: &SmurfingHit,
    legitimate: &HashSet<String>,
    accounts: &mut HashMap<String, AccountState>,
    thresholds: &ScoringThresholds,
) {
    let hub_score = hub_contribution(hit);
    let contribution = thresholds.peripheral_multiplier * hub_score;
    let tag = match hit.role {
        FanRole::FanIn => "fan_in_contributor",
        FanRole::FanOut => "fan_out_receiver",
    };
    for partner in &hit.partners {
        if legitimate.contains(partner) {
            continue;
        }
        accounts
            .entry(partner.clone())
            .or_default()
            .apply(contribution, tag, thresholds.diminishing_denominator);
    }
}

fn push_candidate(
    candidates: &mut Vec<RingCandidate>,
    order: &mut usize,
    pattern_type: PatternType,
    members: Vec<String>,
    accounts: &HashMap<String, AccountState>,
) {
    if members.is_empty() {
        return;
    }
    let risk_score = members
        .iter()
        .map(|m| accounts.get(m).map(|s| s.score).unwrap_or(0.0))
        .fold(0.0_f64, f64::max);
    candidates.push(RingCandidate {
        pattern_type,
        members,
        risk_score,
        construction_order: *order,
    });
    *order += 1;
}

fn overlap(a: &[String], b: &[String]) -> f64 {
    let set_a: HashSet<&String> = a.iter().collect();
    let set_b: HashSet<&String> = b.iter().collect();
    let shared = set_a.intersection(&set_b).count();
    let denom = set_a.len().min(set_b.len());
    if denom == 0 {
        0.0
    } else {
        shared as f64 / denom as f64
    }
}

fn dedup(candidates: Vec<RingCandidate>, threshold: f64) -> Vec<RingCandidate> {
    let n = candidates.len();
    let mut keep = vec![true; n];

    for i in 0..n {
        if !keep[i] {
            continue;
        }
        for j in (i + 1)..n {
            if !keep[j] {
                continue;
            }
            if candidates[i].pattern_type != candidates[j].pattern_type {
                continue;
            }
            if overlap(&candidates[i].members, &candidates[j].members) <= threshold {
                continue;
            }
            let loser = pick_loser(&candidates[i], &candidates[j]);
            keep[loser] = false;
            if loser == i {
                break;
            }
        }
    }

    candidates
        .into_iter()
        .zip(keep)
        .filter_map(|(c, k)| k.then_some(c))
        .collect()
}

/// Returns 0 if `a` should be dropped, 1 if `b` should be dropped, comparing
/// by risk_score, then member count, then construction order (earlier wins).
fn pick_loser(a: &RingCandidate, b: &RingCandidate) -> usize {
    if a.risk_score != b.risk_score {
        return if a.risk_score < b.risk_score { 0 } else { 1 };
    }
    if a.members.len() != b.members.len() {
        return if a.members.len() < b.members.len() { 0 } else { 1 };
    }
    if a.construction_order <= b.construction_order {
        1
    } else {
        0
    }
}

fn renumber(mut candidates: Vec<RingCandidate>) -> Vec<Ring> {
    candidates.sort_by(|a, b| {
        b.risk_score
            .partial_cmp(&a.risk_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| smallest_member(&a.members).cmp(smallest_member(&b.members)))
    });

    candidates
        .into_iter()
        .enumerate()
        .map(|(i, c)| Ring {
            ring_id: format!("R{:03}", i + 1),
            pattern_type: c.pattern_type,
            member_accounts: c.members,
            risk_score: c.risk_score,
        })
        .collect()
}

fn smallest_member(members: &[String]) -> &String {
    members.iter().min().expect("ring has at least one member")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smurfing::FanRole;
    use chrono::{TimeZone, Utc};

    fn ts(hour: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(hour * 3600, 0).unwrap()
    }

    #[test]
    fn cycle_scoring_and_ring_assembly() {
        let hit = CycleHit {
            members: vec!["A".into(), "B".into(), "C".into()],
            amounts: vec![1000.0, 950.0, 910.0],
            timestamps: vec![ts(0), ts(1), ts(2)],
        };
        let (rings, accounts) = consolidate(
            &[hit],
            &[],
            &[],
            &HashSet::new(),
            &ScoringThresholds::default(),
        );

        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].ring_id, "R001");
        assert_eq!(rings[0].pattern_type, PatternType::Cycle);
        assert_eq!(accounts.len(), 3);
        let a = accounts.iter().find(|s| s.account_id == "A").unwrap();
        assert_eq!(a.suspicion_score, 89);
        assert!(a.detected_patterns.contains(&"cycle_length_3".to_string()));
        assert!(a
            .detected_patterns
            .contains(&"temporal_burst_72h".to_string()));
        assert!(a.detected_patterns.contains(&"amount_decay".to_string()));
    }

    #[test]
    fn smurfing_peripheral_accounts_have_no_ring() {
        let partners: Vec<String> = (0..12).map(|i| format!("S{i}")).collect();
        let hit = SmurfingHit {
            hub: "H".into(),
            role: FanRole::FanIn,
            partners: partners.clone(),
            max_window_count_72h: 12,
            max_window_count_24h: 2,
        };
        let (rings, accounts) = consolidate(
            &[],
            &[hit],
            &[],
            &HashSet::new(),
            &ScoringThresholds::default(),
        );

        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].member_accounts, vec!["H".to_string()]);

        let hub_entry = accounts.iter().find(|a| a.account_id == "H").unwrap();
        assert_eq!(hub_entry.ring_id.as_deref(), Some("R001"));

        let contributor = accounts.iter().find(|a| a.account_id == "S0").unwrap();
        assert_eq!(contributor.ring_id, None);
        assert!(contributor
            .detected_patterns
            .contains(&"fan_in_contributor".to_string()));
    }

    #[test]
    fn overlapping_rings_below_threshold_both_survive() {
        let hit_a = CycleHit {
            members: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            amounts: vec![500.0, 500.0, 500.0, 500.0],
            timestamps: vec![ts(0), ts(100), ts(200), ts(300)],
        };
        let hit_b = CycleHit {
            members: vec!["A".into(), "B".into(), "C".into(), "E".into()],
            amounts: vec![500.0, 500.0, 500.0, 500.0],
            timestamps: vec![ts(0), ts(100), ts(200), ts(300)],
        };
        let (rings, _) = consolidate(
            &[hit_a, hit_b],
            &[],
            &[],
            &HashSet::new(),
            &ScoringThresholds::default(),
        );
        // overlap = 3/4 = 0.75, at/below the 0.85 threshold: both survive.
        assert_eq!(rings.len(), 2);
    }

    #[test]
    fn overlapping_rings_above_threshold_collapse() {
        let hit_a = CycleHit {
            members: vec!["A".into(), "B".into(), "C".into()],
            amounts: vec![500.0, 500.0, 500.0],
            timestamps: vec![ts(0), ts(1), ts(2)],
        };
        let hit_b = hit_a.clone();
        let (rings, _) = consolidate(
            &[hit_a, hit_b],
            &[],
            &[],
            &HashSet::new(),
            &ScoringThresholds::default(),
        );
        assert_eq!(rings.len(), 1);
    }

    #[test]
    fn ring_density_is_gap_free() {
        let mut hits = Vec::new();
        for i in 0..3 {
            hits.push(CycleHit {
                members: vec![format!("A{i}"), format!("B{i}"), format!("C{i}")],
                amounts: vec![1000.0, 500.0, 100.0],
                timestamps: vec![ts(0), ts(1), ts(2)],
            });
        }
        let (rings, _) = consolidate(
            &hits,
            &[],
            &[],
            &HashSet::new(),
            &ScoringThresholds::default(),
        );
        let ids: Vec<&str> = rings.iter().map(|r| r.ring_id.as_str()).collect();
        assert_eq!(ids, vec!["R001", "R002", "R003"]);
    }

    #[test]
    fn legitimate_accounts_never_appear() {
        let hit = CycleHit {
            members: vec!["A".into(), "B".into(), "C".into()],
            amounts: vec![1000.0, 500.0, 100.0],
            timestamps: vec![ts(0), ts(1), ts(2)],
        };
        let mut legit = HashSet::new();
        legit.insert("B".to_string());
        let (rings, accounts) =
            consolidate(&[hit], &[], &[], &legit, &ScoringThresholds::default());
        assert!(rings.iter().all(|r| !r.member_accounts.contains(&"B".to_string())));
        assert!(accounts.iter().all(|a| a.account_id != "B"));
    }
}
