//! Collect-then-rank selection for the tiered scanner
//!
//! Every snapshot in a cycle is run through extraction, safety, tiering and
//! the dedup check. Survivors are ranked by `(tier priority, window volume)`
//! and only the top one is alerted, regardless of how many qualified.

use super::dedup::DedupLedger;
use super::metrics::extract_metrics;
use super::safety::check_safety;
use super::tiers::classify;
use super::types::{Candidate, PairSnapshot, Tier};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Outcome of evaluating one cycle's snapshots
#[derive(Debug, Clone)]
pub struct CycleEvaluation {
    /// Unique pairs considered
    pub considered: usize,
    /// Pairs that passed every gate
    pub qualified: usize,
    pub winner: Option<Candidate>,
}

/// Build a candidate, or `None` if the snapshot is filtered out
pub fn build_candidate(snapshot: &PairSnapshot, now_ms: i64) -> Option<Candidate> {
    let metrics = extract_metrics(snapshot)?;

    let safety = check_safety(snapshot, now_ms);
    if !safety.is_eligible() {
        log::debug!(
            "🛡️  {} ({}) failed safety: liquidity_ok={}, age_ok={}",
            snapshot.symbol,
            snapshot.pair_address,
            safety.liquidity_ok,
            safety.age_ok
        );
        return None;
    }

    let tier = classify(&metrics);
    if tier == Tier::None {
        return None;
    }

    Some(Candidate {
        snapshot: snapshot.clone(),
        metrics,
        tier,
        safety,
        tier_priority: tier.priority(),
        ranking_volume: metrics.window_volume,
    })
}

/// Highest priority first, then highest window volume
fn rank_order(a: &Candidate, b: &Candidate) -> Ordering {
    b.tier_priority.cmp(&a.tier_priority).then_with(|| {
        b.ranking_volume
            .partial_cmp(&a.ranking_volume)
            .unwrap_or(Ordering::Equal)
    })
}

/// Pick the single best candidate. Stable: equal keys keep input order.
pub fn rank_best(mut candidates: Vec<Candidate>) -> Option<Candidate> {
    candidates.sort_by(rank_order);
    candidates.into_iter().next()
}

/// Evaluate one scan cycle. Pure apart from reading the ledger.
///
/// A pair that appears in more than one query batch is considered once.
pub fn evaluate_cycle(
    snapshots: &[PairSnapshot],
    ledger: &DedupLedger,
    now_ms: i64,
) -> CycleEvaluation {
    let mut seen_this_cycle = HashSet::new();
    let mut qualified = Vec::new();

    for snapshot in snapshots {
        if !seen_this_cycle.insert(snapshot.pair_address.as_str()) {
            continue;
        }

        let Some(candidate) = build_candidate(snapshot, now_ms) else {
            continue;
        };

        if ledger.seen(&snapshot.pair_address) {
            log::debug!(
                "🔁 {} already called, skipping ({})",
                snapshot.symbol,
                candidate.tier
            );
            continue;
        }

        qualified.push(candidate);
    }

    let count = qualified.len();
    CycleEvaluation {
        considered: seen_this_cycle.len(),
        qualified: count,
        winner: rank_best(qualified),
    }
}
