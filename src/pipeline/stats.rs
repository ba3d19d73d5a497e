//! Aggregate performance statistics over persisted calls
//!
//! A call's performance is its peak multiple: `peak_price / initial_price`.
//! Calls with a non-positive initial price are counted but excluded from
//! every multiple-based figure.

use super::types::{AlertRecord, Tier};

/// Peak multiple at which a call counts as a winner
pub const WIN_MULTIPLE: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TierStats {
    pub tier: Tier,
    pub calls: usize,
    pub winners: usize,
    pub average_multiple: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallStats {
    pub total_calls: usize,
    pub winners: usize,
    /// winners / calls with a usable initial price, 0 when there are none
    pub hit_rate: f64,
    pub average_multiple: f64,
    /// Symbol and multiple of the best call
    pub best: Option<(String, f64)>,
    /// Most severe tier first; tiers without calls are omitted
    pub per_tier: Vec<TierStats>,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Compute statistics over `records`
pub fn compute_stats(records: &[AlertRecord]) -> CallStats {
    let multiples: Vec<(&AlertRecord, f64)> = records
        .iter()
        .filter_map(|r| r.peak_multiple().map(|m| (r, m)))
        .collect();

    let values: Vec<f64> = multiples.iter().map(|(_, m)| *m).collect();
    let winners = values.iter().filter(|&&m| m >= WIN_MULTIPLE).count();

    let best = multiples
        .iter()
        .fold(None::<(&AlertRecord, f64)>, |best, &(r, m)| match best {
            Some((_, b)) if b >= m => best,
            _ => Some((r, m)),
        })
        .map(|(r, m)| (r.symbol.clone(), m));

    let per_tier = Tier::alertable()
        .into_iter()
        .filter_map(|tier| {
            let calls = records.iter().filter(|r| r.tier == tier).count();
            if calls == 0 {
                return None;
            }
            let tier_values: Vec<f64> = multiples
                .iter()
                .filter(|(r, _)| r.tier == tier)
                .map(|(_, m)| *m)
                .collect();
            Some(TierStats {
                tier,
                calls,
                winners: tier_values.iter().filter(|&&m| m >= WIN_MULTIPLE).count(),
                average_multiple: mean(&tier_values),
            })
        })
        .collect();

    CallStats {
        total_calls: records.len(),
        winners,
        hit_rate: if values.is_empty() {
            0.0
        } else {
            winners as f64 / values.len() as f64
        },
        average_multiple: mean(&values),
        best,
        per_tier,
    }
}

/// Statistics over calls made at or after `cutoff` (unix seconds)
pub fn stats_since(records: &[AlertRecord], cutoff: i64) -> CallStats {
    let recent: Vec<AlertRecord> = records
        .iter()
        .filter(|r| r.call_time >= cutoff)
        .cloned()
        .collect();
    compute_stats(&recent)
}
