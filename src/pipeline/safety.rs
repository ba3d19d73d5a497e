//! Liquidity and age gating

use super::types::{PairSnapshot, SafetyVerdict};

/// Liquidity must be strictly above this (USD)
pub const MIN_LIQUIDITY_USD: f64 = 5_000.0;

/// Pairs older than this are no longer "new" (10 days)
pub const MAX_AGE_HOURS: f64 = 240.0;

/// Gate a snapshot. Unknown creation time fails the age check.
pub fn check_safety(snapshot: &PairSnapshot, now_ms: i64) -> SafetyVerdict {
    SafetyVerdict {
        liquidity_ok: snapshot.liquidity_usd > MIN_LIQUIDITY_USD,
        age_ok: snapshot
            .age_hours(now_ms)
            .map(|age| age < MAX_AGE_HOURS)
            .unwrap_or(false),
    }
}
