//! Metric extraction from a single pair snapshot
//!
//! DexScreener only publishes 5-minute aggregates. The scanner wants a
//! narrower ~2.5 minute slice, so the 5-minute figures are scaled by
//! `SUB_WINDOW_SCALE`. This is a heuristic: it has never been checked against
//! true sub-window trade data.

use super::types::{Metrics, PairSnapshot};

/// Scale applied to 5-minute aggregates to approximate the sub-window
pub const SUB_WINDOW_SCALE: f64 = 0.5;

/// Hourly buys below this mean the 5-minute spike has no sustained backing
pub const MIN_HOURLY_BUYS: u64 = 5;

/// Noise floor for the scaled window
pub const MIN_RECENT_BUYS: u64 = 1;
pub const MIN_WINDOW_VOLUME_USD: f64 = 50.0;

/// Derive short-window metrics, or `None` when the snapshot carries no signal
pub fn extract_metrics(snapshot: &PairSnapshot) -> Option<Metrics> {
    if snapshot.txns_h1.buys < MIN_HOURLY_BUYS {
        return None;
    }

    let recent_buys = (snapshot.txns_m5.buys as f64 * SUB_WINDOW_SCALE).floor() as u64;
    let window_volume = snapshot.volume.m5 * SUB_WINDOW_SCALE;

    if recent_buys < MIN_RECENT_BUYS || window_volume < MIN_WINDOW_VOLUME_USD {
        return None;
    }

    Some(Metrics::new(recent_buys, window_volume))
}
