//! Tier classification
//!
//! Tiers are checked from most to least severe and the first satisfied
//! predicate wins. VERY_STRONG is an OR over buys and volume; the others
//! require all three thresholds.

use super::types::{Metrics, Tier};

/// Minimum thresholds for an AND-tier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierThresholds {
    pub min_buys: u64,
    pub min_volume: f64,
    pub min_average_buy: f64,
}

impl TierThresholds {
    fn satisfied_by(&self, m: &Metrics) -> bool {
        m.recent_buys >= self.min_buys
            && m.window_volume >= self.min_volume
            && m.average_buy_size >= self.min_average_buy
    }
}

pub const VERY_STRONG_MIN_BUYS: u64 = 80;
pub const VERY_STRONG_MIN_VOLUME: f64 = 20_000.0;

pub const STRONG: TierThresholds = TierThresholds {
    min_buys: 45,
    min_volume: 10_000.0,
    min_average_buy: 100.0,
};

pub const MEDIUM: TierThresholds = TierThresholds {
    min_buys: 30,
    min_volume: 6_000.0,
    min_average_buy: 75.0,
};

pub const FIRST_CALL: TierThresholds = TierThresholds {
    min_buys: 20,
    min_volume: 3_000.0,
    min_average_buy: 50.0,
};

/// Map metrics to exactly one tier
pub fn classify(m: &Metrics) -> Tier {
    if m.recent_buys >= VERY_STRONG_MIN_BUYS || m.window_volume >= VERY_STRONG_MIN_VOLUME {
        Tier::VeryStrong
    } else if STRONG.satisfied_by(m) {
        Tier::Strong
    } else if MEDIUM.satisfied_by(m) {
        Tier::Medium
    } else if FIRST_CALL.satisfied_by(m) {
        Tier::FirstCall
    } else {
        Tier::None
    }
}
