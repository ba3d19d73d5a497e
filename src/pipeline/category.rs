//! Category browsing with a guaranteed pick
//!
//! This is the early-exit selection strategy, separate from the tiered
//! scanner's collect-then-rank. Selection runs in three stages:
//!
//! 1. **Exact match**: first unseen pair inside every configured bound
//! 2. **Proximity score**: best additive score over all unseen pairs
//! 3. **Liquidity floor**: first unseen pair with liquidity above 5000 USD
//!
//! Only an empty (or fully shown) pool, or one where no unseen pair clears
//! the liquidity floor, yields nothing.

use super::dexscreener::SnapshotSource;
use super::error::ScanError;
use super::safety::MIN_LIQUIDITY_USD;
use super::types::PairSnapshot;
use std::collections::HashSet;
use std::time::Duration;

pub const LIQUIDITY_IN_RANGE_POINTS: f64 = 100.0;
pub const LIQUIDITY_PROXIMITY_MAX_POINTS: f64 = 50.0;
pub const VALUATION_POINTS: f64 = 50.0;
pub const AGE_POINTS: f64 = 50.0;
pub const TXNS_POINTS: f64 = 30.0;

/// Inclusive numeric range; `max` may be infinite
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub const fn at_least(min: f64) -> Self {
        Self {
            min,
            max: f64::INFINITY,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Distance outside the range relative to the nearer bound, 0 inside
    pub fn relative_distance(&self, value: f64) -> f64 {
        if value < self.min {
            if self.min > 0.0 {
                (self.min - value) / self.min
            } else {
                f64::INFINITY
            }
        } else if value > self.max {
            if self.max > 0.0 {
                (value - self.max) / self.max
            } else {
                f64::INFINITY
            }
        } else {
            0.0
        }
    }
}

/// Named category filter. Unset optional bounds are neither checked nor scored.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryFilter {
    pub name: String,
    /// Search query sent to the snapshot source
    pub query: String,
    pub liquidity: Bounds,
    pub valuation: Option<Bounds>,
    pub age_hours: Option<Bounds>,
    /// Floor on 5-minute buys + sells
    pub min_txns_5m: Option<u64>,
}

impl CategoryFilter {
    /// Built-in categories
    pub fn presets() -> Vec<CategoryFilter> {
        vec![
            CategoryFilter {
                name: "fresh".to_string(),
                query: "solana".to_string(),
                liquidity: Bounds::new(5_000.0, 100_000.0),
                valuation: Some(Bounds::new(10_000.0, 500_000.0)),
                age_hours: Some(Bounds::new(0.0, 24.0)),
                min_txns_5m: Some(20),
            },
            CategoryFilter {
                name: "gems".to_string(),
                query: "solana".to_string(),
                liquidity: Bounds::new(10_000.0, 250_000.0),
                valuation: Some(Bounds::new(50_000.0, 2_000_000.0)),
                age_hours: Some(Bounds::new(24.0, 168.0)),
                min_txns_5m: Some(10),
            },
            CategoryFilter {
                name: "established".to_string(),
                query: "solana".to_string(),
                liquidity: Bounds::at_least(100_000.0),
                valuation: Some(Bounds::at_least(1_000_000.0)),
                age_hours: Some(Bounds::at_least(168.0)),
                min_txns_5m: Some(5),
            },
        ]
    }

    /// Look up a preset by name (case-insensitive)
    pub fn preset(name: &str) -> Option<CategoryFilter> {
        Self::presets()
            .into_iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    fn valuation_ok(&self, snap: &PairSnapshot) -> Option<bool> {
        self.valuation
            .map(|b| snap.valuation().map(|v| b.contains(v)).unwrap_or(false))
    }

    fn age_ok(&self, snap: &PairSnapshot, now_ms: i64) -> Option<bool> {
        self.age_hours
            .map(|b| snap.age_hours(now_ms).map(|a| b.contains(a)).unwrap_or(false))
    }

    fn txns_ok(&self, snap: &PairSnapshot) -> Option<bool> {
        self.min_txns_5m.map(|floor| snap.txns_m5.total() >= floor)
    }

    /// True when the snapshot satisfies every configured bound
    pub fn matches(&self, snap: &PairSnapshot, now_ms: i64) -> bool {
        self.liquidity.contains(snap.liquidity_usd)
            && self.valuation_ok(snap).unwrap_or(true)
            && self.age_ok(snap, now_ms).unwrap_or(true)
            && self.txns_ok(snap).unwrap_or(true)
    }

    /// Additive proximity score used when nothing matches exactly
    pub fn score(&self, snap: &PairSnapshot, now_ms: i64) -> f64 {
        let mut score = if self.liquidity.contains(snap.liquidity_usd) {
            LIQUIDITY_IN_RANGE_POINTS
        } else {
            let distance = self.liquidity.relative_distance(snap.liquidity_usd);
            (LIQUIDITY_PROXIMITY_MAX_POINTS * (1.0 - distance)).max(0.0)
        };

        if self.valuation_ok(snap) == Some(true) {
            score += VALUATION_POINTS;
        }
        if self.age_ok(snap, now_ms) == Some(true) {
            score += AGE_POINTS;
        }
        if self.txns_ok(snap) == Some(true) {
            score += TXNS_POINTS;
        }

        score
    }
}

/// Pick one snapshot for `filter` that has not been shown yet
pub fn select_for_category<'a>(
    candidates: &'a [PairSnapshot],
    filter: &CategoryFilter,
    already_shown: &HashSet<String>,
    now_ms: i64,
) -> Option<&'a PairSnapshot> {
    let unseen: Vec<&PairSnapshot> = candidates
        .iter()
        .filter(|s| !already_shown.contains(&s.pair_address))
        .collect();

    if let Some(exact) = unseen.iter().find(|s| filter.matches(s, now_ms)) {
        log::debug!("🎯 [{}] exact match: {}", filter.name, exact.symbol);
        return Some(*exact);
    }

    let mut best: Option<(&PairSnapshot, f64)> = None;
    for snap in &unseen {
        let score = filter.score(snap, now_ms);
        // Strictly greater keeps the first-encountered on ties
        if best.map(|(_, s)| score > s).unwrap_or(true) {
            best = Some((*snap, score));
        }
    }
    if let Some((snap, score)) = best {
        if score > 0.0 {
            log::debug!(
                "📐 [{}] closest match: {} (score {:.1})",
                filter.name,
                snap.symbol,
                score
            );
            return Some(snap);
        }
    }

    let fallback = unseen
        .into_iter()
        .find(|s| s.liquidity_usd > MIN_LIQUIDITY_USD);
    if let Some(snap) = fallback {
        log::debug!("🪂 [{}] liquidity fallback: {}", filter.name, snap.symbol);
    }
    fallback
}

/// Fetch the category's query and pick one unshown pair, marking it shown
pub async fn search_category(
    source: &dyn SnapshotSource,
    filter: &CategoryFilter,
    shown: &mut HashSet<String>,
    request_timeout: Duration,
    now_ms: i64,
) -> Result<Option<PairSnapshot>, ScanError> {
    let snapshots = tokio::time::timeout(request_timeout, source.search(&filter.query))
        .await
        .map_err(|_| ScanError::Timeout {
            what: format!("category search '{}'", filter.name),
            after_ms: request_timeout.as_millis() as u64,
        })??;

    let picked = select_for_category(&snapshots, filter, shown, now_ms).cloned();
    if let Some(ref snap) = picked {
        shown.insert(snap.pair_address.clone());
    }
    Ok(picked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::test_support::{snapshot, NOW_MS};
    use crate::pipeline::types::TxnCount;
    use async_trait::async_trait;

    fn filter() -> CategoryFilter {
        CategoryFilter {
            name: "test".to_string(),
            query: "solana".to_string(),
            liquidity: Bounds::new(10_000.0, 20_000.0),
            valuation: Some(Bounds::new(100_000.0, 200_000.0)),
            age_hours: Some(Bounds::new(0.0, 6.0)),
            min_txns_5m: Some(50),
        }
    }

    fn pair(id: &str, liquidity: f64) -> PairSnapshot {
        let mut snap = snapshot(id);
        snap.liquidity_usd = liquidity;
        snap.market_cap = Some(5_000_000.0);
        snap.fdv = None;
        snap.created_at_ms = Some(NOW_MS - 100 * 3_600_000);
        snap.txns_m5 = TxnCount { buys: 1, sells: 1 };
        snap
    }

    #[test]
    fn test_exact_match_first_hit() {
        let mut a = pair("a", 15_000.0);
        a.market_cap = Some(150_000.0);
        a.created_at_ms = Some(NOW_MS - 3_600_000);
        a.txns_m5 = TxnCount { buys: 40, sells: 20 };
        let mut b = a.clone();
        b.pair_address = "b".to_string();

        let pool = vec![pair("x", 1_000_000.0), a, b];
        let picked = select_for_category(&pool, &filter(), &HashSet::new(), NOW_MS).unwrap();
        assert_eq!(picked.pair_address, "a");
    }

    #[test]
    fn test_proximity_prefers_closer_liquidity() {
        // Both miss every optional bound. far is 50% above max, near is 10% below min.
        let pool = vec![pair("far", 30_000.0), pair("near", 9_000.0)];
        let f = filter();
        assert_eq!(f.score(&pool[0], NOW_MS), 25.0);
        assert_eq!(f.score(&pool[1], NOW_MS), 45.0);

        let picked = select_for_category(&pool, &f, &HashSet::new(), NOW_MS).unwrap();
        assert_eq!(picked.pair_address, "near");
    }

    #[test]
    fn test_proximity_ties_keep_first() {
        let pool = vec![pair("first", 30_000.0), pair("second", 30_000.0)];
        let picked = select_for_category(&pool, &filter(), &HashSet::new(), NOW_MS).unwrap();
        assert_eq!(picked.pair_address, "first");
    }

    #[test]
    fn test_optional_bounds_add_points() {
        let mut snap = pair("p", 15_000.0);
        snap.txns_m5 = TxnCount { buys: 30, sells: 30 };
        // liquidity in range (100) + txns (30); valuation and age miss
        assert_eq!(filter().score(&snap, NOW_MS), 130.0);
    }

    #[test]
    fn test_liquidity_floor_fallback() {
        // Far outside every bound: proximity score is 0 for both
        let pool = vec![pair("dust", 0.0), pair("whale", 10_000_000.0)];
        let mut f = filter();
        f.liquidity = Bounds::new(1_000_000.0, 2_000_000.0);
        assert_eq!(f.score(&pool[0], NOW_MS), 0.0);
        assert_eq!(f.score(&pool[1], NOW_MS), 0.0);

        let picked = select_for_category(&pool, &f, &HashSet::new(), NOW_MS).unwrap();
        assert_eq!(picked.pair_address, "whale");
    }

    #[test]
    fn test_always_picks_when_liquid_pair_unseen() {
        let f = filter();
        let liquidities = [5_001.0, 9_000.0, 25_000.0, 1_000_000.0, 50_000_000.0];
        for liq in liquidities {
            let pool = vec![pair("only", liq)];
            assert!(
                select_for_category(&pool, &f, &HashSet::new(), NOW_MS).is_some(),
                "no pick for liquidity {}",
                liq
            );
        }
    }

    #[test]
    fn test_exhausted_pool_yields_nothing() {
        let pool = vec![pair("a", 15_000.0), pair("b", 15_000.0)];
        let shown: HashSet<String> = ["a".to_string(), "b".to_string()].into_iter().collect();
        assert!(select_for_category(&pool, &filter(), &shown, NOW_MS).is_none());
        assert!(select_for_category(&[], &filter(), &HashSet::new(), NOW_MS).is_none());
    }

    #[test]
    fn test_presets_lookup() {
        assert!(CategoryFilter::preset("FRESH").is_some());
        assert!(CategoryFilter::preset("established").is_some());
        assert!(CategoryFilter::preset("unknown").is_none());
    }

    struct StalledSource;

    #[async_trait]
    impl SnapshotSource for StalledSource {
        async fn search(&self, _query: &str) -> Result<Vec<PairSnapshot>, ScanError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![pair("late", 15_000.0)])
        }

        async fn current_price(&self, _pair: &str) -> Result<Option<f64>, ScanError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_search_timeout_reported_and_nothing_marked_shown() {
        let mut shown = HashSet::new();
        let result = search_category(
            &StalledSource,
            &filter(),
            &mut shown,
            Duration::from_millis(20),
            NOW_MS,
        )
        .await;

        match result {
            Err(ScanError::Timeout { after_ms, .. }) => assert_eq!(after_ms, 20),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(shown.is_empty());
    }
}
