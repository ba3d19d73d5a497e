//! Core data structures for the scan pipeline
//!
//! - DexScreener wire structs (`DexPair` and friends), deserialized as-is
//! - `PairSnapshot`: the normalized, validated view the pipeline works on
//! - `Metrics`, `Tier`, `SafetyVerdict`, `Candidate`: per-cycle derived values
//! - `AlertRecord`: the persisted call row

use super::error::ScanError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// DexScreener search / pairs response body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DexResponse {
    #[serde(default)]
    pub pairs: Option<Vec<DexPair>>,
}

/// One trading pair as returned by DexScreener
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DexPair {
    #[serde(rename = "chainId", default)]
    pub chain_id: String,
    #[serde(rename = "pairAddress", default)]
    pub pair_address: String,
    #[serde(rename = "baseToken", default)]
    pub base_token: DexToken,
    #[serde(rename = "priceUsd", default)]
    pub price_usd: Option<String>,
    #[serde(default)]
    pub liquidity: Option<DexLiquidity>,
    #[serde(default)]
    pub fdv: Option<f64>,
    #[serde(rename = "marketCap", default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub volume: Option<DexVolume>,
    #[serde(default)]
    pub txns: Option<DexTxns>,
    #[serde(rename = "pairCreatedAt", default)]
    pub pair_created_at: Option<i64>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DexToken {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DexLiquidity {
    #[serde(default)]
    pub usd: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DexVolume {
    #[serde(default)]
    pub m5: Option<f64>,
    #[serde(default)]
    pub h1: Option<f64>,
    #[serde(default)]
    pub h6: Option<f64>,
    #[serde(default)]
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DexTxns {
    #[serde(default)]
    pub m5: Option<TxnCount>,
    #[serde(default)]
    pub h1: Option<TxnCount>,
    #[serde(default)]
    pub h24: Option<TxnCount>,
}

/// Buy/sell counts for one aggregation window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnCount {
    #[serde(default)]
    pub buys: u64,
    #[serde(default)]
    pub sells: u64,
}

impl TxnCount {
    pub fn total(&self) -> u64 {
        self.buys.saturating_add(self.sells)
    }
}

/// Volume aggregates in USD
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VolumeWindows {
    pub m5: f64,
    pub h1: f64,
    pub h6: f64,
    pub h24: f64,
}

/// Validated pair snapshot, read-only for the rest of the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PairSnapshot {
    pub pair_address: String,
    pub chain_id: String,
    pub token_address: String,
    pub symbol: String,
    pub name: String,
    pub price_usd: f64,
    pub liquidity_usd: f64,
    pub fdv: Option<f64>,
    pub market_cap: Option<f64>,
    /// Pair creation time, epoch milliseconds
    pub created_at_ms: Option<i64>,
    pub volume: VolumeWindows,
    pub txns_m5: TxnCount,
    pub txns_h1: TxnCount,
    pub txns_h24: TxnCount,
    pub url: Option<String>,
}

impl PairSnapshot {
    /// Market cap, falling back to FDV when DexScreener omits it
    pub fn valuation(&self) -> Option<f64> {
        self.market_cap.or(self.fdv)
    }

    /// Age in hours at `now_ms`, `None` when the creation time is unknown
    pub fn age_hours(&self, now_ms: i64) -> Option<f64> {
        self.created_at_ms
            .map(|created| now_ms.saturating_sub(created) as f64 / 3_600_000.0)
    }
}

impl TryFrom<DexPair> for PairSnapshot {
    type Error = ScanError;

    /// Rejects pairs whose numeric fields the pipeline depends on are missing
    /// or unparseable. Missing liquidity normalizes to 0.
    fn try_from(pair: DexPair) -> Result<Self, Self::Error> {
        let id = pair.pair_address.clone();
        if id.is_empty() {
            return Err(ScanError::malformed("<unknown>", "empty pairAddress"));
        }

        let price_usd = pair
            .price_usd
            .as_deref()
            .ok_or_else(|| ScanError::malformed(&id, "missing priceUsd"))?
            .parse::<f64>()
            .map_err(|e| ScanError::malformed(&id, format!("priceUsd: {}", e)))?;
        if !price_usd.is_finite() || price_usd < 0.0 {
            return Err(ScanError::malformed(&id, "priceUsd out of range"));
        }

        let txns = pair
            .txns
            .ok_or_else(|| ScanError::malformed(&id, "missing txns"))?;
        let txns_m5 = txns
            .m5
            .ok_or_else(|| ScanError::malformed(&id, "missing txns.m5"))?;
        let txns_h1 = txns
            .h1
            .ok_or_else(|| ScanError::malformed(&id, "missing txns.h1"))?;

        let volume = pair
            .volume
            .ok_or_else(|| ScanError::malformed(&id, "missing volume"))?;
        let m5 = volume
            .m5
            .filter(|v| v.is_finite())
            .ok_or_else(|| ScanError::malformed(&id, "missing volume.m5"))?;

        let liquidity_usd = pair
            .liquidity
            .and_then(|l| l.usd)
            .filter(|v| v.is_finite())
            .unwrap_or(0.0);

        Ok(Self {
            pair_address: pair.pair_address,
            chain_id: pair.chain_id,
            token_address: pair.base_token.address,
            symbol: pair.base_token.symbol,
            name: pair.base_token.name,
            price_usd,
            liquidity_usd,
            fdv: pair.fdv,
            market_cap: pair.market_cap,
            created_at_ms: pair.pair_created_at,
            volume: VolumeWindows {
                m5,
                h1: volume.h1.unwrap_or(0.0),
                h6: volume.h6.unwrap_or(0.0),
                h24: volume.h24.unwrap_or(0.0),
            },
            txns_m5,
            txns_h1,
            txns_h24: txns.h24.unwrap_or_default(),
            url: pair.url,
        })
    }
}

/// Short-window trading metrics derived from one snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub recent_buys: u64,
    pub window_volume: f64,
    pub average_buy_size: f64,
}

impl Metrics {
    /// Builds metrics with `average_buy_size` derived from the other two
    pub fn new(recent_buys: u64, window_volume: f64) -> Self {
        let average_buy_size = if recent_buys == 0 {
            0.0
        } else {
            window_volume / recent_buys as f64
        };
        Self {
            recent_buys,
            window_volume,
            average_buy_size,
        }
    }
}

/// Ordered signal severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    None,
    FirstCall,
    Medium,
    Strong,
    VeryStrong,
}

impl Tier {
    /// Ranking priority; `None` never reaches the ranker
    pub fn priority(&self) -> u8 {
        match self {
            Tier::None => 0,
            Tier::FirstCall => 1,
            Tier::Medium => 2,
            Tier::Strong => 3,
            Tier::VeryStrong => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::None => "NONE",
            Tier::FirstCall => "FIRST_CALL",
            Tier::Medium => "MEDIUM",
            Tier::Strong => "STRONG",
            Tier::VeryStrong => "VERY_STRONG",
        }
    }

    /// Alertable tiers, most severe first
    pub fn alertable() -> [Tier; 4] {
        [Tier::VeryStrong, Tier::Strong, Tier::Medium, Tier::FirstCall]
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NONE" => Ok(Tier::None),
            "FIRST_CALL" => Ok(Tier::FirstCall),
            "MEDIUM" => Ok(Tier::Medium),
            "STRONG" => Ok(Tier::Strong),
            "VERY_STRONG" => Ok(Tier::VeryStrong),
            other => Err(ScanError::Persistence(format!("unknown tier '{}'", other))),
        }
    }
}

/// Liquidity/age gate, independent of tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetyVerdict {
    pub liquidity_ok: bool,
    pub age_ok: bool,
}

impl SafetyVerdict {
    pub fn is_eligible(&self) -> bool {
        self.liquidity_ok && self.age_ok
    }
}

/// A snapshot under consideration within one scan cycle
#[derive(Debug, Clone)]
pub struct Candidate {
    pub snapshot: PairSnapshot,
    pub metrics: Metrics,
    pub tier: Tier,
    pub safety: SafetyVerdict,
    pub tier_priority: u8,
    pub ranking_volume: f64,
}

/// Persisted call. Only `peak_price` is mutated after insert.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRecord {
    /// Store-assigned row id, `None` until persisted
    pub id: Option<i64>,
    pub pair_address: String,
    pub token_address: String,
    pub symbol: String,
    pub name: String,
    pub initial_price: f64,
    pub peak_price: f64,
    pub tier: Tier,
    /// Unix seconds
    pub call_time: i64,
}

impl AlertRecord {
    /// New unpersisted record for an alerted candidate
    pub fn from_candidate(candidate: &Candidate, call_time: i64) -> Self {
        let snap = &candidate.snapshot;
        Self {
            id: None,
            pair_address: snap.pair_address.clone(),
            token_address: snap.token_address.clone(),
            symbol: snap.symbol.clone(),
            name: snap.name.clone(),
            initial_price: snap.price_usd,
            peak_price: snap.price_usd,
            tier: candidate.tier,
            call_time,
        }
    }

    /// Peak over initial price, `None` when the initial price is unusable
    pub fn peak_multiple(&self) -> Option<f64> {
        if self.initial_price > 0.0 {
            Some(self.peak_price / self.initial_price)
        } else {
            None
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn wire_pair() -> DexPair {
        serde_json::from_str(
            r#"{
                "chainId": "solana",
                "dexId": "raydium",
                "url": "https://dexscreener.com/solana/pair1",
                "pairAddress": "pair1",
                "baseToken": {"address": "mint1", "name": "Cat Coin", "symbol": "CAT"},
                "quoteToken": {"address": "So11111111111111111111111111111111111111112", "name": "Wrapped SOL", "symbol": "SOL"},
                "priceUsd": "0.00123",
                "txns": {"m5": {"buys": 40, "sells": 10}, "h1": {"buys": 300, "sells": 90}, "h24": {"buys": 2000, "sells": 900}},
                "volume": {"m5": 8000.5, "h1": 40000, "h6": 90000, "h24": 250000},
                "liquidity": {"usd": 42000.0, "base": 1, "quote": 2},
                "fdv": 1200000,
                "marketCap": 1100000,
                "pairCreatedAt": 1699990000000
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_normalize_full_pair() {
        let snap = PairSnapshot::try_from(wire_pair()).unwrap();
        assert_eq!(snap.pair_address, "pair1");
        assert_eq!(snap.token_address, "mint1");
        assert_eq!(snap.symbol, "CAT");
        assert_eq!(snap.price_usd, 0.00123);
        assert_eq!(snap.liquidity_usd, 42_000.0);
        assert_eq!(snap.txns_m5, TxnCount { buys: 40, sells: 10 });
        assert_eq!(snap.volume.m5, 8000.5);
        assert_eq!(snap.valuation(), Some(1_100_000.0));
        assert_eq!(snap.created_at_ms, Some(1_699_990_000_000));
    }

    #[test]
    fn test_normalize_rejects_bad_price() {
        let mut pair = wire_pair();
        pair.price_usd = Some("n/a".to_string());
        let err = PairSnapshot::try_from(pair).unwrap_err();
        assert!(matches!(err, ScanError::MalformedRecord { .. }));

        let mut pair = wire_pair();
        pair.price_usd = None;
        assert!(PairSnapshot::try_from(pair).is_err());
    }

    #[test]
    fn test_normalize_rejects_missing_short_window() {
        let mut pair = wire_pair();
        pair.txns.as_mut().unwrap().m5 = None;
        assert!(PairSnapshot::try_from(pair).is_err());

        let mut pair = wire_pair();
        pair.volume.as_mut().unwrap().m5 = None;
        assert!(PairSnapshot::try_from(pair).is_err());
    }

    #[test]
    fn test_missing_liquidity_is_zero() {
        let mut pair = wire_pair();
        pair.liquidity = None;
        let snap = PairSnapshot::try_from(pair).unwrap();
        assert_eq!(snap.liquidity_usd, 0.0);
    }

    #[test]
    fn test_valuation_falls_back_to_fdv() {
        let mut pair = wire_pair();
        pair.market_cap = None;
        let snap = PairSnapshot::try_from(pair).unwrap();
        assert_eq!(snap.valuation(), Some(1_200_000.0));
    }

    #[test]
    fn test_tier_ordering_and_round_trip_names() {
        assert!(Tier::None < Tier::FirstCall);
        assert!(Tier::FirstCall < Tier::Medium);
        assert!(Tier::Medium < Tier::Strong);
        assert!(Tier::Strong < Tier::VeryStrong);
        for tier in Tier::alertable() {
            assert_eq!(tier.as_str().parse::<Tier>().unwrap(), tier);
        }
        assert!("LOUD".parse::<Tier>().is_err());
    }

    #[test]
    fn test_metrics_average_zero_buys() {
        let m = Metrics::new(0, 500.0);
        assert_eq!(m.average_buy_size, 0.0);
        let m = Metrics::new(4, 500.0);
        assert_eq!(m.average_buy_size, 125.0);
    }

    #[test]
    fn test_extreme_wire_values_do_not_overflow() {
        let counts = TxnCount {
            buys: u64::MAX,
            sells: u64::MAX,
        };
        assert_eq!(counts.total(), u64::MAX);

        let mut snap = test_support::snapshot("hostile");
        snap.created_at_ms = Some(i64::MIN);
        assert!(snap.age_hours(test_support::NOW_MS).unwrap() > 0.0);
        snap.created_at_ms = Some(i64::MAX);
        assert!(snap.age_hours(i64::MIN).unwrap() < 0.0);
    }
}
