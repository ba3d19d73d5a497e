//! Scanner configuration from environment variables

use super::dedup::DEFAULT_CAPACITY;
use super::peak_tracker::DEFAULT_TRACK_LIMIT;
use std::env;

/// Configuration for the scanner runtime
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerConfig {
    /// Path to SQLite database file
    pub db_path: String,

    /// Directory holding the `.sql` migration files
    pub schema_dir: String,

    /// DexScreener chain id pairs must belong to
    pub chain_id: String,

    /// Search queries issued every cycle
    pub queries: Vec<String>,

    /// Scan cycle interval in milliseconds
    pub scan_interval_ms: u64,

    /// Courtesy delay between consecutive external calls in milliseconds
    pub request_delay_ms: u64,

    /// Upper bound on every external call in milliseconds
    pub request_timeout_ms: u64,

    /// Number of recent calls the peak tracker revisits
    pub peak_tracker_limit: usize,

    /// Dedup ledger capacity
    pub dedup_capacity: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            db_path: "callscan.db".to_string(),
            schema_dir: "sql".to_string(),
            chain_id: "solana".to_string(),
            queries: vec!["solana".to_string()],
            scan_interval_ms: 60_000,
            request_delay_ms: 500,
            request_timeout_ms: 10_000,
            peak_tracker_limit: DEFAULT_TRACK_LIMIT,
            dedup_capacity: DEFAULT_CAPACITY,
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl ScannerConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `CALLSCAN_DB_PATH` (default: callscan.db)
    /// - `CALLSCAN_SCHEMA_DIR` (default: sql)
    /// - `CALLSCAN_CHAIN_ID` (default: solana)
    /// - `CALLSCAN_QUERIES` comma-separated (default: solana)
    /// - `SCAN_INTERVAL_MS` (default: 60000)
    /// - `REQUEST_DELAY_MS` (default: 500)
    /// - `REQUEST_TIMEOUT_MS` (default: 10000)
    /// - `PEAK_TRACKER_LIMIT` (default: 20)
    /// - `DEDUP_CAPACITY` (default: 100)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let queries: Vec<String> = env::var("CALLSCAN_QUERIES")
            .map(|s| {
                s.split(',')
                    .map(|q| q.trim().to_string())
                    .filter(|q| !q.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            db_path: env::var("CALLSCAN_DB_PATH").unwrap_or(defaults.db_path),
            schema_dir: env::var("CALLSCAN_SCHEMA_DIR").unwrap_or(defaults.schema_dir),
            chain_id: env::var("CALLSCAN_CHAIN_ID").unwrap_or(defaults.chain_id),
            queries: if queries.is_empty() {
                defaults.queries
            } else {
                queries
            },
            scan_interval_ms: parse_var("SCAN_INTERVAL_MS", defaults.scan_interval_ms),
            request_delay_ms: parse_var("REQUEST_DELAY_MS", defaults.request_delay_ms),
            request_timeout_ms: parse_var("REQUEST_TIMEOUT_MS", defaults.request_timeout_ms),
            peak_tracker_limit: parse_var("PEAK_TRACKER_LIMIT", defaults.peak_tracker_limit),
            dedup_capacity: parse_var("DEDUP_CAPACITY", defaults.dedup_capacity),
        }
    }
}
