//! # Signal Detection & Ranking Pipeline
//!
//! Turns a continuously refreshed stream of DexScreener pair snapshots into
//! a small number of deduplicated, severity-ranked calls.
//!
//! ## Scan Cycle
//!
//! 1. Fetch snapshot batches for every configured query
//! 2. Derive short-window metrics (`metrics`)
//! 3. Gate on liquidity and age (`safety`)
//! 4. Classify into a tier (`tiers`)
//! 5. Drop pairs still in the dedup ledger (`dedup`)
//! 6. Rank survivors and call at most one (`ranker`)
//! 7. Persist the call and mark it alerted in one step (`engine`, `db`)
//!
//! Independently, every tick dispatches the peak tracker over the most recent
//! calls (`peak_tracker`).
//!
//! Category browsing (`category`) is a separate, early-exit selection mode
//! with a guaranteed pick.
//!
//! ## Schema Reference
//!
//! - `calls` → `AlertRecord` (`sql/01_calls.sql`)
//!
//! ## Module Organization
//!
//! - `types` - Wire structs, PairSnapshot, Metrics, Tier, Candidate, AlertRecord
//! - `error` - ScanError taxonomy
//! - `config` - Environment configuration
//! - `metrics` - Short-window buy metrics from a snapshot
//! - `tiers` - Tier thresholds and classification
//! - `safety` - Liquidity and age gate
//! - `dedup` - Bounded FIFO ledger of alerted pairs
//! - `ranker` - Candidate building, ranking, per-cycle evaluation
//! - `category` - Category filters with guaranteed-pick selection
//! - `dexscreener` - SnapshotSource trait and HTTP client
//! - `db` - CallStore trait, SQLite store, migrations
//! - `peak_tracker` - Post-call peak price tracking
//! - `engine` - One scan cycle end to end, owns the ledger
//! - `stats` - Aggregate call performance
//! - `scheduler` - Periodic single-flight scan loop

pub mod types;
pub mod error;
pub mod config;
pub mod metrics;
pub mod tiers;
pub mod safety;
pub mod dedup;
pub mod ranker;
pub mod category;
pub mod dexscreener;
pub mod db;
pub mod peak_tracker;
pub mod engine;
pub mod stats;
pub mod scheduler;

// Re-export commonly used types
pub use types::{AlertRecord, Candidate, Metrics, PairSnapshot, SafetyVerdict, Tier};
pub use error::ScanError;
pub use config::ScannerConfig;
pub use dedup::DedupLedger;
pub use ranker::evaluate_cycle;
pub use category::{select_for_category, CategoryFilter};
pub use dexscreener::{DexScreenerClient, SnapshotSource};
pub use db::{CallStore, SqliteCallStore};
pub use peak_tracker::PeakTracker;
pub use engine::ScanEngine;
