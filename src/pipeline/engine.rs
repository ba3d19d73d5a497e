//! Scan Engine - one scan cycle end to end
//!
//! ```text
//! queries ──fetch (timeout, courtesy delay)──▶ Vec<PairSnapshot>
//!     ↓
//! evaluate_cycle (metrics → safety → tier → dedup → rank)
//!     ↓
//! commit_alert: store.create (retry once) ──ok──▶ ledger.record
//! ```
//!
//! The engine owns the dedup ledger. Ledger and store are only updated
//! together: a pair is marked as alerted only after its record was persisted,
//! so a failed insert leaves the pair eligible on the next cycle.

use super::config::ScannerConfig;
use super::db::CallStore;
use super::dedup::DedupLedger;
use super::dexscreener::SnapshotSource;
use super::error::ScanError;
use super::ranker::{evaluate_cycle, CycleEvaluation};
use super::types::{AlertRecord, Candidate, PairSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// An emitted alert: the persisted record plus the candidate it came from
#[derive(Debug, Clone)]
pub struct Alert {
    pub record: AlertRecord,
    pub candidate: Candidate,
}

/// What happened during one cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub queries: usize,
    pub failed_queries: usize,
    /// Snapshots returned across all queries
    pub fetched: usize,
    pub unique_pairs: usize,
    pub qualified: usize,
    pub alert: Option<Alert>,
    /// Set when the winner could not be persisted after the retry
    pub persistence_error: Option<String>,
}

pub struct ScanEngine {
    source: Arc<dyn SnapshotSource>,
    store: Arc<dyn CallStore>,
    ledger: DedupLedger,
    queries: Vec<String>,
    request_delay: Duration,
    request_timeout: Duration,
    /// Epoch milliseconds (for testing with mock time)
    now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl ScanEngine {
    /// Create an engine using system time
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        store: Arc<dyn CallStore>,
        config: &ScannerConfig,
    ) -> Self {
        Self::new_with_timestamp_fn(
            source,
            store,
            config,
            Box::new(|| chrono::Utc::now().timestamp_millis()),
        )
    }

    /// Create an engine with a custom clock returning epoch milliseconds
    pub fn new_with_timestamp_fn(
        source: Arc<dyn SnapshotSource>,
        store: Arc<dyn CallStore>,
        config: &ScannerConfig,
        now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
    ) -> Self {
        Self {
            source,
            store,
            ledger: DedupLedger::new(config.dedup_capacity),
            queries: config.queries.clone(),
            request_delay: Duration::from_millis(config.request_delay_ms),
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            now_fn,
        }
    }

    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    /// Rebuild the dedup ledger from the newest persisted calls
    pub async fn rehydrate_ledger(&mut self) -> Result<usize, ScanError> {
        let capacity = self.ledger.capacity();
        let recent = self.store.most_recent(capacity).await?;
        self.ledger = DedupLedger::from_recent(&recent, capacity);
        Ok(self.ledger.len())
    }

    /// Fetch every configured query. Failed or timed-out queries are skipped.
    ///
    /// Returns the merged snapshots and the number of failed queries.
    pub async fn fetch_batch(&self) -> (Vec<PairSnapshot>, usize) {
        let mut snapshots = Vec::new();
        let mut failed = 0;

        for (i, query) in self.queries.iter().enumerate() {
            if i > 0 && !self.request_delay.is_zero() {
                sleep(self.request_delay).await;
            }

            let result = match timeout(self.request_timeout, self.source.search(query)).await {
                Ok(result) => result,
                Err(_) => Err(ScanError::Timeout {
                    what: format!("search '{}'", query),
                    after_ms: self.request_timeout.as_millis() as u64,
                }),
            };

            match result {
                Ok(batch) => {
                    log::debug!("📡 Query '{}' returned {} pairs", query, batch.len());
                    snapshots.extend(batch);
                }
                Err(e) if e.is_skippable() => {
                    log::warn!("⚠️  Skipping query '{}': {}", query, e);
                    failed += 1;
                }
                Err(e) => {
                    log::error!("❌ Query '{}' failed unexpectedly, skipping: {}", query, e);
                    failed += 1;
                }
            }
        }

        (snapshots, failed)
    }

    /// Evaluate a batch against the current ledger without side effects
    pub fn evaluate(&self, snapshots: &[PairSnapshot]) -> CycleEvaluation {
        evaluate_cycle(snapshots, &self.ledger, (self.now_fn)())
    }

    /// Persist the winner and mark it as alerted, as one step.
    ///
    /// The insert is retried once. On repeated failure the ledger is left
    /// untouched and the error is returned.
    pub async fn commit_alert(&mut self, candidate: Candidate) -> Result<Alert, ScanError> {
        let call_time = (self.now_fn)() / 1000;
        let record = AlertRecord::from_candidate(&candidate, call_time);

        let stored = match self.store.create(record.clone()).await {
            Ok(stored) => stored,
            Err(first) => {
                log::warn!(
                    "⚠️  Persisting call for {} failed ({}), retrying once",
                    record.symbol,
                    first
                );
                self.store.create(record).await?
            }
        };

        self.ledger.record(&stored.pair_address);

        Ok(Alert {
            record: stored,
            candidate,
        })
    }

    /// Run one full scan cycle. Never fails; problems are in the report.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let (snapshots, failed_queries) = self.fetch_batch().await;
        let evaluation = self.evaluate(&snapshots);

        let mut report = CycleReport {
            queries: self.queries.len(),
            failed_queries,
            fetched: snapshots.len(),
            unique_pairs: evaluation.considered,
            qualified: evaluation.qualified,
            alert: None,
            persistence_error: None,
        };

        if let Some(winner) = evaluation.winner {
            let symbol = winner.snapshot.symbol.clone();
            match self.commit_alert(winner).await {
                Ok(alert) => {
                    log::info!(
                        "🚨 {} call: {} ({}) at ${} | buys {} | vol ${:.0} | avg ${:.0}",
                        alert.record.tier,
                        alert.record.symbol,
                        alert.record.pair_address,
                        alert.record.initial_price,
                        alert.candidate.metrics.recent_buys,
                        alert.candidate.metrics.window_volume,
                        alert.candidate.metrics.average_buy_size
                    );
                    report.alert = Some(alert);
                }
                Err(e) => {
                    log::error!(
                        "❌ Could not persist call for {}, not marking as alerted: {}",
                        symbol,
                        e
                    );
                    report.persistence_error = Some(e.to_string());
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::test_support::{snapshot, NOW_MS};
    use crate::pipeline::types::TxnCount;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FixedSource {
        batches: Vec<(String, Result<Vec<PairSnapshot>, String>)>,
    }

    #[async_trait]
    impl SnapshotSource for FixedSource {
        async fn search(&self, query: &str) -> Result<Vec<PairSnapshot>, ScanError> {
            match self.batches.iter().find(|(q, _)| q == query) {
                Some((_, Ok(batch))) => Ok(batch.clone()),
                Some((_, Err(reason))) => Err(ScanError::fetch(query, reason)),
                None => Ok(Vec::new()),
            }
        }

        async fn current_price(&self, _pair: &str) -> Result<Option<f64>, ScanError> {
            Ok(None)
        }
    }

    /// Store that fails the first `failures` inserts
    #[derive(Default)]
    struct FlakyStore {
        failures: AtomicUsize,
        rows: Mutex<Vec<AlertRecord>>,
    }

    impl FlakyStore {
        fn failing(n: usize) -> Self {
            Self {
                failures: AtomicUsize::new(n),
                rows: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CallStore for FlakyStore {
        async fn create(&self, mut record: AlertRecord) -> Result<AlertRecord, ScanError> {
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(ScanError::Persistence("database is locked".to_string()));
            }
            let mut rows = self.rows.lock().unwrap();
            record.id = Some(rows.len() as i64 + 1);
            rows.push(record.clone());
            Ok(record)
        }

        async fn update_peak_if_higher(&self, _id: i64, _price: f64) -> Result<bool, ScanError> {
            Ok(false)
        }

        async fn most_recent(&self, limit: usize) -> Result<Vec<AlertRecord>, ScanError> {
            let rows = self.rows.lock().unwrap();
            Ok(rows.iter().rev().take(limit).cloned().collect())
        }

        async fn all(&self) -> Result<Vec<AlertRecord>, ScanError> {
            self.most_recent(usize::MAX).await
        }
    }

    fn config(queries: &[&str]) -> ScannerConfig {
        ScannerConfig {
            queries: queries.iter().map(|q| q.to_string()).collect(),
            request_delay_ms: 0,
            ..ScannerConfig::default()
        }
    }

    fn hot(pair: &str, buys_m5: u64, volume_m5: f64) -> PairSnapshot {
        let mut snap = snapshot(pair);
        snap.txns_m5 = TxnCount { buys: buys_m5, sells: 0 };
        snap.volume.m5 = volume_m5;
        snap
    }

    fn engine(source: FixedSource, store: Arc<FlakyStore>, queries: &[&str]) -> ScanEngine {
        ScanEngine::new_with_timestamp_fn(
            Arc::new(source),
            store,
            &config(queries),
            Box::new(|| NOW_MS),
        )
    }

    #[tokio::test]
    async fn test_one_alert_per_cycle() {
        let source = FixedSource {
            batches: vec![(
                "solana".to_string(),
                Ok(vec![
                    hot("medium", 60, 12_500.0),
                    hot("very_strong", 200, 10_000.0),
                    hot("strong", 100, 22_000.0),
                ]),
            )],
        };
        let store = Arc::new(FlakyStore::default());
        let mut engine = engine(source, store.clone(), &["solana"]);

        let report = engine.run_cycle().await;
        assert_eq!(report.qualified, 3);
        let alert = report.alert.unwrap();
        assert_eq!(alert.record.pair_address, "very_strong");
        assert_eq!(alert.record.call_time, NOW_MS / 1000);
        assert_eq!(store.all().await.unwrap().len(), 1);
        assert!(engine.ledger().seen("very_strong"));

        // Next cycle moves on to the next best
        let report = engine.run_cycle().await;
        assert_eq!(report.alert.unwrap().record.pair_address, "strong");
    }

    #[tokio::test]
    async fn test_failed_query_does_not_abort_cycle() {
        let source = FixedSource {
            batches: vec![
                ("down".to_string(), Err("503 Service Unavailable".to_string())),
                ("up".to_string(), Ok(vec![hot("p1", 60, 8_000.0)])),
            ],
        };
        let store = Arc::new(FlakyStore::default());
        let mut engine = engine(source, store, &["down", "up"]);

        let report = engine.run_cycle().await;
        assert_eq!(report.queries, 2);
        assert_eq!(report.failed_queries, 1);
        assert_eq!(report.fetched, 1);
        assert!(report.alert.is_some());
    }

    #[tokio::test]
    async fn test_persistence_retried_once() {
        let source = FixedSource {
            batches: vec![("solana".to_string(), Ok(vec![hot("p1", 60, 8_000.0)]))],
        };
        let store = Arc::new(FlakyStore::failing(1));
        let mut engine = engine(source, store.clone(), &["solana"]);

        let report = engine.run_cycle().await;
        assert!(report.alert.is_some());
        assert!(report.persistence_error.is_none());
        assert_eq!(store.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_persistence_failure_leaves_pair_eligible() {
        let source = FixedSource {
            batches: vec![("solana".to_string(), Ok(vec![hot("p1", 60, 8_000.0)]))],
        };
        let store = Arc::new(FlakyStore::failing(2));
        let mut engine = engine(source, store.clone(), &["solana"]);

        let report = engine.run_cycle().await;
        assert!(report.alert.is_none());
        assert!(report.persistence_error.is_some());
        assert!(!engine.ledger().seen("p1"));

        // Store recovered: the same pair is alerted on the next cycle
        let report = engine.run_cycle().await;
        assert_eq!(report.alert.unwrap().record.pair_address, "p1");
        assert_eq!(store.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rehydrate_ledger_from_store() {
        let store = Arc::new(FlakyStore::default());
        let mut existing = AlertRecord::from_candidate(
            &crate::pipeline::ranker::build_candidate(&hot("p1", 60, 8_000.0), NOW_MS).unwrap(),
            1,
        );
        existing.id = None;
        store.create(existing).await.unwrap();

        let source = FixedSource {
            batches: vec![("solana".to_string(), Ok(vec![hot("p1", 60, 8_000.0)]))],
        };
        let mut engine = engine(source, store, &["solana"]);
        assert_eq!(engine.rehydrate_ledger().await.unwrap(), 1);

        let report = engine.run_cycle().await;
        assert_eq!(report.qualified, 0);
        assert!(report.alert.is_none());
    }

    /// Source whose "stalled" query never answers in time and whose
    /// "corrupt" query fails with a non-skippable error
    struct StallingSource;

    #[async_trait]
    impl SnapshotSource for StallingSource {
        async fn search(&self, query: &str) -> Result<Vec<PairSnapshot>, ScanError> {
            match query {
                "stalled" => {
                    sleep(Duration::from_secs(5)).await;
                    Ok(vec![hot("late", 200, 50_000.0)])
                }
                "corrupt" => Err(ScanError::Persistence("cache unreadable".to_string())),
                _ => Ok(vec![hot("p1", 60, 8_000.0)]),
            }
        }

        async fn current_price(&self, _pair: &str) -> Result<Option<f64>, ScanError> {
            Ok(None)
        }
    }

    fn stalling_engine(store: Arc<FlakyStore>, queries: &[&str]) -> ScanEngine {
        let config = ScannerConfig {
            request_timeout_ms: 20,
            ..config(queries)
        };
        ScanEngine::new_with_timestamp_fn(
            Arc::new(StallingSource),
            store,
            &config,
            Box::new(|| NOW_MS),
        )
    }

    #[tokio::test]
    async fn test_timed_out_query_is_skipped() {
        let store = Arc::new(FlakyStore::default());
        let mut engine = stalling_engine(store.clone(), &["stalled", "solana"]);

        let report = engine.run_cycle().await;
        assert_eq!(report.queries, 2);
        assert_eq!(report.failed_queries, 1);
        assert_eq!(report.fetched, 1);
        assert_eq!(report.alert.unwrap().record.pair_address, "p1");
        assert_eq!(store.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unexpected_query_error_is_still_skipped() {
        let store = Arc::new(FlakyStore::default());
        let engine = stalling_engine(store, &["corrupt", "solana"]);

        let (snapshots, failed) = engine.fetch_batch().await;
        assert_eq!(failed, 1);
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].pair_address, "p1");
    }
}
