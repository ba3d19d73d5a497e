//! Periodic scan scheduler
//!
//! One timer drives scan cycles. Cycles never overlap: the loop awaits each
//! cycle before the next tick, ticks missed meanwhile are skipped, and the
//! engine lock is only ever try-locked so a cycle triggered elsewhere also
//! causes the tick to be skipped. The peak tracker is dispatched detached at
//! the start of every tick unless its previous run is still in flight, and
//! never delays the scan.

use super::engine::{CycleReport, ScanEngine};
use super::peak_tracker::PeakTracker;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Run one tick: dispatch the tracker, then scan if no cycle is in flight.
///
/// Returns `None` when the tick was skipped.
pub async fn run_tick(
    engine: &Arc<Mutex<ScanEngine>>,
    tracker: &Arc<PeakTracker>,
) -> Option<CycleReport> {
    tracker.spawn();

    let mut guard = match engine.try_lock() {
        Ok(guard) => guard,
        Err(_) => {
            log::warn!("⏭️  Previous scan cycle still running, skipping tick");
            return None;
        }
    };

    let started = std::time::Instant::now();
    let report = guard.run_cycle().await;

    log::info!(
        "🔎 Cycle done in {}ms: {} pairs ({} unique) from {}/{} queries, {} qualified, {}",
        started.elapsed().as_millis(),
        report.fetched,
        report.unique_pairs,
        report.queries - report.failed_queries,
        report.queries,
        report.qualified,
        match &report.alert {
            Some(alert) => format!("called {}", alert.record.symbol),
            None => "no call".to_string(),
        }
    );

    Some(report)
}

/// Scan scheduler task - runs indefinitely until cancelled
///
/// Arguments:
/// - `engine`: Shared ScanEngine (owns the dedup ledger)
/// - `tracker`: Peak tracker dispatched once per tick
/// - `scan_interval_ms`: Cycle interval in milliseconds
pub async fn scan_scheduler_task(
    engine: Arc<Mutex<ScanEngine>>,
    tracker: Arc<PeakTracker>,
    scan_interval_ms: u64,
) {
    log::info!("⏰ Starting scan scheduler (interval: {}ms)", scan_interval_ms);

    let mut timer = interval(Duration::from_millis(scan_interval_ms.max(1)));
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        timer.tick().await;
        run_tick(&engine, &tracker).await;
    }
}
