//! Peak price tracking for alerted pairs
//!
//! Each scan cycle dispatches one detached run. A run takes a point-in-time
//! list of the most recent calls, looks up each pair's current price and
//! raises the stored peak through the store's conditional update. Calls
//! created while a run is in flight are picked up by the next run.

use super::db::CallStore;
use super::dexscreener::SnapshotSource;
use super::error::ScanError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

/// Default number of recent calls revisited per run
pub const DEFAULT_TRACK_LIMIT: usize = 20;

/// Counters for one tracker run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeakRunSummary {
    pub checked: usize,
    pub raised: usize,
    pub skipped: usize,
}

pub struct PeakTracker {
    source: Arc<dyn SnapshotSource>,
    store: Arc<dyn CallStore>,
    limit: usize,
    request_delay: Duration,
    request_timeout: Duration,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when a dispatched run ends or is dropped
struct InFlightGuard(Arc<PeakTracker>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.in_flight.store(false, Ordering::Release);
    }
}

impl PeakTracker {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        store: Arc<dyn CallStore>,
        limit: usize,
        request_delay: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            source,
            store,
            limit,
            request_delay,
            request_timeout,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Run once over the current snapshot of recent calls.
    ///
    /// Per-record failures are logged and skipped. Only failing to read the
    /// record list aborts the run.
    pub async fn run_once(&self) -> Result<PeakRunSummary, ScanError> {
        let records = self.store.most_recent(self.limit).await?;
        let mut summary = PeakRunSummary::default();

        for (i, record) in records.iter().enumerate() {
            let Some(id) = record.id else {
                summary.skipped += 1;
                continue;
            };

            if i > 0 && !self.request_delay.is_zero() {
                sleep(self.request_delay).await;
            }

            let price = match timeout(
                self.request_timeout,
                self.source.current_price(&record.pair_address),
            )
            .await
            {
                Ok(Ok(Some(price))) => price,
                Ok(Ok(None)) => {
                    log::debug!("📉 {} no longer listed", record.symbol);
                    summary.skipped += 1;
                    continue;
                }
                Ok(Err(e)) => {
                    if e.is_skippable() {
                        log::debug!("⚠️  Price lookup failed for {}: {}", record.symbol, e);
                    } else {
                        log::warn!("⚠️  Price lookup failed for {}: {}", record.symbol, e);
                    }
                    summary.skipped += 1;
                    continue;
                }
                Err(_) => {
                    log::debug!(
                        "⏱️  Price lookup for {} timed out after {}ms",
                        record.symbol,
                        self.request_timeout.as_millis()
                    );
                    summary.skipped += 1;
                    continue;
                }
            };

            summary.checked += 1;

            if price <= record.peak_price {
                continue;
            }

            match self.store.update_peak_if_higher(id, price).await {
                Ok(true) => {
                    summary.raised += 1;
                    log::debug!(
                        "📈 {} new peak {:.8} ({:.2}x)",
                        record.symbol,
                        price,
                        if record.initial_price > 0.0 {
                            price / record.initial_price
                        } else {
                            0.0
                        }
                    );
                }
                // A concurrent run already stored an equal or higher peak
                Ok(false) => {}
                Err(e) => {
                    log::warn!("⚠️  Peak update failed for {}: {}", record.symbol, e);
                    summary.skipped += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Dispatch a detached run; the caller does not wait for it.
    ///
    /// At most one dispatched run is in flight. Returns `None` when the
    /// previous run has not finished yet.
    pub fn spawn(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("⏭️  Peak tracker run still in flight, skipping dispatch");
            return None;
        }

        let guard = InFlightGuard(Arc::clone(self));
        Some(tokio::spawn(async move {
            match guard.0.run_once().await {
                Ok(summary) => {
                    if summary.raised > 0 {
                        log::info!(
                            "📈 Peak tracker raised {} of {} calls",
                            summary.raised,
                            summary.checked
                        );
                    }
                }
                Err(e) => log::warn!("⚠️  Peak tracker run failed: {}", e),
            }
        }))
    }
}
