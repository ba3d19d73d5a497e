//! Bounded FIFO ledger of recently alerted pairs
//!
//! Owned by the scan engine and only touched inside the scan-cycle critical
//! section. `record` is called by the engine after the AlertRecord insert
//! succeeded, never before.

use super::types::AlertRecord;
use std::collections::{HashSet, VecDeque};

/// Default ledger size
pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct DedupLedger {
    order: VecDeque<String>,
    members: HashSet<String>,
    capacity: usize,
}

impl DedupLedger {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            order: VecDeque::with_capacity(capacity + 1),
            members: HashSet::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Rebuild from persisted calls, newest first as returned by the store
    pub fn from_recent(records: &[AlertRecord], capacity: usize) -> Self {
        let mut ledger = Self::new(capacity);
        for record in records.iter().rev() {
            ledger.record(&record.pair_address);
        }
        ledger
    }

    pub fn seen(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    /// Insert `id`, evicting the oldest entries once over capacity.
    /// Re-recording a resident id is a no-op.
    pub fn record(&mut self, id: &str) {
        if !self.members.insert(id.to_string()) {
            return;
        }
        self.order.push_back(id.to_string());

        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.members.remove(&evicted);
                log::debug!("🧹 Dedup ledger evicted {}", evicted);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Resident ids, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

impl Default for DedupLedger {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
