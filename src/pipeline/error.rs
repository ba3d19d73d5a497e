//! Error taxonomy for the scan pipeline
//!
//! Nothing in here is process-fatal. Fetch, timeout and malformed-record
//! errors are confined to a single query or candidate and are skipped by the
//! caller; persistence errors are retried once and then surfaced.

use thiserror::Error;

/// All errors generated by the scan pipeline.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("fetch failed for query '{query}': {reason}")]
    TransientFetch { query: String, reason: String },

    #[error("{what} timed out after {after_ms}ms")]
    Timeout { what: String, after_ms: u64 },

    #[error("malformed pair {pair}: {reason}")]
    MalformedRecord { pair: String, reason: String },

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("schema error: {0}")]
    Schema(String),
}

impl ScanError {
    /// True when the error only affects one query or one candidate.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            ScanError::TransientFetch { .. }
                | ScanError::Timeout { .. }
                | ScanError::MalformedRecord { .. }
        )
    }

    pub(crate) fn fetch(query: &str, reason: impl ToString) -> Self {
        ScanError::TransientFetch {
            query: query.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn malformed(pair: &str, reason: impl ToString) -> Self {
        ScanError::MalformedRecord {
            pair: pair.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<rusqlite::Error> for ScanError {
    fn from(e: rusqlite::Error) -> Self {
        ScanError::Persistence(e.to_string())
    }
}

impl From<std::io::Error> for ScanError {
    fn from(e: std::io::Error) -> Self {
        ScanError::Schema(e.to_string())
    }
}
