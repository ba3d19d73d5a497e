//! callscan - DexScreener signal scanner
//!
//! Polls public pair snapshots, ranks short-window buying pressure into
//! severity tiers, and emits at most one deduplicated call per scan cycle.
//! Alerted pairs are persisted to SQLite and their peak price is tracked in
//! the background for later performance statistics.

pub mod pipeline;
