//! Scanner Runtime
//!
//! This binary orchestrates the call scanner:
//! - Initializes SQLite database with schema
//! - Rebuilds the dedup ledger from recent calls
//! - Spawns the periodic scan scheduler (which dispatches the peak tracker)
//!
//! Usage:
//!   cargo run --release --bin scanner_runtime
//!
//! Environment variables:
//!   CALLSCAN_DB_PATH - SQLite database path (default: callscan.db)
//!   CALLSCAN_QUERIES - Comma-separated search queries (default: solana)
//!   SCAN_INTERVAL_MS - Scan interval (default: 60000)
//!   See `ScannerConfig::from_env` for the full list.

use callscan::pipeline::{
    config::ScannerConfig,
    db::{run_schema_migrations, CallStore, SqliteCallStore},
    dexscreener::{DexScreenerClient, SnapshotSource},
    engine::ScanEngine,
    peak_tracker::PeakTracker,
    scheduler::scan_scheduler_task,
    stats::compute_stats,
};
use dotenv::dotenv;
use log::{error, info};
use rusqlite::Connection;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    info!("🚀 Call Scanner Runtime");

    let config = ScannerConfig::from_env();
    info!("📊 Configuration:");
    info!("   ├─ Database: {}", config.db_path);
    info!("   ├─ Chain: {}", config.chain_id);
    info!("   ├─ Queries: {:?}", config.queries);
    info!("   ├─ Scan interval: {}ms", config.scan_interval_ms);
    info!("   ├─ Request delay: {}ms", config.request_delay_ms);
    info!("   ├─ Request timeout: {}ms", config.request_timeout_ms);
    info!("   ├─ Peak tracker limit: {}", config.peak_tracker_limit);
    info!("   └─ Dedup capacity: {}", config.dedup_capacity);

    info!("🔧 Initializing database...");
    let mut conn = Connection::open(&config.db_path)?;
    run_schema_migrations(&mut conn, &config.schema_dir)?;
    drop(conn);

    let store: Arc<dyn CallStore> = Arc::new(SqliteCallStore::new(&config.db_path)?);
    info!("✅ Database initialized");

    match store.all().await {
        Ok(records) if !records.is_empty() => {
            let stats = compute_stats(&records);
            info!(
                "📈 {} calls on record, {} reached {}x+ (hit rate {:.1}%, avg peak {:.2}x)",
                stats.total_calls,
                stats.winners,
                callscan::pipeline::stats::WIN_MULTIPLE,
                stats.hit_rate * 100.0,
                stats.average_multiple
            );
        }
        Ok(_) => info!("📈 No calls on record yet"),
        Err(e) => error!("❌ Failed to load call history: {}", e),
    }

    let request_timeout = Duration::from_millis(config.request_timeout_ms);
    let source: Arc<dyn SnapshotSource> =
        Arc::new(DexScreenerClient::new(&config.chain_id, request_timeout)?);

    let mut engine = ScanEngine::new(source.clone(), store.clone(), &config);
    match engine.rehydrate_ledger().await {
        Ok(n) => info!("✅ Dedup ledger rebuilt with {} recent calls", n),
        Err(e) => error!("❌ Could not rebuild dedup ledger, starting empty: {}", e),
    }

    let tracker = Arc::new(PeakTracker::new(
        source,
        store,
        config.peak_tracker_limit,
        Duration::from_millis(config.request_delay_ms),
        request_timeout,
    ));

    let engine = Arc::new(Mutex::new(engine));
    let scheduler = tokio::spawn(scan_scheduler_task(
        engine,
        tracker,
        config.scan_interval_ms,
    ));
    info!("✅ Scan scheduler spawned");
    info!("🔄 Press CTRL+C to shutdown gracefully");

    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("");
            info!("⚠️  Received CTRL+C, shutting down...");
        }
        Err(err) => {
            error!("❌ Failed to listen for CTRL+C: {}", err);
        }
    }

    scheduler.abort();

    info!("✅ Scanner runtime stopped");
    Ok(())
}
