//! Call ledger persistence
//!
//! `CallStore` is the contract the engine and the peak tracker depend on.
//! `SqliteCallStore` implements it on top of the `calls` table
//! (`sql/01_calls.sql`).
//!
//! Every operation is atomic per record. `update_peak_if_higher` is a single
//! conditional UPDATE so concurrent tracker runs can never lower a peak.

use super::error::ScanError;
use super::types::{AlertRecord, Tier};
use async_trait::async_trait;
use rusqlite::{Connection, Row};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Storage contract for alert records
#[async_trait]
pub trait CallStore: Send + Sync {
    /// Insert a new record. Returns it with the assigned id.
    async fn create(&self, record: AlertRecord) -> Result<AlertRecord, ScanError>;

    /// Raise `peak_price` to `price` if and only if `price` is higher.
    ///
    /// Returns `true` when the row changed.
    async fn update_peak_if_higher(&self, id: i64, price: f64) -> Result<bool, ScanError>;

    /// Newest `limit` records, newest first
    async fn most_recent(&self, limit: usize) -> Result<Vec<AlertRecord>, ScanError>;

    /// Every record, newest first
    async fn all(&self) -> Result<Vec<AlertRecord>, ScanError>;
}

/// Run schema migrations from SQL files
///
/// Reads all .sql files from `schema_dir`, sorted by file name, and executes
/// them. Every file must use `IF NOT EXISTS` so re-running is harmless.
pub fn run_schema_migrations(conn: &mut Connection, schema_dir: &str) -> Result<(), ScanError> {
    let schema_path = Path::new(schema_dir);

    if !schema_path.exists() {
        return Err(ScanError::Schema(format!(
            "Schema directory not found: {}",
            schema_dir
        )));
    }

    conn.pragma_update(None, "journal_mode", "WAL")?;
    log::info!("📊 Enabled WAL mode for SQLite database");

    let mut sql_files: Vec<_> = fs::read_dir(schema_path)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().and_then(|s| s.to_str()) == Some("sql"))
        .collect();

    sql_files.sort_by_key(|entry| entry.file_name());

    log::info!("🔧 Running schema migrations from: {}", schema_dir);

    for entry in sql_files {
        let path = entry.path();
        let filename = entry.file_name().to_string_lossy().into_owned();

        log::info!("   ├─ Executing: {}", filename);
        let sql_content = fs::read_to_string(&path)?;
        conn.execute_batch(&sql_content)
            .map_err(|e| ScanError::Schema(format!("{}: {}", filename, e)))?;
    }

    log::info!("✅ All schema migrations completed successfully");

    Ok(())
}

/// SQLite implementation of CallStore
pub struct SqliteCallStore {
    conn: Arc<Mutex<Connection>>,
}

const SELECT_COLUMNS: &str = "id, pair_address, token_address, symbol, name, \
     initial_price, peak_price, tier, call_time";

impl SqliteCallStore {
    /// Open an existing database. The schema must already be migrated.
    pub fn new(db_path: &str) -> Result<Self, ScanError> {
        let conn = Connection::open(db_path)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ScanError> {
        self.conn
            .lock()
            .map_err(|_| ScanError::Persistence("connection lock poisoned".to_string()))
    }

    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<(AlertRecord, String)> {
        let tier: String = row.get(7)?;
        Ok((
            AlertRecord {
                id: Some(row.get(0)?),
                pair_address: row.get(1)?,
                token_address: row.get(2)?,
                symbol: row.get(3)?,
                name: row.get(4)?,
                initial_price: row.get(5)?,
                peak_price: row.get(6)?,
                tier: Tier::None,
                call_time: row.get(8)?,
            },
            tier,
        ))
    }

    fn query_records(&self, sql: &str, limit: i64) -> Result<Vec<AlertRecord>, ScanError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map([limit], Self::row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(mut record, tier)| {
                record.tier = tier.parse()?;
                Ok(record)
            })
            .collect()
    }
}

#[async_trait]
impl CallStore for SqliteCallStore {
    async fn create(&self, mut record: AlertRecord) -> Result<AlertRecord, ScanError> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT INTO calls (
                pair_address, token_address, symbol, name,
                initial_price, peak_price, tier, call_time
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            rusqlite::params![
                record.pair_address,
                record.token_address,
                record.symbol,
                record.name,
                record.initial_price,
                record.peak_price,
                record.tier.as_str(),
                record.call_time,
            ],
        )?;

        record.id = Some(conn.last_insert_rowid());
        Ok(record)
    }

    async fn update_peak_if_higher(&self, id: i64, price: f64) -> Result<bool, ScanError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE calls SET peak_price = ?2 WHERE id = ?1 AND ?2 > peak_price",
            rusqlite::params![id, price],
        )?;
        Ok(changed == 1)
    }

    async fn most_recent(&self, limit: usize) -> Result<Vec<AlertRecord>, ScanError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query_records(
            &format!(
                "SELECT {} FROM calls ORDER BY call_time DESC, id DESC LIMIT ?1",
                SELECT_COLUMNS
            ),
            limit,
        )
    }

    async fn all(&self) -> Result<Vec<AlertRecord>, ScanError> {
        // LIMIT -1 is "no limit" in SQLite
        self.query_records(
            &format!(
                "SELECT {} FROM calls ORDER BY call_time DESC, id DESC LIMIT ?1",
                SELECT_COLUMNS
            ),
            -1,
        )
    }
}
