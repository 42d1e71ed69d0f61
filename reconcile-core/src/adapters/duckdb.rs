//! DuckDB movement store

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use duckdb::{params, Connection};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result as CoreResult};
use crate::domain::{ExistingMovement, LedgerMovement, MovementOrigin, TransactionType};
use crate::ports::{BatchInsertOutcome, InsertOutcome, MovementStore};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const INSERT_SQL: &str = "INSERT INTO ledger_movements (movement_id, account_id, movement_date, amount,
                                                     description, kind, origin, batch_id,
                                                     fingerprint, created_at)
     VALUES (?, ?, CAST(? AS DATE), CAST(? AS DECIMAL(18, 2)), ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP))";

const SELECT_COLUMNS: &str = "movement_id, account_id, movement_date::VARCHAR, amount::VARCHAR,
                              description, kind, origin, batch_id, fingerprint, created_at::VARCHAR";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock on file")
}

/// Check if an error is the ledger's uniqueness constraint firing
fn is_constraint_violation(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("duplicate key") || lower.contains("violates unique constraint")
        || lower.contains("violates primary key constraint")
}

/// Ledger movement store on a DuckDB file
pub struct DuckDbMovementStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbMovementStore {
    /// Open (or create) the ledger database
    ///
    /// Retries with exponential backoff while another process holds the
    /// file lock, then runs pending migrations.
    pub fn open(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    let store = Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    };
                    store.ensure_schema()?;
                    return Ok(store);
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[reconcile] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    /// In-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            db_path: PathBuf::from(":memory:"),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Autoloading is off so cached extensions are never picked up
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()
    }

    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Insert one movement; `false` when the uniqueness constraint rejected it
    pub fn insert_movement(&self, movement: &LedgerMovement) -> Result<bool> {
        let conn = self.lock()?;
        match insert_row(&conn, movement, false) {
            Ok(_) => Ok(true),
            Err(e) if is_constraint_violation(&e.to_string()) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Insert all movements in one transaction, skipping conflicts
    pub fn insert_movements(&self, movements: &[LedgerMovement]) -> Result<BatchInsertOutcome> {
        let conn = self.lock()?;
        conn.execute_batch("BEGIN TRANSACTION")?;

        let mut outcome = BatchInsertOutcome::default();
        for movement in movements {
            match insert_row(&conn, movement, true) {
                Ok(0) => outcome.duplicates += 1,
                Ok(_) => outcome.inserted += 1,
                Err(e) => {
                    // Rollback failure is secondary to the insert error
                    let _ = conn.execute_batch("ROLLBACK");
                    return Err(anyhow!("batch insert rolled back: {}", e));
                }
            }
        }

        if let Err(e) = conn.execute_batch("COMMIT") {
            let _ = conn.execute_batch("ROLLBACK");
            return Err(e.into());
        }
        Ok(outcome)
    }

    pub fn get_movements_in_range(
        &self,
        account: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<LedgerMovement>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM ledger_movements
             WHERE account_id = ? AND movement_date BETWEEN CAST(? AS DATE) AND CAST(? AS DATE)
             ORDER BY movement_date",
            SELECT_COLUMNS
        ))?;
        let movements = stmt
            .query_map(params![account, from.to_string(), to.to_string()], row_to_movement)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(movements)
    }

    pub fn get_movements_by_account(&self, account: &str) -> Result<Vec<LedgerMovement>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM ledger_movements WHERE account_id = ?
             ORDER BY movement_date DESC, created_at DESC",
            SELECT_COLUMNS
        ))?;
        let movements = stmt
            .query_map(params![account], row_to_movement)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(movements)
    }

    pub fn count_movements(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM ledger_movements", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn insert_row(conn: &Connection, m: &LedgerMovement, skip_conflicts: bool) -> duckdb::Result<usize> {
    let sql = if skip_conflicts {
        format!("{} ON CONFLICT (account_id, fingerprint) DO NOTHING", INSERT_SQL)
    } else {
        INSERT_SQL.to_string()
    };

    conn.execute(
        &sql,
        params![
            m.id.to_string(),
            m.account,
            m.date.to_string(),
            m.amount.round_dp(2).to_string(),
            m.description,
            m.kind.as_str(),
            m.origin.as_str(),
            m.batch_id,
            m.fingerprint,
            m.created_at.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        ],
    )
}

fn row_to_movement(row: &duckdb::Row) -> duckdb::Result<LedgerMovement> {
    let id: String = row.get(0)?;
    let date: String = row.get(2)?;
    let amount: String = row.get(3)?;
    let kind: String = row.get(5)?;
    let origin: String = row.get(6)?;
    let created_at: String = row.get(9)?;

    Ok(LedgerMovement {
        id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::new_v4()),
        account: row.get(1)?,
        date: parse_date(&date),
        amount: Decimal::from_str(&amount).unwrap_or_default(),
        description: row.get(4)?,
        kind: TransactionType::parse(&kind).unwrap_or(TransactionType::Debit),
        origin: MovementOrigin::parse(&origin).unwrap_or(MovementOrigin::StatementImport),
        batch_id: row.get(7)?,
        fingerprint: row.get(8)?,
        created_at: parse_timestamp(&created_at),
    })
}

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_default()
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl MovementStore for DuckDbMovementStore {
    async fn insert(&self, movement: &LedgerMovement) -> CoreResult<InsertOutcome> {
        match self.insert_movement(movement) {
            Ok(true) => Ok(InsertOutcome::Inserted),
            Ok(false) => Ok(InsertOutcome::Duplicate),
            Err(e) => Err(Error::database(e.to_string())),
        }
    }

    async fn insert_batch(&self, movements: &[LedgerMovement]) -> CoreResult<BatchInsertOutcome> {
        self.insert_movements(movements)
            .map_err(|e| Error::database(e.to_string()))
    }

    async fn query_by_account_and_date_range(
        &self,
        account: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> CoreResult<Vec<ExistingMovement>> {
        let movements = self
            .get_movements_in_range(account, from, to)
            .map_err(|e| Error::database(e.to_string()))?;
        Ok(movements.iter().map(ExistingMovement::from).collect())
    }

    async fn list_by_account(&self, account: &str) -> CoreResult<Vec<LedgerMovement>> {
        self.get_movements_by_account(account)
            .map_err(|e| Error::database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movement(desc: &str, fingerprint: Option<&str>) -> LedgerMovement {
        let mut m = LedgerMovement::new(
            "checking",
            NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
            Decimal::new(123456, 2),
            desc,
            TransactionType::Credit,
            MovementOrigin::ManualAdjustment,
        );
        m.fingerprint = fingerprint.map(|f| f.to_string());
        m.batch_id = Some("import_20250610_120000".to_string());
        m
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let store = DuckDbMovementStore::open_in_memory().unwrap();
        let original = movement("Transferência recebida", Some("abc"));
        assert!(store.insert_movement(&original).unwrap());

        let listed = store.get_movements_by_account("checking").unwrap();
        assert_eq!(listed.len(), 1);
        let loaded = &listed[0];
        assert_eq!(loaded.id, original.id);
        assert_eq!(loaded.date, original.date);
        assert_eq!(loaded.amount, Decimal::new(123456, 2));
        assert_eq!(loaded.description, "Transferência recebida");
        assert_eq!(loaded.kind, TransactionType::Credit);
        assert_eq!(loaded.origin, MovementOrigin::ManualAdjustment);
        assert_eq!(loaded.fingerprint.as_deref(), Some("abc"));
    }

    #[test]
    fn test_fingerprint_conflict_is_reported() {
        let store = DuckDbMovementStore::open_in_memory().unwrap();
        assert!(store.insert_movement(&movement("a", Some("fp1"))).unwrap());
        assert!(!store.insert_movement(&movement("a", Some("fp1"))).unwrap());
        assert_eq!(store.count_movements().unwrap(), 1);
    }

    #[test]
    fn test_null_fingerprints_never_conflict() {
        let store = DuckDbMovementStore::open_in_memory().unwrap();
        assert!(store.insert_movement(&movement("a", None)).unwrap());
        assert!(store.insert_movement(&movement("a", None)).unwrap());
        assert_eq!(store.count_movements().unwrap(), 2);
    }

    #[test]
    fn test_batch_skips_conflicts() {
        let store = DuckDbMovementStore::open_in_memory().unwrap();
        store.insert_movement(&movement("a", Some("fp1"))).unwrap();

        let outcome = store
            .insert_movements(&[movement("a", Some("fp1")), movement("b", Some("fp2"))])
            .unwrap();
        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(store.count_movements().unwrap(), 2);
    }

    #[test]
    fn test_range_query_is_inclusive_and_scoped() {
        let store = DuckDbMovementStore::open_in_memory().unwrap();
        store.insert_movement(&movement("a", None)).unwrap();
        let mut other = movement("b", None);
        other.account = "savings".to_string();
        store.insert_movement(&other).unwrap();

        let day = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let found = store.get_movements_in_range("checking", day, day).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].description, "a");

        let later = NaiveDate::from_ymd_opt(2025, 6, 11).unwrap();
        assert!(store.get_movements_in_range("checking", later, later).unwrap().is_empty());
    }
}
