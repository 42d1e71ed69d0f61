//! Integration tests for the statement import pipeline
//!
//! These run the full preview/dedup/commit flow against a real DuckDB file.
//! Storage failures are injected at the trait level.
//!
//! Run with: cargo test --test import_pipeline_test -- --nocapture

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tempfile::TempDir;

use reconcile_core::adapters::duckdb::DuckDbMovementStore;
use reconcile_core::adapters::memory::InMemoryMovementStore;
use reconcile_core::adapters::table_file::{parse_delimited, read_table};
use reconcile_core::domain::result::Result as CoreResult;
use reconcile_core::domain::{
    rows_from_grid, ExistingMovement, FormatKind, LedgerMovement, MovementOrigin, RawCell,
};
use reconcile_core::ports::{BatchInsertOutcome, InsertOutcome, MovementStore};
use reconcile_core::services::import::{build_movements, execute};
use reconcile_core::services::{
    CommitMode, EntryPoint, ImportOptions, ImportService, LoggingService,
};
use reconcile_core::{Error, ImportBatch, ReconcileContext, TransactionType};

// ============================================================================
// Test Helpers
// ============================================================================

const STANDARD_CSV: &str = "\
Banco Exemplo S.A.;;;
Extrato de conta corrente;;;
Data;Histórico;Crédito (R$);Débito (R$)
03/02/2025;PIX RECEBIDO FULANO;1.500,00;
04/02/2025;PAGAMENTO BOLETO;;320,45
;;;
05/02/2025;TARIFA PACOTE;;0,00
06/02/2025;SUPERMERCADO;;89,90
";

fn create_test_store(temp_dir: &TempDir) -> Arc<DuckDbMovementStore> {
    let db_path = temp_dir.path().join("test.duckdb");
    Arc::new(DuckDbMovementStore::open(&db_path).expect("Failed to open store"))
}

fn preview(service: &ImportService) -> ImportBatch {
    let rows = parse_delimited(STANDARD_CSV).expect("Failed to parse CSV");
    service.preview(&rows).expect("Failed to preview")
}

/// Store that fails the n-th insert (1-based) with a non-duplicate error
struct FailingStore {
    inner: InMemoryMovementStore,
    fail_on: usize,
    attempts: AtomicUsize,
}

impl FailingStore {
    fn new(fail_on: usize) -> Self {
        Self {
            inner: InMemoryMovementStore::new(),
            fail_on,
            attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MovementStore for FailingStore {
    async fn insert(&self, movement: &LedgerMovement) -> CoreResult<InsertOutcome> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt == self.fail_on {
            return Err(Error::database("disk I/O error"));
        }
        self.inner.insert(movement).await
    }

    async fn insert_batch(&self, movements: &[LedgerMovement]) -> CoreResult<BatchInsertOutcome> {
        self.attempts.fetch_add(movements.len(), Ordering::SeqCst);
        if movements.len() >= self.fail_on {
            return Err(Error::database("disk I/O error"));
        }
        self.inner.insert_batch(movements).await
    }

    async fn query_by_account_and_date_range(
        &self,
        account: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> CoreResult<Vec<ExistingMovement>> {
        self.inner.query_by_account_and_date_range(account, from, to).await
    }

    async fn list_by_account(&self, account: &str) -> CoreResult<Vec<LedgerMovement>> {
        self.inner.list_by_account(account).await
    }
}

// ============================================================================
// Preview
// ============================================================================

#[test]
fn test_preview_of_bank_export() {
    let service = ImportService::new(Arc::new(InMemoryMovementStore::new()));
    let batch = preview(&service);

    assert_eq!(batch.format().kind, FormatKind::Standard);
    assert_eq!(batch.header_index(), 2);
    assert_eq!(batch.blank_rows(), 1);
    assert_eq!(batch.len(), 4);
    assert_eq!(batch.valid_count(), 3);

    let tarifa = &batch.rows()[2];
    assert_eq!(tarifa.description.as_deref(), Some("TARIFA PACOTE"));
    assert!(!tarifa.is_valid);
    assert!(!tarifa.is_selected);

    let totals = batch.totals();
    assert_eq!(totals.selected, 3);
    assert_eq!(totals.credits, Decimal::new(150000, 2));
    assert_eq!(totals.debits, Decimal::new(41035, 2));
}

#[test]
fn test_unrecognized_layout_parses_nothing() {
    let service = ImportService::new(Arc::new(InMemoryMovementStore::new()));
    let mut grid = vec![vec![RawCell::from("Date"), RawCell::from("Payee"), RawCell::from("Amount")]];
    for _ in 0..35 {
        grid.push(vec![
            RawCell::from("2025-01-01"),
            RawCell::from("Coffee"),
            RawCell::from("3.50"),
        ]);
    }

    let err = service.preview(&rows_from_grid(grid)).unwrap_err();
    let msg = err.to_string();
    assert!(matches!(err, Error::Format(_)));
    assert!(msg.contains("STANDARD"));
    assert!(msg.contains("PROCESSOR_X"));
}

// ============================================================================
// Idempotent import
// ============================================================================

#[tokio::test]
async fn test_strict_reimport_inserts_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let service = ImportService::new(store.clone());
    let batch = preview(&service);
    let options = ImportOptions::new("checking").strict();

    let first = service.commit(&batch, &options).await.unwrap();
    assert_eq!(first.commit.inserted, 3);
    assert_eq!(first.total_duplicates(), 0);
    assert!(first.is_success());

    let second = service.commit(&batch, &options).await.unwrap();
    assert_eq!(second.commit.inserted, 0);
    assert_eq!(second.total_duplicates(), 3);

    assert_eq!(store.count_movements().unwrap(), 3);
    let history = service.history("checking").await.unwrap();
    assert!(history.iter().all(|m| m.origin == MovementOrigin::ManualAdjustment));
    assert!(history.iter().all(|m| m.fingerprint.is_some()));
}

#[tokio::test]
async fn test_strict_reimport_in_sequential_mode() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let service = ImportService::new(store.clone());
    let batch = preview(&service);
    let options = ImportOptions::new("checking")
        .strict()
        .with_commit_mode(CommitMode::Sequential);

    assert_eq!(service.commit(&batch, &options).await.unwrap().commit.inserted, 3);
    let second = service.commit(&batch, &options).await.unwrap();
    assert_eq!(second.commit.inserted, 0);
    assert_eq!(second.total_duplicates(), 3);
}

#[tokio::test]
async fn test_storage_constraint_catches_missed_duplicates() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let service = ImportService::new(store.clone());
    let batch = preview(&service);

    service
        .commit(&batch, &ImportOptions::new("checking").strict())
        .await
        .unwrap();

    // Bypass the dedup engine: only the store's constraint stands in the way
    let rows: Vec<_> = batch.committable().into_iter().cloned().collect();
    let movements = build_movements(&rows, "checking", MovementOrigin::ManualAdjustment, "again", true);
    let outcome = execute(store.as_ref(), &movements, CommitMode::Sequential).await;

    assert_eq!(outcome.inserted, 0);
    assert_eq!(outcome.duplicates_skipped, 3);
    assert!(outcome.error.is_none());
}

#[tokio::test]
async fn test_permissive_import_records_repeats() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let service = ImportService::new(store.clone());
    let batch = preview(&service);
    let options = ImportOptions::new("checking");

    service.commit(&batch, &options).await.unwrap();
    let second = service.commit(&batch, &options).await.unwrap();

    assert_eq!(second.commit.inserted, 3);
    assert_eq!(second.origin, MovementOrigin::StatementImport);
    assert_eq!(store.count_movements().unwrap(), 6);
}

// ============================================================================
// Storage failures
// ============================================================================

#[tokio::test]
async fn test_sequential_failure_keeps_earlier_rows() {
    let store = Arc::new(FailingStore::new(2));
    let service = ImportService::new(store.clone());
    let batch = preview(&service);
    assert_eq!(batch.committable().len(), 3);

    let options = ImportOptions::new("checking").with_commit_mode(CommitMode::Sequential);
    let report = service.commit(&batch, &options).await.unwrap();

    assert_eq!(report.commit.inserted, 1);
    assert_eq!(report.commit.duplicates_skipped, 0);
    assert!(report.commit.error.as_deref().unwrap().contains("disk I/O error"));
    assert!(!report.is_success());

    // The third row was never attempted
    assert_eq!(store.attempts.load(Ordering::SeqCst), 2);
    assert_eq!(store.inner.len().unwrap(), 1);
}

#[tokio::test]
async fn test_atomic_failure_leaves_nothing_behind() {
    let store = Arc::new(FailingStore::new(2));
    let service = ImportService::new(store.clone());
    let batch = preview(&service);

    let report = service
        .commit(&batch, &ImportOptions::new("checking"))
        .await
        .unwrap();

    assert_eq!(report.commit.inserted, 0);
    assert!(report.commit.error.is_some());
    assert!(store.inner.is_empty().unwrap());
}

#[tokio::test]
async fn test_duckdb_batch_rolls_back_on_error() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);

    let day = NaiveDate::from_ymd_opt(2025, 2, 3).unwrap();
    let first = LedgerMovement::new(
        "checking",
        day,
        Decimal::new(1000, 2),
        "A",
        TransactionType::Credit,
        MovementOrigin::StatementImport,
    );
    // Same primary key: not covered by the fingerprint conflict clause
    let mut clash = first.clone();
    clash.description = "B".to_string();

    let result = store.insert_batch(&[first, clash]).await;
    assert!(result.is_err());
    assert_eq!(store.count_movements().unwrap(), 0);
}

// ============================================================================
// Context and files
// ============================================================================

#[tokio::test]
async fn test_context_imports_statement_file() {
    let temp_dir = TempDir::new().unwrap();
    let statement = temp_dir.path().join("extrato.csv");
    std::fs::write(&statement, STANDARD_CSV).unwrap();

    let data_dir = temp_dir.path().join("data");
    let context = ReconcileContext::new(&data_dir, None).unwrap();
    let batch = context.preview_file(&statement).unwrap();

    let options = context.config.import_options("checking").strict();
    let report = context.import_service.commit(&batch, &options).await.unwrap();
    assert_eq!(report.commit.inserted, 3);

    assert!(data_dir.join(reconcile_core::LEDGER_DB).exists());
    assert_eq!(read_table(&statement).unwrap().len(), 8);
}

#[test]
fn test_reopen_keeps_movements_and_schema() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.duckdb");

    {
        let store = DuckDbMovementStore::open(&db_path).unwrap();
        let movement = LedgerMovement::new(
            "checking",
            NaiveDate::from_ymd_opt(2025, 2, 3).unwrap(),
            Decimal::new(5000, 2),
            "DEPOSITO",
            TransactionType::Credit,
            MovementOrigin::StatementImport,
        );
        assert!(store.insert_movement(&movement).unwrap());
    }

    let store = DuckDbMovementStore::open(&db_path).unwrap();
    assert!(store.run_migrations().unwrap().applied.is_empty());
    assert_eq!(store.count_movements().unwrap(), 1);
}

#[tokio::test]
async fn test_import_events_are_logged_without_statement_content() {
    let temp_dir = TempDir::new().unwrap();
    let logger = Arc::new(LoggingService::new(temp_dir.path(), EntryPoint::Library, "0.1.0").unwrap());
    let service = ImportService::new(Arc::new(FailingStore::new(1))).with_logger(logger.clone());

    let batch = preview(&service);
    let report = service
        .commit(&batch, &ImportOptions::new("checking").with_commit_mode(CommitMode::Sequential))
        .await
        .unwrap();
    assert!(!report.is_success());

    let events: Vec<String> = logger
        .get_recent(10)
        .unwrap()
        .into_iter()
        .map(|e| e.event)
        .collect();
    assert_eq!(events, vec!["import_commit_failed", "import_previewed", "format_detected"]);

    let failure = &logger.get_errors(1).unwrap()[0];
    assert_eq!(failure.layout.as_deref(), Some("STANDARD"));
    assert_eq!(failure.error_details.as_deref(), Some("mode=sequential"));
    assert!(!failure.error_message.as_deref().unwrap_or("").contains("SUPERMERCADO"));
}
