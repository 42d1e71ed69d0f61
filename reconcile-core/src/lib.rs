//! Reconcile Core - statement ingestion and reconciliation
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core entities (raw cells, parsed rows, batches, movements)
//! - **ports**: Trait definitions for external dependencies (MovementStore)
//! - **services**: Import pipeline, logging and migrations
//! - **adapters**: Concrete implementations (DuckDB, in-memory, file readers)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbMovementStore;
use config::Config;
use services::{ImportService, LoggingService};

// Re-export commonly used types at crate root
pub use domain::result::{Error, FormatError, OperationResult};
pub use domain::{ImportBatch, LedgerMovement, ParsedRow, RawCell, RawRow, TransactionType};
pub use services::{CommitMode, ImportOptions, ImportReport};

/// Ledger database file inside the data directory
pub const LEDGER_DB: &str = "ledger.duckdb";

/// Main context for reconcile operations
///
/// Holds the configuration, the ledger store and the import service wired
/// to both.
pub struct ReconcileContext {
    pub config: Config,
    pub store: Arc<DuckDbMovementStore>,
    pub import_service: ImportService,
}

impl ReconcileContext {
    /// Open the ledger in `data_dir`, creating it on first use
    pub fn new(data_dir: &Path, logger: Option<Arc<LoggingService>>) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let config = Config::load(data_dir)?;

        let store = Arc::new(DuckDbMovementStore::open(&data_dir.join(LEDGER_DB))?);

        let mut import_service =
            ImportService::new(store.clone()).with_scan_rows(config.header_scan_rows);
        if let Some(logger) = logger {
            import_service = import_service.with_logger(logger);
        }

        Ok(Self {
            config,
            store,
            import_service,
        })
    }

    /// Read a statement file and build its preview batch
    pub fn preview_file(&self, path: &Path) -> Result<ImportBatch> {
        let rows = adapters::table_file::read_table(path)?;
        Ok(self.import_service.preview(&rows)?)
    }
}
