//! Import service - statement ingestion from raw rows to ledger movements
//!
//! The pipeline runs in two steps so the operator can curate in between:
//!
//! - `preview` detects the layout and classifies every row into an
//!   [`ImportBatch`] (pure, no I/O)
//! - `commit` deduplicates the selected rows against the store when strict
//!   mode is on, then writes them in the configured [`CommitMode`]

mod classify;
mod commit;
mod date;
mod dedup;
mod detect;
mod text;
mod value;

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

pub use classify::{classify_row, classify_rows, classify_type, Classified};
pub use commit::{build_movements, execute, CommitMode, CommitOutcome};
pub use date::normalize_date;
pub use dedup::{deduplicate, DedupOutcome};
pub use detect::{detect_format, DetectedFormat, DEFAULT_SCAN_ROWS};
pub use value::normalize_value;

use crate::domain::result::{Error, Result};
use crate::domain::{ImportBatch, LedgerMovement, MovementOrigin, RawRow};
use crate::ports::MovementStore;
use crate::services::logging::{LogEvent, LoggingService};

/// Operator controls for a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    /// Target account; required
    pub account: String,
    /// Permissive mode; `false` turns on strict deduplication
    pub allow_duplicates: bool,
    pub commit_mode: CommitMode,
}

impl ImportOptions {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            allow_duplicates: true,
            commit_mode: CommitMode::default(),
        }
    }

    pub fn strict(mut self) -> Self {
        self.allow_duplicates = false;
        self
    }

    pub fn with_commit_mode(mut self, mode: CommitMode) -> Self {
        self.commit_mode = mode;
        self
    }
}

/// What a commit did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub batch_id: String,
    pub account: String,
    pub origin: MovementOrigin,
    /// Rows selected for commit before deduplication
    pub selected: usize,
    /// Rows dropped because they matched a stored movement
    pub deduplicated: usize,
    pub commit: CommitOutcome,
}

impl ImportReport {
    /// Duplicates caught before and during the write
    pub fn total_duplicates(&self) -> usize {
        self.deduplicated + self.commit.duplicates_skipped
    }

    pub fn is_success(&self) -> bool {
        self.commit.is_success()
    }
}

/// Service orchestrating detection, classification, dedup and commit
pub struct ImportService {
    store: Arc<dyn MovementStore>,
    scan_rows: usize,
    logger: Option<Arc<LoggingService>>,
}

impl ImportService {
    pub fn new(store: Arc<dyn MovementStore>) -> Self {
        Self {
            store,
            scan_rows: DEFAULT_SCAN_ROWS,
            logger: None,
        }
    }

    /// Rows scanned for a header row
    pub fn with_scan_rows(mut self, scan_rows: usize) -> Self {
        self.scan_rows = scan_rows.max(1);
        self
    }

    pub fn with_logger(mut self, logger: Arc<LoggingService>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Find the layout of a table without classifying it
    pub fn detect(&self, rows: &[RawRow]) -> Result<DetectedFormat> {
        match detect_format(rows, self.scan_rows) {
            Ok(detected) => {
                self.log(LogEvent::new("format_detected").with_layout(detected.spec.kind.as_str()));
                Ok(detected)
            }
            Err(e) => {
                self.log(LogEvent::new("format_detection_failed").with_error(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Detect and classify a table into a batch for review
    pub fn preview(&self, rows: &[RawRow]) -> Result<ImportBatch> {
        let detected = self.detect(rows)?;
        let (parsed, blanks) = classify_rows(detected.data_rows(rows), &detected.spec);
        let batch = ImportBatch::new(detected.spec, detected.header_index, parsed, blanks);

        self.log(LogEvent::new("import_previewed").with_layout(batch.format().kind.as_str()));
        Ok(batch)
    }

    /// Commit the selected, valid rows of a batch
    ///
    /// Storage failures while writing are reported in the returned
    /// [`ImportReport`]; only a missing account or a failed dedup lookup
    /// surface as `Err`.
    pub async fn commit(&self, batch: &ImportBatch, options: &ImportOptions) -> Result<ImportReport> {
        let account = options.account.trim();
        if account.is_empty() {
            return Err(Error::validation("a target account is required to commit"));
        }

        let strict = !options.allow_duplicates;
        let layout = batch.format().kind.as_str();
        let candidates: Vec<_> = batch.committable().into_iter().cloned().collect();
        let selected = candidates.len();

        let dedup = match deduplicate(self.store.as_ref(), account, candidates, strict).await {
            Ok(d) => d,
            Err(e) => {
                self.log(
                    LogEvent::new("import_commit_failed")
                        .with_layout(layout)
                        .with_error(e.to_string()),
                );
                return Err(e);
            }
        };

        let origin = MovementOrigin::for_commit(strict);
        let batch_id = Utc::now().format("import_%Y%m%d_%H%M%S").to_string();
        let movements = build_movements(&dedup.kept, account, origin, &batch_id, strict);
        let outcome = execute(self.store.as_ref(), &movements, options.commit_mode).await;

        match &outcome.error {
            None => self.log(LogEvent::new("import_committed").with_layout(layout)),
            Some(err) => self.log(
                LogEvent::new("import_commit_failed")
                    .with_layout(layout)
                    .with_error(err.clone())
                    .with_error_details(format!("mode={}", options.commit_mode.as_str())),
            ),
        }

        Ok(ImportReport {
            batch_id,
            account: account.to_string(),
            origin,
            selected,
            deduplicated: dedup.discarded,
            commit: outcome,
        })
    }

    /// Movements recorded on an account, newest first
    pub async fn history(&self, account: &str) -> Result<Vec<LedgerMovement>> {
        self.store.list_by_account(account).await
    }

    fn log(&self, event: LogEvent) {
        if let Some(logger) = &self.logger {
            // Logging never fails an import
            let _ = logger.log(event);
        }
    }
}
