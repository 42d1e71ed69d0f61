//! Movement store port - ledger persistence abstraction

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::result::Result;
use crate::domain::{ExistingMovement, LedgerMovement};

/// Outcome of inserting a single movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The store's uniqueness constraint rejected the movement
    Duplicate,
}

/// Outcome of an all-or-nothing batch insert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchInsertOutcome {
    pub inserted: usize,
    pub duplicates: usize,
}

/// Ledger movement store
///
/// The import engine only appends movements and reads them back for
/// deduplication; it never updates or deletes existing rows.
#[async_trait]
pub trait MovementStore: Send + Sync {
    /// Insert one movement
    ///
    /// A uniqueness violation is reported as `InsertOutcome::Duplicate`;
    /// any other failure is an `Error::Database`.
    async fn insert(&self, movement: &LedgerMovement) -> Result<InsertOutcome>;

    /// Insert all movements in a single storage transaction
    ///
    /// Conflicting movements are skipped and counted. Any other failure
    /// rolls back every insert of the call.
    async fn insert_batch(&self, movements: &[LedgerMovement]) -> Result<BatchInsertOutcome>;

    /// Movements on `account` dated within `[from, to]`, inclusive
    async fn query_by_account_and_date_range(
        &self,
        account: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExistingMovement>>;

    /// Every movement on `account`, newest first
    async fn list_by_account(&self, account: &str) -> Result<Vec<LedgerMovement>>;
}
