//! In-memory movement store for tests and dry runs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::result::{Error, Result};
use crate::domain::{ExistingMovement, LedgerMovement};
use crate::ports::{BatchInsertOutcome, InsertOutcome, MovementStore};

/// Movement store backed by a vector
///
/// Enforces the same `(account, fingerprint)` uniqueness as the DuckDB store.
#[derive(Default)]
pub struct InMemoryMovementStore {
    movements: Mutex<Vec<LedgerMovement>>,
    queries: AtomicUsize,
}

impl InMemoryMovementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of date-range lookups served so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<LedgerMovement>>> {
        self.movements
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    fn conflicts(existing: &[LedgerMovement], movement: &LedgerMovement) -> bool {
        let Some(fp) = movement.fingerprint.as_deref() else {
            return false;
        };
        existing
            .iter()
            .any(|m| m.account == movement.account && m.fingerprint.as_deref() == Some(fp))
    }
}

#[async_trait]
impl MovementStore for InMemoryMovementStore {
    async fn insert(&self, movement: &LedgerMovement) -> Result<InsertOutcome> {
        let mut movements = self.lock()?;
        if Self::conflicts(&movements, movement) {
            return Ok(InsertOutcome::Duplicate);
        }
        movements.push(movement.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn insert_batch(&self, batch: &[LedgerMovement]) -> Result<BatchInsertOutcome> {
        let mut movements = self.lock()?;
        let mut outcome = BatchInsertOutcome::default();
        for movement in batch {
            if Self::conflicts(&movements, movement) {
                outcome.duplicates += 1;
            } else {
                movements.push(movement.clone());
                outcome.inserted += 1;
            }
        }
        Ok(outcome)
    }

    async fn query_by_account_and_date_range(
        &self,
        account: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExistingMovement>> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        let movements = self.lock()?;
        Ok(movements
            .iter()
            .filter(|m| m.account == account && m.date >= from && m.date <= to)
            .map(ExistingMovement::from)
            .collect())
    }

    async fn list_by_account(&self, account: &str) -> Result<Vec<LedgerMovement>> {
        let movements = self.lock()?;
        let mut listed: Vec<LedgerMovement> = movements
            .iter()
            .filter(|m| m.account == account)
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(listed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_poisoned_lock_is_an_error() {
        let store = Arc::new(InMemoryMovementStore::new());
        assert_eq!(store.len().unwrap(), 0);

        let poisoner = Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.movements.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(store.len().is_err());
        assert!(store.is_empty().is_err());
    }
}
