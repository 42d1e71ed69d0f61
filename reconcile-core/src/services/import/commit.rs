//! Commit executor - write the final row set to the movement store

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::dedup::row_key;
use crate::domain::{DedupKey, LedgerMovement, MovementOrigin, ParsedRow};
use crate::ports::{InsertOutcome, MovementStore};

/// How rows reach the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitMode {
    /// One storage transaction; a failure leaves nothing behind
    #[default]
    Atomic,
    /// One insert at a time; a failure keeps earlier inserts
    Sequential,
}

impl CommitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitMode::Atomic => "atomic",
            CommitMode::Sequential => "sequential",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "atomic" => Some(CommitMode::Atomic),
            "sequential" => Some(CommitMode::Sequential),
            _ => None,
        }
    }
}

/// Counts from one commit run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitOutcome {
    pub inserted: usize,
    pub duplicates_skipped: usize,
    /// Storage error that stopped the run
    pub error: Option<String>,
}

impl CommitOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Turn committable rows into movements for `account`
///
/// With `fingerprint` set every movement carries a re-import guard; the
/// n-th identical line of the batch gets occurrence n so genuine repeats
/// inside one statement stay distinct. Rows missing a key field are skipped.
pub fn build_movements(
    rows: &[ParsedRow],
    account: &str,
    origin: MovementOrigin,
    batch_id: &str,
    fingerprint: bool,
) -> Vec<LedgerMovement> {
    let mut occurrences: HashMap<DedupKey, usize> = HashMap::new();

    rows.iter()
        .filter_map(|row| {
            let key = row_key(row)?;
            let kind = row.transaction_type?;
            let description = row.description.as_deref()?.trim();

            let mut movement = LedgerMovement::new(
                account,
                key.date,
                row.amount?,
                description,
                kind,
                origin,
            );
            movement.batch_id = Some(batch_id.to_string());

            if fingerprint {
                let seen = occurrences.entry(key.clone()).or_insert(0);
                movement.fingerprint = Some(key.fingerprint(account, *seen));
                *seen += 1;
            }

            Some(movement)
        })
        .collect()
}

/// Write movements using the given mode
pub async fn execute(
    store: &dyn MovementStore,
    movements: &[LedgerMovement],
    mode: CommitMode,
) -> CommitOutcome {
    match mode {
        CommitMode::Atomic => execute_atomic(store, movements).await,
        CommitMode::Sequential => execute_sequential(store, movements).await,
    }
}

async fn execute_sequential(store: &dyn MovementStore, movements: &[LedgerMovement]) -> CommitOutcome {
    let mut outcome = CommitOutcome::default();

    for movement in movements {
        match store.insert(movement).await {
            Ok(InsertOutcome::Inserted) => outcome.inserted += 1,
            Ok(InsertOutcome::Duplicate) => outcome.duplicates_skipped += 1,
            Err(e) => {
                outcome.error = Some(e.to_string());
                break;
            }
        }
    }

    outcome
}

async fn execute_atomic(store: &dyn MovementStore, movements: &[LedgerMovement]) -> CommitOutcome {
    if movements.is_empty() {
        return CommitOutcome::default();
    }

    match store.insert_batch(movements).await {
        Ok(result) => CommitOutcome {
            inserted: result.inserted,
            duplicates_skipped: result.duplicates,
            error: None,
        },
        Err(e) => CommitOutcome {
            error: Some(e.to_string()),
            ..Default::default()
        },
    }
}
