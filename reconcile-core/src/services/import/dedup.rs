//! Deduplication engine - drop rows already recorded in the ledger

use std::collections::HashSet;

use crate::domain::result::Result;
use crate::domain::{DedupKey, ParsedRow};
use crate::ports::MovementStore;

/// Rows that survived deduplication plus how many were dropped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupOutcome {
    pub kept: Vec<ParsedRow>,
    pub discarded: usize,
}

/// Key of a committable row; `None` for rows missing a key field
pub(crate) fn row_key(row: &ParsedRow) -> Option<DedupKey> {
    let date = row.date?;
    let amount = row.amount?;
    let description = row.description.as_deref()?;
    Some(DedupKey::new(date, amount, description))
}

/// Remove rows whose key matches a stored movement on `account`
///
/// Only runs in strict mode; permissive mode passes every row through.
/// The store is queried once, for the date span of the candidates.
pub async fn deduplicate(
    store: &dyn MovementStore,
    account: &str,
    rows: Vec<ParsedRow>,
    strict: bool,
) -> Result<DedupOutcome> {
    if !strict || rows.is_empty() {
        return Ok(DedupOutcome {
            kept: rows,
            discarded: 0,
        });
    }

    let dates = rows.iter().filter_map(|r| r.date);
    let (Some(min_date), Some(max_date)) = (dates.clone().min(), dates.max()) else {
        return Ok(DedupOutcome {
            kept: rows,
            discarded: 0,
        });
    };

    let existing: HashSet<DedupKey> = store
        .query_by_account_and_date_range(account, min_date, max_date)
        .await?
        .iter()
        .map(|m| m.dedup_key())
        .collect();

    let before = rows.len();
    let kept: Vec<ParsedRow> = rows
        .into_iter()
        .filter(|r| row_key(r).map_or(true, |k| !existing.contains(&k)))
        .collect();

    Ok(DedupOutcome {
        discarded: before - kept.len(),
        kept,
    })
}
