//! Import batch - the operator's preview of a parsed statement

use rust_decimal::Decimal;
use serde::Serialize;

use super::format::FormatSpec;
use super::result::{Error, Result};
use super::row::{ParsedRow, TransactionType};

/// Aggregates over the selected rows of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTotals {
    pub selected: usize,
    pub credits: Decimal,
    pub debits: Decimal,
}

impl BatchTotals {
    /// Credits minus debits
    pub fn net(&self) -> Decimal {
        self.credits - self.debits
    }
}

/// Every parsed row of one statement plus the operator's selection
///
/// Totals are never cached: `totals()` folds over the rows each time, so
/// they cannot drift from the selection state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatch {
    format: FormatSpec,
    header_index: usize,
    rows: Vec<ParsedRow>,
    /// Blank separator rows dropped during classification
    blank_rows: usize,
}

impl ImportBatch {
    pub fn new(format: FormatSpec, header_index: usize, rows: Vec<ParsedRow>, blank_rows: usize) -> Self {
        Self {
            format,
            header_index,
            rows,
            blank_rows,
        }
    }

    pub fn format(&self) -> &FormatSpec {
        &self.format
    }

    pub fn header_index(&self) -> usize {
        self.header_index
    }

    pub fn rows(&self) -> &[ParsedRow] {
        &self.rows
    }

    pub fn blank_rows(&self) -> usize {
        self.blank_rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn valid_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_valid).count()
    }

    pub fn invalid_count(&self) -> usize {
        self.rows.len() - self.valid_count()
    }

    /// Flip the selection of the row at `position` (position in the batch,
    /// not the source index). Returns the new selection state.
    pub fn toggle(&mut self, position: usize) -> Result<bool> {
        let current = self.row(position)?.is_selected;
        self.set_selected(position, !current)?;
        Ok(!current)
    }

    /// Set the selection of one row; invalid rows can only be deselected
    pub fn set_selected(&mut self, position: usize, selected: bool) -> Result<()> {
        let row = self
            .rows
            .get_mut(position)
            .ok_or_else(|| Error::not_found(format!("row {} is not in the batch", position)))?;

        if selected && !row.is_valid {
            let reason = row
                .validation_error
                .map(|e| e.message())
                .unwrap_or("invalid row");
            return Err(Error::validation(format!(
                "row {} cannot be selected: {}",
                row.source_index, reason
            )));
        }

        row.is_selected = selected;
        Ok(())
    }

    /// Apply a full selection mask, one flag per row
    pub fn apply_selection(&mut self, mask: &[bool]) -> Result<()> {
        if mask.len() != self.rows.len() {
            return Err(Error::validation(format!(
                "selection has {} entries but the batch has {} rows",
                mask.len(),
                self.rows.len()
            )));
        }
        for (position, selected) in mask.iter().enumerate() {
            // Invalid rows silently stay unselected
            let selected = *selected && self.rows[position].is_valid;
            self.rows[position].is_selected = selected;
        }
        Ok(())
    }

    pub fn select_all_valid(&mut self) {
        for row in &mut self.rows {
            row.is_selected = row.is_valid;
        }
    }

    pub fn clear_selection(&mut self) {
        for row in &mut self.rows {
            row.is_selected = false;
        }
    }

    /// Selected, valid rows in batch order
    pub fn committable(&self) -> Vec<&ParsedRow> {
        self.rows.iter().filter(|r| r.is_committable()).collect()
    }

    pub fn totals(&self) -> BatchTotals {
        self.rows
            .iter()
            .filter(|r| r.is_committable())
            .fold(BatchTotals::default(), |mut acc, row| {
                acc.selected += 1;
                match (row.transaction_type, row.amount) {
                    (Some(TransactionType::Credit), Some(a)) => acc.credits += a,
                    (Some(TransactionType::Debit), Some(a)) => acc.debits += a,
                    _ => {}
                }
                acc
            })
    }

    fn row(&self, position: usize) -> Result<&ParsedRow> {
        self.rows
            .get(position)
            .ok_or_else(|| Error::not_found(format!("row {} is not in the batch", position)))
    }
}
