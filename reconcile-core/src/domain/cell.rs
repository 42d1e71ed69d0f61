//! Raw statement cells, as handed over by whatever decoded the file

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// An untyped cell value from a statement export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl RawCell {
    /// Build a text cell, collapsing blank strings to `Empty`
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            RawCell::Empty
        } else {
            RawCell::Text(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text view of the cell, used for header matching and descriptions
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawCell::Empty => None,
            RawCell::Text(s) => Some(s.clone()),
            RawCell::Number(n) => Some(n.to_string()),
            RawCell::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            RawCell::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

impl From<&str> for RawCell {
    fn from(value: &str) -> Self {
        RawCell::text(value)
    }
}

impl From<String> for RawCell {
    fn from(value: String) -> Self {
        RawCell::text(value)
    }
}

impl From<f64> for RawCell {
    fn from(value: f64) -> Self {
        RawCell::Number(value)
    }
}

impl From<NaiveDate> for RawCell {
    fn from(value: NaiveDate) -> Self {
        RawCell::Date(value)
    }
}

static EMPTY_CELL: RawCell = RawCell::Empty;

/// One row of the source table, with its 0-based position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub index: usize,
    pub cells: Vec<RawCell>,
}

impl RawRow {
    pub fn new(index: usize, cells: Vec<RawCell>) -> Self {
        Self { index, cells }
    }

    /// Cell at a column position; positions past the end read as `Empty`
    pub fn cell(&self, column: usize) -> &RawCell {
        self.cells.get(column).unwrap_or(&EMPTY_CELL)
    }

    /// Optional column lookup, for mappings where the column may be absent
    pub fn cell_at(&self, column: Option<usize>) -> &RawCell {
        column.map(|c| self.cell(c)).unwrap_or(&EMPTY_CELL)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(RawCell::is_empty)
    }
}

/// Turn a plain grid of cells into indexed rows
pub fn rows_from_grid(grid: Vec<Vec<RawCell>>) -> Vec<RawRow> {
    grid.into_iter()
        .enumerate()
        .map(|(index, cells)| RawRow::new(index, cells))
        .collect()
}
