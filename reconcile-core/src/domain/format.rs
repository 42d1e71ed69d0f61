//! Statement layouts and their column mappings

use serde::{Deserialize, Serialize};

/// Known statement layouts
///
/// Adding a bank or processor layout means one new variant here, one header
/// rule in the detector and one branch in the row classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FormatKind {
    /// Bank export with separate credit and debit columns
    Standard,
    /// Payment processor export with a single value column and a type column
    ProcessorX,
}

impl FormatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatKind::Standard => "STANDARD",
            FormatKind::ProcessorX => "PROCESSOR_X",
        }
    }

    /// Human-readable list of the header columns this layout is recognized by
    pub fn expected_columns(&self) -> &'static str {
        match self {
            FormatKind::Standard => "Data, Descrição/Histórico, Crédito (and optionally Débito)",
            FormatKind::ProcessorX => "Data, Transação, Tipo, Valor",
        }
    }
}

impl std::fmt::Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column positions for the canonical fields
///
/// Only the fields a layout uses are populated: `credit`/`debit` for
/// STANDARD, `amount`/`kind` for PROCESSOR_X.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub date: usize,
    pub description: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debit: Option<usize>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<usize>,
}

/// A detected layout and where its columns live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSpec {
    pub kind: FormatKind,
    pub columns: ColumnMap,
}

impl FormatSpec {
    pub fn new(kind: FormatKind, columns: ColumnMap) -> Self {
        Self { kind, columns }
    }
}
