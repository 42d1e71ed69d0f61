//! Format detector - find the header row and map its columns

use serde::Serialize;

use super::text::fold;
use crate::domain::result::FormatError;
use crate::domain::{ColumnMap, FormatKind, FormatSpec, RawRow};

/// Rows inspected for a header before giving up
pub const DEFAULT_SCAN_ROWS: usize = 30;

/// Layout found for a table plus where its header sits
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedFormat {
    pub spec: FormatSpec,
    /// Source index of the header row; data rows follow it
    pub header_index: usize,
}

impl DetectedFormat {
    /// Rows after the header
    pub fn data_rows<'a>(&self, rows: &'a [RawRow]) -> impl Iterator<Item = &'a RawRow> + 'a {
        let header_index = self.header_index;
        rows.iter().filter(move |r| r.index > header_index)
    }
}

/// Scan the first `scan_rows` rows for a known header
///
/// The first row that matches any layout wins. Column positions come from
/// where the header tokens sit, so column order may vary between exports.
pub fn detect_format(rows: &[RawRow], scan_rows: usize) -> Result<DetectedFormat, FormatError> {
    if rows.is_empty() {
        return Err(FormatError::EmptyTable);
    }

    let window = rows.iter().take(scan_rows);
    for row in window {
        let tokens: Vec<String> = row
            .cells
            .iter()
            .map(|c| c.as_text().map(|t| fold(&t)).unwrap_or_default())
            .collect();

        if let Some(columns) = match_standard(&tokens) {
            return Ok(DetectedFormat {
                spec: FormatSpec::new(FormatKind::Standard, columns),
                header_index: row.index,
            });
        }

        if let Some(columns) = match_processor_x(&tokens) {
            return Ok(DetectedFormat {
                spec: FormatSpec::new(FormatKind::ProcessorX, columns),
                header_index: row.index,
            });
        }
    }

    Err(FormatError::UnrecognizedLayout {
        scanned: rows.len().min(scan_rows),
    })
}

/// First column satisfying `pred` that is not already taken
fn find(tokens: &[String], taken: &[usize], pred: impl Fn(&str) -> bool) -> Option<usize> {
    tokens
        .iter()
        .enumerate()
        .find(|(i, t)| !t.is_empty() && !taken.contains(i) && pred(t))
        .map(|(i, _)| i)
}

fn match_standard(tokens: &[String]) -> Option<ColumnMap> {
    let date = find(tokens, &[], |t| t.starts_with("data"))?;
    let description = find(tokens, &[date], |t| t.contains("descri") || t.contains("histor"))?;
    let credit = find(tokens, &[date, description], |t| t.contains("credit"))?;
    let debit = find(tokens, &[date, description, credit], |t| t.contains("debit"));

    Some(ColumnMap {
        date,
        description,
        credit: Some(credit),
        debit,
        ..Default::default()
    })
}

fn match_processor_x(tokens: &[String]) -> Option<ColumnMap> {
    let date = find(tokens, &[], |t| t == "data")?;
    let description = find(tokens, &[date], |t| t == "transacao")?;
    let kind = find(tokens, &[date, description], |t| t == "tipo" || t.starts_with("tipo "))?;
    let amount = find(tokens, &[date, description, kind], |t| t == "valor")?;

    Some(ColumnMap {
        date,
        description,
        kind: Some(kind),
        amount: Some(amount),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{rows_from_grid, RawCell};

    fn grid(rows: &[&[&str]]) -> Vec<RawRow> {
        rows_from_grid(
            rows.iter()
                .map(|r| r.iter().map(|c| RawCell::from(*c)).collect())
                .collect(),
        )
    }

    #[test]
    fn test_detects_standard_after_preamble() {
        let rows = grid(&[
            &["Banco Exemplo S.A."],
            &["Extrato de conta corrente", "", "Agência 0001"],
            &[],
            &["Data", "Histórico", "Documento", "Crédito (R$)", "Débito (R$)", "Saldo"],
            &["01/02/2025", "PIX RECEBIDO", "123", "150,50", "", "1.150,50"],
        ]);

        let detected = detect_format(&rows, DEFAULT_SCAN_ROWS).unwrap();
        assert_eq!(detected.header_index, 3);
        assert_eq!(detected.spec.kind, FormatKind::Standard);
        assert_eq!(detected.spec.columns.date, 0);
        assert_eq!(detected.spec.columns.description, 1);
        assert_eq!(detected.spec.columns.credit, Some(3));
        assert_eq!(detected.spec.columns.debit, Some(4));
        assert_eq!(detected.data_rows(&rows).count(), 1);
    }

    #[test]
    fn test_standard_columns_follow_header_positions() {
        let rows = grid(&[&["Débito", "Crédito", "Descrição", "Data Lançamento"]]);
        let detected = detect_format(&rows, DEFAULT_SCAN_ROWS).unwrap();
        let columns = detected.spec.columns;
        assert_eq!(columns.date, 3);
        assert_eq!(columns.description, 2);
        assert_eq!(columns.credit, Some(1));
        assert_eq!(columns.debit, Some(0));
    }

    #[test]
    fn test_standard_without_debit_column() {
        let rows = grid(&[&["Data", "Descrição", "Crédito"]]);
        let detected = detect_format(&rows, DEFAULT_SCAN_ROWS).unwrap();
        assert_eq!(detected.spec.kind, FormatKind::Standard);
        assert_eq!(detected.spec.columns.debit, None);
    }

    #[test]
    fn test_detects_processor_x() {
        let rows = grid(&[
            &["Relatório de vendas"],
            &["Valor", "Tipo", "Data", "Transação", "ID"],
            &["89,90", "Crédito", "2025-01-10", "Venda cartão", "abc"],
        ]);
        let detected = detect_format(&rows, DEFAULT_SCAN_ROWS).unwrap();
        assert_eq!(detected.header_index, 1);
        assert_eq!(detected.spec.kind, FormatKind::ProcessorX);
        let columns = detected.spec.columns;
        assert_eq!(columns.amount, Some(0));
        assert_eq!(columns.kind, Some(1));
        assert_eq!(columns.date, 2);
        assert_eq!(columns.description, 3);
        assert_eq!(columns.credit, None);
    }

    #[test]
    fn test_processor_x_requires_distinct_exact_tokens() {
        let rows = grid(&[&["Data", "Transação", "Valor"]]);
        assert!(detect_format(&rows, DEFAULT_SCAN_ROWS).is_err());
    }

    #[test]
    fn test_unrecognized_layout_fails_with_both_layouts() {
        let mut raw: Vec<&[&str]> = Vec::new();
        raw.push(&["Date", "Payee", "Amount"]);
        for _ in 0..40 {
            raw.push(&["2025-01-01", "Coffee", "3.50"]);
        }
        let rows = grid(&raw);

        let err = detect_format(&rows, DEFAULT_SCAN_ROWS).unwrap_err();
        assert_eq!(err, FormatError::UnrecognizedLayout { scanned: 30 });
        let msg = err.to_string();
        assert!(msg.contains("STANDARD"));
        assert!(msg.contains("PROCESSOR_X"));
    }

    #[test]
    fn test_header_outside_scan_window_is_not_found() {
        let mut raw: Vec<&[&str]> = Vec::new();
        for _ in 0..5 {
            raw.push(&["preamble"]);
        }
        raw.push(&["Data", "Descrição", "Crédito", "Débito"]);
        let rows = grid(&raw);

        assert!(detect_format(&rows, 5).is_err());
        assert!(detect_format(&rows, 6).is_ok());
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(detect_format(&[], DEFAULT_SCAN_ROWS), Err(FormatError::EmptyTable));
    }
}
