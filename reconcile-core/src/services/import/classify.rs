//! Row classifier - one raw row plus a column mapping to a parsed row

use rust_decimal::Decimal;

use super::date::normalize_date;
use super::text::fold;
use super::value::normalize_value;
use crate::domain::{FormatKind, FormatSpec, ParsedRow, RawCell, RawRow, TransactionType};

const CREDIT_WORDS: &[&str] = &["credit", "entrada", "recebimento"];
const DEBIT_WORDS: &[&str] = &["debit", "saida", "pagamento", "compra"];

/// Result of classifying a single row
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    Row(ParsedRow),
    /// Separator row with nothing in any mapped field
    Blank,
}

/// Classify every row, dropping blank separators
///
/// Returns the parsed rows in source order and the number of blanks dropped.
pub fn classify_rows<'a>(
    rows: impl IntoIterator<Item = &'a RawRow>,
    spec: &FormatSpec,
) -> (Vec<ParsedRow>, usize) {
    let mut parsed = Vec::new();
    let mut blanks = 0;
    for row in rows {
        match classify_row(row, spec) {
            Classified::Row(r) => parsed.push(r),
            Classified::Blank => blanks += 1,
        }
    }
    (parsed, blanks)
}

pub fn classify_row(row: &RawRow, spec: &FormatSpec) -> Classified {
    let columns = &spec.columns;
    let date = normalize_date(row.cell(columns.date));
    let description = description_of(row.cell(columns.description));

    let (kind, amount, ambiguous, has_amount_data) = match spec.kind {
        FormatKind::Standard => standard_amount(row, spec),
        FormatKind::ProcessorX => processor_x_amount(row, spec),
    };

    if date.is_none() && description.is_none() && !has_amount_data {
        return Classified::Blank;
    }

    Classified::Row(ParsedRow::new(
        row.index,
        date,
        description,
        kind,
        amount,
        ambiguous,
    ))
}

fn description_of(cell: &RawCell) -> Option<String> {
    cell.as_text()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Amount read from a column; zero counts as absent
fn amount_of(cell: &RawCell) -> Option<Decimal> {
    normalize_value(cell)
        .filter(|v| !v.is_zero())
        .map(|v| v.abs())
}

type AmountParts = (Option<TransactionType>, Option<Decimal>, bool, bool);

fn standard_amount(row: &RawRow, spec: &FormatSpec) -> AmountParts {
    let credit = amount_of(row.cell_at(spec.columns.credit));
    let debit = amount_of(row.cell_at(spec.columns.debit));

    match (credit, debit) {
        (Some(c), None) => (Some(TransactionType::Credit), Some(c), false, true),
        (None, Some(d)) => (Some(TransactionType::Debit), Some(d), false, true),
        (Some(_), Some(_)) => (None, None, true, true),
        (None, None) => (None, None, false, false),
    }
}

fn processor_x_amount(row: &RawRow, spec: &FormatSpec) -> AmountParts {
    let amount = amount_of(row.cell_at(spec.columns.amount));
    let type_text = row.cell_at(spec.columns.kind).as_text();
    let has_data = amount.is_some() || type_text.as_deref().is_some_and(|t| !t.trim().is_empty());
    let kind = type_text.as_deref().and_then(classify_type);
    (kind, amount, false, has_data)
}

/// Map free-text type labels onto a direction
pub fn classify_type(text: &str) -> Option<TransactionType> {
    let folded = fold(text);
    if folded.is_empty() {
        return None;
    }
    if CREDIT_WORDS.iter().any(|w| folded.contains(w)) {
        Some(TransactionType::Credit)
    } else if DEBIT_WORDS.iter().any(|w| folded.contains(w)) {
        Some(TransactionType::Debit)
    } else {
        None
    }
}
