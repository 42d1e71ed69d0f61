//! Value normalizer - locale-formatted amounts to decimals

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::domain::RawCell;

/// Parse a cell into a signed decimal, or `None` when it carries no amount
///
/// Numeric cells pass through untouched. Text is read in the Brazilian
/// convention: `.` groups thousands and `,` is the decimal separator.
/// `""`, `"0"` and `"0,00"` mean "not this column".
pub fn normalize_value(cell: &RawCell) -> Option<Decimal> {
    match cell {
        RawCell::Number(n) => Decimal::try_from(*n).ok(),
        RawCell::Text(s) => parse_text(s),
        RawCell::Empty | RawCell::Date(_) | RawCell::DateTime(_) => None,
    }
}

fn parse_text(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if matches!(trimmed, "" | "0" | "0,00") {
        return None;
    }

    let unprefixed = trimmed
        .strip_prefix("R$")
        .or_else(|| trimmed.strip_prefix('$'))
        .unwrap_or(trimmed);

    let cleaned: String = unprefixed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    Decimal::from_str(&cleaned).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RawCell {
        RawCell::Text(s.to_string())
    }

    #[test]
    fn test_numeric_passes_through() {
        assert_eq!(
            normalize_value(&RawCell::Number(150.5)),
            Some(Decimal::new(1505, 1))
        );
        assert_eq!(normalize_value(&RawCell::Number(0.0)), Some(Decimal::ZERO));
        assert_eq!(normalize_value(&RawCell::Number(f64::NAN)), None);
    }

    #[test]
    fn test_placeholders_are_none() {
        assert_eq!(normalize_value(&text("")), None);
        assert_eq!(normalize_value(&text("0")), None);
        assert_eq!(normalize_value(&text("0,00")), None);
        assert_eq!(normalize_value(&text("  ")), None);
        assert_eq!(normalize_value(&RawCell::Empty), None);
    }

    #[test]
    fn test_brazilian_format() {
        assert_eq!(normalize_value(&text("1.234,56")), Some(Decimal::new(123456, 2)));
        assert_eq!(normalize_value(&text("150,50")), Some(Decimal::new(15050, 2)));
        assert_eq!(normalize_value(&text("-42,10")), Some(Decimal::new(-4210, 2)));
        assert_eq!(normalize_value(&text("R$ 2.000,00")), Some(Decimal::new(200000, 2)));
        assert_eq!(normalize_value(&text("1.000.000")), Some(Decimal::new(1000000, 0)));
    }

    #[test]
    fn test_garbage_is_none() {
        assert_eq!(normalize_value(&text("abc")), None);
        assert_eq!(normalize_value(&text("12,34,56")), None);
        assert_eq!(normalize_value(&text("R$")), None);
    }
}
