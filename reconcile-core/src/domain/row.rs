//! Canonical transaction rows produced by the classifier

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Credit,
    Debit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Credit => "CREDIT",
            TransactionType::Debit => "DEBIT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "CREDIT" => Some(TransactionType::Credit),
            "DEBIT" => Some(TransactionType::Debit),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a row cannot be committed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowIssue {
    /// One or more of date, description, amount or type is missing
    Incomplete,
    /// Both credit and debit columns carry a value
    AmbiguousAmount,
}

impl RowIssue {
    pub fn message(&self) -> &'static str {
        match self {
            RowIssue::Incomplete => "incomplete row",
            RowIssue::AmbiguousAmount => "both credit and debit populated",
        }
    }
}

impl std::fmt::Display for RowIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// One normalized statement line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedRow {
    /// Position of the originating row in the source table
    pub source_index: usize,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub credit: Option<Decimal>,
    pub debit: Option<Decimal>,
    pub transaction_type: Option<TransactionType>,
    /// Mirrors whichever of credit/debit is set
    pub amount: Option<Decimal>,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<RowIssue>,
    pub is_selected: bool,
}

impl ParsedRow {
    /// Assemble a row and derive validity from its fields
    ///
    /// `credit` and `debit` must already be resolved so that at most one is
    /// set; `ambiguous` records that both were populated in the source.
    pub fn new(
        source_index: usize,
        date: Option<NaiveDate>,
        description: Option<String>,
        transaction_type: Option<TransactionType>,
        amount: Option<Decimal>,
        ambiguous: bool,
    ) -> Self {
        let (credit, debit, transaction_type, amount) = match (transaction_type, amount) {
            (Some(TransactionType::Credit), Some(a)) => {
                (Some(a), None, Some(TransactionType::Credit), Some(a))
            }
            (Some(TransactionType::Debit), Some(a)) => {
                (None, Some(a), Some(TransactionType::Debit), Some(a))
            }
            _ => (None, None, None, None),
        };

        let is_valid = date.is_some() && description.is_some() && amount.is_some();
        let validation_error = if is_valid {
            None
        } else if ambiguous {
            Some(RowIssue::AmbiguousAmount)
        } else {
            Some(RowIssue::Incomplete)
        };

        Self {
            source_index,
            date,
            description,
            credit,
            debit,
            transaction_type,
            amount,
            is_valid,
            validation_error,
            is_selected: is_valid,
        }
    }

    /// Signed view of the amount: credits positive, debits negative
    pub fn signed_amount(&self) -> Option<Decimal> {
        match (self.transaction_type, self.amount) {
            (Some(TransactionType::Credit), Some(a)) => Some(a),
            (Some(TransactionType::Debit), Some(a)) => Some(-a),
            _ => None,
        }
    }

    /// Row that may be handed to the commit stage
    pub fn is_committable(&self) -> bool {
        self.is_valid && self.is_selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2025, 2, 28)
    }

    #[test]
    fn test_valid_credit_row() {
        let row = ParsedRow::new(
            3,
            date(),
            Some("PIX RECEBIDO".to_string()),
            Some(TransactionType::Credit),
            Some(Decimal::new(15050, 2)),
            false,
        );
        assert!(row.is_valid);
        assert!(row.is_selected);
        assert_eq!(row.credit, Some(Decimal::new(15050, 2)));
        assert_eq!(row.debit, None);
        assert_eq!(row.amount, row.credit);
        assert!(row.validation_error.is_none());
    }

    #[test]
    fn test_missing_type_clears_amount() {
        let row = ParsedRow::new(
            1,
            date(),
            Some("TARIFA".to_string()),
            None,
            Some(Decimal::ONE),
            false,
        );
        assert!(!row.is_valid);
        assert!(!row.is_selected);
        assert_eq!(row.amount, None);
        assert_eq!(row.validation_error, Some(RowIssue::Incomplete));
    }

    #[test]
    fn test_ambiguous_reason_is_distinct() {
        let row = ParsedRow::new(2, date(), Some("X".to_string()), None, None, true);
        assert_eq!(row.validation_error, Some(RowIssue::AmbiguousAmount));
        assert_eq!(row.validation_error.unwrap().message(), "both credit and debit populated");
    }

    #[test]
    fn test_signed_amount() {
        let row = ParsedRow::new(
            0,
            date(),
            Some("BOLETO".to_string()),
            Some(TransactionType::Debit),
            Some(Decimal::new(990, 2)),
            false,
        );
        assert_eq!(row.signed_amount(), Some(Decimal::new(-990, 2)));
    }
}
