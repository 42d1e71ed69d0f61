//! Ledger movement domain model

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::row::TransactionType;

/// Where a movement came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementOrigin {
    /// Raw statement lines committed without deduplication
    StatementImport,
    /// Statement lines committed under strict dedup, treated as corrective entries
    ManualAdjustment,
}

impl MovementOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementOrigin::StatementImport => "statement_import",
            MovementOrigin::ManualAdjustment => "manual_adjustment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "statement_import" => Some(MovementOrigin::StatementImport),
            "manual_adjustment" => Some(MovementOrigin::ManualAdjustment),
            _ => None,
        }
    }

    /// Origin tag for a commit, given whether strict dedup was active
    pub fn for_commit(strict_dedup: bool) -> Self {
        if strict_dedup {
            MovementOrigin::ManualAdjustment
        } else {
            MovementOrigin::StatementImport
        }
    }
}

/// A posted credit or debit against an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerMovement {
    pub id: Uuid,
    pub account: String,
    pub date: NaiveDate,
    /// Always non-negative; direction lives in `kind`
    pub amount: Decimal,
    pub description: String,
    pub kind: TransactionType,
    pub origin: MovementOrigin,
    /// Import batch this movement was committed with
    pub batch_id: Option<String>,
    /// Re-import guard, unique per account when present
    pub fingerprint: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LedgerMovement {
    /// Create a new movement with required fields
    pub fn new(
        account: impl Into<String>,
        date: NaiveDate,
        amount: Decimal,
        description: impl Into<String>,
        kind: TransactionType,
        origin: MovementOrigin,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account: account.into(),
            date,
            amount,
            description: description.into(),
            kind,
            origin,
            batch_id: None,
            fingerprint: None,
            created_at: Utc::now(),
        }
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(self.date, self.amount, &self.description)
    }
}

/// The slice of a stored movement the dedup engine compares against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingMovement {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
}

impl ExistingMovement {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(self.date, self.amount, &self.description)
    }
}

impl From<&LedgerMovement> for ExistingMovement {
    fn from(m: &LedgerMovement) -> Self {
        Self {
            date: m.date,
            amount: m.amount,
            description: m.description.clone(),
        }
    }
}

/// (date, amount to the cent, lowercased trimmed description)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupKey {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
}

impl DedupKey {
    pub fn new(date: NaiveDate, amount: Decimal, description: &str) -> Self {
        Self {
            date,
            // normalize() drops trailing zeros so 10.5 and 10.50 hash alike
            amount: amount.abs().round_dp(2).normalize(),
            description: normalize_description(description),
        }
    }

    /// Stable hash of the key for an account, distinguishing the n-th
    /// identical line within one statement
    pub fn fingerprint(&self, account: &str, occurrence: usize) -> String {
        let input = format!(
            "{}|{}|{:.2}|{}|{}",
            account, self.date, self.amount, self.description, occurrence
        );

        let mut hasher = Sha256::new();
        hasher.update(input.as_bytes());
        let result = hasher.finalize();

        // 16 hex chars
        hex::encode(&result[..8])
    }
}

/// Lowercase and trim a description for comparison
pub fn normalize_description(description: &str) -> String {
    description.trim().to_lowercase()
}
