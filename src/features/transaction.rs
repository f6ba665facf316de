use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Awaiting an administrator decision. No balance effect yet.
    Pending,

    /// The balance effect has been applied, exactly once. Terminal.
    Approved,

    /// Explicitly declined by an administrator. Terminal, no balance effect.
    Rejected,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// A credit to the user's balance, applied when an administrator approves it
    Deposit,

    /// A debit from the user's balance, applied when an administrator approves it.
    /// Carries the destination account the funds should be paid out to
    Withdrawal,
}

#[derive(Error, Debug)]
#[error("Unknown transaction type - {0}")]
pub struct UnknownTransactionType(pub String);

impl FromStr for TransactionKind {
    type Err = UnknownTransactionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "withdrawal" => Ok(Self::Withdrawal),
            other => Err(UnknownTransactionType(other.to_string())),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deposit => f.write_str("deposit"),
            Self::Withdrawal => f.write_str("withdrawal"),
        }
    }
}

/// A single deposit or withdrawal request. Created Pending; mutated only by
/// the approval engine; never deleted.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Transaction {
    pub id: TransactionId,

    pub created_at: DateTime<Utc>,

    pub amount: Decimal,

    /// Free-form payment method, e.g. "card" or "bank-transfer"
    pub method: String,

    pub status: TransactionStatus,

    /// Destination account for withdrawals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

impl Transaction {
    pub(crate) fn pending(amount: Decimal, method: &str, destination: Option<&str>) -> Self {
        Self {
            id: TransactionId::generate(),
            created_at: Utc::now(),
            amount,
            method: method.to_string(),
            status: TransactionStatus::Pending,
            destination: destination.map(str::to_string),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    #[test_case("deposit", TransactionKind::Deposit)]
    #[test_case("withdrawal", TransactionKind::Withdrawal)]
    fn parse_known_kind(input: &str, want: TransactionKind) {
        assert_eq!(want, input.parse::<TransactionKind>().unwrap());
    }

    #[test_case("Deposit")]
    #[test_case("transfer")]
    #[test_case("")]
    fn parse_unknown_kind(input: &str) {
        let err = input.parse::<TransactionKind>().unwrap_err();
        assert_eq!(input, err.0);
    }

    #[test]
    fn new_transaction_starts_pending() {
        let tx = Transaction::pending(dec!(25), "card", None);
        assert!(tx.is_pending());
        assert_eq!(dec!(25), tx.amount);
        assert_eq!(None, tx.destination);

        let other = Transaction::pending(dec!(10), "bank-transfer", Some("NL91ABNA0417164300"));
        assert_eq!(Some("NL91ABNA0417164300".to_string()), other.destination);
        assert_ne!(tx.id, other.id);
    }
}
