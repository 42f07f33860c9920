//! Ledger transaction records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::DomainError;
use super::money::Amount;

/// Longest description accepted on a transaction
pub const MAX_DESCRIPTION_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Interest,
    Penalty,
    Fee,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
            TransactionType::Interest => "INTEREST",
            TransactionType::Penalty => "PENALTY",
            TransactionType::Fee => "FEE",
        }
    }

    /// Whether this kind of entry adds to the balance
    pub fn is_credit(&self) -> bool {
        matches!(self, TransactionType::Deposit | TransactionType::Interest)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" => Ok(TransactionType::Deposit),
            "WITHDRAWAL" => Ok(TransactionType::Withdrawal),
            "INTEREST" => Ok(TransactionType::Interest),
            "PENALTY" => Ok(TransactionType::Penalty),
            "FEE" => Ok(TransactionType::Fee),
            other => Err(DomainError::invalid_argument(format!(
                "Unknown transaction type: {other}"
            ))),
        }
    }
}

/// An appended ledger entry. Never updated after insert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,
    pub amount: Amount,
    pub transaction_type: TransactionType,
    pub description: Option<String>,
    pub reference_number: String,
    pub transaction_date: DateTime<Utc>,
}

/// A ledger entry waiting to be posted; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub account_id: i64,
    pub amount: Amount,
    pub transaction_type: TransactionType,
    pub description: Option<String>,
    pub reference_number: String,
    pub transaction_date: DateTime<Utc>,
}

impl NewTransaction {
    pub fn new(
        account_id: i64,
        amount: Amount,
        transaction_type: TransactionType,
        description: Option<String>,
        reference_number: String,
        transaction_date: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if amount.value() < rust_decimal::Decimal::ONE {
            return Err(DomainError::invalid_argument(
                "Transaction amount must be at least 1",
            ));
        }
        if let Some(text) = &description {
            if text.chars().count() > MAX_DESCRIPTION_LEN {
                return Err(DomainError::invalid_argument(format!(
                    "Description cannot exceed {MAX_DESCRIPTION_LEN} characters"
                )));
            }
        }

        Ok(Self {
            account_id,
            amount,
            transaction_type,
            description,
            reference_number,
            transaction_date,
        })
    }

    pub fn into_transaction(self, id: i64) -> Transaction {
        Transaction {
            id,
            account_id: self.account_id,
            amount: self.amount,
            transaction_type: self.transaction_type,
            description: self.description,
            reference_number: self.reference_number,
            transaction_date: self.transaction_date,
        }
    }
}
