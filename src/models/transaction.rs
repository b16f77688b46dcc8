//! Transaction model
//!
//! A single amount on a single account. Imported bank lines and
//! verification entries are both transactions; a transaction becomes booked
//! when it carries a verification id.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::ids::VerificationId;
use super::money::Money;

/// A ledger transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Account number the amount is booked on
    pub account: String,

    /// Amount (positive debit, negative credit)
    pub amount: Money,

    /// Transaction date; drafts may leave it unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,

    /// Description; empty means missing
    #[serde(default)]
    pub description: String,

    /// Verification this transaction is booked in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_id: Option<VerificationId>,
}

/// The dedup key: two transactions with equal keys are the same transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionKey<'a> {
    pub date: Option<NaiveDate>,
    pub amount: Money,
    pub description: &'a str,
    pub account: &'a str,
}

impl Transaction {
    /// Create a dated transaction
    pub fn new(
        account: impl Into<String>,
        amount: Money,
        date: NaiveDate,
        description: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            amount,
            date: Some(date),
            description: description.into(),
            verification_id: None,
        }
    }

    /// Create an undated draft entry, as used in verification templates
    pub fn entry(account: impl Into<String>, amount: Money) -> Self {
        Self {
            account: account.into(),
            amount,
            date: None,
            description: String::new(),
            verification_id: None,
        }
    }

    /// Check if this transaction is booked in a verification
    pub fn is_booked(&self) -> bool {
        self.verification_id.is_some()
    }

    /// The (date, amount, description, account) dedup key
    pub fn key(&self) -> TransactionKey<'_> {
        TransactionKey {
            date: self.date,
            amount: self.amount,
            description: &self.description,
            account: &self.account,
        }
    }

    /// Check if two transactions are the same by the dedup key
    pub fn same_as(&self, other: &Transaction) -> bool {
        self.key() == other.key()
    }

    /// Log order: date ascending, then description; amount never participates
    pub fn log_order(&self, other: &Transaction) -> Ordering {
        self.date
            .cmp(&other.date)
            .then_with(|| self.description.cmp(&other.description))
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = self
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "----------".to_string());
        write!(
            f,
            "{} {} {} {}",
            date, self.account, self.amount, self.description
        )
    }
}
