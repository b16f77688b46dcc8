//! Verification model
//!
//! A verification groups the entries of one accounting event. Its entries
//! must sum to exactly zero.

use chrono::NaiveDate;
use std::fmt;

use super::ids::{TxnRef, VerificationId};
use super::transaction::Transaction;

/// A booked verification
#[derive(Debug, Clone)]
pub struct Verification {
    /// Series letter plus sequence number
    pub id: VerificationId,

    /// Posting date
    pub date: NaiveDate,

    /// Verification text
    pub text: String,

    /// Date the verification was registered in the ledger
    pub registered_date: Option<NaiveDate>,

    /// Entries, in the order they were given
    pub entries: Vec<TxnRef>,
}

impl Verification {
    /// Sort key used for the verification list: date, then id
    pub fn sort_key(&self) -> (NaiveDate, VerificationId) {
        (self.date, self.id)
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.id,
            self.date.format("%Y-%m-%d"),
            self.text
        )
    }
}

/// A proposed verification, before balancing and numbering
#[derive(Debug, Clone, Default)]
pub struct NewVerification {
    /// Explicit posting date; defaults to the first dated entry
    pub date: Option<NaiveDate>,

    /// Verification text
    pub text: String,

    /// Proposed entries; at most one may be a zero-amount placeholder
    pub entries: Vec<Transaction>,
}

impl NewVerification {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            date: None,
            text: text.into(),
            entries: Vec::new(),
        }
    }

    /// Set the posting date
    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Add an entry
    pub fn entry(mut self, entry: Transaction) -> Self {
        self.entries.push(entry);
        self
    }
}
