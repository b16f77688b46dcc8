//! Strongly-typed identifiers
//!
//! Verification ids are a series letter plus a sequence number. Transactions
//! are referenced by arena handles so the log, the owning account and the
//! verification all point at the same logical transaction.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Identity of a verification: series letter plus sequence number ("A12")
///
/// Ordering is by series, then number, never by the textual form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VerificationId {
    pub series: char,
    pub number: u32,
}

impl VerificationId {
    pub const fn new(series: char, number: u32) -> Self {
        Self { series, number }
    }

    /// Same series, different number
    pub const fn with_number(&self, number: u32) -> Self {
        Self {
            series: self.series,
            number,
        }
    }
}

impl fmt::Display for VerificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.series, self.number)
    }
}

/// Error returned when a verification id string is malformed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationIdParseError(pub String);

impl fmt::Display for VerificationIdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid verification id: {}", self.0)
    }
}

impl std::error::Error for VerificationIdParseError {}

impl FromStr for VerificationId {
    type Err = VerificationIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let series = chars
            .next()
            .filter(|c| c.is_ascii_alphabetic())
            .ok_or_else(|| VerificationIdParseError(s.to_string()))?;
        let number = chars
            .as_str()
            .parse::<u32>()
            .map_err(|_| VerificationIdParseError(s.to_string()))?;
        Ok(Self { series, number })
    }
}

impl Serialize for VerificationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VerificationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Handle to a transaction stored in the ledger arena
///
/// Two handles are equal exactly when they refer to the same object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxnRef(pub(crate) usize);

impl TxnRef {
    pub fn index(&self) -> usize {
        self.0
    }
}
