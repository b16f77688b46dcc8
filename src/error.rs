//! Custom error types for bokfor
//!
//! This module defines the error hierarchy for the ledger using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

use crate::models::Money;

/// The main error type for ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// YAML serialization/deserialization errors
    #[error("YAML error: {0}")]
    Yaml(String),

    /// Numeric text that is not a valid amount
    #[error("Malformed amount: '{0}'")]
    MalformedAmount(String),

    /// Verification entries do not sum to zero
    #[error("Unbalanced verification '{text}': entries sum to {sum}")]
    UnbalancedVerification { text: String, sum: Money },

    /// An entry already belongs to a verification
    #[error("Transaction already booked in verification {verification_id}: {transaction}")]
    AlreadyBooked {
        verification_id: String,
        transaction: String,
    },

    /// The verification id is taken
    #[error("Duplicate verification id: {0}")]
    DuplicateVerificationId(String),

    /// Ordering or duplicate-detection failure in persisted or merged data
    #[error("Ledger corruption: {0}")]
    LedgerCorruption(String),

    /// Renumbering preconditions not met
    #[error("Renumbering error: {0}")]
    Renumber(String),

    /// Validation errors for data models
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Import errors
    #[error("Import error: {0}")]
    Import(String),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Create a "not found" error for accounts
    pub fn account_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Account",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for verifications
    pub fn verification_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Verification",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Errors that only reject a single verification draft.
    ///
    /// Everything else aborts the whole run.
    pub fn is_verification_rejection(&self) -> bool {
        matches!(
            self,
            Self::UnbalancedVerification { .. }
                | Self::AlreadyBooked { .. }
                | Self::DuplicateVerificationId(_)
                | Self::Validation(_)
        )
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<serde_yaml::Error> for LedgerError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err.to_string())
    }
}

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
