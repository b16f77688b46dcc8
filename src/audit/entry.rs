//! Audit entry data structures
//!
//! Defines the structure of audit log entries: what was committed to the
//! ledger, when, and a short summary of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Verification, VerificationId};

/// Types of operations that can be audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// A verification was booked
    Create,
    /// Imported transactions were merged into the log
    Merge,
    /// Verifications were renumbered
    Renumber,
    /// A new year's ledger was written
    Rollover,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "CREATE"),
            Operation::Merge => write!(f, "MERGE"),
            Operation::Renumber => write!(f, "RENUMBER"),
            Operation::Rollover => write!(f, "ROLLOVER"),
        }
    }
}

/// Types of entities that can be audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Verification,
    TransactionLog,
    Ledger,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityType::Verification => write!(f, "Verification"),
            EntityType::TransactionLog => write!(f, "TransactionLog"),
            EntityType::Ledger => write!(f, "Ledger"),
        }
    }
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the change was committed (UTC)
    pub timestamp: DateTime<Utc>,

    /// Type of operation performed
    pub operation: Operation,

    /// Type of entity affected
    pub entity_type: EntityType,

    /// ID of the affected entity (verification id, file name)
    pub entity_id: String,

    /// Human-readable summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// JSON details of the change
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AuditEntry {
    /// Create a new audit entry stamped with the current time
    pub fn new(operation: Operation, entity_type: EntityType, entity_id: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            entity_type,
            entity_id: entity_id.into(),
            summary: None,
            details: None,
        }
    }

    /// Attach a summary
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Attach serialized details
    pub fn with_details<T: Serialize>(mut self, details: &T) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }

    /// A verification was booked
    pub fn verification_created(verification: &Verification) -> Self {
        Self::new(
            Operation::Create,
            EntityType::Verification,
            verification.id.to_string(),
        )
        .with_summary(format!(
            "{} {} ({} entries)",
            verification.date.format("%Y-%m-%d"),
            verification.text,
            verification.entries.len()
        ))
    }

    /// Transactions from a file were merged into the log
    pub fn transactions_merged(source: &str, added: usize, duplicates: usize) -> Self {
        Self::new(Operation::Merge, EntityType::TransactionLog, source)
            .with_summary(format!("{} added, {} already present", added, duplicates))
    }

    /// Verifications were renumbered
    pub fn renumbered(mapping: &[(VerificationId, VerificationId)]) -> Self {
        let moved: Vec<(String, String)> = mapping
            .iter()
            .filter(|(old, new)| old != new)
            .map(|(old, new)| (old.to_string(), new.to_string()))
            .collect();
        let id = mapping
            .first()
            .map(|(_, new)| new.series.to_string())
            .unwrap_or_default();

        Self::new(Operation::Renumber, EntityType::Verification, id)
            .with_summary(format!("{} verifications moved", moved.len()))
            .with_details(&moved)
    }

    /// A new year's ledger was written
    pub fn rolled_over(output: &str, accounts: usize) -> Self {
        Self::new(Operation::Rollover, EntityType::Ledger, output)
            .with_summary(format!("{} accounts", accounts))
    }

    /// Format the entry for human-readable output
    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] {} {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.operation,
            self.entity_type,
            self.entity_id
        );

        if let Some(summary) = &self.summary {
            output.push_str(&format!(" ({})", summary));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::Create.to_string(), "CREATE");
        assert_eq!(Operation::Renumber.to_string(), "RENUMBER");
    }

    #[test]
    fn test_verification_created() {
        let verification = Verification {
            id: VerificationId::new('A', 4),
            date: NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(),
            text: "Bank fee".into(),
            registered_date: None,
            entries: Vec::new(),
        };
        let entry = AuditEntry::verification_created(&verification);

        assert_eq!(entry.operation, Operation::Create);
        assert_eq!(entry.entity_id, "A4");
        assert_eq!(
            entry.summary.as_deref(),
            Some("2023-03-01 Bank fee (0 entries)")
        );
    }

    #[test]
    fn test_renumbered_lists_moves_only() {
        let a = |n| VerificationId::new('A', n);
        let entry = AuditEntry::renumbered(&[(a(3), a(1)), (a(1), a(2)), (a(2), a(2))]);

        assert_eq!(entry.summary.as_deref(), Some("2 verifications moved"));
        let details = entry.details.unwrap();
        assert_eq!(details.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_serialization() {
        let entry = AuditEntry::transactions_merged("bank.csv", 3, 1);

        let json = serde_json::to_string(&entry).unwrap();
        let deserialized: AuditEntry = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.operation, Operation::Merge);
        assert_eq!(deserialized.entity_type, EntityType::TransactionLog);
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_human_readable_format() {
        let entry = AuditEntry::rolled_over("2024.jsonl", 12);

        let formatted = entry.format_human_readable();
        assert!(formatted.contains("ROLLOVER"));
        assert!(formatted.contains("Ledger"));
        assert!(formatted.contains("2024.jsonl"));
        assert!(formatted.contains("12 accounts"));
    }
}
