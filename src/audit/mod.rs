//! Audit logging for bokfor
//!
//! Records every committed ledger change in an append-only audit log.
//!
//! - `AuditEntry`: a single entry with timestamp, operation, entity and a
//!   short summary.
//! - `AuditLogger`: appends entries to the log file as JSON lines.
//!
//! # Example
//!
//! ```rust,ignore
//! use bokfor_cli::audit::{AuditEntry, AuditLogger};
//!
//! let logger = AuditLogger::new(paths.audit_log());
//! logger.log(&AuditEntry::transactions_merged("bank.csv", 12, 3))?;
//! ```

mod entry;
mod logger;

pub use entry::{AuditEntry, EntityType, Operation};
pub use logger::AuditLogger;
