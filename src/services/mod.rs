//! Service layer for bokfor
//!
//! The service layer provides the ledger operations on top of the in-memory
//! store: merging imported transactions, building and renumbering
//! verifications, rule-based booking, validation and year-end rollover.

pub mod autobook;
pub mod import;
pub mod merge;
pub mod rollover;
pub mod validation;
pub mod verification;

pub use autobook::{AutobookEngine, AutobookReport};
pub use import::{ImportResult, VerificationImportResult};
pub use merge::{merge, MergeResult};
pub use rollover::{rollover, Rollover};
pub use validation::{validate, ValidationMode, ValidationReport, Violation};
pub use verification::VerificationService;
