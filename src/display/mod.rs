//! Terminal output formatting
//!
//! Plain-text tables for accounts, transactions, verifications and
//! validation reports.

pub mod account;
pub mod transaction;
pub mod validation;
pub mod verification;

pub use account::format_account_list;
pub use transaction::format_transaction_list;
pub use validation::format_validation_report;
pub use verification::{format_verification, format_verification_list};
