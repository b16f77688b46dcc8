//! Core data models for bokfor
//!
//! This module contains the data structures of the ledger domain: money,
//! accounts, transactions and verifications.

pub mod account;
pub mod ids;
pub mod money;
pub mod transaction;
pub mod verification;

pub use account::{Account, AccountType};
pub use ids::{TxnRef, VerificationId};
pub use money::{Money, MoneyParseError};
pub use transaction::{Transaction, TransactionKey};
pub use verification::{NewVerification, Verification};
