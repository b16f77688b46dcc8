//! bokfor - double-entry bookkeeping from the command line
//!
//! This library keeps a double-entry ledger consistent: it merges bank
//! statements into a sorted transaction log without duplicates, builds
//! balanced verifications (by hand or from autobook rules), renumbers them
//! into date order and validates the whole ledger before anything is saved.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Core data models (money, accounts, transactions, verifications)
//! - `storage`: In-memory ledger and JSON-lines file storage
//! - `services`: Merge, verification building, autobook, validation, rollover
//! - `audit`: Audit logging system
//! - `display`: Terminal output formatting
//! - `cli`: Command handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use bokfor_cli::config::{LedgerPaths, Settings};
//! use bokfor_cli::storage::Storage;
//!
//! let paths = LedgerPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let store = Storage::new(paths)?.load()?;
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{LedgerError, LedgerResult};
