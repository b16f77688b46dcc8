//! Storage layer for bokfor
//!
//! Provides JSON-lines file storage with atomic writes and automatic
//! directory creation. The whole ledger is loaded into a [`LedgerStore`] at
//! the start of a run and rewritten in full on commit.

pub mod file_io;
pub mod ledger;
pub mod ledger_file;

pub use file_io::{read_jsonl, read_yaml, write_jsonl_atomic};
pub use ledger::LedgerStore;
pub use ledger_file::{LedgerRecord, VerificationRecord};

use std::path::Path;

use crate::config::paths::LedgerPaths;
use crate::error::LedgerResult;
use crate::models::Account;

/// Main storage coordinator for the ledger and transaction log files
pub struct Storage {
    paths: LedgerPaths,
}

impl Storage {
    /// Create a new Storage instance
    pub fn new(paths: LedgerPaths) -> LedgerResult<Self> {
        // Ensure directories exist
        paths.ensure_directories()?;

        Ok(Self { paths })
    }

    /// Get the paths configuration
    pub fn paths(&self) -> &LedgerPaths {
        &self.paths
    }

    /// Load the ledger and the transaction log
    pub fn load(&self) -> LedgerResult<LedgerStore> {
        let records: Vec<LedgerRecord> = read_jsonl(self.paths.ledger_file())?;
        let mut store = ledger_file::load_ledger(records)?;

        let log = read_jsonl(self.paths.transactions_file())?;
        ledger_file::load_transaction_log(&mut store, log)?;

        tracing::debug!(
            accounts = store.accounts().len(),
            verifications = store.verifications().len(),
            transactions = store.log().len(),
            "ledger loaded"
        );
        Ok(store)
    }

    /// Rewrite both files from the store
    ///
    /// Records are built before either file is touched, so a ledger that
    /// cannot be serialized leaves the files as they were.
    pub fn save(&self, store: &LedgerStore) -> LedgerResult<()> {
        let records = ledger_file::ledger_records(store)?;
        let log = ledger_file::log_records(store);

        write_jsonl_atomic(self.paths.ledger_file(), &records)?;
        write_jsonl_atomic(self.paths.transactions_file(), &log)?;

        tracing::info!(
            verifications = store.verifications().len(),
            transactions = log.len(),
            "ledger saved"
        );
        Ok(())
    }

    /// Write an account-only ledger file, as produced by year-end rollover
    pub fn write_accounts(&self, path: &Path, accounts: &[Account]) -> LedgerResult<()> {
        let records: Vec<LedgerRecord> = accounts
            .iter()
            .cloned()
            .map(LedgerRecord::Account)
            .collect();
        write_jsonl_atomic(path, &records)
    }

    /// Check if storage has been initialized (settings file exists)
    pub fn is_initialized(&self) -> bool {
        self.paths.is_initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Money, Transaction};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn storage(temp_dir: &TempDir) -> Storage {
        Storage::new(LedgerPaths::with_base_dir(temp_dir.path().to_path_buf())).unwrap()
    }

    #[test]
    fn test_storage_creation() {
        let temp_dir = TempDir::new().unwrap();
        let storage = storage(&temp_dir);

        assert!(temp_dir.path().join("data").exists());
        assert!(!storage.is_initialized());
    }

    #[test]
    fn test_load_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = storage(&temp_dir).load().unwrap();

        assert!(store.accounts().is_empty());
        assert!(store.log().is_empty());
        assert!(!store.is_changed());
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let storage = storage(&temp_dir);

        let mut store = LedgerStore::new();
        store
            .add_account(Account::new("1930", "Företagskonto"))
            .unwrap();
        let txn = store.add_transaction(Transaction::new(
            "1930",
            Money::from_cents(-10000),
            NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(),
            "fee",
        ));
        store.push_log(txn);

        storage.save(&store).unwrap();
        let loaded = storage.load().unwrap();

        assert_eq!(loaded.accounts().len(), 1);
        assert_eq!(loaded.accounts()[0].name, "Företagskonto");
        assert_eq!(loaded.log().len(), 1);
        assert_eq!(loaded.unbooked().len(), 1);
    }

    #[test]
    fn test_write_accounts() {
        let temp_dir = TempDir::new().unwrap();
        let storage = storage(&temp_dir);
        let path = temp_dir.path().join("next.jsonl");

        storage
            .write_accounts(&path, &[Account::new("1930", "Bank")])
            .unwrap();

        let records: Vec<LedgerRecord> = read_jsonl(&path).unwrap();
        assert_eq!(records.len(), 1);
    }
}
