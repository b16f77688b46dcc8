//! CLI command handlers
//!
//! This module contains the implementation of CLI commands, bridging the
//! clap argument parsing with the service layer. Every command that changes
//! the ledger runs through a [`Session`]: load, mutate in memory, validate,
//! and only then write.

pub mod autobook;
pub mod import;
pub mod ledger;

pub use autobook::handle_autobook_command;
pub use import::{handle_import_command, handle_verify_command};
pub use ledger::{
    handle_accounts_command, handle_amount_command, handle_audit_command,
    handle_rollover_command, handle_validate_command, handle_verifications_command,
};

use std::collections::HashMap;

use crate::audit::{AuditEntry, AuditLogger};
use crate::config::{LedgerPaths, Settings};
use crate::display::format_validation_report;
use crate::error::{LedgerError, LedgerResult};
use crate::models::VerificationId;
use crate::services::validation::{validate, ValidationMode};
use crate::services::verification::VerificationService;
use crate::storage::{LedgerStore, Storage};

/// One run against the ledger
pub struct Session {
    pub storage: Storage,
    pub settings: Settings,
    pub store: LedgerStore,
    audit: Vec<AuditEntry>,
}

impl Session {
    /// Load the ledger
    pub fn open(paths: LedgerPaths, settings: Settings) -> LedgerResult<Self> {
        let storage = Storage::new(paths)?;
        let store = storage.load()?;
        Ok(Self {
            storage,
            settings,
            store,
            audit: Vec::new(),
        })
    }

    /// Queue an audit entry, written only if the run is committed
    pub fn record(&mut self, entry: AuditEntry) {
        self.audit.push(entry);
    }

    /// Verification service for the configured series
    pub fn verifications(&mut self) -> VerificationService<'_> {
        VerificationService::new(&mut self.store, self.settings.series)
    }

    /// Renumber a batch created in this run and queue audit entries for it
    pub fn settle_batch(&mut self, created: &[VerificationId]) -> LedgerResult<()> {
        if created.is_empty() {
            return Ok(());
        }

        let mapping = self.verifications().renumber(created)?;
        let renamed: HashMap<VerificationId, VerificationId> = mapping.iter().copied().collect();

        if mapping.iter().any(|(old, new)| old != new) {
            self.record(AuditEntry::renumbered(&mapping));
        }
        for id in created {
            let current = renamed.get(id).copied().unwrap_or(*id);
            if let Some(verification) = self.store.verification(current) {
                let entry = AuditEntry::verification_created(verification);
                self.audit.push(entry);
            }
        }
        Ok(())
    }

    /// Validate and, when asked to and the ledger is clean, save
    ///
    /// Returns whether the files were written.
    pub fn finish(self, commit: bool) -> LedgerResult<bool> {
        if !self.store.is_changed() {
            println!("No changes.");
            return Ok(false);
        }

        let report = validate(&self.store, ValidationMode::Verbose);
        if !report.is_valid() {
            print!("{}", format_validation_report(&report));
            return Err(LedgerError::Validation(format!(
                "{} violation(s), nothing saved",
                report.violations.len()
            )));
        }

        if !commit {
            println!("Dry run, nothing saved. Re-run with --commit to save.");
            return Ok(false);
        }

        self.storage.save(&self.store)?;
        AuditLogger::new(self.storage.paths().audit_log()).log_batch(&self.audit)?;
        println!("Saved.");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Money, NewVerification, Transaction};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn session(temp_dir: &TempDir) -> Session {
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        Session::open(paths, Settings::default()).unwrap()
    }

    fn fee(day: u32) -> NewVerification {
        NewVerification::new("Bank fee")
            .on(NaiveDate::from_ymd_opt(2023, 3, day).unwrap())
            .entry(Transaction::entry("1930", Money::from_cents(-100)))
            .entry(Transaction::entry("6570", Money::zero()))
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session(&temp_dir);
        session.verifications().create(fee(1)).unwrap();

        assert!(!session.finish(false).unwrap());
        assert!(!temp_dir.path().join("data").join("ledger.jsonl").exists());
    }

    #[test]
    fn test_commit_writes_ledger_and_audit() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session(&temp_dir);
        let id = session.verifications().create(fee(1)).unwrap();
        session.settle_batch(&[id]).unwrap();

        assert!(session.finish(true).unwrap());

        let reloaded = self::session(&temp_dir);
        assert_eq!(reloaded.store.verifications().len(), 1);
        let audit = AuditLogger::new(temp_dir.path().join("audit.log"))
            .read_all()
            .unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].entity_id, "A1");
    }

    #[test]
    fn test_settle_batch_renumbers() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session(&temp_dir);
        let late = session.verifications().create(fee(20)).unwrap();
        let early = session.verifications().create(fee(5)).unwrap();

        session.settle_batch(&[late, early]).unwrap();

        let first = &session.store.verifications()[0];
        assert_eq!(first.id, VerificationId::new('A', 1));
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2023, 3, 5).unwrap());
        assert_eq!(session.audit.len(), 3);
    }

    #[test]
    fn test_violations_block_commit() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session(&temp_dir);
        session.store.ensure_account("1930").balance = Money::from_cents(1);

        let err = session.finish(true).unwrap_err();
        assert!(err.is_validation());
        assert!(!temp_dir.path().join("data").join("ledger.jsonl").exists());
    }
}
