//! Ledger inspection CLI commands
//!
//! Listing, validation, year-end rollover and the audit trail.

use std::path::Path;

use crate::audit::{AuditEntry, AuditLogger};
use crate::config::{LedgerPaths, Settings};
use crate::display::{
    format_account_list, format_validation_report, format_verification_list,
};
use crate::error::{LedgerError, LedgerResult};
use crate::models::Money;
use crate::services::rollover::rollover;
use crate::services::validation::{validate, ValidationMode};
use crate::storage::Storage;

/// Handle the accounts command
pub fn handle_accounts_command(storage: &Storage) -> LedgerResult<()> {
    let store = storage.load()?;
    println!("{}", format_account_list(store.accounts()));
    Ok(())
}

/// Handle the verifications command
///
/// With a limit, only the most recent verifications are shown.
pub fn handle_verifications_command(storage: &Storage, limit: Option<usize>) -> LedgerResult<()> {
    let store = storage.load()?;
    let all = store.verifications();
    let skip = limit.map_or(0, |n| all.len().saturating_sub(n));
    print!("{}", format_verification_list(&store, &all[skip..]));
    Ok(())
}

/// Handle the validate command
pub fn handle_validate_command(storage: &Storage, fail_fast: bool) -> LedgerResult<()> {
    let store = storage.load()?;
    let mode = if fail_fast {
        ValidationMode::FailFast
    } else {
        ValidationMode::Verbose
    };

    let report = validate(&store, mode);
    println!("{}", format_validation_report(&report).trim_end());

    if report.is_valid() {
        Ok(())
    } else {
        Err(LedgerError::Validation(format!(
            "{} violation(s) found",
            report.violations.len()
        )))
    }
}

/// Handle the rollover command
///
/// Writes next year's opening ledger to `output`; the current ledger is left
/// untouched.
pub fn handle_rollover_command(
    storage: &Storage,
    settings: &Settings,
    output: &Path,
) -> LedgerResult<()> {
    if output.exists() {
        return Err(LedgerError::Storage(format!(
            "Refusing to overwrite {}",
            output.display()
        )));
    }

    let store = storage.load()?;
    let result = rollover(&store)?;
    storage.write_accounts(output, &result.accounts)?;

    let audit = AuditLogger::new(storage.paths().audit_log());
    audit.log(&AuditEntry::rolled_over(
        &output.display().to_string(),
        result.accounts.len(),
    ))?;

    println!(
        "Wrote {} account(s) to {} ({} with an opening balance)",
        result.accounts.len(),
        output.display(),
        result.carried
    );
    if !result.unclosed_result.is_zero() {
        println!(
            "Warning: opening balances sum to {}; the year's result is not closed",
            result.unclosed_result.format_with_symbol(&settings.currency_symbol)
        );
    }
    Ok(())
}

/// Handle the amount command
pub fn handle_amount_command(text: &str, decimal: char, settings: &Settings) -> LedgerResult<()> {
    let amount = Money::parse_with_separator(text, decimal)?;
    println!(
        "{}  ({} hundredths)",
        amount.format_with_symbol(&settings.currency_symbol),
        amount.cents()
    );
    Ok(())
}

/// Handle the audit command
pub fn handle_audit_command(paths: &LedgerPaths, limit: usize) -> LedgerResult<()> {
    let entries = AuditLogger::new(paths.audit_log()).read_recent(limit)?;

    if entries.is_empty() {
        println!("No audit entries.");
        return Ok(());
    }
    for entry in &entries {
        println!("{}", entry.format_human_readable());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Account;
    use crate::storage::{write_jsonl_atomic, LedgerRecord};
    use tempfile::TempDir;

    fn storage_with(accounts: Vec<Account>) -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        let records: Vec<LedgerRecord> = accounts.into_iter().map(LedgerRecord::Account).collect();
        write_jsonl_atomic(storage.paths().ledger_file(), &records).unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn test_validate_reports_error() {
        let (_dir, storage) = storage_with(vec![Account::with_opening_balance(
            "1930",
            "Bank",
            Money::from_cents(100),
        )]);

        let err = handle_validate_command(&storage, false).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_rollover_writes_accounts_and_audit() {
        let (dir, storage) = storage_with(vec![
            Account::with_opening_balance("1930", "Bank", Money::from_cents(100)),
            Account::with_opening_balance("2081", "Aktiekapital", Money::from_cents(-100)),
        ]);
        let output = dir.path().join("next.jsonl");

        handle_rollover_command(&storage, &Settings::default(), &output).unwrap();

        assert!(output.exists());
        let entries = AuditLogger::new(storage.paths().audit_log())
            .read_all()
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert!(handle_rollover_command(&storage, &Settings::default(), &output).is_err());
    }

    #[test]
    fn test_amount_rejects_garbage() {
        let err = handle_amount_command("12.3.4", '.', &Settings::default()).unwrap_err();
        assert!(matches!(err, LedgerError::MalformedAmount(_)));
    }
}
