//! CLI command handlers for importing transactions and verifications
//!
//! Transactions are merged into the log; verifications from a YAML file are
//! booked and then renumbered into date order.

use std::path::Path;

use chrono::Local;

use super::Session;
use crate::audit::AuditEntry;
use crate::display::format_transaction_list;
use crate::error::LedgerResult;
use crate::services::import::{
    import_candidates, import_verifications, read_candidates, read_verification_inputs,
};

/// Handle the import command
pub fn handle_import_command(
    mut session: Session,
    file: &Path,
    account: Option<&str>,
    decimal: char,
    commit: bool,
) -> LedgerResult<()> {
    let year = session
        .settings
        .financial_year_range(Local::now().date_naive())?;
    let candidates = read_candidates(file, account, decimal)?;

    let result = import_candidates(&mut session.store, candidates, year)?;

    println!("Import from '{}'", file.display());
    println!("{}", "=".repeat(40));
    println!("  Read:               {}", result.read);
    println!("  Outside year:       {}", result.outside_year);
    println!("  Already in log:     {}", result.duplicates_skipped);
    println!("  New transactions:   {}", result.imported);
    println!();

    if !result.added.is_empty() {
        let store = &session.store;
        let added = result.added.iter().map(|&txn| store.transaction(txn));
        println!("{}", format_transaction_list(added));
    }

    session.record(AuditEntry::transactions_merged(
        &file.display().to_string(),
        result.imported,
        result.duplicates_skipped,
    ));
    session.finish(commit)?;
    Ok(())
}

/// Handle the verify command
pub fn handle_verify_command(mut session: Session, file: &Path, commit: bool) -> LedgerResult<()> {
    let inputs = read_verification_inputs(file)?;
    let total = inputs.len();

    let result = {
        let mut service = session.verifications();
        import_verifications(&mut service, inputs)?
    };

    println!(
        "Booked {} of {} verification(s) from '{}'",
        result.created.len(),
        total,
        file.display()
    );
    for rejected in &result.rejected {
        println!("  Rejected '{}': {}", rejected.text, rejected.error);
    }

    session.settle_batch(&result.created)?;
    session.finish(commit)?;
    Ok(())
}
