//! CLI command handler for rule-based booking

use std::path::Path;

use super::Session;
use crate::error::{LedgerError, LedgerResult};
use crate::services::autobook::AutobookEngine;

/// Handle the autobook command
pub fn handle_autobook_command(
    mut session: Session,
    rules: Option<&Path>,
    commit: bool,
) -> LedgerResult<()> {
    let rules_path = rules
        .map(Path::to_path_buf)
        .unwrap_or_else(|| session.storage.paths().rules_file());
    if !rules_path.exists() {
        return Err(LedgerError::Config(format!(
            "Rules file not found: {}",
            rules_path.display()
        )));
    }

    let engine = AutobookEngine::load(&rules_path)?;
    let unbooked = session.store.unbooked().len();

    let report = {
        let mut service = session.verifications();
        engine.run(&mut service)?
    };

    println!(
        "Autobook: {} rule(s), {} unbooked transaction(s)",
        engine.rules().len(),
        unbooked
    );
    println!("  Booked:   {}", report.booked.len());
    println!("  Failed:   {}", report.failures.len());

    for failure in &report.failures {
        println!(
            "  {} [{}]: {}",
            failure.transaction, failure.rule, failure.error
        );
    }

    session.settle_batch(&report.created())?;
    session.finish(commit)?;
    Ok(())
}
