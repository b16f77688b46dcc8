//! Year-end rollover
//!
//! Produces the account list that opens the next financial year.

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, Money};
use crate::services::validation::{validate, ValidationMode};
use crate::storage::LedgerStore;

/// Accounts for the next financial year
#[derive(Debug, Clone)]
pub struct Rollover {
    pub accounts: Vec<Account>,
    /// Accounts that bring a non-zero balance forward
    pub carried: usize,
    /// Net of all opening balances; non-zero when the year's result was not
    /// closed against equity
    pub unclosed_result: Money,
}

/// Roll the ledger over to a new year
///
/// Refuses a ledger with violations, since their balances would be carried
/// into the new year.
pub fn rollover(store: &LedgerStore) -> LedgerResult<Rollover> {
    let report = validate(store, ValidationMode::FailFast);
    if let Some(violation) = report.violations.first() {
        return Err(LedgerError::Validation(format!(
            "Cannot roll over an inconsistent ledger: {}",
            violation
        )));
    }

    let accounts = store.rollover();
    let carried = accounts
        .iter()
        .filter(|a| !a.opening_balance.is_zero())
        .count();
    let unclosed_result: Money = accounts.iter().map(|a| a.opening_balance).sum();

    if !unclosed_result.is_zero() {
        tracing::warn!(%unclosed_result, "year result is not closed against equity");
    }
    tracing::info!(accounts = accounts.len(), carried, "ledger rolled over");

    Ok(Rollover {
        accounts,
        carried,
        unclosed_result,
    })
}
