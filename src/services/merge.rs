//! Transaction merge
//!
//! Merges an imported, sorted transaction list into the sorted transaction
//! log without creating duplicates. Re-importing the same statement is a
//! no-op.

use std::cmp::Ordering;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Transaction, TxnRef};
use crate::storage::LedgerStore;

/// Result of a merge
#[derive(Debug, Default)]
pub struct MergeResult {
    /// Handles of the candidates that were appended, in log order
    pub added: Vec<TxnRef>,
    /// Candidates that were already in the log
    pub duplicates: usize,
}

impl MergeResult {
    pub fn added_count(&self) -> usize {
        self.added.len()
    }
}

/// Check that a sequence is sorted by (date, description) and duplicate free
///
/// Duplicates can only sit inside a run of equal (date, description), so only
/// the current run is remembered. Every transaction must be dated.
pub fn check_sequence<'a>(txns: impl IntoIterator<Item = &'a Transaction>) -> LedgerResult<()> {
    let mut run: Vec<&Transaction> = Vec::new();

    for txn in txns {
        if txn.date.is_none() {
            return Err(LedgerError::LedgerCorruption(format!(
                "transaction without date: {}",
                txn
            )));
        }

        if let Some(prev) = run.last() {
            match prev.log_order(txn) {
                Ordering::Greater => {
                    return Err(LedgerError::LedgerCorruption(format!(
                        "transaction out of order: {} after {}",
                        txn, prev
                    )));
                }
                Ordering::Less => run.clear(),
                Ordering::Equal => {
                    if run.iter().any(|t| t.same_as(txn)) {
                        return Err(LedgerError::LedgerCorruption(format!(
                            "duplicate transaction: {}",
                            txn
                        )));
                    }
                }
            }
        }
        run.push(txn);
    }

    Ok(())
}

/// One slot of the merged log before it is installed
enum Slot {
    Existing(TxnRef),
    Candidate(usize),
}

/// Merge sorted candidates into the store's transaction log
///
/// Candidates equal by key to a log transaction are skipped; all others are
/// inserted in order. The merged order is checked before it replaces the
/// log, so a failed merge leaves the store unchanged.
pub fn merge(store: &mut LedgerStore, candidates: Vec<Transaction>) -> LedgerResult<MergeResult> {
    check_sequence(candidates.iter())?;
    check_sequence(store.log_transactions())?;

    let existing = store.log();
    let mut slots = Vec::with_capacity(existing.len() + candidates.len());
    let mut duplicates = 0;
    let (mut i, mut j) = (0, 0);

    loop {
        match (existing.get(i), candidates.get(j)) {
            (_, None) => {
                slots.extend(existing[i..].iter().copied().map(Slot::Existing));
                break;
            }
            (None, Some(_)) => {
                slots.push(Slot::Candidate(j));
                j += 1;
            }
            (Some(&txn), Some(candidate)) => {
                let current = store.transaction(txn);
                if current.same_as(candidate) {
                    slots.push(Slot::Existing(txn));
                    duplicates += 1;
                    i += 1;
                    j += 1;
                } else if current.log_order(candidate) == Ordering::Greater {
                    slots.push(Slot::Candidate(j));
                    j += 1;
                } else {
                    slots.push(Slot::Existing(txn));
                    i += 1;
                }
            }
        }
    }

    check_sequence(slots.iter().map(|slot| match *slot {
        Slot::Existing(txn) => store.transaction(txn),
        Slot::Candidate(k) => &candidates[k],
    }))?;

    let mut candidates: Vec<Option<Transaction>> = candidates.into_iter().map(Some).collect();
    let mut added = Vec::new();
    let mut log = Vec::with_capacity(slots.len());
    for slot in slots {
        let txn = match slot {
            Slot::Existing(txn) => txn,
            Slot::Candidate(k) => match candidates[k].take() {
                Some(candidate) => {
                    let txn = store.add_transaction(candidate);
                    added.push(txn);
                    txn
                }
                None => continue,
            },
        };
        log.push(txn);
    }

    if !added.is_empty() {
        store.replace_log(log);
    }

    tracing::info!(
        added = added.len(),
        duplicates,
        "merged transactions into log"
    );
    Ok(MergeResult { added, duplicates })
}
