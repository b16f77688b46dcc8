//! Ledger file and transaction log records
//!
//! The ledger file holds one tagged record per line:
//!
//! ```text
//! {"Account":{"number":"1930","name":"Bank","openingBalance":100000,"balance":90000}}
//! {"Verification":{"series":"A","number":1,"date":"2023-03-01","text":"Fee",...}}
//! ```
//!
//! The transaction log holds one raw transaction per line.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, Transaction, TxnRef, Verification, VerificationId};
use crate::services::merge::check_sequence;

use super::ledger::LedgerStore;

/// One line of the ledger file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LedgerRecord {
    Account(Account),
    Verification(VerificationRecord),
}

/// Persisted form of a verification, entries inline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    pub series: char,
    pub number: u32,
    pub date: NaiveDate,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_date: Option<NaiveDate>,
    pub entries: Vec<Transaction>,
}

impl VerificationRecord {
    pub fn id(&self) -> VerificationId {
        VerificationId::new(self.series, self.number)
    }
}

/// Build a store from ledger records
///
/// Verification ids must increase within each series; anything else is
/// corruption. Stored balances are kept as read, the validator re-derives
/// them.
pub fn load_ledger(records: Vec<LedgerRecord>) -> LedgerResult<LedgerStore> {
    let mut store = LedgerStore::new();
    let mut last_in_series: HashMap<char, u32> = HashMap::new();

    for record in records {
        match record {
            LedgerRecord::Account(mut account) => {
                account.transactions.clear();
                store.add_account(account)?;
            }
            LedgerRecord::Verification(record) => {
                let id = record.id();
                if let Some(&last) = last_in_series.get(&id.series) {
                    if id.number == last {
                        return Err(LedgerError::LedgerCorruption(format!(
                            "duplicate verification id {}",
                            id
                        )));
                    }
                    if id.number < last {
                        return Err(LedgerError::LedgerCorruption(format!(
                            "verification {} follows {}{}",
                            id, id.series, last
                        )));
                    }
                }
                last_in_series.insert(id.series, id.number);

                let mut entries = Vec::with_capacity(record.entries.len());
                for mut entry in record.entries {
                    if entry.verification_id.is_none() {
                        entry.verification_id = Some(id);
                    }
                    let account = entry.account.clone();
                    let txn = store.add_transaction(entry);
                    store.ensure_account(&account).transactions.push(txn);
                    entries.push(txn);
                }

                store.push_verification(Verification {
                    id,
                    date: record.date,
                    text: record.text,
                    registered_date: record.registered_date,
                    entries,
                })?;
            }
        }
    }

    store.mark_clean();
    Ok(store)
}

/// Attach the transaction log to a loaded store
///
/// Booked log records are bound to the matching entry object of their
/// verification so both refer to the same transaction. A booked record with
/// no matching entry is kept as its own object; the validator reports it.
pub fn load_transaction_log(store: &mut LedgerStore, records: Vec<Transaction>) -> LedgerResult<()> {
    check_sequence(records.iter())?;

    let mut bound: HashSet<TxnRef> = HashSet::new();
    for record in records {
        let existing = record.verification_id.and_then(|id| {
            store.verification(id).and_then(|v| {
                v.entries
                    .iter()
                    .copied()
                    .find(|t| !bound.contains(t) && store.transaction(*t).same_as(&record))
            })
        });

        let txn = match existing {
            Some(txn) => {
                bound.insert(txn);
                txn
            }
            None => {
                if let Some(id) = record.verification_id {
                    tracing::warn!(%id, transaction = %record, "booked log record has no matching entry");
                }
                store.add_transaction(record)
            }
        };
        store.push_log(txn);
    }

    store.mark_clean();
    Ok(())
}

/// Records for the ledger file: accounts first, then verifications
///
/// Refuses to emit verifications whose ids do not increase within a series.
pub fn ledger_records(store: &LedgerStore) -> LedgerResult<Vec<LedgerRecord>> {
    let mut records: Vec<LedgerRecord> = store
        .accounts()
        .iter()
        .cloned()
        .map(LedgerRecord::Account)
        .collect();

    let mut last_in_series: HashMap<char, u32> = HashMap::new();
    for verification in store.verifications() {
        let id = verification.id;
        if let Some(&last) = last_in_series.get(&id.series) {
            if id.number <= last {
                return Err(LedgerError::LedgerCorruption(format!(
                    "verification {} is out of order, renumber before saving",
                    id
                )));
            }
        }
        last_in_series.insert(id.series, id.number);

        records.push(LedgerRecord::Verification(VerificationRecord {
            series: id.series,
            number: id.number,
            date: verification.date,
            text: verification.text.clone(),
            registered_date: verification.registered_date,
            entries: verification
                .entries
                .iter()
                .map(|&t| store.transaction(t).clone())
                .collect(),
        }));
    }

    Ok(records)
}

/// Records for the transaction log file, in log order
pub fn log_records(store: &LedgerStore) -> Vec<Transaction> {
    store.log_transactions().cloned().collect()
}
