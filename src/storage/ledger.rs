//! In-memory ledger store
//!
//! Holds the accounts, the verifications and the global transaction log of
//! one financial year. Transactions live in an arena and are referenced by
//! [`TxnRef`] handles, so a booked bank line is the same object in the log,
//! in its account's history and in its verification.

use std::collections::HashMap;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, Money, Transaction, TxnRef, Verification, VerificationId};

/// The ledger of a single run
#[derive(Debug, Default)]
pub struct LedgerStore {
    accounts: Vec<Account>,
    account_index: HashMap<String, usize>,
    arena: Vec<Transaction>,
    log: Vec<TxnRef>,
    verifications: Vec<Verification>,
    verification_index: HashMap<VerificationId, usize>,
    changed: bool,
}

impl LedgerStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    // --- accounts ---

    /// All accounts in insertion order
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// Look up an account by number
    pub fn account(&self, number: &str) -> Option<&Account> {
        self.account_index.get(number).map(|&i| &self.accounts[i])
    }

    /// Register a pre-loaded account
    pub fn add_account(&mut self, account: Account) -> LedgerResult<()> {
        if self.account_index.contains_key(&account.number) {
            return Err(LedgerError::LedgerCorruption(format!(
                "duplicate account {}",
                account.number
            )));
        }
        self.account_index
            .insert(account.number.clone(), self.accounts.len());
        self.accounts.push(account);
        Ok(())
    }

    /// Get an account, creating it on first reference
    pub fn ensure_account(&mut self, number: &str) -> &mut Account {
        let index = match self.account_index.get(number) {
            Some(&i) => i,
            None => {
                tracing::debug!(account = number, "creating account on first reference");
                self.account_index
                    .insert(number.to_string(), self.accounts.len());
                self.accounts.push(Account::new(number, ""));
                self.changed = true;
                self.accounts.len() - 1
            }
        };
        &mut self.accounts[index]
    }

    // --- transactions ---

    /// Get a transaction by handle
    pub fn transaction(&self, txn: TxnRef) -> &Transaction {
        &self.arena[txn.0]
    }

    pub(crate) fn transaction_mut(&mut self, txn: TxnRef) -> &mut Transaction {
        &mut self.arena[txn.0]
    }

    /// Store a transaction in the arena without adding it to the log
    pub fn add_transaction(&mut self, txn: Transaction) -> TxnRef {
        self.arena.push(txn);
        TxnRef(self.arena.len() - 1)
    }

    /// Every transaction known to the store, booked or not
    pub fn all_transactions(&self) -> impl Iterator<Item = (TxnRef, &Transaction)> {
        self.arena.iter().enumerate().map(|(i, t)| (TxnRef(i), t))
    }

    /// The global transaction log, in (date, description) order
    pub fn log(&self) -> &[TxnRef] {
        &self.log
    }

    /// Log transactions in order
    pub fn log_transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.log.iter().map(|&t| self.transaction(t))
    }

    /// Log transactions that are not booked in any verification
    pub fn unbooked(&self) -> Vec<TxnRef> {
        self.log
            .iter()
            .copied()
            .filter(|&t| !self.transaction(t).is_booked())
            .collect()
    }

    pub(crate) fn push_log(&mut self, txn: TxnRef) {
        self.log.push(txn);
    }

    pub(crate) fn replace_log(&mut self, log: Vec<TxnRef>) {
        self.log = log;
        self.changed = true;
    }

    /// Mark a transaction as booked and post it on its account
    pub(crate) fn post(&mut self, txn: TxnRef, id: VerificationId) {
        let (account, amount) = {
            let t = self.transaction_mut(txn);
            t.verification_id = Some(id);
            (t.account.clone(), t.amount)
        };
        self.ensure_account(&account).post(txn, amount);
        self.changed = true;
    }

    // --- verifications ---

    /// All verifications in ledger order
    pub fn verifications(&self) -> &[Verification] {
        &self.verifications
    }

    /// Look up a verification by id
    pub fn verification(&self, id: VerificationId) -> Option<&Verification> {
        self.verification_index
            .get(&id)
            .map(|&i| &self.verifications[i])
    }

    /// Check if a verification id is taken
    pub fn contains_verification(&self, id: VerificationId) -> bool {
        self.verification_index.contains_key(&id)
    }

    /// The next free number in a series
    pub fn next_number(&self, series: char) -> u32 {
        self.verifications
            .iter()
            .filter(|v| v.id.series == series)
            .map(|v| v.id.number)
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Sum of a verification's entries
    pub fn entry_sum(&self, verification: &Verification) -> Money {
        verification
            .entries
            .iter()
            .map(|&t| self.transaction(t).amount)
            .sum()
    }

    /// Append a verification as read from the ledger file, keeping file order
    pub(crate) fn push_verification(&mut self, verification: Verification) -> LedgerResult<()> {
        if self.contains_verification(verification.id) {
            return Err(LedgerError::DuplicateVerificationId(
                verification.id.to_string(),
            ));
        }
        self.verification_index
            .insert(verification.id, self.verifications.len());
        self.verifications.push(verification);
        Ok(())
    }

    /// Insert a new verification keeping (date, id) order
    ///
    /// An out-of-order insertion triggers a full re-sort.
    pub(crate) fn insert_verification(&mut self, verification: Verification) -> LedgerResult<()> {
        let in_order = self
            .verifications
            .last()
            .map_or(true, |last| last.sort_key() <= verification.sort_key());

        self.push_verification(verification)?;
        if !in_order {
            tracing::debug!("verification inserted out of date order, re-sorting");
            self.sort_verifications();
        }
        self.changed = true;
        Ok(())
    }

    pub(crate) fn verifications_mut(&mut self) -> &mut Vec<Verification> {
        &mut self.verifications
    }

    /// Sort by (date, id) and rebuild the id index
    pub(crate) fn sort_verifications(&mut self) {
        self.verifications.sort_by_key(Verification::sort_key);
        self.rebuild_verification_index();
    }

    pub(crate) fn rebuild_verification_index(&mut self) {
        self.verification_index = self
            .verifications
            .iter()
            .enumerate()
            .map(|(i, v)| (v.id, i))
            .collect();
    }

    // --- bookkeeping ---

    /// Whether anything was mutated since load
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub(crate) fn mark_changed(&mut self) {
        self.changed = true;
    }

    pub(crate) fn mark_clean(&mut self) {
        self.changed = false;
    }

    /// Account list for the next financial year
    pub fn rollover(&self) -> Vec<Account> {
        self.accounts.iter().map(Account::rolled_over).collect()
    }
}
