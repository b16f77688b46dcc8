//! Verification service
//!
//! Turns a draft into a balanced, numbered verification and posts it on the
//! ledger. Also renumbers a batch of verifications so numbers follow dates.

use std::collections::{HashMap, HashSet};

use chrono::{Local, NaiveDate};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Money, NewVerification, Transaction, TxnRef, Verification, VerificationId};
use crate::storage::LedgerStore;

/// Service for creating and renumbering verifications
pub struct VerificationService<'a> {
    store: &'a mut LedgerStore,
    series: char,
    today: NaiveDate,
}

/// Where a verification entry comes from
enum EntrySource {
    /// An unbooked transaction already in the log
    Log(TxnRef),
    /// A new transaction to mint
    New(Transaction),
}

impl<'a> VerificationService<'a> {
    /// Create a new verification service for a series
    pub fn new(store: &'a mut LedgerStore, series: char) -> Self {
        Self {
            store,
            series,
            today: Local::now().date_naive(),
        }
    }

    /// Override the registration date (defaults to today)
    pub fn registered_on(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// The underlying store
    pub fn store(&self) -> &LedgerStore {
        &*self.store
    }

    /// Balance, number and post a draft
    ///
    /// Nothing is mutated unless every check passes.
    pub fn create(&mut self, draft: NewVerification) -> LedgerResult<VerificationId> {
        let NewVerification {
            date,
            text,
            mut entries,
        } = draft;

        balance_placeholder(&mut entries);

        let sum: Money = entries.iter().map(|e| e.amount).sum();
        if entries.is_empty() || !sum.is_zero() {
            return Err(LedgerError::UnbalancedVerification { text, sum });
        }

        if let Some(booked) = entries.iter().find(|e| e.is_booked()) {
            return Err(LedgerError::AlreadyBooked {
                verification_id: booked
                    .verification_id
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
                transaction: booked.to_string(),
            });
        }

        let date = date
            .or_else(|| entries.iter().find_map(|e| e.date))
            .ok_or_else(|| {
                LedgerError::Validation(format!("Verification '{}' has no date", text))
            })?;

        for entry in &mut entries {
            if entry.date.is_none() {
                entry.date = Some(date);
            }
        }

        let sources = self.reconcile(entries, &text);

        let id = VerificationId::new(self.series, self.store.next_number(self.series));
        if self.store.contains_verification(id) {
            return Err(LedgerError::DuplicateVerificationId(id.to_string()));
        }

        let mut handles = Vec::with_capacity(sources.len());
        for source in sources {
            let txn = match source {
                EntrySource::Log(txn) => txn,
                EntrySource::New(entry) => self.store.add_transaction(entry),
            };
            self.store.post(txn, id);
            handles.push(txn);
        }

        tracing::info!(%id, %date, text = %text, entries = handles.len(), "verification created");

        self.store.insert_verification(Verification {
            id,
            date,
            text,
            registered_date: Some(self.today),
            entries: handles,
        })?;

        Ok(id)
    }

    /// Match each entry to an unbooked log transaction, using every log
    /// transaction at most once
    ///
    /// An entry without a description matches on the verification text.
    fn reconcile(&self, entries: Vec<Transaction>, text: &str) -> Vec<EntrySource> {
        let unbooked = self.store.unbooked();
        let mut used: HashSet<TxnRef> = HashSet::new();

        entries
            .into_iter()
            .map(|entry| {
                let found = unbooked.iter().copied().find(|txn| {
                    let candidate = self.store.transaction(*txn);
                    !used.contains(txn)
                        && candidate.account == entry.account
                        && candidate.amount == entry.amount
                        && candidate.date == entry.date
                        && (candidate.description == entry.description
                            || (entry.description.is_empty() && candidate.description == text))
                });

                match found {
                    Some(txn) => {
                        tracing::debug!(transaction = %self.store.transaction(txn), "entry bound to log transaction");
                        used.insert(txn);
                        EntrySource::Log(txn)
                    }
                    None => EntrySource::New(entry),
                }
            })
            .collect()
    }

    /// Renumber a batch created in this run so numbers follow dates
    ///
    /// Renumbering starts at the lowest batch number, or lower when an
    /// earlier-numbered verification of the same series is dated after the
    /// earliest batch verification. Every verification from there on is
    /// sorted by (date, id) and numbered densely. Returns the old to new
    /// mapping for the renumbered range.
    pub fn renumber(
        &mut self,
        batch: &[VerificationId],
    ) -> LedgerResult<Vec<(VerificationId, VerificationId)>> {
        let Some(first) = batch.first() else {
            return Ok(Vec::new());
        };
        let series = first.series;
        if batch.iter().any(|id| id.series != series) {
            return Err(LedgerError::Renumber(
                "batch spans more than one series".into(),
            ));
        }

        let mut earliest: Option<NaiveDate> = None;
        let mut start = u32::MAX;
        for &id in batch {
            let verification = self
                .store
                .verification(id)
                .ok_or_else(|| LedgerError::verification_not_found(id.to_string()))?;
            earliest = Some(earliest.map_or(verification.date, |d| d.min(verification.date)));
            start = start.min(id.number);
        }
        let earliest = earliest.unwrap_or(NaiveDate::MIN);

        start = self
            .store
            .verifications()
            .iter()
            .filter(|v| v.id.series == series && v.id.number < start && v.date > earliest)
            .map(|v| v.id.number)
            .fold(start, u32::min);

        let mut range: Vec<&Verification> = self
            .store
            .verifications()
            .iter()
            .filter(|v| v.id.series == series && v.id.number >= start)
            .collect();

        let mut numbers: Vec<u32> = range.iter().map(|v| v.id.number).collect();
        numbers.sort_unstable();
        let contiguous = numbers
            .iter()
            .enumerate()
            .all(|(i, &n)| n as usize == start as usize + i);
        if !contiguous {
            return Err(LedgerError::Renumber(format!(
                "numbers from {}{} are not a contiguous run",
                series, start
            )));
        }

        for verification in &range {
            for &txn in &verification.entries {
                let entry = self.store.transaction(txn);
                if entry.verification_id != Some(verification.id) {
                    return Err(LedgerError::Renumber(format!(
                        "entry {} does not belong to {}",
                        entry, verification.id
                    )));
                }
            }
        }

        range.sort_by_key(|v| v.sort_key());
        let mapping: Vec<(VerificationId, VerificationId)> = range
            .iter()
            .zip(start..)
            .map(|(v, number)| (v.id, v.id.with_number(number)))
            .collect();

        let renamed: HashMap<VerificationId, VerificationId> = mapping.iter().copied().collect();
        let mut moved_entries: Vec<(TxnRef, VerificationId)> = Vec::new();
        for verification in self.store.verifications_mut().iter_mut() {
            if let Some(&new_id) = renamed.get(&verification.id) {
                verification.id = new_id;
                moved_entries.extend(verification.entries.iter().map(|&t| (t, new_id)));
            }
        }
        for (txn, id) in moved_entries {
            self.store.transaction_mut(txn).verification_id = Some(id);
        }
        self.store.sort_verifications();
        self.store.mark_changed();

        let moved = mapping.iter().filter(|(old, new)| old != new).count();
        tracing::info!(series = %series, start, moved, "verifications renumbered");

        Ok(mapping)
    }
}

/// Resolve the single zero-amount entry, if any
///
/// If the other entries already balance it is dropped, otherwise it takes
/// the negated sum of the others.
fn balance_placeholder(entries: &mut Vec<Transaction>) {
    let mut zeros = entries.iter().enumerate().filter(|(_, e)| e.amount.is_zero());
    let placeholder = match (zeros.next(), zeros.next()) {
        (Some((index, _)), None) => index,
        _ => return,
    };

    let rest: Money = entries
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != placeholder)
        .map(|(_, e)| e.amount)
        .sum();

    if rest.is_zero() {
        tracing::debug!(account = %entries[placeholder].account, "dropping balanced placeholder");
        entries.remove(placeholder);
    } else {
        entries[placeholder].amount = -rest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::merge::merge;
    use crate::storage::ledger_file::{load_ledger, LedgerRecord, VerificationRecord};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 3, d).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 4, 1).unwrap()
    }

    fn fee(day: u32) -> NewVerification {
        NewVerification::new("Bank fee")
            .on(date(day))
            .entry(Transaction::entry("1930", Money::from_cents(-10000)))
            .entry(Transaction::entry("6570", Money::zero()))
    }

    fn entry_ids(store: &LedgerStore, id: VerificationId) -> Vec<Option<VerificationId>> {
        store
            .verification(id)
            .unwrap()
            .entries
            .iter()
            .map(|&t| store.transaction(t).verification_id)
            .collect()
    }

    #[test]
    fn test_placeholder_takes_negated_sum() {
        let mut store = LedgerStore::new();
        let id = VerificationService::new(&mut store, 'A')
            .registered_on(today())
            .create(fee(1))
            .unwrap();

        assert_eq!(id, VerificationId::new('A', 1));
        let ver = store.verification(id).unwrap();
        assert_eq!(ver.entries.len(), 2);
        assert_eq!(store.transaction(ver.entries[1]).amount, Money::from_cents(10000));
        assert_eq!(store.entry_sum(ver), Money::zero());
        assert_eq!(ver.registered_date, Some(today()));
        assert_eq!(store.account("6570").unwrap().balance, Money::from_cents(10000));
        assert_eq!(store.account("1930").unwrap().balance, Money::from_cents(-10000));
    }

    #[test]
    fn test_balanced_placeholder_is_dropped() {
        let mut store = LedgerStore::new();
        let draft = NewVerification::new("Transfer")
            .on(date(1))
            .entry(Transaction::entry("1930", Money::from_cents(-500)))
            .entry(Transaction::entry("1940", Money::from_cents(500)))
            .entry(Transaction::entry("2640", Money::zero()));

        let id = VerificationService::new(&mut store, 'A').create(draft).unwrap();

        assert_eq!(store.verification(id).unwrap().entries.len(), 2);
        assert!(store.account("2640").is_none());
    }

    #[test]
    fn test_unbalanced_is_rejected() {
        let mut store = LedgerStore::new();
        let draft = NewVerification::new("Off by five")
            .on(date(1))
            .entry(Transaction::entry("1930", Money::from_cents(-100)))
            .entry(Transaction::entry("6570", Money::from_cents(105)));

        let err = VerificationService::new(&mut store, 'A')
            .create(draft)
            .unwrap_err();

        match err {
            LedgerError::UnbalancedVerification { sum, .. } => assert_eq!(sum, Money::from_cents(5)),
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.verifications().is_empty());
        assert!(store.accounts().is_empty());
        assert!(!store.is_changed());
    }

    #[test]
    fn test_empty_draft_is_unbalanced() {
        let mut store = LedgerStore::new();
        let err = VerificationService::new(&mut store, 'A')
            .create(NewVerification::new("Nothing").on(date(1)))
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnbalancedVerification { .. }));
    }

    #[test]
    fn test_already_booked_entry_is_rejected() {
        let mut store = LedgerStore::new();
        let mut booked = Transaction::new("1930", Money::from_cents(-100), date(1), "fee");
        booked.verification_id = Some(VerificationId::new('A', 9));
        let draft = NewVerification::new("Again")
            .entry(booked)
            .entry(Transaction::entry("6570", Money::zero()));

        let err = VerificationService::new(&mut store, 'A')
            .create(draft)
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyBooked { .. }));
        assert!(err.is_verification_rejection());
    }

    #[test]
    fn test_missing_date_is_rejected() {
        let mut store = LedgerStore::new();
        let draft = NewVerification::new("Undated")
            .entry(Transaction::entry("1930", Money::from_cents(-100)))
            .entry(Transaction::entry("6570", Money::from_cents(100)));

        let err = VerificationService::new(&mut store, 'A')
            .create(draft)
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_date_defaults_to_first_dated_entry() {
        let mut store = LedgerStore::new();
        let draft = NewVerification::new("Dated by entry")
            .entry(Transaction::entry("6570", Money::from_cents(100)))
            .entry(Transaction::new("1930", Money::from_cents(-100), date(7), "fee"));

        let id = VerificationService::new(&mut store, 'A').create(draft).unwrap();

        let ver = store.verification(id).unwrap();
        assert_eq!(ver.date, date(7));
        assert_eq!(store.transaction(ver.entries[0]).date, Some(date(7)));
    }

    #[test]
    fn test_entry_binds_to_unbooked_log_transaction() {
        let mut store = LedgerStore::new();
        merge(
            &mut store,
            vec![Transaction::new("1930", Money::from_cents(-10000), date(1), "Bank fee")],
        )
        .unwrap();
        let logged = store.log()[0];

        let id = VerificationService::new(&mut store, 'A').create(fee(1)).unwrap();

        let ver = store.verification(id).unwrap();
        assert_eq!(ver.entries[0], logged);
        assert!(store.unbooked().is_empty());
        assert_eq!(store.log().len(), 1);
        assert_eq!(store.account("1930").unwrap().transactions, vec![logged]);
    }

    #[test]
    fn test_numbers_are_sequential_per_series() {
        let mut store = LedgerStore::new();
        let a1 = VerificationService::new(&mut store, 'A').create(fee(1)).unwrap();
        let a2 = VerificationService::new(&mut store, 'A').create(fee(2)).unwrap();
        let b1 = VerificationService::new(&mut store, 'B').create(fee(3)).unwrap();

        assert_eq!(a1.to_string(), "A1");
        assert_eq!(a2.to_string(), "A2");
        assert_eq!(b1.to_string(), "B1");
    }

    #[test]
    fn test_renumber_follows_dates() {
        let mut store = LedgerStore::new();
        let mut service = VerificationService::new(&mut store, 'A');
        service.create(fee(10)).unwrap();
        service.create(fee(20)).unwrap();
        let a3 = service.create(fee(5)).unwrap();
        let a4 = service.create(fee(15)).unwrap();

        let mapping = service.renumber(&[a3, a4]).unwrap();

        let a = |n| VerificationId::new('A', n);
        assert_eq!(
            mapping,
            vec![(a(3), a(1)), (a(1), a(2)), (a(4), a(3)), (a(2), a(4))]
        );

        let olds: HashSet<_> = mapping.iter().map(|(o, _)| *o).collect();
        let news: HashSet<_> = mapping.iter().map(|(_, n)| *n).collect();
        assert_eq!(olds, news);

        let dates: Vec<_> = (1..=4).map(|n| store.verification(a(n)).unwrap().date).collect();
        assert_eq!(dates, vec![date(5), date(10), date(15), date(20)]);
        for n in 1..=4 {
            assert!(entry_ids(&store, a(n)).iter().all(|id| *id == Some(a(n))));
        }
    }

    #[test]
    fn test_renumber_in_order_batch_is_identity() {
        let mut store = LedgerStore::new();
        let mut service = VerificationService::new(&mut store, 'A');
        service.create(fee(1)).unwrap();
        let a2 = service.create(fee(2)).unwrap();

        let mapping = service.renumber(&[a2]).unwrap();
        assert_eq!(mapping, vec![(a2, a2)]);
    }

    #[test]
    fn test_renumber_requires_contiguous_numbers() {
        let record = |number: u32, day: u32| {
            let id = VerificationId::new('A', number);
            let mut a = Transaction::new("1930", Money::from_cents(-100), date(day), "x");
            let mut b = Transaction::new("6570", Money::from_cents(100), date(day), "x");
            a.verification_id = Some(id);
            b.verification_id = Some(id);
            LedgerRecord::Verification(VerificationRecord {
                series: 'A',
                number,
                date: date(day),
                text: "x".into(),
                registered_date: Some(date(day)),
                entries: vec![a, b],
            })
        };
        let mut store = load_ledger(vec![record(1, 10), record(3, 5)]).unwrap();

        let err = VerificationService::new(&mut store, 'A')
            .renumber(&[VerificationId::new('A', 3)])
            .unwrap_err();

        assert!(matches!(err, LedgerError::Renumber(_)));
        assert!(store.verification(VerificationId::new('A', 3)).is_some());
    }

    #[test]
    fn test_renumber_refuses_mismatched_entry_id() {
        let mut store = LedgerStore::new();
        let (a1, a2, a3) = {
            let mut service = VerificationService::new(&mut store, 'A');
            (
                service.create(fee(10)).unwrap(),
                service.create(fee(20)).unwrap(),
                service.create(fee(5)).unwrap(),
            )
        };
        let tampered = store.verification(a2).unwrap().entries[0];
        let stray = VerificationId::new('A', 9);
        store.transaction_mut(tampered).verification_id = Some(stray);
        let before: Vec<(VerificationId, NaiveDate)> =
            store.verifications().iter().map(|v| (v.id, v.date)).collect();

        let err = VerificationService::new(&mut store, 'A')
            .renumber(&[a3])
            .unwrap_err();

        assert!(matches!(err, LedgerError::Renumber(_)));
        let after: Vec<(VerificationId, NaiveDate)> =
            store.verifications().iter().map(|v| (v.id, v.date)).collect();
        assert_eq!(after, before);
        assert_eq!(store.verification(a1).unwrap().date, date(10));
        assert_eq!(store.verification(a2).unwrap().date, date(20));
        assert_eq!(store.verification(a3).unwrap().date, date(5));
        assert!(entry_ids(&store, a1).iter().all(|id| *id == Some(a1)));
        assert!(entry_ids(&store, a3).iter().all(|id| *id == Some(a3)));
        assert_eq!(store.transaction(tampered).verification_id, Some(stray));
    }

    #[test]
    fn test_renumber_refuses_mixed_series() {
        let mut store = LedgerStore::new();
        let a1 = VerificationService::new(&mut store, 'A').create(fee(2)).unwrap();
        let b1 = VerificationService::new(&mut store, 'B').create(fee(1)).unwrap();

        let err = VerificationService::new(&mut store, 'A')
            .renumber(&[a1, b1])
            .unwrap_err();

        assert!(matches!(err, LedgerError::Renumber(_)));
        assert_eq!(store.verification(a1).unwrap().date, date(2));
        assert_eq!(store.verification(b1).unwrap().date, date(1));
    }
}
