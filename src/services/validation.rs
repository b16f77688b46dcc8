//! Ledger validation
//!
//! A read-only pass over the whole ledger checking double-entry invariants.
//! Violations are values, not errors: the caller decides whether they block
//! a commit.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use chrono::NaiveDate;

use crate::models::{AccountType, Money, TxnRef, VerificationId};
use crate::storage::LedgerStore;

/// How many violations to collect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Collect every violation
    #[default]
    Verbose,
    /// Stop at the first violation
    FailFast,
}

/// One broken invariant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Opening assets do not match opening liabilities
    OpeningImbalance { assets: Money, liabilities: Money },
    /// Verification entries do not sum to zero
    UnbalancedVerification { id: VerificationId, sum: Money },
    /// Verification number is zero
    MissingNumber { id: VerificationId },
    /// Verification has no registration date
    MissingRegistrationDate { id: VerificationId },
    /// Verification dated before the previous one in its series
    DateOutOfOrder {
        id: VerificationId,
        date: NaiveDate,
        previous: VerificationId,
        previous_date: NaiveDate,
    },
    /// The same transaction appears twice in one verification
    RepeatedEntry { id: VerificationId, transaction: String },
    /// A transaction claims a verification that does not exist
    UnknownVerification { claimed: VerificationId, transaction: String },
    /// A transaction claims a verification that does not contain it
    NotInVerification { claimed: VerificationId, transaction: String },
    /// A verification entry carries another id, or none
    EntryIdMismatch {
        id: VerificationId,
        found: Option<VerificationId>,
        transaction: String,
    },
    /// A verification books on an account the ledger does not know
    UnknownAccount { id: VerificationId, account: String },
    /// Stored balance differs from the opening balance plus postings
    BalanceMismatch {
        account: String,
        stored: Money,
        computed: Money,
        source: BalanceSource,
    },
    /// Balance sheet and result do not net to zero
    ClosingImbalance { balance_sheet: Money, result: Money },
}

/// Which posting list a balance was recomputed from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceSource {
    AccountHistory,
    Verifications,
}

impl fmt::Display for BalanceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccountHistory => write!(f, "account history"),
            Self::Verifications => write!(f, "verification entries"),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpeningImbalance {
                assets,
                liabilities,
            } => write!(
                f,
                "Opening balances do not balance: assets {} vs liabilities {}",
                assets, liabilities
            ),
            Self::UnbalancedVerification { id, sum } => {
                write!(f, "Verification {} sums to {}", id, sum)
            }
            Self::MissingNumber { id } => write!(f, "Verification {} has no number", id),
            Self::MissingRegistrationDate { id } => {
                write!(f, "Verification {} has no registration date", id)
            }
            Self::DateOutOfOrder {
                id,
                date,
                previous,
                previous_date,
            } => write!(
                f,
                "Verification {} dated {} is earlier than {} dated {}",
                id, date, previous, previous_date
            ),
            Self::RepeatedEntry { id, transaction } => {
                write!(f, "Verification {} lists {} more than once", id, transaction)
            }
            Self::UnknownVerification {
                claimed,
                transaction,
            } => write!(
                f,
                "Transaction {} claims missing verification {}",
                transaction, claimed
            ),
            Self::NotInVerification {
                claimed,
                transaction,
            } => write!(
                f,
                "Transaction {} claims verification {} but is not one of its entries",
                transaction, claimed
            ),
            Self::EntryIdMismatch {
                id,
                found,
                transaction,
            } => match found {
                Some(found) => write!(
                    f,
                    "Entry {} of verification {} is marked {}",
                    transaction, id, found
                ),
                None => write!(f, "Entry {} of verification {} is unmarked", transaction, id),
            },
            Self::UnknownAccount { id, account } => {
                write!(f, "Verification {} books on unknown account {}", id, account)
            }
            Self::BalanceMismatch {
                account,
                stored,
                computed,
                source,
            } => write!(
                f,
                "Account {} balance {} differs from {} computed from {}",
                account, stored, computed, source
            ),
            Self::ClosingImbalance {
                balance_sheet,
                result,
            } => write!(
                f,
                "Closing balances do not net to zero: balance sheet {} vs result {}",
                balance_sheet, result
            ),
        }
    }
}

/// Outcome of a validation pass
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

struct Collector {
    mode: ValidationMode,
    violations: Vec<Violation>,
}

impl Collector {
    /// Record a violation; returns true when the pass should stop
    fn push(&mut self, violation: Violation) -> bool {
        tracing::debug!(%violation, "ledger violation");
        self.violations.push(violation);
        self.done()
    }

    fn done(&self) -> bool {
        self.mode == ValidationMode::FailFast && !self.violations.is_empty()
    }
}

/// Check every ledger invariant
pub fn validate(store: &LedgerStore, mode: ValidationMode) -> ValidationReport {
    let mut out = Collector {
        mode,
        violations: Vec::new(),
    };

    let checks: [fn(&LedgerStore, &mut Collector); 7] = [
        check_opening_balances,
        check_verification_sums,
        check_verification_headers,
        check_repeated_entries,
        check_references,
        check_account_balances,
        check_closing_balances,
    ];
    for check in checks {
        check(store, &mut out);
        if out.done() {
            break;
        }
    }

    tracing::info!(violations = out.violations.len(), "ledger validated");
    ValidationReport {
        violations: out.violations,
    }
}

/// Check the ledger, stopping at the first violation
pub fn is_valid(store: &LedgerStore) -> bool {
    validate(store, ValidationMode::FailFast).is_valid()
}

fn check_opening_balances(store: &LedgerStore, out: &mut Collector) {
    let total = |kind: AccountType| -> Money {
        store
            .accounts()
            .iter()
            .filter(|a| a.account_type() == kind)
            .map(|a| a.opening_balance)
            .sum()
    };
    let assets = total(AccountType::Asset);
    let liabilities = total(AccountType::Liability);

    if assets != -liabilities {
        out.push(Violation::OpeningImbalance {
            assets,
            liabilities,
        });
    }
}

fn check_verification_sums(store: &LedgerStore, out: &mut Collector) {
    for verification in store.verifications() {
        let sum = store.entry_sum(verification);
        if !sum.is_zero()
            && out.push(Violation::UnbalancedVerification {
                id: verification.id,
                sum,
            })
        {
            return;
        }
    }
}

fn check_verification_headers(store: &LedgerStore, out: &mut Collector) {
    for verification in store.verifications() {
        let id = verification.id;
        if id.number == 0 && out.push(Violation::MissingNumber { id }) {
            return;
        }
        if verification.registered_date.is_none()
            && out.push(Violation::MissingRegistrationDate { id })
        {
            return;
        }
    }

    // Dates must not decrease along the numbering of each series
    let mut by_series: BTreeMap<char, Vec<(VerificationId, NaiveDate)>> = BTreeMap::new();
    for verification in store.verifications() {
        by_series
            .entry(verification.id.series)
            .or_default()
            .push((verification.id, verification.date));
    }
    for mut series in by_series.into_values() {
        series.sort();
        for pair in series.windows(2) {
            let ((previous, previous_date), (id, date)) = (pair[0], pair[1]);
            if date < previous_date
                && out.push(Violation::DateOutOfOrder {
                    id,
                    date,
                    previous,
                    previous_date,
                })
            {
                return;
            }
        }
    }
}

fn check_repeated_entries(store: &LedgerStore, out: &mut Collector) {
    for verification in store.verifications() {
        let mut seen: HashSet<TxnRef> = HashSet::new();
        for &txn in &verification.entries {
            if !seen.insert(txn)
                && out.push(Violation::RepeatedEntry {
                    id: verification.id,
                    transaction: store.transaction(txn).to_string(),
                })
            {
                return;
            }
        }
    }
}

fn check_references(store: &LedgerStore, out: &mut Collector) {
    for (txn, transaction) in store.all_transactions() {
        let Some(claimed) = transaction.verification_id else {
            continue;
        };
        let violation = match store.verification(claimed) {
            None => Some(Violation::UnknownVerification {
                claimed,
                transaction: transaction.to_string(),
            }),
            Some(v) if !v.entries.contains(&txn) => Some(Violation::NotInVerification {
                claimed,
                transaction: transaction.to_string(),
            }),
            Some(_) => None,
        };
        if let Some(violation) = violation {
            if out.push(violation) {
                return;
            }
        }
    }

    for verification in store.verifications() {
        for &txn in &verification.entries {
            let entry = store.transaction(txn);
            if entry.verification_id != Some(verification.id)
                && out.push(Violation::EntryIdMismatch {
                    id: verification.id,
                    found: entry.verification_id,
                    transaction: entry.to_string(),
                })
            {
                return;
            }
        }
    }
}

fn check_account_balances(store: &LedgerStore, out: &mut Collector) {
    let mut from_verifications: HashMap<&str, Money> = HashMap::new();
    for verification in store.verifications() {
        for &txn in &verification.entries {
            let entry = store.transaction(txn);
            if store.account(&entry.account).is_none() {
                if out.push(Violation::UnknownAccount {
                    id: verification.id,
                    account: entry.account.clone(),
                }) {
                    return;
                }
                continue;
            }
            *from_verifications
                .entry(entry.account.as_str())
                .or_default() += entry.amount;
        }
    }

    for account in store.accounts() {
        let history: Money = account
            .transactions
            .iter()
            .map(|&t| store.transaction(t).amount)
            .sum();
        let booked = from_verifications
            .get(account.number.as_str())
            .copied()
            .unwrap_or_default();

        for (computed, source) in [
            (account.opening_balance + history, BalanceSource::AccountHistory),
            (account.opening_balance + booked, BalanceSource::Verifications),
        ] {
            if computed != account.balance
                && out.push(Violation::BalanceMismatch {
                    account: account.number.clone(),
                    stored: account.balance,
                    computed,
                    source,
                })
            {
                return;
            }
        }
    }
}

fn check_closing_balances(store: &LedgerStore, out: &mut Collector) {
    let (mut balance_sheet, mut result) = (Money::zero(), Money::zero());
    for account in store.accounts() {
        if account.account_type().is_balance_sheet() {
            balance_sheet += account.balance;
        } else {
            result += account.balance;
        }
    }

    if !(balance_sheet + result).is_zero() {
        out.push(Violation::ClosingImbalance {
            balance_sheet,
            result,
        });
    }
}
