//! Autobook rules
//!
//! An ordered list of pattern rules that turn unbooked log transactions into
//! verifications. The first rule whose predicate matches and whose action
//! can produce a draft wins.
//!
//! Rules are read from YAML:
//!
//! ```yaml
//! - name: bank-fee
//!   description: "^Avgift"
//!   account: "1930"
//!   action:
//!     counter: "6570"
//! - name: card-purchase
//!   description: "^Kortköp"
//!   action:
//!     split:
//!       parts:
//!         - { account: "2640", numerator: 1, denominator: 5 }
//!       remainder: "6540"
//! - name: tax-transfer
//!   account: "1930"
//!   description: "^Skatteverket"
//!   text: "Tax account transfer {description}"
//!   action:
//!     correlated:
//!       account: "1630"
//!       description: "Inbetalning"
//!       window_days: 3
//! ```

use std::path::Path;

use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Money, NewVerification, Transaction, TxnRef, VerificationId};
use crate::services::import::AmountInput;
use crate::services::verification::VerificationService;
use crate::storage::{read_yaml, LedgerStore};

/// Rule as written in the rule file
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    /// Regex the transaction description must match
    #[serde(default)]
    pub description: Option<String>,
    /// Exact account the transaction must be on
    #[serde(default)]
    pub account: Option<String>,
    /// Exact amount the transaction must have
    #[serde(default)]
    pub amount: Option<AmountInput>,
    /// Verification text; `{description}` is replaced by the description
    #[serde(default)]
    pub text: Option<String>,
    pub action: ActionSpec,
}

/// Rule action as written in the rule file
///
/// Exactly one of the fields must be set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionSpec {
    /// Book the full amount against one account
    #[serde(default)]
    pub counter: Option<String>,
    /// Book fractions on part accounts and the rest on a remainder account
    #[serde(default)]
    pub split: Option<SplitSpec>,
    /// Pair with exactly one opposite transaction on another account
    #[serde(default)]
    pub correlated: Option<CorrelatedSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SplitSpec {
    pub parts: Vec<SplitPart>,
    pub remainder: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorrelatedSpec {
    pub account: String,
    /// Regex the correlated transaction's description must match
    pub description: String,
    #[serde(default = "default_window_days")]
    pub window_days: i64,
}

fn default_window_days() -> i64 {
    3
}

/// One part of a split: `numerator / denominator` of the counter amount
#[derive(Debug, Clone, Deserialize)]
pub struct SplitPart {
    pub account: String,
    pub numerator: i64,
    pub denominator: i64,
    /// Truncate to whole currency units
    #[serde(default)]
    pub floor: bool,
}

/// What a transaction must look like for a rule to apply
#[derive(Debug, Clone, Default)]
pub struct Predicate {
    pub description: Option<Regex>,
    pub account: Option<String>,
    pub amount: Option<Money>,
}

impl Predicate {
    pub fn matches(&self, txn: &Transaction) -> bool {
        self.description
            .as_ref()
            .map_or(true, |re| re.is_match(&txn.description))
            && self.account.as_ref().map_or(true, |a| *a == txn.account)
            && self.amount.map_or(true, |a| a == txn.amount)
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    Counter {
        account: String,
    },
    Split {
        parts: Vec<SplitPart>,
        remainder: String,
    },
    Correlated {
        account: String,
        description: Regex,
        window_days: i64,
    },
}

/// A compiled rule
#[derive(Debug, Clone)]
pub struct AutobookRule {
    pub name: String,
    pub predicate: Predicate,
    pub action: Action,
    pub text: Option<String>,
}

impl AutobookRule {
    /// Compile a rule, validating regexes and split fractions
    pub fn compile(spec: RuleSpec) -> LedgerResult<Self> {
        let invalid = |detail: String| {
            LedgerError::Config(format!("Invalid autobook rule '{}': {}", spec.name, detail))
        };

        let description = spec
            .description
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| invalid(e.to_string()))?;
        let amount = spec.amount.as_ref().map(AmountInput::to_money).transpose()?;

        let action = match spec.action {
            ActionSpec {
                counter: Some(account),
                split: None,
                correlated: None,
            } => Action::Counter { account },
            ActionSpec {
                counter: None,
                split: Some(SplitSpec { parts, remainder }),
                correlated: None,
            } => {
                if let Some(part) = parts.iter().find(|p| p.denominator == 0) {
                    return Err(invalid(format!("zero denominator for {}", part.account)));
                }
                Action::Split { parts, remainder }
            }
            ActionSpec {
                counter: None,
                split: None,
                correlated:
                    Some(CorrelatedSpec {
                        account,
                        description,
                        window_days,
                    }),
            } => Action::Correlated {
                account,
                description: Regex::new(&description).map_err(|e| invalid(e.to_string()))?,
                window_days,
            },
            _ => {
                return Err(invalid(
                    "action needs exactly one of counter, split or correlated".into(),
                ))
            }
        };

        Ok(Self {
            name: spec.name,
            predicate: Predicate {
                description,
                account: spec.account,
                amount,
            },
            action,
            text: spec.text,
        })
    }

    /// Verification text for a transaction
    fn text_for(&self, txn: &Transaction) -> String {
        match &self.text {
            Some(template) => template.replace("{description}", &txn.description),
            None => txn.description.clone(),
        }
    }

    /// Build a draft for `txn`, or `None` if the action cannot apply
    fn draft(&self, store: &LedgerStore, handle: TxnRef) -> LedgerResult<Option<NewVerification>> {
        let txn = store.transaction(handle);
        let mut draft = NewVerification::new(self.text_for(txn)).entry(txn.clone());

        match &self.action {
            Action::Counter { account } => {
                draft = draft.entry(Transaction::entry(account.clone(), Money::zero()));
            }
            Action::Split { parts, remainder } => {
                let counter = -txn.amount;
                for part in parts {
                    let mut amount = counter
                        .mul_div_rounded(part.numerator, part.denominator)
                        .ok_or_else(|| {
                            LedgerError::Validation(format!(
                                "split {}/{} of {} does not fit",
                                part.numerator, part.denominator, counter
                            ))
                        })?;
                    if part.floor {
                        amount = amount.floor_to_whole();
                    }
                    if !amount.is_zero() {
                        draft = draft.entry(Transaction::entry(part.account.clone(), amount));
                    }
                }
                draft = draft.entry(Transaction::entry(remainder.clone(), Money::zero()));
            }
            Action::Correlated {
                account,
                description,
                window_days,
            } => match find_correlated(store, handle, account, description, *window_days) {
                Some(other) => draft = draft.entry(store.transaction(other).clone()),
                None => return Ok(None),
            },
        }

        Ok(Some(draft))
    }
}

/// The single unbooked transaction on `account` that offsets `handle`
fn find_correlated(
    store: &LedgerStore,
    handle: TxnRef,
    account: &str,
    description: &Regex,
    window_days: i64,
) -> Option<TxnRef> {
    let txn = store.transaction(handle);
    let date = txn.date?;
    let within_window = |other: NaiveDate| (other - date).num_days().abs() <= window_days;

    let mut candidates = store.unbooked().into_iter().filter(|&other| {
        let candidate = store.transaction(other);
        other != handle
            && candidate.account == account
            && candidate.amount == -txn.amount
            && description.is_match(&candidate.description)
            && candidate.date.is_some_and(|d| within_window(d))
    });

    match (candidates.next(), candidates.next()) {
        (Some(other), None) => Some(other),
        (Some(_), Some(_)) => {
            tracing::debug!(transaction = %txn, "several correlated candidates, not booking");
            None
        }
        _ => None,
    }
}

/// A draft proposed by a rule
#[derive(Debug, Clone)]
pub struct Proposal {
    pub rule: String,
    pub draft: NewVerification,
}

/// A transaction booked by a rule
#[derive(Debug, Clone)]
pub struct Booked {
    pub id: VerificationId,
    pub rule: String,
}

/// A transaction a rule matched but could not book
#[derive(Debug)]
pub struct AutobookFailure {
    pub transaction: String,
    pub rule: String,
    pub error: LedgerError,
}

/// Outcome of one autobook pass
#[derive(Debug, Default)]
pub struct AutobookReport {
    pub booked: Vec<Booked>,
    pub failures: Vec<AutobookFailure>,
}

impl AutobookReport {
    /// Ids of the created verifications, in creation order
    pub fn created(&self) -> Vec<VerificationId> {
        self.booked.iter().map(|b| b.id).collect()
    }
}

/// Ordered rule set
#[derive(Debug, Clone, Default)]
pub struct AutobookEngine {
    rules: Vec<AutobookRule>,
}

impl AutobookEngine {
    pub fn new(rules: Vec<AutobookRule>) -> Self {
        Self { rules }
    }

    /// Compile rule specs in order
    pub fn from_specs(specs: Vec<RuleSpec>) -> LedgerResult<Self> {
        let rules = specs
            .into_iter()
            .map(AutobookRule::compile)
            .collect::<LedgerResult<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Load rules from a YAML file
    pub fn load(path: &Path) -> LedgerResult<Self> {
        let specs: Vec<RuleSpec> = read_yaml(path)?;
        let engine = Self::from_specs(specs)?;
        tracing::debug!(rules = engine.rules.len(), path = %path.display(), "autobook rules loaded");
        Ok(engine)
    }

    pub fn rules(&self) -> &[AutobookRule] {
        &self.rules
    }

    /// The draft the first applicable rule would book for a transaction
    ///
    /// Does not touch the store. A rule whose draft cannot be built does not
    /// fire; evaluation continues with the next rule.
    pub fn propose(&self, store: &LedgerStore, txn: TxnRef) -> Option<Proposal> {
        self.evaluate(store, txn, &mut Vec::new())
    }

    /// Book every unbooked log transaction some rule applies to
    ///
    /// Walks the log in order and fires at most one rule per transaction.
    /// Rules that cannot draft and rejected drafts are collected as
    /// failures; other errors abort.
    pub fn run(&self, service: &mut VerificationService<'_>) -> LedgerResult<AutobookReport> {
        let mut report = AutobookReport::default();

        for txn in service.store().unbooked() {
            let Some(proposal) = self.evaluate(service.store(), txn, &mut report.failures) else {
                continue;
            };

            let description = service.store().transaction(txn).to_string();
            match service.create(proposal.draft) {
                Ok(id) => {
                    tracing::info!(%id, rule = %proposal.rule, "autobooked");
                    report.booked.push(Booked {
                        id,
                        rule: proposal.rule,
                    });
                }
                Err(error) if error.is_verification_rejection() => {
                    tracing::warn!(transaction = %description, rule = %proposal.rule, %error, "autobook failed");
                    report.failures.push(AutobookFailure {
                        transaction: description,
                        rule: proposal.rule,
                        error,
                    });
                }
                Err(error) => return Err(error),
            }
        }

        Ok(report)
    }

    fn evaluate(
        &self,
        store: &LedgerStore,
        txn: TxnRef,
        failures: &mut Vec<AutobookFailure>,
    ) -> Option<Proposal> {
        let transaction = store.transaction(txn);
        if transaction.is_booked() {
            return None;
        }

        for rule in &self.rules {
            if !rule.predicate.matches(transaction) {
                continue;
            }
            match rule.draft(store, txn) {
                Ok(Some(draft)) => {
                    return Some(Proposal {
                        rule: rule.name.clone(),
                        draft,
                    })
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(transaction = %transaction, rule = %rule.name, %error, "rule could not draft");
                    failures.push(AutobookFailure {
                        transaction: transaction.to_string(),
                        rule: rule.name.clone(),
                        error,
                    });
                }
            }
        }

        None
    }
}
