//! Import service
//!
//! Reads candidate transactions (JSON lines or CSV with a
//! `date,description,amount[,account]` header) and merges them into the
//! transaction log. Also reads YAML verification records and books them.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::NaiveDate;
use csv::{Reader, ReaderBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Money, NewVerification, Transaction, TxnRef, VerificationId};
use crate::services::merge::merge;
use crate::services::verification::VerificationService;
use crate::storage::{read_jsonl, read_yaml, LedgerStore};

/// An amount as written by hand: integer hundredths or decimal text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Cents(i64),
    Text(String),
}

impl AmountInput {
    pub fn to_money(&self) -> LedgerResult<Money> {
        self.to_money_with('.')
    }

    /// Convert, reading text with `decimal` as the decimal separator
    pub fn to_money_with(&self, decimal: char) -> LedgerResult<Money> {
        match self {
            Self::Cents(cents) => Ok(Money::from_cents(*cents)),
            Self::Text(text) => Ok(Money::parse_with_separator(text, decimal)?),
        }
    }
}

/// An account number written as text or as a bare number
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(untagged)]
pub enum AccountKey {
    Number(u32),
    Text(String),
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One candidate transaction as found in a JSON-lines import file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CandidateRecord {
    #[serde(default)]
    account: Option<AccountKey>,
    amount: AmountInput,
    date: NaiveDate,
    #[serde(default)]
    description: String,
}

/// Result of a completed transaction import
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    /// Candidates read from the file
    pub read: usize,
    /// Candidates dated outside the financial year
    pub outside_year: usize,
    /// Candidates appended to the log
    pub imported: usize,
    /// Handles of the appended transactions, in log order
    pub added: Vec<TxnRef>,
    /// Candidates already in the log
    pub duplicates_skipped: usize,
}

/// Read candidate transactions from a file
///
/// Files ending in `.csv` are parsed as CSV, everything else as JSON lines.
/// `default_account` is used for rows that do not name an account.
///
/// Amounts are read with `decimal` as the decimal separator; the other of
/// `.` and `,` counts as a grouping mark anywhere in the integer part. With
/// the default `.`, a comma-decimal statement line such as `12,34` reads as
/// 1234.00, so such files must be imported with `decimal` set to `,`.
pub fn read_candidates(
    path: &Path,
    default_account: Option<&str>,
    decimal: char,
) -> LedgerResult<Vec<Transaction>> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    if is_csv {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| LedgerError::Import(format!("Failed to open {}: {}", path.display(), e)))?;
        return parse_csv_from_reader(&mut reader, default_account, decimal);
    }

    if !path.exists() {
        return Err(LedgerError::Import(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let records: Vec<CandidateRecord> = read_jsonl(path)?;
    records
        .into_iter()
        .enumerate()
        .map(|(idx, record)| {
            let account = record
                .account
                .map(|a| a.to_string())
                .or_else(|| default_account.map(str::to_string))
                .ok_or_else(|| missing_account(idx + 1))?;
            Ok(Transaction::new(
                account,
                record.amount.to_money_with(decimal)?,
                record.date,
                record.description,
            ))
        })
        .collect()
}

/// Parse candidate transactions from a CSV reader with a header row
///
/// A malformed amount aborts the whole file.
pub fn parse_csv_from_reader<R: std::io::Read>(
    reader: &mut Reader<R>,
    default_account: Option<&str>,
    decimal: char,
) -> LedgerResult<Vec<Transaction>> {
    let headers = reader
        .headers()
        .map_err(|e| LedgerError::Import(format!("Error reading CSV header: {}", e)))?
        .clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };
    let date_col = column("date")
        .ok_or_else(|| LedgerError::Import("CSV header has no 'date' column".into()))?;
    let amount_col = column("amount")
        .ok_or_else(|| LedgerError::Import("CSV header has no 'amount' column".into()))?;
    let description_col = column("description");
    let account_col = column("account");

    let mut transactions = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let row = idx + 1;
        let record = result
            .map_err(|e| LedgerError::Import(format!("Error reading CSV row {}: {}", row, e)))?;

        let field = |col: Option<usize>| {
            col.and_then(|c| record.get(c))
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };

        let date_str = field(Some(date_col))
            .ok_or_else(|| LedgerError::Import(format!("Row {}: missing date", row)))?;
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|_| {
            LedgerError::Import(format!("Row {}: could not parse date '{}'", row, date_str))
        })?;

        let amount_str = field(Some(amount_col))
            .ok_or_else(|| LedgerError::Import(format!("Row {}: missing amount", row)))?;
        let amount = Money::parse_with_separator(amount_str, decimal)?;

        let account = field(account_col)
            .or(default_account)
            .ok_or_else(|| missing_account(row))?;
        let description = field(description_col).unwrap_or_default();

        transactions.push(Transaction::new(account, amount, date, description));
    }

    Ok(transactions)
}

fn missing_account(row: usize) -> LedgerError {
    LedgerError::Import(format!(
        "Row {}: no account given and no default account set",
        row
    ))
}

/// Keep candidates inside `[first, last]` and stable-sort them by
/// (date, description)
///
/// Returns the kept candidates and the number dropped.
pub fn prepare_candidates(
    candidates: Vec<Transaction>,
    first: NaiveDate,
    last: NaiveDate,
) -> (Vec<Transaction>, usize) {
    let total = candidates.len();
    let mut kept: Vec<Transaction> = candidates
        .into_iter()
        .filter(|t| t.date.is_some_and(|d| d >= first && d <= last))
        .collect();
    kept.sort_by(|a, b| a.log_order(b));

    let dropped = total - kept.len();
    if dropped > 0 {
        tracing::debug!(dropped, %first, %last, "candidates outside the financial year");
    }
    (kept, dropped)
}

/// Filter, sort and merge candidates into the transaction log
pub fn import_candidates(
    store: &mut LedgerStore,
    candidates: Vec<Transaction>,
    year: (NaiveDate, NaiveDate),
) -> LedgerResult<ImportResult> {
    let read = candidates.len();
    let (candidates, outside_year) = prepare_candidates(candidates, year.0, year.1);
    let merged = merge(store, candidates)?;

    Ok(ImportResult {
        read,
        outside_year,
        imported: merged.added_count(),
        duplicates_skipped: merged.duplicates,
        added: merged.added,
    })
}

/// One verification entry in a YAML import file
///
/// Either `{account, amount[, description, date]}` or the short form
/// `{<account>: amount[, description, date]}`, where the account is the
/// entry's only 4-digit key.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryInput {
    #[serde(default)]
    pub account: Option<AccountKey>,
    #[serde(default)]
    pub amount: Option<AmountInput>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Keys that are not entry fields; only a 4-digit account is allowed
    #[serde(flatten)]
    pub other: BTreeMap<AccountKey, AmountInput>,
}

impl EntryInput {
    fn into_transaction(self) -> LedgerResult<Transaction> {
        let mut short = Vec::with_capacity(self.other.len());
        for (key, amount) in self.other {
            let key = key.to_string();
            if key.len() != 4 || !key.bytes().all(|b| b.is_ascii_digit()) {
                return Err(LedgerError::Import(format!("unknown entry key '{}'", key)));
            }
            short.push((key, amount));
        }

        let (account, amount) = match (self.account, self.amount, short.len()) {
            (Some(account), Some(amount), 0) => (account.to_string(), amount),
            (None, None, 1) => short.remove(0),
            (None, _, 0) => return Err(LedgerError::Import("entry names no account".into())),
            (Some(account), None, 0) => {
                return Err(LedgerError::Import(format!(
                    "entry for {} has no amount",
                    account
                )))
            }
            (None, Some(_), 1) => {
                return Err(LedgerError::Import(format!(
                    "entry for {} has two amounts",
                    short[0].0
                )))
            }
            _ => {
                return Err(LedgerError::Import(
                    "entry names more than one account".into(),
                ))
            }
        };

        let mut entry = Transaction::entry(account, amount.to_money()?);
        entry.description = self.description;
        entry.date = self.date;
        Ok(entry)
    }
}

/// One verification in a YAML import file
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationInput {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub text: String,
    pub entries: Vec<EntryInput>,
}

impl VerificationInput {
    /// Convert into a draft; malformed amounts fail the conversion
    pub fn into_draft(self) -> LedgerResult<NewVerification> {
        let entries = self
            .entries
            .into_iter()
            .map(EntryInput::into_transaction)
            .collect::<LedgerResult<Vec<_>>>()?;

        Ok(NewVerification {
            date: self.date,
            text: self.text,
            entries,
        })
    }
}

/// A verification the builder refused
#[derive(Debug)]
pub struct RejectedVerification {
    pub text: String,
    pub error: LedgerError,
}

/// Result of a verification import
#[derive(Debug, Default)]
pub struct VerificationImportResult {
    /// Ids of the created verifications, in creation order
    pub created: Vec<VerificationId>,
    /// Drafts that were rejected
    pub rejected: Vec<RejectedVerification>,
}

/// Read verification records from a YAML file
pub fn read_verification_inputs(path: &Path) -> LedgerResult<Vec<VerificationInput>> {
    read_yaml(path)
}

/// Book verification records
///
/// A draft the builder rejects is reported and skipped; any other error
/// aborts the import.
pub fn import_verifications(
    service: &mut VerificationService<'_>,
    inputs: Vec<VerificationInput>,
) -> LedgerResult<VerificationImportResult> {
    let mut result = VerificationImportResult::default();

    for input in inputs {
        let draft = input.into_draft()?;
        let text = draft.text.clone();
        match service.create(draft) {
            Ok(id) => result.created.push(id),
            Err(error) if error.is_verification_rejection() => {
                tracing::warn!(text = %text, %error, "verification rejected");
                result.rejected.push(RejectedVerification { text, error });
            }
            Err(error) => return Err(error),
        }
    }

    Ok(result)
}
