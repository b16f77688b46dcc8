//! Verification display formatting

use crate::models::Verification;
use crate::storage::LedgerStore;

/// Format verifications with their entries
pub fn format_verification_list<'a>(
    store: &LedgerStore,
    verifications: impl IntoIterator<Item = &'a Verification>,
) -> String {
    let mut output = String::new();

    for verification in verifications {
        output.push_str(&format_verification(store, verification));
    }

    if output.is_empty() {
        return "No verifications found.".to_string();
    }
    output
}

/// Format one verification and its entries
pub fn format_verification(store: &LedgerStore, verification: &Verification) -> String {
    let mut output = format!(
        "{:<5} {}  {}\n",
        verification.id.to_string(),
        verification.date.format("%Y-%m-%d"),
        verification.text
    );

    for &txn in &verification.entries {
        let entry = store.transaction(txn);
        let name = store
            .account(&entry.account)
            .map(|a| a.name.as_str())
            .unwrap_or_default();
        output.push_str(&format!(
            "      {:<4} {:<24} {:>12}  {}\n",
            entry.account, name, entry.amount, entry.description
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, Money, NewVerification, Transaction};
    use crate::services::verification::VerificationService;
    use chrono::NaiveDate;

    #[test]
    fn test_verification_with_entries() {
        let mut store = LedgerStore::new();
        store.add_account(Account::new("1930", "Företagskonto")).unwrap();
        let draft = NewVerification::new("Bank fee")
            .on(NaiveDate::from_ymd_opt(2023, 3, 1).unwrap())
            .entry(Transaction::entry("1930", Money::from_cents(-10000)))
            .entry(Transaction::entry("6570", Money::zero()));
        VerificationService::new(&mut store, 'A').create(draft).unwrap();

        let output = format_verification_list(&store, store.verifications());
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("A1    2023-03-01  Bank fee"));
        assert!(lines[1].contains("Företagskonto"));
        assert!(lines[1].contains("-100.00"));
        assert!(lines[2].contains("6570"));
        assert!(lines[2].contains("100.00"));
    }

    #[test]
    fn test_empty() {
        let store = LedgerStore::new();
        assert_eq!(
            format_verification_list(&store, store.verifications()),
            "No verifications found."
        );
    }
}
