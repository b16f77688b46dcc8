//! Transaction display formatting

use crate::models::Transaction;

/// Format transactions as a register
pub fn format_transaction_list<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> String {
    let mut output = String::new();

    for txn in transactions {
        let date = txn
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let booked = txn
            .verification_id
            .map(|id| id.to_string())
            .unwrap_or_default();

        output.push_str(&format!(
            "{:<10}  {:<4}  {:>12}  {:<5}  {}\n",
            date, txn.account, txn.amount, booked, txn.description
        ));
    }

    if output.is_empty() {
        return "No transactions.".to_string();
    }
    output
}
