//! Account display formatting
//!
//! Formats the chart of accounts with opening and running balances.

use crate::models::{Account, Money};

/// Format a list of accounts with balances as a table
pub fn format_account_list(accounts: &[Account]) -> String {
    if accounts.is_empty() {
        return "No accounts found.".to_string();
    }

    let name_width = accounts
        .iter()
        .map(|a| a.name.chars().count())
        .max()
        .unwrap_or(4)
        .max(4);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<6}  {:<name_width$}  {:<9}  {:>14}  {:>14}  {:>5}\n",
        "Number",
        "Name",
        "Type",
        "Opening",
        "Balance",
        "Txns",
        name_width = name_width,
    ));

    output.push_str(&format!(
        "{:-<6}  {:-<name_width$}  {:-<9}  {:->14}  {:->14}  {:->5}\n",
        "",
        "",
        "",
        "",
        "",
        "",
        name_width = name_width,
    ));

    for account in accounts {
        output.push_str(&format!(
            "{:<6}  {:<name_width$}  {:<9}  {:>14}  {:>14}  {:>5}\n",
            account.number,
            account.name,
            account.account_type().to_string(),
            account.opening_balance,
            account.balance,
            account.transactions.len(),
            name_width = name_width,
        ));
    }

    let total_opening: Money = accounts.iter().map(|a| a.opening_balance).sum();
    let total_balance: Money = accounts.iter().map(|a| a.balance).sum();
    output.push_str(&format!(
        "{:<6}  {:<name_width$}  {:<9}  {:>14}  {:>14}\n",
        "",
        "Total",
        "",
        total_opening,
        total_balance,
        name_width = name_width,
    ));

    output
}
