//! Account model
//!
//! Represents a ledger account identified by its four-digit account number.
//! The account type is derived from the first digit of the number.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::TxnRef;
use super::money::Money;

/// Type of ledger account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Class 1 accounts
    Asset,
    /// Class 2 accounts (equity and liabilities)
    Liability,
    /// Class 3 accounts
    Income,
    /// Classes 4-7 and 9
    Expense,
    /// Class 8 accounts (financial items and year-end closing entries)
    Closing,
}

impl AccountType {
    /// Derive the account type from an account number
    ///
    /// # Examples
    /// ```
    /// use bokfor_cli::models::AccountType;
    /// assert_eq!(AccountType::from_number("1510"), AccountType::Asset);
    /// assert_eq!(AccountType::from_number("6000"), AccountType::Expense);
    /// ```
    pub fn from_number(number: &str) -> Self {
        match number.chars().next() {
            Some('1') => Self::Asset,
            Some('2') => Self::Liability,
            Some('3') => Self::Income,
            Some('8') => Self::Closing,
            _ => Self::Expense,
        }
    }

    /// Balance sheet accounts carry their balance over to the next year
    pub fn is_balance_sheet(&self) -> bool {
        matches!(self, Self::Asset | Self::Liability)
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asset => write!(f, "Asset"),
            Self::Liability => write!(f, "Liability"),
            Self::Income => write!(f, "Income"),
            Self::Expense => write!(f, "Expense"),
            Self::Closing => write!(f, "Closing"),
        }
    }
}

/// A ledger account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Four-digit account number, e.g. "1930"
    pub number: String,

    /// Account name, e.g. "Företagskonto"
    #[serde(default)]
    pub name: String,

    /// Balance brought forward from the previous financial year
    #[serde(default)]
    pub opening_balance: Money,

    /// Running balance: opening balance plus every booked transaction
    #[serde(default)]
    pub balance: Money,

    /// Booked transactions on this account, in posting order
    #[serde(skip)]
    pub transactions: Vec<TxnRef>,
}

impl Account {
    /// Create a new account with zero balances
    pub fn new(number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            name: name.into(),
            opening_balance: Money::zero(),
            balance: Money::zero(),
            transactions: Vec::new(),
        }
    }

    /// Create an account carrying an opening balance
    pub fn with_opening_balance(
        number: impl Into<String>,
        name: impl Into<String>,
        opening_balance: Money,
    ) -> Self {
        let mut account = Self::new(number, name);
        account.opening_balance = opening_balance;
        account.balance = opening_balance;
        account
    }

    /// The account type, derived from the number
    pub fn account_type(&self) -> AccountType {
        AccountType::from_number(&self.number)
    }

    /// Record a booked transaction and update the running balance
    pub fn post(&mut self, txn: TxnRef, amount: Money) {
        self.balance += amount;
        self.transactions.push(txn);
    }

    /// The account as it opens the next financial year
    ///
    /// Balance sheet accounts bring their closing balance forward; all other
    /// accounts restart from zero. Transaction history is cleared.
    pub fn rolled_over(&self) -> Self {
        let opening = if self.account_type().is_balance_sheet() {
            self.balance
        } else {
            Money::zero()
        };
        Self::with_opening_balance(self.number.clone(), self.name.clone(), opening)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.number)
        } else {
            write!(f, "{} {}", self.number, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_from_number() {
        assert_eq!(AccountType::from_number("1510"), AccountType::Asset);
        assert_eq!(AccountType::from_number("2999"), AccountType::Liability);
        assert_eq!(AccountType::from_number("3001"), AccountType::Income);
        assert_eq!(AccountType::from_number("6000"), AccountType::Expense);
        assert_eq!(AccountType::from_number("8999"), AccountType::Closing);
        assert_eq!(AccountType::from_number("9000"), AccountType::Expense);
    }

    #[test]
    fn test_post_updates_balance() {
        let mut account = Account::with_opening_balance("1930", "Bank", Money::from_cents(10000));
        account.post(TxnRef(0), Money::from_cents(-2500));
        assert_eq!(account.balance, Money::from_cents(7500));
        assert_eq!(account.transactions, vec![TxnRef(0)]);
    }

    #[test]
    fn test_rollover_keeps_balance_sheet_only() {
        let mut bank = Account::new("1930", "Bank");
        bank.post(TxnRef(0), Money::from_cents(5000));
        let rolled = bank.rolled_over();
        assert_eq!(rolled.opening_balance, Money::from_cents(5000));
        assert_eq!(rolled.balance, Money::from_cents(5000));
        assert!(rolled.transactions.is_empty());

        let mut sales = Account::new("3001", "Sales");
        sales.post(TxnRef(1), Money::from_cents(-5000));
        let rolled = sales.rolled_over();
        assert!(rolled.opening_balance.is_zero());
        assert!(rolled.balance.is_zero());
    }

    #[test]
    fn test_serialization_skips_transactions() {
        let mut account = Account::new("1930", "Bank");
        account.post(TxnRef(3), Money::from_cents(100));
        let json = serde_json::to_string(&account).unwrap();
        assert_eq!(
            json,
            r#"{"number":"1930","name":"Bank","openingBalance":0,"balance":100}"#
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Account::new("1930", "Bank").to_string(), "1930 Bank");
        assert_eq!(Account::new("1930", "").to_string(), "1930");
    }
}
