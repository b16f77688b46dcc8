//! Money type for representing currency amounts
//!
//! Internally stores amounts in hundredths (i64) so that every balance check
//! is an exact integer comparison. Provides safe arithmetic operations,
//! rounding helpers and decimal text conversion.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Represents a monetary amount stored as hundredths of the currency unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

/// Grouping marks accepted in the integer part regardless of separator
const GROUPING_MARKS: [char; 3] = [' ', '\'', '\u{a0}'];

impl Money {
    /// Create a Money amount from hundredths
    ///
    /// # Examples
    /// ```
    /// use bokfor_cli::models::Money;
    /// let amount = Money::from_cents(1050); // 10.50
    /// ```
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Create a Money amount from whole units
    pub const fn from_whole(units: i64) -> Self {
        Self(units * 100)
    }

    /// Create a zero Money amount
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Get the amount in hundredths
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Get the whole units portion (truncated toward zero)
    pub const fn whole(&self) -> i64 {
        self.0 / 100
    }

    /// Get the hundredths portion (0-99)
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Check if the amount is zero
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Check if the amount is positive
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Check if the amount is negative
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Get the absolute value
    pub const fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Drop the sub-unit remainder, truncating toward zero
    ///
    /// Used when VAT amounts are rounded down to whole units.
    pub const fn floor_to_whole(&self) -> Self {
        Self((self.0 / 100) * 100)
    }

    /// Compute `self * numerator / denominator`, rounded to the nearest
    /// hundredth with ties away from zero
    ///
    /// Returns `None` for a zero denominator or when the result does not fit.
    ///
    /// # Examples
    /// ```
    /// use bokfor_cli::models::Money;
    /// // 25% VAT share of a gross 125.00
    /// let vat = Money::from_cents(12500).mul_div_rounded(1, 5).unwrap();
    /// assert_eq!(vat.cents(), 2500);
    /// ```
    pub fn mul_div_rounded(&self, numerator: i64, denominator: i64) -> Option<Self> {
        if denominator == 0 {
            return None;
        }

        let product = i128::from(self.0) * i128::from(numerator);
        let sign = product.signum() * i128::from(denominator).signum();
        let (a, b) = (product.abs(), i128::from(denominator).abs());

        let mut quotient = a / b;
        if 2 * (a % b) >= b {
            quotient += 1;
        }

        i64::try_from(sign * quotient).ok().map(Self)
    }

    /// Checked addition
    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Parse an amount using `.` as the decimal separator
    ///
    /// Accepts "1234.12", "-1234.12", "1 234", "1,234.50", "1'234.00".
    /// The fractional part, when present, must have exactly two digits.
    pub fn parse(s: &str) -> Result<Self, MoneyParseError> {
        Self::parse_with_separator(s, '.')
    }

    /// Parse an amount with an explicit decimal separator (`.` or `,`)
    ///
    /// The separator not used for decimals is accepted as a grouping mark in
    /// the integer part, together with spaces and apostrophes.
    pub fn parse_with_separator(s: &str, decimal: char) -> Result<Self, MoneyParseError> {
        let invalid = || MoneyParseError::InvalidFormat(s.to_string());
        let grouping = if decimal == ',' { '.' } else { ',' };

        let trimmed = s.trim();
        let (negative, body) = match trimmed.chars().next() {
            Some('-') => (true, &trimmed[1..]),
            Some('+') => (false, &trimmed[1..]),
            Some(_) => (false, trimmed),
            None => return Err(invalid()),
        };

        let mut parts = body.split(decimal);
        let integer_part = parts.next().unwrap_or_default();
        let frac_part = parts.next();
        if parts.next().is_some() {
            return Err(invalid());
        }

        let mut digits = String::with_capacity(integer_part.len());
        for c in integer_part.chars() {
            if c.is_ascii_digit() {
                digits.push(c);
            } else if c != grouping && !GROUPING_MARKS.contains(&c) {
                return Err(invalid());
            }
        }
        if digits.is_empty() {
            return Err(invalid());
        }

        let frac = match frac_part {
            None => 0,
            Some(f) if f.len() == 2 && f.chars().all(|c| c.is_ascii_digit()) => {
                f.parse::<i64>().map_err(|_| invalid())?
            }
            Some(_) => return Err(invalid()),
        };

        let whole: i64 = digits.parse().map_err(|_| invalid())?;
        let cents = whole
            .checked_mul(100)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(invalid)?;

        Ok(Self(if negative { -cents } else { cents }))
    }

    /// Format as plain decimal text, e.g. "-1234.12"
    pub fn to_decimal_string(&self) -> String {
        self.to_string()
    }

    /// Format with a trailing currency symbol
    pub fn format_with_symbol(&self, symbol: &str) -> String {
        if symbol.is_empty() {
            self.to_string()
        } else {
            format!("{} {}", self, symbol)
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = if self.is_negative() {
            format!("-{}.{:02}", self.whole().abs(), self.cents_part())
        } else {
            format!("{}.{:02}", self.whole(), self.cents_part())
        };
        f.pad(&text)
    }
}

impl std::str::FromStr for Money {
    type Err = MoneyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// Error type for money parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoneyParseError {
    InvalidFormat(String),
}

impl fmt::Display for MoneyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoneyParseError::InvalidFormat(s) => write!(f, "Invalid money format: {}", s),
        }
    }
}

impl std::error::Error for MoneyParseError {}

impl From<MoneyParseError> for crate::error::LedgerError {
    fn from(err: MoneyParseError) -> Self {
        match err {
            MoneyParseError::InvalidFormat(s) => Self::MalformedAmount(s),
        }
    }
}
