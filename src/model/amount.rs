//! Amount type for fee values read from the fee list.
//!
//! Fee cells are free text. Anything that is not a number counts as zero, so a dirty cell never
//! stops a run; it only drops out of the total.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

/// A fee amount.
///
/// Totals are billed in whole yuan, so `whole()` and `Display` truncate toward zero the same way
/// the totals have always been printed.
///
/// ```
/// # use patent_invoicer::Amount;
/// let total: Amount = ["100", "abc", "", "50.5"].iter().map(|s| Amount::parse_or_zero(s)).sum();
/// assert_eq!(total.whole(), 150);
/// assert_eq!(total.to_string(), "150");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Parses `s`, falling back to zero when it is blank or not a number.
    pub fn parse_or_zero(s: &str) -> Self {
        s.parse().unwrap_or(Self::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// The amount in whole yuan, truncated toward zero.
    pub fn whole(&self) -> i64 {
        self.0.trunc().to_i64().unwrap_or_default()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

/// The error returned when a string is not a number. The aggregation code never surfaces it, it
/// substitutes zero instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountError(String);

impl fmt::Display for AmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a number", self.0)
    }
}

impl std::error::Error for AmountError {}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AmountError(s.to_string()));
        }

        // Thousands separators
        let without_commas = trimmed.replace(',', "");

        Decimal::from_str(&without_commas)
            .or_else(|_| Decimal::from_scientific(&without_commas))
            .map(Amount)
            .map_err(|_| AmountError(s.to_string()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.whole())
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(self.whole())
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount(Decimal::from(value))
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount(value)
    }
}
