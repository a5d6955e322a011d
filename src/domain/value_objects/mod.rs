//! Value Objects for the configurator

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Sentinel string meaning "no choice made yet".
pub const UNSELECTED: &str = "unselected";

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }
            pub fn as_str(&self) -> &str { &self.0 }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self { Self(s.to_string()) }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self { Self(s) }
        }
    };
}

define_id!(ProductId);
define_id!(CartLineId);
define_id!(SessionId);

/// Money value object.
///
/// Amounts accumulate at full decimal precision; rounding to two places only
/// happens in [`Money::rounded`] and `Display`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self { Self(amount) }
    /// Amount given in hundredths, e.g. `Money::cents(2550)` is 25.50.
    pub fn cents(cents: i64) -> Self { Self(Decimal::new(cents, 2)) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_positive(&self) -> bool { self.0 > Decimal::ZERO }
    pub fn is_zero(&self) -> bool { self.0.is_zero() }
    pub fn times(&self, qty: u32) -> Money { Money(self.0 * Decimal::from(qty)) }

    /// Divides by a quantity; zero quantity yields zero.
    pub fn per_unit(&self, qty: u32) -> Money {
        if qty == 0 { return Money::ZERO; }
        Money(self.0 / Decimal::from(qty))
    }

    /// Returns `self` when positive, otherwise `None`.
    pub fn positive(self) -> Option<Money> { self.is_positive().then_some(self) }

    pub fn rounded(&self) -> Decimal {
        self.0.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self { Self(Decimal::from(value)) }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self { Self(value) }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money { Money(self.0 + rhs.0) }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) { self.0 += rhs.0; }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::ZERO, Add::add) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:.2}", self.rounded()) }
}

/// A single-valued choice that may still be unselected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Choice {
    #[default]
    Unselected,
    Chosen(String),
}

impl Choice {
    pub fn chosen(value: impl Into<String>) -> Self { Choice::from(value.into()) }
    pub fn is_selected(&self) -> bool { matches!(self, Choice::Chosen(_)) }
    pub fn value(&self) -> Option<&str> {
        match self { Choice::Chosen(v) => Some(v), Choice::Unselected => None }
    }
}

impl From<String> for Choice {
    fn from(raw: String) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == UNSELECTED { Choice::Unselected } else { Choice::Chosen(raw) }
    }
}

impl From<Choice> for String {
    fn from(choice: Choice) -> Self {
        match choice { Choice::Chosen(v) => v, Choice::Unselected => UNSELECTED.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_rounds_only_when_formatted() {
        let third = Money::new(Decimal::from(10) / Decimal::from(3));
        let total = third + third + third;
        assert_eq!(total.rounded(), Decimal::from(10));
        assert_eq!(third.to_string(), "3.33");
    }

    #[test]
    fn test_money_per_unit() {
        assert_eq!(Money::from(100).per_unit(50), Money::from(2));
        assert_eq!(Money::from(100).per_unit(0), Money::ZERO);
    }

    #[test]
    fn test_money_serializes_as_number() {
        let json = serde_json::to_value(Money::cents(2550)).unwrap();
        assert_eq!(json, serde_json::json!(25.5));
        let back: Money = serde_json::from_value(serde_json::json!(20)).unwrap();
        assert_eq!(back, Money::from(20));
    }

    #[test]
    fn test_choice_sentinel() {
        assert_eq!(Choice::chosen("unselected"), Choice::Unselected);
        assert_eq!(Choice::chosen(""), Choice::Unselected);
        assert_eq!(Choice::chosen("M").value(), Some("M"));
        let json = serde_json::to_value(Choice::Unselected).unwrap();
        assert_eq!(json, serde_json::json!(UNSELECTED));
    }
}
