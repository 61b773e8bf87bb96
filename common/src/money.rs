//! [`Money`]-related definitions.

use std::{fmt, ops, str::FromStr};

#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::{prelude::ToPrimitive as _, Decimal};

use crate::Weight;

/// Amount of money in the marketplace currency.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(
    feature = "postgres",
    derive(FromSql, ToSql),
    postgres(transparent)
)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(transparent)
)]
pub struct Money(Decimal);

impl Money {
    /// Zero [`Money`].
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates a new [`Money`] amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Returns the amount of this [`Money`].
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }

    /// Indicates whether this [`Money`] amount is strictly above zero.
    #[must_use]
    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Returns the ratio of this [`Money`] to the `other` one.
    ///
    /// [`None`] if the `other` amount is zero.
    #[must_use]
    pub fn ratio_to(self, other: Self) -> Option<f64> {
        self.0.checked_div(other.0)?.to_f64()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Money {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .map(Self)
            .map_err(|_| "invalid amount")
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl ops::Mul<Weight> for Money {
    type Output = Self;

    fn mul(self, rhs: Weight) -> Self::Output {
        Self(self.0 * rhs.kg())
    }
}

impl ops::Mul<u32> for Money {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self::Output {
        Self(self.0 * Decimal::from(rhs))
    }
}

impl ops::Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use rust_decimal::Decimal;

    use crate::Weight;

    use super::Money;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    #[test]
    fn from_str() {
        assert_eq!(
            Money::from_str("123.45").unwrap(),
            Money::new(Decimal::new(12345, 2)),
        );
        assert_eq!(Money::from_str(" 1400 ").unwrap(), Money::new(1400.into()));

        assert!(Money::from_str("").is_err());
        assert!(Money::from_str("123.45USD").is_err());
        assert!(Money::from_str("one").is_err());
    }

    #[test]
    fn to_string() {
        assert_eq!(money("123.45").to_string(), "123.45");
        assert_eq!(money("123.40").to_string(), "123.4");
        assert_eq!(money("123.00").to_string(), "123");
        assert_eq!(money("123.0").to_string(), "123");
        assert_eq!(money("123").to_string(), "123");
    }

    #[test]
    fn multiplies_by_weight() {
        let total = money("1400") * Weight::from_str("50.5").unwrap();

        assert_eq!(total, money("70700"));
    }

    #[test]
    fn ratio() {
        let ratio = money("1400").ratio_to(money("1500")).unwrap();

        assert!((ratio - 14.0 / 15.0).abs() < 1e-9);
        assert_eq!(money("1").ratio_to(Money::ZERO), None);
    }

    #[test]
    fn positivity() {
        assert!(money("0.01").is_positive());
        assert!(!Money::ZERO.is_positive());
        assert!(!money("-5").is_positive());
    }
}
