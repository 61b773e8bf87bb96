//! [`Weight`] definitions.

use std::{fmt, str::FromStr};

#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;

/// Live weight of an animal or a batch, in kilograms.
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
pub struct Weight(Decimal);

impl Weight {
    /// Creates a new [`Weight`] out of the provided kilograms.
    ///
    /// [`None`] is returned if the value is negative.
    #[must_use]
    pub fn new(kg: Decimal) -> Option<Self> {
        (kg >= Decimal::ZERO).then_some(Self(kg))
    }

    /// Returns this [`Weight`] in kilograms.
    #[must_use]
    pub const fn kg(self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}kg", self.0.normalize())
    }
}

impl FromStr for Weight {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let kg = Decimal::from_str(s.strip_suffix("kg").unwrap_or(s).trim())
            .map_err(|_| "invalid weight")?;
        Self::new(kg).ok_or("negative weight")
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use rust_decimal::Decimal;

    use super::Weight;

    #[test]
    fn rejects_negative() {
        assert!(Weight::new(Decimal::NEGATIVE_ONE).is_none());
        assert!(Weight::new(Decimal::ZERO).is_some());
    }

    #[test]
    fn from_str() {
        assert_eq!(Weight::from_str("50").unwrap().kg(), Decimal::from(50));
        assert_eq!(
            Weight::from_str("50.5kg").unwrap().kg(),
            Decimal::new(505, 1),
        );
        assert!(Weight::from_str("-1").is_err());
        assert!(Weight::from_str("heavy").is_err());
    }

    #[test]
    fn to_string() {
        assert_eq!(Weight::from_str("50.50").unwrap().to_string(), "50.5kg");
    }
}
