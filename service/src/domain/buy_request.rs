//! [`BuyRequest`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{
    define_kind, unit, Coordinates, DateTimeOf, Distance, Money, Weight,
};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{subject, user};

/// Buyer-authored structured want-ad.
#[derive(Clone, Debug)]
pub struct BuyRequest {
    /// ID of this [`BuyRequest`].
    pub id: Id,

    /// ID of the user willing to buy.
    pub buyer_id: user::Id,

    /// Wanted [`subject::Breed`], if any breed is not fine.
    pub breed: Option<subject::Breed>,

    /// Acceptable [`WeightRange`] per head.
    pub weight: WeightRange,

    /// Acceptable [`AgeWindow`], if age matters.
    pub age: Option<AgeWindow>,

    /// Number of animals wanted.
    pub quantity: Quantity,

    /// Where the animals should be delivered, if it matters.
    pub delivery: Option<Delivery>,

    /// Maximum price per kilogram of live weight, if any.
    pub max_price_per_kg: Option<Money>,

    /// Maximum price of a whole animal, if any.
    pub max_total_price: Option<Money>,

    /// [`Status`] of this [`BuyRequest`].
    pub status: Status,

    /// [`DateTime`] when this [`BuyRequest`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`BuyRequest`] stops being published.
    pub expires_at: ExpirationDateTime,
}

impl BuyRequest {
    /// Indicates whether this [`BuyRequest`] is past its expiration at the
    /// provided [`DateTime`].
    #[must_use]
    pub fn is_due<Of: ?Sized>(&self, at: DateTimeOf<Of>) -> bool {
        self.expires_at <= at.coerce()
    }

    /// Indicates whether this [`BuyRequest`] is published and not yet due at
    /// the provided [`DateTime`].
    #[must_use]
    pub fn is_open<Of: ?Sized>(&self, at: DateTimeOf<Of>) -> bool {
        self.status == Status::Published && !self.is_due(at)
    }

    /// Marks this [`BuyRequest`] as fulfilled by an accepted offer.
    ///
    /// # Errors
    ///
    /// With the current [`Status`] if it's not [`Status::Published`].
    pub fn fulfill(&mut self) -> Result<(), Status> {
        self.transition(Status::Published, Status::Fulfilled)
    }

    /// Archives this [`BuyRequest`].
    ///
    /// # Errors
    ///
    /// With the current [`Status`] if it's not [`Status::Published`].
    pub fn archive(&mut self) -> Result<(), Status> {
        self.transition(Status::Published, Status::Archived)
    }

    /// Restores this archived [`BuyRequest`].
    ///
    /// # Errors
    ///
    /// With the current [`Status`] if it's not [`Status::Archived`].
    pub fn restore(&mut self) -> Result<(), Status> {
        self.transition(Status::Archived, Status::Published)
    }

    /// Expires this [`BuyRequest`].
    ///
    /// # Errors
    ///
    /// With the current [`Status`] if it's not [`Status::Published`].
    pub fn expire(&mut self) -> Result<(), Status> {
        self.transition(Status::Published, Status::Expired)
    }

    /// Moves this [`BuyRequest`] `from` one [`Status`] `to` another.
    fn transition(&mut self, from: Status, to: Status) -> Result<(), Status> {
        if self.status != from {
            return Err(self.status);
        }
        self.status = to;
        Ok(())
    }
}

/// Inclusive range of acceptable [`Weight`]s.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WeightRange {
    /// Lower bound.
    min: Weight,

    /// Upper bound.
    max: Weight,
}

impl WeightRange {
    /// Creates a new [`WeightRange`] if `min` doesn't exceed `max`.
    #[must_use]
    pub fn new(min: Weight, max: Weight) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }

    /// Returns the lower bound of this [`WeightRange`].
    #[must_use]
    pub const fn min(self) -> Weight {
        self.min
    }

    /// Returns the upper bound of this [`WeightRange`].
    #[must_use]
    pub const fn max(self) -> Weight {
        self.max
    }

    /// Indicates whether the provided [`Weight`] lies in this
    /// [`WeightRange`].
    #[must_use]
    pub fn contains(self, weight: Weight) -> bool {
        self.min <= weight && weight <= self.max
    }
}

/// Acceptable age of the wanted animals.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AgeWindow {
    /// Any age inside the [`AgeCategory`].
    Category(AgeCategory),

    /// Explicit bounds in whole months, both inclusive.
    Months {
        /// Minimal age, if any.
        min: Option<u16>,

        /// Maximal age, if any.
        max: Option<u16>,
    },
}

impl AgeWindow {
    /// Indicates whether this [`AgeWindow`] is well-formed.
    #[must_use]
    pub fn is_valid(self) -> bool {
        match self {
            Self::Category(_) => true,
            Self::Months { min, max } => {
                min.zip(max).map_or(true, |(min, max)| min <= max)
            }
        }
    }

    /// Indicates whether the provided age in months fits this
    /// [`AgeWindow`].
    #[must_use]
    pub fn contains(self, months: i32) -> bool {
        let (min, max) = match self {
            Self::Category(c) => c.bounds(),
            Self::Months { min, max } => (min.unwrap_or(0), max),
        };
        months >= i32::from(min)
            && max.map_or(true, |max| months <= i32::from(max))
    }
}

define_kind! {
    #[doc = "Age category of an animal."]
    enum AgeCategory {
        #[doc = "Up to 3 months old."]
        Young = 1,

        #[doc = "From 4 up to 6 months old."]
        Finishing = 2,

        #[doc = "7 months old and more."]
        Finished = 3,
    }
}

impl AgeCategory {
    /// Returns bounds of this [`AgeCategory`] in whole months, both
    /// inclusive.
    #[must_use]
    pub const fn bounds(self) -> (u16, Option<u16>) {
        match self {
            Self::Young => (0, Some(3)),
            Self::Finishing => (4, Some(6)),
            Self::Finished => (7, None),
        }
    }
}

/// Number of wanted animals, at least one.
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd,
)]
pub struct Quantity(u32);

impl Quantity {
    /// Creates a new [`Quantity`] if it's positive.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        if value == 0 {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Returns this [`Quantity`] as a plain number.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Delivery constraint of a [`BuyRequest`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Delivery {
    /// [`Coordinates`] to deliver the animals to.
    pub location: Coordinates,

    /// Maximal [`Distance`] from the [`Delivery::location`], if not the
    /// default one.
    pub radius: Option<Distance>,
}

/// ID of a [`BuyRequest`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_kind! {
    #[doc = "Status of a [`BuyRequest`]."]
    enum Status {
        #[doc = "[`BuyRequest`] is visible and open for offers."]
        Published = 1,

        #[doc = "Offer on the [`BuyRequest`] is accepted."]
        Fulfilled = 2,

        #[doc = "[`BuyRequest`] is past its expiration."]
        Expired = 3,

        #[doc = "[`BuyRequest`] is hidden by its buyer."]
        Archived = 4,

        #[doc = "[`BuyRequest`] is cancelled by its buyer."]
        Cancelled = 5,
    }
}

/// [`DateTime`] when a [`BuyRequest`] was created.
pub type CreationDateTime = DateTimeOf<(BuyRequest, unit::Creation)>;

/// [`DateTime`] when a [`BuyRequest`] expires.
pub type ExpirationDateTime = DateTimeOf<(BuyRequest, unit::Expiration)>;

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use common::Weight;

    use super::{AgeCategory, AgeWindow, Quantity, WeightRange};

    fn kg(v: &str) -> Weight {
        Weight::from_str(v).unwrap()
    }

    #[test]
    fn weight_range_is_inclusive() {
        let range = WeightRange::new(kg("40"), kg("60")).unwrap();

        assert!(range.contains(kg("40")));
        assert!(range.contains(kg("60")));
        assert!(range.contains(kg("50.5")));
        assert!(!range.contains(kg("39.99")));
        assert!(!range.contains(kg("60.01")));
    }

    #[test]
    fn weight_range_rejects_inverted_bounds() {
        assert!(WeightRange::new(kg("60"), kg("40")).is_none());
        assert!(WeightRange::new(kg("50"), kg("50")).is_some());
    }

    #[test]
    fn age_categories() {
        let young = AgeWindow::Category(AgeCategory::Young);
        let finishing = AgeWindow::Category(AgeCategory::Finishing);
        let finished = AgeWindow::Category(AgeCategory::Finished);

        assert!(young.contains(0));
        assert!(young.contains(3));
        assert!(!young.contains(4));
        assert!(finishing.contains(4));
        assert!(finishing.contains(6));
        assert!(!finishing.contains(7));
        assert!(finished.contains(7));
        assert!(finished.contains(40));
        assert!(!finished.contains(6));
    }

    #[test]
    fn explicit_months() {
        let window = AgeWindow::Months {
            min: Some(2),
            max: Some(5),
        };
        assert!(window.is_valid());
        assert!(window.contains(2));
        assert!(window.contains(5));
        assert!(!window.contains(1));
        assert!(!window.contains(6));

        let open = AgeWindow::Months {
            min: None,
            max: Some(5),
        };
        assert!(open.contains(0));
        assert!(!open.contains(-1));

        assert!(!AgeWindow::Months {
            min: Some(6),
            max: Some(5),
        }
        .is_valid());
    }

    #[test]
    fn quantity_is_positive() {
        assert!(Quantity::new(0).is_none());
        assert_eq!(Quantity::new(3).map(Quantity::get), Some(3));
    }
}
