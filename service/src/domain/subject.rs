//! Subject (individual animal) definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, DateTimeOf, Weight};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{farm, transaction};

/// Read-only view of an animal, as reported by the herd management.
#[derive(Clone, Debug)]
pub struct Snapshot {
    /// ID of the described subject.
    pub id: Id,

    /// ID of the [`Farm`] the subject belongs to.
    ///
    /// [`Farm`]: crate::domain::Farm
    pub farm_id: farm::Id,

    /// [`Breed`] of the subject, if known.
    pub breed: Option<Breed>,

    /// Last measured [`Weight`] of the subject, if any.
    pub current_weight: Option<Weight>,

    /// [`Weight`] the subject had when it entered the herd, if known.
    pub initial_weight: Option<Weight>,

    /// [`DateTime`] of the last weighing, if any.
    pub weighed_at: Option<WeighingDateTime>,

    /// [`DateTime`] the subject was born at, if known.
    pub born_at: Option<BirthDateTime>,

    /// [`Health`] flag of the subject, if known.
    pub health: Option<Health>,

    /// [`DateTime`] the subject was sold at, if it was.
    pub sold_at: Option<SaleDateTime>,
}

impl Snapshot {
    /// Creates a [`Snapshot`] knowing nothing about the subject beyond its
    /// identity.
    #[must_use]
    pub const fn unknown(id: Id, farm_id: farm::Id) -> Self {
        Self {
            id,
            farm_id,
            breed: None,
            current_weight: None,
            initial_weight: None,
            weighed_at: None,
            born_at: None,
            health: None,
            sold_at: None,
        }
    }

    /// Resolves the [`Weight`] of the subject, falling back to the
    /// `declared` one (of a listing, for example) and then to the initial
    /// one.
    #[must_use]
    pub fn resolve_weight(
        &self,
        declared: Option<Weight>,
    ) -> Option<ResolvedWeight> {
        self.current_weight
            .map(|weight| ResolvedWeight {
                weight,
                confidence: Confidence::Measured,
            })
            .or_else(|| {
                declared.map(|weight| ResolvedWeight {
                    weight,
                    confidence: Confidence::Declared,
                })
            })
            .or_else(|| {
                self.initial_weight.map(|weight| ResolvedWeight {
                    weight,
                    confidence: Confidence::Initial,
                })
            })
    }

    /// Resolves the [`Breed`] of the subject, falling back to the `declared`
    /// one.
    #[must_use]
    pub fn resolve_breed<'b>(
        &'b self,
        declared: Option<&'b Breed>,
    ) -> Option<&'b Breed> {
        self.breed.as_ref().or(declared)
    }

    /// Returns the age of the subject in whole months at the provided
    /// [`DateTime`], if its birth date is known.
    #[must_use]
    pub fn age_in_months<Of: ?Sized>(&self, at: DateTimeOf<Of>) -> Option<i32> {
        self.born_at.map(|born| at.months_since(born))
    }

    /// Indicates whether the subject is in a state allowing it to be sold.
    #[must_use]
    pub fn is_sellable(&self) -> bool {
        self.sold_at.is_none() && self.health.map_or(true, Health::is_sellable)
    }
}

/// [`Weight`] resolved out of a [`Snapshot`] with its [`Confidence`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ResolvedWeight {
    /// Resolved [`Weight`].
    pub weight: Weight,

    /// [`Confidence`] of the resolved [`Weight`].
    pub confidence: Confidence,
}

/// Confidence tier of a [`ResolvedWeight`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Confidence {
    /// Weight measured on the subject itself.
    Measured,

    /// Weight declared by the seller.
    Declared,

    /// Weight the subject had when it entered the herd.
    Initial,
}

/// Record of a subject leaving the herd because of a completed sale.
#[derive(Clone, Copy, Debug)]
pub struct Sold {
    /// ID of the sold subject.
    pub subject_id: Id,

    /// ID of the [`Transaction`] the subject was sold by.
    ///
    /// [`Transaction`]: crate::domain::Transaction
    pub transaction_id: transaction::Id,

    /// [`DateTime`] of the sale.
    pub sold_at: SaleDateTime,
}

/// ID of a subject.
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

/// Breed (race) of an animal.
///
/// Compared case-insensitively.
#[derive(AsRef, Clone, Debug, Display)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Breed(String);

impl Breed {
    /// Creates a new [`Breed`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Breed`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && !name.is_empty() && name.len() <= 128
    }
}

impl PartialEq for Breed {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_lowercase() == other.0.to_lowercase()
    }
}

impl Eq for Breed {}

impl FromStr for Breed {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Breed`")
    }
}

define_kind! {
    #[doc = "Health flag of a subject."]
    enum Health {
        #[doc = "Nothing prevents the subject from being sold."]
        Healthy = 1,

        #[doc = "Subject is under a medical treatment."]
        UnderTreatment = 2,

        #[doc = "Subject is quarantined."]
        Quarantined = 3,
    }
}

impl Health {
    /// Indicates whether a subject with this [`Health`] may be sold.
    #[must_use]
    pub const fn is_sellable(self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Marker of a subject birth.
#[derive(Clone, Copy, Debug)]
pub struct Birth;

/// Marker of a subject weighing.
#[derive(Clone, Copy, Debug)]
pub struct Weighing;

/// Marker of a subject sale.
#[derive(Clone, Copy, Debug)]
pub struct Sale;

/// [`DateTime`] when a subject was born.
pub type BirthDateTime = DateTimeOf<(Snapshot, Birth)>;

/// [`DateTime`] when a subject was weighed.
pub type WeighingDateTime = DateTimeOf<(Snapshot, Weighing)>;

/// [`DateTime`] when a subject was sold.
pub type SaleDateTime = DateTimeOf<(Snapshot, Sale)>;

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use common::Weight;

    use crate::domain::farm;

    use super::{Breed, Confidence, Health, Id, Snapshot};

    fn kg(v: &str) -> Weight {
        Weight::from_str(v).unwrap()
    }

    #[test]
    fn resolves_weight_in_order() {
        let mut snapshot = Snapshot::unknown(Id::new(), farm::Id::new());
        assert_eq!(snapshot.resolve_weight(None), None);

        snapshot.initial_weight = Some(kg("20"));
        let resolved = snapshot.resolve_weight(None).unwrap();
        assert_eq!(resolved.weight, kg("20"));
        assert_eq!(resolved.confidence, Confidence::Initial);

        let resolved = snapshot.resolve_weight(Some(kg("45"))).unwrap();
        assert_eq!(resolved.weight, kg("45"));
        assert_eq!(resolved.confidence, Confidence::Declared);

        snapshot.current_weight = Some(kg("50"));
        let resolved = snapshot.resolve_weight(Some(kg("45"))).unwrap();
        assert_eq!(resolved.weight, kg("50"));
        assert_eq!(resolved.confidence, Confidence::Measured);
    }

    #[test]
    fn resolves_breed_from_snapshot_first() {
        let declared = Breed::new("Duroc").unwrap();
        let mut snapshot = Snapshot::unknown(Id::new(), farm::Id::new());
        assert_eq!(snapshot.resolve_breed(Some(&declared)), Some(&declared));

        snapshot.breed = Breed::new("Landrace");
        assert_eq!(
            snapshot.resolve_breed(Some(&declared)),
            Breed::new("Landrace").as_ref(),
        );
    }

    #[test]
    fn breed_compares_case_insensitively() {
        assert_eq!(Breed::from_str("Landrace"), Breed::from_str("LANDRACE"));
        assert_ne!(Breed::from_str("Landrace"), Breed::from_str("Duroc"));
        assert!(Breed::new(" Landrace").is_none());
        assert!(Breed::new("").is_none());
    }

    #[test]
    fn only_healthy_subjects_are_sellable() {
        let mut snapshot = Snapshot::unknown(Id::new(), farm::Id::new());
        assert!(snapshot.is_sellable());

        snapshot.health = Some(Health::Healthy);
        assert!(snapshot.is_sellable());

        snapshot.health = Some(Health::UnderTreatment);
        assert!(!snapshot.is_sellable());

        snapshot.health = Some(Health::Quarantined);
        assert!(!snapshot.is_sellable());
    }
}
