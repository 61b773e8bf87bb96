//! [`Listing`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, Coordinates, DateTimeOf, Money, Weight};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{farm, subject, user, Farm};

/// Seller-authored offer to sell a single animal or a batch of them.
#[derive(Clone, Debug)]
pub struct Listing {
    /// ID of this [`Listing`].
    pub id: Id,

    /// ID of the user selling the animals.
    pub seller_id: user::Id,

    /// ID of the [`Farm`] the animals are raised on.
    pub farm_id: farm::Id,

    /// What exactly is sold by this [`Listing`].
    pub kind: Kind,

    /// [`subject::Breed`] declared by the seller, if any.
    pub breed: Option<subject::Breed>,

    /// Asked price per kilogram of live weight.
    pub price_per_kg: Money,

    /// Weight per head declared by the seller, if any.
    pub current_weight: Option<Weight>,

    /// [`DateTime`] the declared weight was measured at, if known.
    pub weighed_at: Option<subject::WeighingDateTime>,

    /// [`Coordinates`] the animals may be picked up at, if known.
    pub location: Option<Coordinates>,

    /// [`Status`] of this [`Listing`].
    pub status: Status,

    /// Number of offers ever made on this [`Listing`].
    pub inquiries: u32,

    /// [`DateTime`] when this [`Listing`] was created.
    pub created_at: CreationDateTime,
}

impl Listing {
    /// Returns IDs of all the subjects sold by this [`Listing`].
    #[must_use]
    pub fn subject_ids(&self) -> &[subject::Id] {
        self.kind.subject_ids()
    }

    /// Indicates whether all the provided subjects are sold by this
    /// [`Listing`].
    #[must_use]
    pub fn contains_all(&self, ids: &[subject::Id]) -> bool {
        ids.iter().all(|id| self.subject_ids().contains(id))
    }

    /// Indicates whether the provided user owns this [`Listing`], either as
    /// its seller or as the owner of its [`Farm`].
    #[must_use]
    pub fn is_owned_by(&self, user_id: user::Id, farm: Option<&Farm>) -> bool {
        self.seller_id == user_id
            || farm.is_some_and(|f| {
                f.id == self.farm_id && f.owner_id == user_id
            })
    }

    /// Indicates whether new offers may be made on this [`Listing`].
    #[must_use]
    pub const fn accepts_offers(&self) -> bool {
        matches!(self.status, Status::Available | Status::Reserved)
    }

    /// Reserves this [`Listing`] for an accepted offer.
    ///
    /// # Errors
    ///
    /// With the current [`Status`] if it's not [`Status::Available`].
    pub fn reserve(&mut self) -> Result<(), Status> {
        self.transition(Status::Available, Status::Reserved)
    }

    /// Marks this reserved [`Listing`] as sold.
    ///
    /// # Errors
    ///
    /// With the current [`Status`] if it's not [`Status::Reserved`].
    pub fn sell(&mut self) -> Result<(), Status> {
        self.transition(Status::Reserved, Status::Sold)
    }

    /// Removes this [`Listing`] from the marketplace.
    ///
    /// # Errors
    ///
    /// With the current [`Status`] if it's not [`Status::Available`].
    pub fn remove(&mut self) -> Result<(), Status> {
        self.transition(Status::Available, Status::Removed)
    }

    /// Moves this [`Listing`] `from` one [`Status`] `to` another.
    fn transition(&mut self, from: Status, to: Status) -> Result<(), Status> {
        if self.status != from {
            return Err(self.status);
        }
        self.status = to;
        Ok(())
    }
}

/// What is sold by a [`Listing`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Kind {
    /// Single animal.
    Individual {
        /// ID of the sold subject.
        subject_id: subject::Id,
    },

    /// Group of animals sold together.
    Batch {
        /// ID of the batch.
        batch_id: BatchId,

        /// IDs of the subjects in the batch.
        subject_ids: Vec<subject::Id>,
    },
}

impl Kind {
    /// Returns IDs of the subjects of this [`Kind`].
    #[must_use]
    pub fn subject_ids(&self) -> &[subject::Id] {
        match self {
            Self::Individual { subject_id } => std::slice::from_ref(subject_id),
            Self::Batch { subject_ids, .. } => subject_ids,
        }
    }

    /// Returns the [`BatchId`] of this [`Kind`], if it's a batch.
    #[must_use]
    pub const fn batch_id(&self) -> Option<BatchId> {
        match self {
            Self::Individual { .. } => None,
            Self::Batch { batch_id, .. } => Some(*batch_id),
        }
    }
}

/// ID of a [`Listing`].
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

/// ID of a batch of subjects sold by a [`Listing`].
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
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct BatchId(Uuid);

impl BatchId {
    /// Creates a new random [`BatchId`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_kind! {
    #[doc = "Status of a [`Listing`]."]
    enum Status {
        #[doc = "[`Listing`] is open for offers."]
        Available = 1,

        #[doc = "Offer on the [`Listing`] is accepted, delivery is pending."]
        Reserved = 2,

        #[doc = "Animals of the [`Listing`] are delivered."]
        Sold = 3,

        #[doc = "[`Listing`] is withdrawn by its seller."]
        Removed = 4,
    }
}

/// [`DateTime`] when a [`Listing`] was created.
pub type CreationDateTime = DateTimeOf<(Listing, unit::Creation)>;

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use common::Money;

    use crate::domain::{farm, subject, user, Farm};

    use super::{Id, Kind, Listing, Status};

    fn listing() -> Listing {
        Listing {
            id: Id::new(),
            seller_id: user::Id::new(),
            farm_id: farm::Id::new(),
            kind: Kind::Individual {
                subject_id: subject::Id::new(),
            },
            breed: None,
            price_per_kg: Money::from_str("1400").unwrap(),
            current_weight: None,
            weighed_at: None,
            location: None,
            status: Status::Available,
            inquiries: 0,
            created_at: super::CreationDateTime::now(),
        }
    }

    #[test]
    fn moves_forward_only() {
        let mut l = listing();
        assert_eq!(l.sell(), Err(Status::Available));

        l.reserve().unwrap();
        assert_eq!(l.status, Status::Reserved);
        assert_eq!(l.reserve(), Err(Status::Reserved));
        assert_eq!(l.remove(), Err(Status::Reserved));

        l.sell().unwrap();
        assert_eq!(l.status, Status::Sold);
        assert_eq!(l.reserve(), Err(Status::Sold));
    }

    #[test]
    fn removes_only_available() {
        let mut l = listing();
        l.remove().unwrap();

        assert_eq!(l.status, Status::Removed);
        assert!(!l.accepts_offers());
        assert_eq!(l.reserve(), Err(Status::Removed));
    }

    #[test]
    fn owned_by_seller_or_farm_owner() {
        let l = listing();
        let farm = Farm {
            id: l.farm_id,
            owner_id: user::Id::new(),
        };
        let other_farm = Farm {
            id: farm::Id::new(),
            owner_id: user::Id::new(),
        };

        assert!(l.is_owned_by(l.seller_id, None));
        assert!(l.is_owned_by(farm.owner_id, Some(&farm)));
        assert!(!l.is_owned_by(other_farm.owner_id, Some(&other_farm)));
        assert!(!l.is_owned_by(user::Id::new(), Some(&farm)));
    }

    #[test]
    fn batch_contains_its_subjects() {
        let ids = vec![subject::Id::new(), subject::Id::new()];
        let mut l = listing();
        l.kind = Kind::Batch {
            batch_id: super::BatchId::new(),
            subject_ids: ids.clone(),
        };

        assert!(l.contains_all(&ids));
        assert!(l.contains_all(&ids[..1]));
        assert!(!l.contains_all(&[ids[0], subject::Id::new()]));
    }
}
