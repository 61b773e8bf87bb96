//! [`Transaction`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{offer, subject, user, Offer, Role};

/// Settlement record of an accepted [`Offer`].
#[derive(Clone, Debug)]
pub struct Transaction {
    /// ID of this [`Transaction`].
    pub id: Id,

    /// ID of the accepted [`Offer`].
    pub offer_id: offer::Id,

    /// What the accepted [`Offer`] was made on.
    pub reference: offer::Reference,

    /// IDs of the traded subjects.
    pub subject_ids: Vec<subject::Id>,

    /// ID of the buying user.
    pub buyer_id: user::Id,

    /// ID of the selling user.
    pub seller_id: user::Id,

    /// Agreed price.
    pub final_price: Money,

    /// [`Status`] of this [`Transaction`].
    pub status: Status,

    /// Delivery [`Confirmation`]s given so far.
    pub confirmation: Confirmation,

    /// [`DateTime`] when this [`Transaction`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Transaction`] was completed, if it was.
    pub completed_at: Option<CompletionDateTime>,
}

impl Transaction {
    /// Opens a new [`Transaction`] for the provided accepted [`Offer`].
    #[must_use]
    pub fn open(offer: &Offer) -> Self {
        Self {
            id: Id::new(),
            offer_id: offer.id,
            reference: offer.reference,
            subject_ids: offer.subjects.to_vec(),
            buyer_id: offer.buyer_id,
            seller_id: offer.seller_id,
            final_price: offer.price,
            status: Status::Confirmed,
            confirmation: Confirmation::default(),
            created_at: CreationDateTime::now(),
            completed_at: None,
        }
    }

    /// Returns ID of the user taking the provided [`Role`].
    #[must_use]
    pub const fn party_id(&self, role: Role) -> user::Id {
        match role {
            Role::Buyer => self.buyer_id,
            Role::Seller => self.seller_id,
        }
    }

    /// Records the delivery confirmation of the provided [`Role`],
    /// completing this [`Transaction`] once both sides confirmed.
    ///
    /// # Errors
    ///
    /// With the current [`Status`] if this [`Transaction`] is cancelled.
    pub fn confirm(
        &mut self,
        role: Role,
        at: CompletionDateTime,
    ) -> Result<Confirmed, Status> {
        if self.status == Status::Cancelled {
            return Err(self.status);
        }

        let flag = match role {
            Role::Buyer => &mut self.confirmation.buyer,
            Role::Seller => &mut self.confirmation.seller,
        };
        if *flag {
            return Ok(Confirmed::Already);
        }
        *flag = true;

        if !self.confirmation.is_complete() {
            return Ok(Confirmed::AwaitingCounterparty);
        }
        self.status = Status::Completed;
        self.completed_at = Some(at);
        Ok(Confirmed::Completed)
    }
}

/// Outcome of a [`Transaction::confirm()`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Confirmed {
    /// The [`Role`] has confirmed before, nothing changed.
    Already,

    /// Confirmation is recorded, the other side is yet to confirm.
    AwaitingCounterparty,

    /// Both sides confirmed, the [`Transaction`] is completed just now.
    Completed,
}

/// Delivery confirmations of a [`Transaction`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Confirmation {
    /// Indicator whether the buyer confirmed the delivery.
    pub buyer: bool,

    /// Indicator whether the seller confirmed the delivery.
    pub seller: bool,
}

impl Confirmation {
    /// Indicates whether both sides confirmed.
    #[must_use]
    pub const fn is_complete(self) -> bool {
        self.buyer && self.seller
    }
}

/// ID of a [`Transaction`].
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
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_kind! {
    #[doc = "Status of a [`Transaction`]."]
    enum Status {
        #[doc = "Offer is accepted, delivery is pending."]
        Confirmed = 1,

        #[doc = "Both sides confirmed the delivery."]
        Completed = 2,

        #[doc = "[`Transaction`] is called off."]
        Cancelled = 3,
    }
}

/// [`DateTime`] when a [`Transaction`] was created.
pub type CreationDateTime = DateTimeOf<(Transaction, unit::Creation)>;

/// [`DateTime`] when a [`Transaction`] was completed.
pub type CompletionDateTime = DateTimeOf<(Transaction, unit::Completion)>;

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use common::Money;

    use crate::domain::{listing, offer, subject, user, Role};

    use super::{
        CompletionDateTime, Confirmation, Confirmed, Id, Status, Transaction,
    };

    fn transaction() -> Transaction {
        Transaction {
            id: Id::new(),
            offer_id: offer::Id::new(),
            reference: offer::Reference::Listing(listing::Id::new()),
            subject_ids: vec![subject::Id::new()],
            buyer_id: user::Id::new(),
            seller_id: user::Id::new(),
            final_price: Money::from_str("70000").unwrap(),
            status: Status::Confirmed,
            confirmation: Confirmation::default(),
            created_at: super::CreationDateTime::now(),
            completed_at: None,
        }
    }

    #[test]
    fn completes_on_both_confirmations() {
        let mut t = transaction();
        let now = CompletionDateTime::now();

        assert_eq!(
            t.confirm(Role::Seller, now),
            Ok(Confirmed::AwaitingCounterparty),
        );
        assert_eq!(t.status, Status::Confirmed);
        assert!(t.completed_at.is_none());

        assert_eq!(t.confirm(Role::Buyer, now), Ok(Confirmed::Completed));
        assert_eq!(t.status, Status::Completed);
        assert_eq!(t.completed_at, Some(now));
    }

    #[test]
    fn repeated_confirmation_is_noop() {
        let mut t = transaction();
        let now = CompletionDateTime::now();

        _ = t.confirm(Role::Buyer, now).unwrap();
        assert_eq!(t.confirm(Role::Buyer, now), Ok(Confirmed::Already));
        assert_eq!(t.status, Status::Confirmed);

        _ = t.confirm(Role::Seller, now).unwrap();
        assert_eq!(t.confirm(Role::Seller, now), Ok(Confirmed::Already));
        assert_eq!(t.confirm(Role::Buyer, now), Ok(Confirmed::Already));
        assert_eq!(t.status, Status::Completed);
    }

    #[test]
    fn cancelled_cannot_be_confirmed() {
        let mut t = transaction();
        t.status = Status::Cancelled;

        assert_eq!(
            t.confirm(Role::Buyer, CompletionDateTime::now()),
            Err(Status::Cancelled),
        );
    }
}
