//! [`Offer`] definitions.

use std::{collections::BTreeSet, time::Duration};

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money};
use derive_more::{AsRef, Deref, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{buy_request, listing, subject, user, Role};
#[cfg(doc)]
use crate::domain::{BuyRequest, Listing};

/// Concrete price proposal between one buyer and one seller.
#[derive(Clone, Debug)]
pub struct Offer {
    /// ID of this [`Offer`].
    pub id: Id,

    /// What this [`Offer`] is made on.
    pub reference: Reference,

    /// ID of the buying user.
    pub buyer_id: user::Id,

    /// ID of the selling user.
    pub seller_id: user::Id,

    /// [`Role`] of the user who made this [`Offer`].
    pub offered_by: Role,

    /// [`Subjects`] this [`Offer`] is made for.
    pub subjects: Subjects,

    /// Proposed price for all the [`Subjects`].
    pub price: Money,

    /// Proposed price per kilogram of live weight, if any.
    pub price_per_kg: Option<Money>,

    /// Free-form [`Message`] to the counterparty, if any.
    pub message: Option<Message>,

    /// [`Status`] of this [`Offer`].
    pub status: Status,

    /// [`DateTime`] when this [`Offer`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Offer`] left the [`Status::Pending`] state.
    pub responded_at: Option<ResponseDateTime>,

    /// [`DateTime`] after which this [`Offer`] cannot be accepted anymore.
    pub expires_at: ExpirationDateTime,

    /// ID of the [`Offer`] this one counters, if any.
    pub countered_offer_id: Option<Id>,
}

impl Offer {
    /// Returns ID of the user who made this [`Offer`].
    #[must_use]
    pub const fn offerer_id(&self) -> user::Id {
        self.party_id(self.offered_by)
    }

    /// Returns ID of the user this [`Offer`] is addressed to.
    #[must_use]
    pub const fn counterparty_id(&self) -> user::Id {
        self.party_id(self.offered_by.other())
    }

    /// Returns ID of the user taking the provided [`Role`].
    #[must_use]
    pub const fn party_id(&self, role: Role) -> user::Id {
        match role {
            Role::Buyer => self.buyer_id,
            Role::Seller => self.seller_id,
        }
    }

    /// Indicates whether this [`Offer`] shares any subject with the provided
    /// ones.
    #[must_use]
    pub fn overlaps(&self, subjects: &Subjects) -> bool {
        !self.subjects.is_disjoint(subjects)
    }

    /// Indicates whether this [`Offer`] is past its expiration at the
    /// provided [`DateTime`].
    #[must_use]
    pub fn is_due<Of: ?Sized>(&self, at: DateTimeOf<Of>) -> bool {
        self.expires_at <= at.coerce()
    }

    /// Indicates whether this [`Offer`] is pending and not yet due at the
    /// provided [`DateTime`].
    #[must_use]
    pub fn is_active<Of: ?Sized>(&self, at: DateTimeOf<Of>) -> bool {
        self.status == Status::Pending && !self.is_due(at)
    }

    /// Moves this pending [`Offer`] into the provided final [`Status`].
    ///
    /// # Errors
    ///
    /// With the current [`Status`] if it's not [`Status::Pending`].
    pub fn respond(
        &mut self,
        status: Status,
        at: ResponseDateTime,
    ) -> Result<(), Status> {
        if self.status != Status::Pending {
            return Err(self.status);
        }
        self.status = status;
        self.responded_at = Some(at);
        Ok(())
    }

    /// Expires this [`Offer`] if it's pending and past its expiration.
    ///
    /// Returns whether this [`Offer`] was expired.
    pub fn expire_if_due(&mut self, at: ResponseDateTime) -> bool {
        self.status == Status::Pending
            && self.is_due(at)
            && self.respond(Status::Expired, at).is_ok()
    }

    /// Creates a counter [`Offer`] to this one, made by its counterparty.
    #[must_use]
    pub fn counter(
        &self,
        price: Money,
        price_per_kg: Option<Money>,
        message: Option<Message>,
        ttl: Duration,
    ) -> Self {
        let created_at = CreationDateTime::now();
        Self {
            id: Id::new(),
            reference: self.reference,
            buyer_id: self.buyer_id,
            seller_id: self.seller_id,
            offered_by: self.offered_by.other(),
            subjects: self.subjects.clone(),
            price,
            price_per_kg,
            message,
            status: Status::Pending,
            created_at,
            responded_at: None,
            expires_at: (created_at + ttl).coerce(),
            countered_offer_id: Some(self.id),
        }
    }
}

/// Entity an [`Offer`] is made on.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Reference {
    /// [`Listing`] the buyer makes an [`Offer`] on.
    Listing(listing::Id),

    /// [`BuyRequest`] the seller makes an [`Offer`] on.
    BuyRequest(buy_request::Id),
}

impl Reference {
    /// Returns the [`Role`] offering on this [`Reference`] first.
    #[must_use]
    pub const fn offering_role(self) -> Role {
        match self {
            Self::Listing(_) => Role::Buyer,
            Self::BuyRequest(_) => Role::Seller,
        }
    }
}

/// Non-empty set of subjects an [`Offer`] is made for.
#[derive(Clone, Debug, Deref, Eq, PartialEq)]
pub struct Subjects(BTreeSet<subject::Id>);

impl Subjects {
    /// Creates new [`Subjects`] out of the provided IDs, deduplicating them.
    ///
    /// [`None`] is returned if no IDs are provided.
    #[must_use]
    pub fn new(ids: impl IntoIterator<Item = subject::Id>) -> Option<Self> {
        let ids: BTreeSet<_> = ids.into_iter().collect();
        (!ids.is_empty()).then_some(Self(ids))
    }

    /// Returns these [`Subjects`] as a [`Vec`] of IDs.
    #[must_use]
    pub fn to_vec(&self) -> Vec<subject::Id> {
        self.0.iter().copied().collect()
    }
}

/// Message attached to an [`Offer`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Message(String);

impl Message {
    /// Creates a new [`Message`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        Self::check(&text).then_some(Self(text))
    }

    /// Checks whether the given `text` is a valid [`Message`].
    fn check(text: impl AsRef<str>) -> bool {
        let text = text.as_ref();
        !text.trim().is_empty() && text.chars().count() <= 2048
    }
}

impl FromStr for Message {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Message`")
    }
}

/// ID of an [`Offer`].
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
    #[doc = "Status of an [`Offer`]."]
    enum Status {
        #[doc = "[`Offer`] awaits a response."]
        Pending = 1,

        #[doc = "[`Offer`] is accepted by its counterparty."]
        Accepted = 2,

        #[doc = "[`Offer`] is rejected by its counterparty."]
        Rejected = 3,

        #[doc = "[`Offer`] is withdrawn by its author."]
        Withdrawn = 4,

        #[doc = "[`Offer`] is past its expiration or its subjects are gone."]
        Expired = 5,

        #[doc = "[`Offer`] is answered with a counter [`Offer`]."]
        Countered = 6,
    }
}

/// [`DateTime`] when an [`Offer`] was created.
pub type CreationDateTime = DateTimeOf<(Offer, unit::Creation)>;

/// [`DateTime`] when an [`Offer`] was responded to.
pub type ResponseDateTime = DateTimeOf<(Offer, unit::Response)>;

/// [`DateTime`] when an [`Offer`] expires.
pub type ExpirationDateTime = DateTimeOf<(Offer, unit::Expiration)>;

#[cfg(test)]
mod spec {
    use std::{str::FromStr as _, time::Duration};

    use common::Money;

    use crate::domain::{listing, subject, user, Role};

    use super::{
        CreationDateTime, ExpirationDateTime, Id, Offer, Reference,
        ResponseDateTime, Status, Subjects,
    };

    const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    fn offer(subjects: &[subject::Id]) -> Offer {
        let created_at = CreationDateTime::now();
        Offer {
            id: Id::new(),
            reference: Reference::Listing(listing::Id::new()),
            buyer_id: user::Id::new(),
            seller_id: user::Id::new(),
            offered_by: Role::Buyer,
            subjects: Subjects::new(subjects.iter().copied()).unwrap(),
            price: Money::from_str("70000").unwrap(),
            price_per_kg: None,
            message: None,
            status: Status::Pending,
            created_at,
            responded_at: None,
            expires_at: (created_at + WEEK).coerce(),
            countered_offer_id: None,
        }
    }

    #[test]
    fn subjects_are_non_empty_and_deduplicated() {
        let id = subject::Id::new();

        assert!(Subjects::new([]).is_none());
        assert_eq!(Subjects::new([id, id]).unwrap().len(), 1);
    }

    #[test]
    fn detects_overlap() {
        let (a, b, c) =
            (subject::Id::new(), subject::Id::new(), subject::Id::new());
        let o = offer(&[a, b]);

        assert!(o.overlaps(&Subjects::new([b, c]).unwrap()));
        assert!(!o.overlaps(&Subjects::new([c]).unwrap()));
    }

    #[test]
    fn responds_only_once() {
        let mut o = offer(&[subject::Id::new()]);
        let now = ResponseDateTime::now();

        o.respond(Status::Rejected, now).unwrap();
        assert_eq!(o.status, Status::Rejected);
        assert_eq!(o.responded_at, Some(now));
        assert_eq!(o.respond(Status::Accepted, now), Err(Status::Rejected));
    }

    #[test]
    fn expires_lazily() {
        let mut o = offer(&[subject::Id::new()]);
        assert!(!o.expire_if_due(ResponseDateTime::now()));
        assert!(o.is_active(ResponseDateTime::now()));

        o.expires_at = ExpirationDateTime::now() - Duration::from_secs(1);
        assert!(!o.is_active(ResponseDateTime::now()));
        assert!(o.expire_if_due(ResponseDateTime::now()));
        assert_eq!(o.status, Status::Expired);
        assert!(!o.expire_if_due(ResponseDateTime::now()));
    }

    #[test]
    fn counter_reverses_roles() {
        let o = offer(&[subject::Id::new()]);
        let price = Money::from_str("65000").unwrap();

        let c = o.counter(price, None, None, WEEK);

        assert_eq!(c.offered_by, Role::Seller);
        assert_eq!(c.offerer_id(), o.counterparty_id());
        assert_eq!(c.counterparty_id(), o.offerer_id());
        assert_eq!(c.subjects, o.subjects);
        assert_eq!(c.reference, o.reference);
        assert_eq!(c.price, price);
        assert_eq!(c.status, Status::Pending);
        assert_eq!(c.countered_offer_id, Some(o.id));
    }
}
