//! [`Notification`] definitions.

use strum::IntoStaticStr;

use crate::domain::{
    buy_request, listing, matching, offer, transaction, user, Match, Offer,
    Role, Transaction,
};

/// Lifecycle event to be delivered to a user.
///
/// Only decides what is delivered and to whom, delivery itself is up to a
/// [`Notifier`].
///
/// [`Notifier`]: crate::infra::Notifier
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notification {
    /// ID of the user to notify.
    pub recipient_id: user::Id,

    /// [`Event`] to notify about.
    pub event: Event,
}

impl Notification {
    /// Notifies the seller about a new [`Match`] of their listing.
    #[must_use]
    pub const fn match_found(m: &Match) -> Self {
        Self {
            recipient_id: m.seller_id,
            event: Event::MatchFound {
                match_id: m.id,
                buy_request_id: m.buy_request_id,
                listing_id: m.listing_id,
                score: m.score,
            },
        }
    }

    /// Notifies the counterparty about a new [`Offer`].
    #[must_use]
    pub const fn offer_received(o: &Offer) -> Self {
        Self {
            recipient_id: o.counterparty_id(),
            event: Event::OfferReceived { offer_id: o.id },
        }
    }

    /// Notifies the offerer about their [`Offer`] being accepted.
    #[must_use]
    pub const fn offer_accepted(o: &Offer, t: &Transaction) -> Self {
        Self {
            recipient_id: o.offerer_id(),
            event: Event::OfferAccepted {
                offer_id: o.id,
                transaction_id: t.id,
            },
        }
    }

    /// Notifies the offerer about their [`Offer`] being rejected.
    #[must_use]
    pub const fn offer_rejected(o: &Offer) -> Self {
        Self {
            recipient_id: o.offerer_id(),
            event: Event::OfferRejected { offer_id: o.id },
        }
    }

    /// Notifies the counterparty about an [`Offer`] being withdrawn.
    #[must_use]
    pub const fn offer_withdrawn(o: &Offer) -> Self {
        Self {
            recipient_id: o.counterparty_id(),
            event: Event::OfferWithdrawn { offer_id: o.id },
        }
    }

    /// Notifies the offerer about their [`Offer`] being countered.
    #[must_use]
    pub const fn offer_countered(o: &Offer, counter: &Offer) -> Self {
        Self {
            recipient_id: o.offerer_id(),
            event: Event::OfferCountered {
                offer_id: o.id,
                counter_offer_id: counter.id,
            },
        }
    }

    /// Notifies the offerer that the subjects of their [`Offer`] are not
    /// available anymore.
    #[must_use]
    pub const fn offer_invalidated(o: &Offer) -> Self {
        Self {
            recipient_id: o.offerer_id(),
            event: Event::OfferInvalidated { offer_id: o.id },
        }
    }

    /// Notifies the offerer about their [`Offer`] being expired.
    #[must_use]
    pub const fn offer_expired(o: &Offer) -> Self {
        Self {
            recipient_id: o.offerer_id(),
            event: Event::OfferExpired { offer_id: o.id },
        }
    }

    /// Notifies the party of the provided [`Role`] that the delivery
    /// confirmation is awaited from them.
    #[must_use]
    pub const fn confirmation_pending(t: &Transaction, awaiting: Role) -> Self {
        Self {
            recipient_id: t.party_id(awaiting),
            event: Event::DeliveryConfirmationPending {
                transaction_id: t.id,
            },
        }
    }

    /// Notifies the party of the provided [`Role`] that the [`Transaction`]
    /// is completed and the counterparty may be rated.
    #[must_use]
    pub const fn transaction_completed(t: &Transaction, role: Role) -> Self {
        Self {
            recipient_id: t.party_id(role),
            event: Event::TransactionCompleted {
                transaction_id: t.id,
            },
        }
    }
}

/// Event of a [`Notification`].
#[derive(Clone, Copy, Debug, Eq, IntoStaticStr, PartialEq)]
#[strum(serialize_all = "snake_case")]
pub enum Event {
    /// Listing of the recipient matches a buy request.
    MatchFound {
        /// ID of the [`Match`].
        match_id: matching::Id,

        /// ID of the matched buy request.
        buy_request_id: buy_request::Id,

        /// ID of the matched listing.
        listing_id: listing::Id,

        /// Score of the [`Match`].
        score: matching::Score,
    },

    /// Recipient received a new [`Offer`].
    OfferReceived {
        /// ID of the received [`Offer`].
        offer_id: offer::Id,
    },

    /// [`Offer`] of the recipient is accepted.
    OfferAccepted {
        /// ID of the accepted [`Offer`].
        offer_id: offer::Id,

        /// ID of the opened [`Transaction`].
        transaction_id: transaction::Id,
    },

    /// [`Offer`] of the recipient is rejected.
    OfferRejected {
        /// ID of the rejected [`Offer`].
        offer_id: offer::Id,
    },

    /// [`Offer`] to the recipient is withdrawn.
    OfferWithdrawn {
        /// ID of the withdrawn [`Offer`].
        offer_id: offer::Id,
    },

    /// [`Offer`] of the recipient is answered with a counter [`Offer`].
    OfferCountered {
        /// ID of the countered [`Offer`].
        offer_id: offer::Id,

        /// ID of the counter [`Offer`].
        counter_offer_id: offer::Id,
    },

    /// Subjects of the recipient's [`Offer`] are sold to someone else.
    OfferInvalidated {
        /// ID of the invalidated [`Offer`].
        offer_id: offer::Id,
    },

    /// [`Offer`] of the recipient is past its expiration.
    OfferExpired {
        /// ID of the expired [`Offer`].
        offer_id: offer::Id,
    },

    /// Counterparty confirmed the delivery, the recipient is yet to.
    DeliveryConfirmationPending {
        /// ID of the [`Transaction`].
        transaction_id: transaction::Id,
    },

    /// Both parties confirmed the delivery.
    TransactionCompleted {
        /// ID of the completed [`Transaction`].
        transaction_id: transaction::Id,
    },
}

impl Event {
    /// Returns a stable name of this [`Event`] kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}
