//! [`Command`] for countering an [`Offer`].

use common::{
    operations::{
        By, Commit, Emit, Insert, Lock, Select, Transact, Transacted, Update,
    },
    Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        buy_request, listing, offer, user, BuyRequest, Listing, Notification,
        Offer,
    },
    error::{Classify, Kind},
    infra::{database, notifier, Database, Notifier},
    read,
    Service,
};

use super::Command;

/// [`Command`] for answering a pending [`Offer`] with a counter [`Offer`] by
/// its counterparty.
///
/// The original [`Offer`] becomes [`offer::Status::Countered`], and the new
/// one is made on the same reference and subjects with the roles reversed.
#[derive(Clone, Debug)]
pub struct CounterOffer {
    /// ID of the [`Offer`] to counter.
    pub offer_id: offer::Id,

    /// ID of the user countering the [`Offer`].
    pub acting_user_id: user::Id,

    /// Proposed price for all the subjects.
    pub price: Money,

    /// Proposed price per kilogram of live weight, if any.
    pub price_per_kg: Option<Money>,

    /// [`offer::Message`] to the original offerer, if any.
    pub message: Option<offer::Message>,
}

impl<Db, Ntf> Command<CounterOffer> for Service<Db, Ntf>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Offer>, offer::Id>>,
            Ok = Option<Offer>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Offer, offer::Reference>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Offer>, offer::Id>>,
            Ok = Option<Offer>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Listing>, listing::Id>>,
            Ok = Option<Listing>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<BuyRequest>, buy_request::Id>>,
            Ok = Option<BuyRequest>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Offer>, read::offer::Pending>>,
            Ok = Vec<Offer>,
            Err = Traced<database::Error>,
        > + Database<Insert<Offer>, Err = Traced<database::Error>>
        + Database<Update<Offer>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Ntf: Notifier<
        Emit<Notification>,
        Ok = (),
        Err = Traced<notifier::Error>,
    >,
{
    type Ok = Offer;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CounterOffer) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CounterOffer {
            offer_id,
            acting_user_id,
            price,
            price_per_kg,
            message,
        } = cmd;

        if let Some(p) = Some(price)
            .into_iter()
            .chain(price_per_kg)
            .find(|p| !p.is_positive())
        {
            return Err(tracerr::new!(E::NonPositivePrice(p)));
        }

        let reference = self
            .database()
            .execute(Select(By::<Option<Offer>, _>::new(offer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OfferNotExists(offer_id))
            .map_err(tracerr::wrap!())?
            .reference;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Lock(By::<Offer, _>::new(reference)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut original = tx
            .execute(Select(By::<Option<Offer>, _>::new(offer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OfferNotExists(offer_id))
            .map_err(tracerr::wrap!())?;
        if original.counterparty_id() != acting_user_id {
            return Err(tracerr::new!(E::NotCounterparty {
                user_id: acting_user_id,
                offer_id,
            }));
        }
        if original.status != offer::Status::Pending {
            return Err(tracerr::new!(E::OfferNotPending(original.status)));
        }

        let now = offer::ResponseDateTime::now();
        if original.expire_if_due(now) {
            tx.execute(Update(original.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            _ = self.notify(Notification::offer_expired(&original)).await;
            return Err(tracerr::new!(E::OfferExpired(offer_id)));
        }

        match reference {
            offer::Reference::Listing(id) => {
                let listing = tx
                    .execute(Select(By::<Option<Listing>, _>::new(id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or(E::ListingNotExists(id))
                    .map_err(tracerr::wrap!())?;
                if !listing.accepts_offers() {
                    return Err(tracerr::new!(E::ListingNotAcceptingOffers(
                        listing.status
                    )));
                }
            }
            offer::Reference::BuyRequest(id) => {
                let request = tx
                    .execute(Select(By::<Option<BuyRequest>, _>::new(id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or(E::BuyRequestNotExists(id))
                    .map_err(tracerr::wrap!())?;
                if !request.is_open(now) {
                    return Err(tracerr::new!(E::BuyRequestNotOpen(
                        request.status
                    )));
                }
            }
        }

        let counter = original.counter(
            price,
            price_per_kg,
            message,
            self.config().marketplace.offer_ttl,
        );

        let pending = tx
            .execute(Select(By::<Vec<Offer>, _>::new(read::offer::Pending(
                reference,
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if let Some(existing) = pending.iter().find(|o| {
            o.id != original.id
                && o.offerer_id() == counter.offerer_id()
                && o.counterparty_id() == counter.counterparty_id()
                && o.is_active(now)
                && o.overlaps(&counter.subjects)
        }) {
            return Err(tracerr::new!(E::ConflictingOffer(existing.id)));
        }

        original
            .respond(offer::Status::Countered, now)
            .map_err(E::OfferNotPending)
            .map_err(tracerr::wrap!())?;
        tx.execute(Update(original.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Insert(counter.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        _ = self
            .notify(Notification::offer_countered(&original, &counter))
            .await;

        Ok(counter)
    }
}

/// Error of [`CounterOffer`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`BuyRequest`] is not published anymore, or past its expiration.
    #[display("`BuyRequest` is `{_0}` and not open")]
    BuyRequestNotOpen(#[error(not(source))] buy_request::Status),

    /// [`BuyRequest`] with the provided ID does not exist.
    #[display("`BuyRequest(id: {_0})` does not exist")]
    BuyRequestNotExists(#[error(not(source))] buy_request::Id),

    /// Pending [`Offer`] between the same parties overlaps the subjects.
    #[display("Pending `Offer(id: {_0})` overlaps the subjects")]
    ConflictingOffer(#[error(not(source))] offer::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Listing`] doesn't accept [`Offer`]s.
    #[display("`Listing` is `{_0}` and doesn't accept offers")]
    ListingNotAcceptingOffers(#[error(not(source))] listing::Status),

    /// [`Listing`] with the provided ID does not exist.
    #[display("`Listing(id: {_0})` does not exist")]
    ListingNotExists(#[error(not(source))] listing::Id),

    /// Price is not positive.
    #[display("Price `{_0}` is not positive")]
    NonPositivePrice(#[error(not(source))] Money),

    /// Acting user is not the counterparty of the [`Offer`].
    #[display(
        "`User(id: {user_id})` is not the counterparty of `Offer(id: \
         {offer_id})`"
    )]
    NotCounterparty {
        /// ID of the acting user.
        user_id: user::Id,

        /// ID of the [`Offer`].
        offer_id: offer::Id,
    },

    /// [`Offer`] is past its expiration.
    #[display("`Offer(id: {_0})` is expired")]
    OfferExpired(#[error(not(source))] offer::Id),

    /// [`Offer`] with the provided ID does not exist.
    #[display("`Offer(id: {_0})` does not exist")]
    OfferNotExists(#[error(not(source))] offer::Id),

    /// [`Offer`] is not pending.
    #[display("`Offer` is `{_0}`, not pending")]
    OfferNotPending(#[error(not(source))] offer::Status),
}

impl Classify for ExecutionError {
    fn kind(&self) -> Kind {
        match self {
            Self::BuyRequestNotExists(_)
            | Self::ListingNotExists(_)
            | Self::OfferNotExists(_) => Kind::NotFound,
            Self::BuyRequestNotOpen(_)
            | Self::ListingNotAcceptingOffers(_)
            | Self::OfferExpired(_)
            | Self::OfferNotPending(_) => Kind::InvalidState,
            Self::ConflictingOffer(_) => Kind::Conflict,
            Self::Db(e) => e.kind(),
            Self::NonPositivePrice(_) => Kind::Validation,
            Self::NotCounterparty { .. } => Kind::Unauthorized,
        }
    }
}
