//! [`Command`] for accepting an [`Offer`].

use std::collections::HashMap;

use common::operations::{
    By, Commit, Emit, Insert, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        buy_request, listing, offer, subject, transaction, user, BuyRequest,
        Listing, Notification, Offer, Transaction,
    },
    error::{Classify, Kind},
    infra::{database, notifier, Database, Notifier},
    read,
    Service,
};

use super::Command;

/// [`Command`] for accepting a pending [`Offer`] by its counterparty.
///
/// Opens a [`Transaction`] and reserves the [`Listing`], expiring every
/// other pending [`Offer`] on it overlapping the accepted subjects. An
/// accepted [`BuyRequest`] is fulfilled instead, expiring every other
/// pending [`Offer`] on it.
///
/// Subjects sold through a [`BuyRequest`] are withdrawn from the marketplace
/// along with the available [`Listing`] holding them.
#[derive(Clone, Copy, Debug)]
pub struct AcceptOffer {
    /// ID of the [`Offer`] to accept.
    pub offer_id: offer::Id,

    /// ID of the user accepting the [`Offer`].
    pub acting_user_id: user::Id,
}

impl<Db, Ntf> Command<AcceptOffer> for Service<Db, Ntf>
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
        > + Database<
            Lock<By<subject::Snapshot, subject::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<
                By<HashMap<subject::Id, subject::Snapshot>, Vec<subject::Id>>,
            >,
            Ok = HashMap<subject::Id, subject::Snapshot>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Listing>, read::listing::Holding>>,
            Ok = Vec<Listing>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Transaction>, read::transaction::Holding>>,
            Ok = Vec<Transaction>,
            Err = Traced<database::Error>,
        > + Database<Update<Offer>, Err = Traced<database::Error>>
        + Database<Update<Listing>, Err = Traced<database::Error>>
        + Database<Update<BuyRequest>, Err = Traced<database::Error>>
        + Database<Insert<Transaction>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Ntf: Notifier<
        Emit<Notification>,
        Ok = (),
        Err = Traced<notifier::Error>,
    >,
{
    type Ok = Transaction;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: AcceptOffer) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AcceptOffer {
            offer_id,
            acting_user_id,
        } = cmd;

        let Offer {
            reference,
            subjects,
            ..
        } = self
            .database()
            .execute(Select(By::<Option<Offer>, _>::new(offer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OfferNotExists(offer_id))
            .map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Acceptance and invalidation of the competing offers must not
        // interleave with any other transition on the same reference.
        tx.execute(Lock(By::<Offer, _>::new(reference)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        // Subjects may be offered on other references too. Locked in their
        // sorted order.
        for id in subjects.iter().copied() {
            tx.execute(Lock(By::<subject::Snapshot, _>::new(id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        let mut offer = tx
            .execute(Select(By::<Option<Offer>, _>::new(offer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OfferNotExists(offer_id))
            .map_err(tracerr::wrap!())?;
        if offer.counterparty_id() != acting_user_id {
            return Err(tracerr::new!(E::NotCounterparty {
                user_id: acting_user_id,
                offer_id,
            }));
        }
        if offer.status != offer::Status::Pending {
            return Err(tracerr::new!(E::OfferNotPending(offer.status)));
        }

        let now = offer::ResponseDateTime::now();
        if offer.expire_if_due(now) {
            tx.execute(Update(offer.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            _ = self.notify(Notification::offer_expired(&offer)).await;
            return Err(tracerr::new!(E::OfferExpired(offer_id)));
        }

        let displaced = ensure_sellable(&tx, &offer).await?;

        match reference {
            offer::Reference::Listing(id) => {
                let mut listing = tx
                    .execute(Select(By::<Option<Listing>, _>::new(id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or(E::ListingNotExists(id))
                    .map_err(tracerr::wrap!())?;
                listing
                    .reserve()
                    .map_err(E::ListingNotAvailable)
                    .map_err(tracerr::wrap!())?;
                tx.execute(Update(listing))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
            }
            offer::Reference::BuyRequest(id) => {
                let mut request = tx
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
                request
                    .fulfill()
                    .map_err(E::BuyRequestNotOpen)
                    .map_err(tracerr::wrap!())?;
                tx.execute(Update(request))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
            }
        }

        offer
            .respond(offer::Status::Accepted, now)
            .map_err(E::OfferNotPending)
            .map_err(tracerr::wrap!())?;
        tx.execute(Update(offer.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let transaction = Transaction::open(&offer);
        tx.execute(Insert(transaction.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let competing = tx
            .execute(Select(By::<Vec<Offer>, _>::new(read::offer::Pending(
                reference,
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let mut notifications = vec![Notification::offer_accepted(
            &offer,
            &transaction,
        )];
        // A fulfilled `BuyRequest` accepts no other offers at all.
        let fulfilled = matches!(reference, offer::Reference::BuyRequest(_));
        for mut other in competing {
            if other.id == offer.id
                || !(fulfilled || other.overlaps(&offer.subjects))
            {
                continue;
            }
            if other.respond(offer::Status::Expired, now).is_err() {
                continue;
            }
            tx.execute(Update(other.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            log::info!(
                offer_id = %other.id,
                accepted_offer_id = %offer.id,
                "competing `Offer` invalidated",
            );
            notifications.push(Notification::offer_invalidated(&other));
        }

        for mut listing in displaced {
            let listing_id = listing.id;
            listing
                .remove()
                .map_err(E::ListingNotAvailable)
                .map_err(tracerr::wrap!())?;
            tx.execute(Update(listing))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            let pending = tx
                .execute(Select(By::<Vec<Offer>, _>::new(
                    read::offer::Pending(offer::Reference::Listing(listing_id)),
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            for mut other in pending {
                if other.respond(offer::Status::Expired, now).is_err() {
                    continue;
                }
                tx.execute(Update(other.clone()))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
                notifications.push(Notification::offer_invalidated(&other));
            }
            log::info!(
                %listing_id,
                accepted_offer_id = %offer.id,
                "`Listing` withdrawn, its subjects are sold elsewhere",
            );
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        self.dispatch(notifications).await;

        Ok(transaction)
    }
}

/// Ensures the subjects of the provided [`Offer`] are still for sale,
/// returning the available [`Listing`]s of other references holding them.
///
/// Expects the subjects to be locked by the provided transaction.
async fn ensure_sellable<Tx>(
    tx: &Tx,
    offer: &Offer,
) -> Result<Vec<Listing>, Traced<ExecutionError>>
where
    Tx: Database<
            Select<
                By<HashMap<subject::Id, subject::Snapshot>, Vec<subject::Id>>,
            >,
            Ok = HashMap<subject::Id, subject::Snapshot>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Listing>, read::listing::Holding>>,
            Ok = Vec<Listing>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Transaction>, read::transaction::Holding>>,
            Ok = Vec<Transaction>,
            Err = Traced<database::Error>,
        >,
{
    use ExecutionError as E;

    let ids = offer.subjects.to_vec();

    let snapshots = tx
        .execute(Select(By::<HashMap<_, subject::Snapshot>, _>::new(
            ids.clone(),
        )))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;
    for id in &ids {
        let snapshot = snapshots
            .get(id)
            .ok_or(E::SubjectNotExists(*id))
            .map_err(tracerr::wrap!())?;
        if !snapshot.is_sellable() {
            return Err(tracerr::new!(E::SubjectNotSellable(*id)));
        }
    }

    if let Some(t) = tx
        .execute(Select(By::<Vec<Transaction>, _>::new(
            read::transaction::Holding(ids.clone()),
        )))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?
        .into_iter()
        .next()
    {
        let subject_id = ids
            .iter()
            .copied()
            .find(|id| t.subject_ids.contains(id))
            .unwrap_or(ids[0]);
        return Err(tracerr::new!(E::SubjectInTransaction {
            subject_id,
            transaction_id: t.id,
        }));
    }

    let mut displaced = Vec::new();
    for listing in tx
        .execute(Select(By::<Vec<Listing>, _>::new(
            read::listing::Holding(ids.clone()),
        )))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?
    {
        if offer::Reference::Listing(listing.id) == offer.reference {
            continue;
        }
        if listing.status != listing::Status::Available {
            let subject_id = ids
                .iter()
                .copied()
                .find(|id| listing.subject_ids().contains(id))
                .unwrap_or(ids[0]);
            return Err(tracerr::new!(E::SubjectReserved {
                subject_id,
                listing_id: listing.id,
            }));
        }
        displaced.push(listing);
    }
    Ok(displaced)
}

/// Error of [`AcceptOffer`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`BuyRequest`] with the provided ID does not exist.
    #[display("`BuyRequest(id: {_0})` does not exist")]
    BuyRequestNotExists(#[error(not(source))] buy_request::Id),

    /// [`BuyRequest`] is not published anymore, or past its expiration.
    #[display("`BuyRequest` is `{_0}` and not open")]
    BuyRequestNotOpen(#[error(not(source))] buy_request::Status),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Listing`] is not available.
    #[display("`Listing` is `{_0}`, not available")]
    ListingNotAvailable(#[error(not(source))] listing::Status),

    /// [`Listing`] with the provided ID does not exist.
    #[display("`Listing(id: {_0})` does not exist")]
    ListingNotExists(#[error(not(source))] listing::Id),

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

    /// [`Offer`] is not pending.
    #[display("`Offer` is `{_0}`, not pending")]
    OfferNotPending(#[error(not(source))] offer::Status),

    /// [`Offer`] with the provided ID does not exist.
    #[display("`Offer(id: {_0})` does not exist")]
    OfferNotExists(#[error(not(source))] offer::Id),

    /// Subject is traded by another [`Transaction`] already.
    #[display(
        "Subject `{subject_id}` is traded by `Transaction(id: \
         {transaction_id})`"
    )]
    SubjectInTransaction {
        /// ID of the subject.
        subject_id: subject::Id,

        /// ID of the [`Transaction`] trading the subject.
        transaction_id: transaction::Id,
    },

    /// Subject is sold already or not healthy.
    #[display("Subject `{_0}` cannot be sold")]
    SubjectNotSellable(#[error(not(source))] subject::Id),

    /// Subject with the provided ID does not exist.
    #[display("Subject `{_0}` does not exist")]
    SubjectNotExists(#[error(not(source))] subject::Id),

    /// Subject is on a reserved [`Listing`] of another reference.
    #[display(
        "Subject `{subject_id}` is reserved by `Listing(id: {listing_id})`"
    )]
    SubjectReserved {
        /// ID of the subject.
        subject_id: subject::Id,

        /// ID of the reserved [`Listing`].
        listing_id: listing::Id,
    },
}

impl Classify for ExecutionError {
    fn kind(&self) -> Kind {
        match self {
            Self::BuyRequestNotExists(_)
            | Self::ListingNotExists(_)
            | Self::OfferNotExists(_)
            | Self::SubjectNotExists(_) => Kind::NotFound,
            Self::BuyRequestNotOpen(_)
            | Self::ListingNotAvailable(_)
            | Self::OfferExpired(_)
            | Self::OfferNotPending(_)
            | Self::SubjectInTransaction { .. }
            | Self::SubjectNotSellable(_)
            | Self::SubjectReserved { .. } => Kind::InvalidState,
            Self::Db(e) => e.kind(),
            Self::NotCounterparty { .. } => Kind::Unauthorized,
        }
    }
}
