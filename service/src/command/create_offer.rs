//! [`Command`] for making a new [`Offer`].

use std::collections::{HashMap, HashSet};

use common::{
    operations::{
        By, Commit, Emit, Insert, Lock, Select, Transact, Transacted, Update,
    },
    DateTime, Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        buy_request, farm, listing, offer, subject, transaction, user,
        BuyRequest, Farm, Listing, Notification, Offer, Transaction,
    },
    error::{Classify, Kind},
    infra::{database, notifier, Database, Notifier},
    read,
    Service,
};

use super::Command;

/// [`Command`] for making a new [`Offer`] on a [`Listing`] (by a buyer) or on
/// a [`BuyRequest`] (by a seller).
#[derive(Clone, Debug)]
pub struct CreateOffer {
    /// What the [`Offer`] is made on.
    pub reference: offer::Reference,

    /// ID of the user making the [`Offer`].
    pub offerer_id: user::Id,

    /// IDs of the subjects the [`Offer`] is made for.
    pub subject_ids: Vec<subject::Id>,

    /// Proposed price for all the subjects.
    pub price: Money,

    /// Proposed price per kilogram of live weight, if any.
    pub price_per_kg: Option<Money>,

    /// [`offer::Message`] to the counterparty, if any.
    pub message: Option<offer::Message>,
}

impl<Db, Ntf> Command<CreateOffer> for Service<Db, Ntf>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<HashMap<farm::Id, Farm>, Vec<farm::Id>>>,
            Ok = HashMap<farm::Id, Farm>,
            Err = Traced<database::Error>,
        > + Database<
            Select<
                By<HashMap<subject::Id, subject::Snapshot>, Vec<subject::Id>>,
            >,
            Ok = HashMap<subject::Id, subject::Snapshot>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Transaction>, read::transaction::Holding>>,
            Ok = Vec<Transaction>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Offer, offer::Reference>>,
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
        + Database<Update<Listing>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Ntf: Notifier<
        Emit<Notification>,
        Ok = (),
        Err = Traced<notifier::Error>,
    >,
{
    type Ok = Offer;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateOffer) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateOffer {
            reference,
            offerer_id,
            subject_ids,
            price,
            price_per_kg,
            message,
        } = cmd;

        let subjects = offer::Subjects::new(subject_ids)
            .ok_or(E::NoSubjects)
            .map_err(tracerr::wrap!())?;
        if let Some(p) = Some(price)
            .into_iter()
            .chain(price_per_kg)
            .find(|p| !p.is_positive())
        {
            return Err(tracerr::new!(E::NonPositivePrice(p)));
        }

        let now = DateTime::now();

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // All the offer transitions on the same reference are serialized.
        tx.execute(Lock(By::<Offer, _>::new(reference)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let (buyer_id, seller_id, listing) = match reference {
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

                let farm = self
                    .database()
                    .execute(Select(By::<HashMap<_, Farm>, _>::new(vec![
                        listing.farm_id,
                    ])))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .remove(&listing.farm_id);
                if listing.is_owned_by(offerer_id, farm.as_ref()) {
                    return Err(tracerr::new!(E::SelfTrade(offerer_id)));
                }

                if let Some(id) = subjects
                    .iter()
                    .copied()
                    .find(|id| !listing.subject_ids().contains(id))
                {
                    return Err(tracerr::new!(E::SubjectNotListed(id)));
                }

                (offerer_id, listing.seller_id, Some(listing))
            }
            offer::Reference::BuyRequest(id) => {
                let request = tx
                    .execute(Select(By::<Option<BuyRequest>, _>::new(id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or(E::BuyRequestNotExists(id))
                    .map_err(tracerr::wrap!())?;
                if !request.is_open(now) {
                    return Err(tracerr::new!(E::BuyRequestNotPublished(id)));
                }
                if request.buyer_id == offerer_id {
                    return Err(tracerr::new!(E::SelfTrade(offerer_id)));
                }

                let snapshots = self
                    .database()
                    .execute(Select(
                        By::<HashMap<_, subject::Snapshot>, _>::new(
                            subjects.to_vec(),
                        ),
                    ))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
                for id in subjects.iter().copied() {
                    let snapshot = snapshots
                        .get(&id)
                        .ok_or(E::SubjectNotExists(id))
                        .map_err(tracerr::wrap!())?;
                    if !snapshot.is_sellable() {
                        return Err(tracerr::new!(E::SubjectNotSellable(id)));
                    }
                }
                if let Some(t) = self
                    .database()
                    .execute(Select(By::<Vec<Transaction>, _>::new(
                        read::transaction::Holding(subjects.to_vec()),
                    )))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .into_iter()
                    .next()
                {
                    return Err(tracerr::new!(E::SubjectInTransaction(t.id)));
                }

                let farm_ids = snapshots
                    .values()
                    .map(|s| s.farm_id)
                    .collect::<HashSet<_>>()
                    .into_iter()
                    .collect::<Vec<_>>();
                let farms = self
                    .database()
                    .execute(Select(By::<HashMap<_, Farm>, _>::new(farm_ids)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
                for s in snapshots.values() {
                    let owner_id = farms.get(&s.farm_id).map(|f| f.owner_id);
                    if owner_id == Some(request.buyer_id) {
                        return Err(tracerr::new!(E::SelfTrade(
                            request.buyer_id
                        )));
                    }
                    if owner_id != Some(offerer_id) {
                        return Err(tracerr::new!(E::NotSubjectOwner {
                            user_id: offerer_id,
                            subject_id: s.id,
                        }));
                    }
                }

                (request.buyer_id, offerer_id, None)
            }
        };

        let pending = tx
            .execute(Select(By::<Vec<Offer>, _>::new(read::offer::Pending(
                reference,
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if let Some(existing) = pending.iter().find(|o| {
            o.offerer_id() == offerer_id
                && o.is_active(now)
                && o.overlaps(&subjects)
        }) {
            return Err(tracerr::new!(E::ConflictingOffer(existing.id)));
        }

        let created_at = offer::CreationDateTime::now();
        let offer = Offer {
            id: offer::Id::new(),
            reference,
            buyer_id,
            seller_id,
            offered_by: reference.offering_role(),
            subjects,
            price,
            price_per_kg,
            message,
            status: offer::Status::Pending,
            created_at,
            responded_at: None,
            expires_at: (created_at + self.config().marketplace.offer_ttl)
                .coerce(),
            countered_offer_id: None,
        };

        tx.execute(Insert(offer.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        if let Some(mut listing) = listing {
            listing.inquiries = listing.inquiries.saturating_add(1);
            tx.execute(Update(listing))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        _ = self.notify(Notification::offer_received(&offer)).await;

        Ok(offer)
    }
}

/// Error of [`CreateOffer`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`BuyRequest`] with the provided ID does not exist.
    #[display("`BuyRequest(id: {_0})` does not exist")]
    BuyRequestNotExists(#[error(not(source))] buy_request::Id),

    /// [`BuyRequest`] is not published, or past its expiration.
    #[display("`BuyRequest(id: {_0})` is not published")]
    BuyRequestNotPublished(#[error(not(source))] buy_request::Id),

    /// Pending [`Offer`] of the same user overlaps the subjects.
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

    /// No subjects are provided.
    #[display("`Offer` names no subjects")]
    NoSubjects,

    /// Price is not positive.
    #[display("Price `{_0}` is not positive")]
    NonPositivePrice(#[error(not(source))] Money),

    /// Offering seller doesn't own the subject.
    #[display("`User(id: {user_id})` doesn't own subject `{subject_id}`")]
    NotSubjectOwner {
        /// ID of the offering user.
        user_id: user::Id,

        /// ID of the subject.
        subject_id: subject::Id,
    },

    /// User would trade with themselves.
    #[display("`User(id: {_0})` cannot trade with themselves")]
    SelfTrade(#[error(not(source))] user::Id),

    /// Subjects are traded by a [`Transaction`] already.
    #[display("Subjects are traded by `Transaction(id: {_0})`")]
    SubjectInTransaction(#[error(not(source))] transaction::Id),

    /// Subject with the provided ID does not exist.
    #[display("Subject `{_0}` does not exist")]
    SubjectNotExists(#[error(not(source))] subject::Id),

    /// Subject is sold already or not healthy.
    #[display("Subject `{_0}` cannot be sold")]
    SubjectNotSellable(#[error(not(source))] subject::Id),

    /// Subject is not sold by the [`Listing`].
    #[display("Subject `{_0}` is not sold by the `Listing`")]
    SubjectNotListed(#[error(not(source))] subject::Id),
}

impl Classify for ExecutionError {
    fn kind(&self) -> Kind {
        match self {
            Self::BuyRequestNotExists(_)
            | Self::ListingNotExists(_)
            | Self::SubjectNotExists(_) => Kind::NotFound,
            Self::BuyRequestNotPublished(_)
            | Self::ListingNotAcceptingOffers(_)
            | Self::SubjectInTransaction(_)
            | Self::SubjectNotSellable(_) => Kind::InvalidState,
            Self::ConflictingOffer(_) => Kind::Conflict,
            Self::Db(e) => e.kind(),
            Self::NoSubjects
            | Self::NonPositivePrice(_)
            | Self::SubjectNotListed(_) => Kind::Validation,
            Self::NotSubjectOwner { .. } | Self::SelfTrade(_) => {
                Kind::Unauthorized
            }
        }
    }
}
