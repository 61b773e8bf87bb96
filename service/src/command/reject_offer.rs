//! [`Command`] for rejecting an [`Offer`].

use common::operations::{
    By, Commit, Emit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{offer, user, Notification, Offer},
    error::{Classify, Kind},
    infra::{database, notifier, Database, Notifier},
    Service,
};

use super::Command;

/// [`Command`] for rejecting a pending [`Offer`] by its counterparty.
#[derive(Clone, Copy, Debug)]
pub struct RejectOffer {
    /// ID of the [`Offer`] to reject.
    pub offer_id: offer::Id,

    /// ID of the user rejecting the [`Offer`].
    pub acting_user_id: user::Id,
}

impl<Db, Ntf> Command<RejectOffer> for Service<Db, Ntf>
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
        > + Database<Update<Offer>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Ntf: Notifier<
        Emit<Notification>,
        Ok = (),
        Err = Traced<notifier::Error>,
    >,
{
    type Ok = Offer;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: RejectOffer) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RejectOffer {
            offer_id,
            acting_user_id,
        } = cmd;

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

        let now = offer::ResponseDateTime::now();
        let expired = offer.expire_if_due(now);
        if !expired {
            offer
                .respond(offer::Status::Rejected, now)
                .map_err(E::OfferNotPending)
                .map_err(tracerr::wrap!())?;
        }

        tx.execute(Update(offer.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        if expired {
            _ = self.notify(Notification::offer_expired(&offer)).await;
            return Err(tracerr::new!(E::OfferExpired(offer_id)));
        }
        _ = self.notify(Notification::offer_rejected(&offer)).await;

        Ok(offer)
    }
}

/// Error of [`RejectOffer`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

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
            Self::Db(e) => e.kind(),
            Self::NotCounterparty { .. } => Kind::Unauthorized,
            Self::OfferExpired(_) | Self::OfferNotPending(_) => {
                Kind::InvalidState
            }
            Self::OfferNotExists(_) => Kind::NotFound,
        }
    }
}
