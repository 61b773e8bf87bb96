//! [`Command`] for removing a [`Listing`] from the marketplace.

use std::collections::HashMap;

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{farm, listing, offer, user, Farm, Listing, Offer},
    error::{Classify, Kind},
    infra::{database, Database},
    read,
    Service,
};

use super::Command;

/// [`Command`] for removing an available [`Listing`] without pending
/// [`Offer`]s.
#[derive(Clone, Copy, Debug)]
pub struct RemoveListing {
    /// ID of the [`Listing`] to remove.
    pub listing_id: listing::Id,

    /// ID of the user removing the [`Listing`].
    pub acting_user_id: user::Id,
}

impl<Db, Ntf> Command<RemoveListing> for Service<Db, Ntf>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<HashMap<farm::Id, Farm>, Vec<farm::Id>>>,
            Ok = HashMap<farm::Id, Farm>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Listing, listing::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Listing>, listing::Id>>,
            Ok = Option<Listing>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Offer>, read::offer::Pending>>,
            Ok = Vec<Offer>,
            Err = Traced<database::Error>,
        > + Database<Update<Listing>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Listing;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: RemoveListing) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RemoveListing {
            listing_id,
            acting_user_id,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Offers are made on the `Listing` under the same lock.
        tx.execute(Lock(By::<Listing, _>::new(listing_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut listing = tx
            .execute(Select(By::<Option<Listing>, _>::new(listing_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ListingNotExists(listing_id))
            .map_err(tracerr::wrap!())?;

        let farm = self
            .database()
            .execute(Select(By::<HashMap<_, Farm>, _>::new(vec![
                listing.farm_id,
            ])))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .remove(&listing.farm_id);
        if !listing.is_owned_by(acting_user_id, farm.as_ref()) {
            return Err(tracerr::new!(E::NotOwner {
                user_id: acting_user_id,
                listing_id,
            }));
        }

        if listing.status != listing::Status::Available {
            return Err(tracerr::new!(E::ListingNotAvailable(listing.status)));
        }

        let now = DateTime::now();
        let pending = tx
            .execute(Select(By::<Vec<Offer>, _>::new(read::offer::Pending(
                offer::Reference::Listing(listing_id),
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if let Some(o) = pending.iter().find(|o| o.is_active(now)) {
            return Err(tracerr::new!(E::HasPendingOffer(o.id)));
        }

        listing
            .remove()
            .map_err(E::ListingNotAvailable)
            .map_err(tracerr::wrap!())?;

        tx.execute(Update(listing.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(listing)
    }
}

/// Error of [`RemoveListing`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Listing`] has a pending [`Offer`].
    #[display("`Listing` has pending `Offer(id: {_0})`")]
    HasPendingOffer(#[error(not(source))] offer::Id),

    /// [`Listing`] is not available.
    #[display("`Listing` is `{_0}`, not available")]
    ListingNotAvailable(#[error(not(source))] listing::Status),

    /// [`Listing`] with the provided ID does not exist.
    #[display("`Listing(id: {_0})` does not exist")]
    ListingNotExists(#[error(not(source))] listing::Id),

    /// Acting user doesn't own the [`Listing`].
    #[display("`User(id: {user_id})` doesn't own `Listing(id: {listing_id})`")]
    NotOwner {
        /// ID of the acting user.
        user_id: user::Id,

        /// ID of the [`Listing`].
        listing_id: listing::Id,
    },
}

impl Classify for ExecutionError {
    fn kind(&self) -> Kind {
        match self {
            Self::Db(e) => e.kind(),
            Self::HasPendingOffer(_) | Self::ListingNotAvailable(_) => {
                Kind::InvalidState
            }
            Self::ListingNotExists(_) => Kind::NotFound,
            Self::NotOwner { .. } => Kind::Unauthorized,
        }
    }
}
