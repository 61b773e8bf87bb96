//! [`Command`] for restoring an archived [`BuyRequest`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{buy_request, user, BuyRequest},
    error::{Classify, Kind},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for publishing an archived [`BuyRequest`] again.
///
/// A [`BuyRequest`] past its expiration cannot be restored.
#[derive(Clone, Copy, Debug)]
pub struct RestoreBuyRequest {
    /// ID of the [`BuyRequest`] to restore.
    pub buy_request_id: buy_request::Id,

    /// ID of the user restoring the [`BuyRequest`].
    pub buyer_id: user::Id,
}

impl<Db, Ntf> Command<RestoreBuyRequest> for Service<Db, Ntf>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<BuyRequest, buy_request::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<BuyRequest>, buy_request::Id>>,
            Ok = Option<BuyRequest>,
            Err = Traced<database::Error>,
        > + Database<Update<BuyRequest>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = BuyRequest;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: RestoreBuyRequest,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RestoreBuyRequest {
            buy_request_id,
            buyer_id,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<BuyRequest, _>::new(buy_request_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut request = tx
            .execute(Select(By::<Option<BuyRequest>, _>::new(buy_request_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BuyRequestNotExists(buy_request_id))
            .map_err(tracerr::wrap!())?;
        if request.buyer_id != buyer_id {
            return Err(tracerr::new!(E::NotOwner(buyer_id)));
        }
        if request.is_due(DateTime::now()) {
            return Err(tracerr::new!(E::Expired(buy_request_id)));
        }

        request
            .restore()
            .map_err(E::NotArchived)
            .map_err(tracerr::wrap!())?;

        tx.execute(Update(request.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(request)
    }
}

/// Error of [`RestoreBuyRequest`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`BuyRequest`] with the provided ID does not exist.
    #[display("`BuyRequest(id: {_0})` does not exist")]
    BuyRequestNotExists(#[error(not(source))] buy_request::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`BuyRequest`] is past its expiration.
    #[display("`BuyRequest(id: {_0})` is past its expiration")]
    Expired(#[error(not(source))] buy_request::Id),

    /// [`BuyRequest`] is not archived.
    #[display("`BuyRequest` is `{_0}`, not archived")]
    NotArchived(#[error(not(source))] buy_request::Status),

    /// Acting user is not the buyer of the [`BuyRequest`].
    #[display("`User(id: {_0})` is not the buyer")]
    NotOwner(#[error(not(source))] user::Id),
}

impl Classify for ExecutionError {
    fn kind(&self) -> Kind {
        match self {
            Self::BuyRequestNotExists(_) => Kind::NotFound,
            Self::Db(e) => e.kind(),
            Self::Expired(_) | Self::NotArchived(_) => Kind::InvalidState,
            Self::NotOwner(_) => Kind::Unauthorized,
        }
    }
}
