//! [`Command`] for archiving a [`BuyRequest`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
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

/// [`Command`] for archiving a published [`BuyRequest`] by its buyer.
#[derive(Clone, Copy, Debug)]
pub struct ArchiveBuyRequest {
    /// ID of the [`BuyRequest`] to archive.
    pub buy_request_id: buy_request::Id,

    /// ID of the user archiving the [`BuyRequest`].
    pub buyer_id: user::Id,
}

impl<Db, Ntf> Command<ArchiveBuyRequest> for Service<Db, Ntf>
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
        cmd: ArchiveBuyRequest,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ArchiveBuyRequest {
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

        request
            .archive()
            .map_err(E::NotPublished)
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

/// Error of [`ArchiveBuyRequest`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`BuyRequest`] with the provided ID does not exist.
    #[display("`BuyRequest(id: {_0})` does not exist")]
    BuyRequestNotExists(#[error(not(source))] buy_request::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Acting user is not the buyer of the [`BuyRequest`].
    #[display("`User(id: {_0})` is not the buyer")]
    NotOwner(#[error(not(source))] user::Id),

    /// [`BuyRequest`] is not published.
    #[display("`BuyRequest` is `{_0}`, not published")]
    NotPublished(#[error(not(source))] buy_request::Status),
}

impl Classify for ExecutionError {
    fn kind(&self) -> Kind {
        match self {
            Self::BuyRequestNotExists(_) => Kind::NotFound,
            Self::Db(e) => e.kind(),
            Self::NotOwner(_) => Kind::Unauthorized,
            Self::NotPublished(_) => Kind::InvalidState,
        }
    }
}
