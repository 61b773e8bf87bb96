//! [`Expire`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::operations::{
    By, Commit, Emit, Lock, Perform, Select, Start, Transact, Transacted,
    Update,
};
use smart_default::SmartDefault;
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{buy_request, offer, BuyRequest, Notification, Offer},
    infra::{database, notifier, Database, Notifier},
    read,
    Service,
};

use super::Task;

/// Configuration for [`Expire`] [`Task`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Interval between sweeps.
    #[default(time::Duration::from_secs(60))]
    pub interval: time::Duration,
}

/// [`Task`] for expiring pending [`Offer`]s and published [`BuyRequest`]s
/// past their expiration.
///
/// Transitions attempted on an expired [`Offer`] expire it anyway, so this
/// [`Task`] only catches up on the untouched ones.
#[derive(Clone, Copy, Debug)]
pub struct Expire<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db, Ntf> Task<Start<By<Expire<Self>, Config>>> for Service<Db, Ntf>
where
    Expire<Self>: Task<Perform<()>, Ok = (), Err: Error> + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<Expire<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = Expire {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            _ = task.execute(Perform(())).await.map_err(|e| {
                log::error!("`task::Expire` failed: {e}");
            });
        }
    }
}

impl<Db, Ntf> Task<Perform<()>> for Expire<Service<Db, Ntf>>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Vec<Offer>, read::offer::Due>>,
            Ok = Vec<Offer>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<BuyRequest>, read::buy_request::Due>>,
            Ok = Vec<BuyRequest>,
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
        + Database<
            Lock<By<BuyRequest, buy_request::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<BuyRequest>, buy_request::Id>>,
            Ok = Option<BuyRequest>,
            Err = Traced<database::Error>,
        > + Database<Update<BuyRequest>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Ntf: Notifier<
        Emit<Notification>,
        Ok = (),
        Err = Traced<notifier::Error>,
    >,
{
    type Ok = ();
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let svc = &self.service;
        let now = offer::ResponseDateTime::now();

        let offers = svc
            .database()
            .execute(Select(By::<Vec<Offer>, _>::new(read::offer::Due(
                now.coerce(),
            ))))
            .await
            .map_err(tracerr::wrap!())?;
        for o in offers {
            match svc.expire_offer(o.id, o.reference, now).await {
                Ok(Some(expired)) => {
                    _ = svc
                        .notify(Notification::offer_expired(&expired))
                        .await;
                }
                Ok(None) => {}
                Err(e) => {
                    log::warn!(
                        offer_id = %o.id,
                        "failed to expire `Offer`: {e}",
                    );
                }
            }
        }

        let requests = svc
            .database()
            .execute(Select(By::<Vec<BuyRequest>, _>::new(
                read::buy_request::Due(now.coerce()),
            )))
            .await
            .map_err(tracerr::wrap!())?;
        for r in requests {
            if let Err(e) = svc.expire_buy_request(r.id, now).await {
                log::warn!(
                    buy_request_id = %r.id,
                    "failed to expire `BuyRequest`: {e}",
                );
            }
        }

        Ok(())
    }
}

impl<Db, Ntf> Service<Db, Ntf>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Offer, offer::Reference>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Offer>, offer::Id>>,
            Ok = Option<Offer>,
            Err = Traced<database::Error>,
        > + Database<Update<Offer>, Err = Traced<database::Error>>
        + Database<
            Lock<By<BuyRequest, buy_request::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<BuyRequest>, buy_request::Id>>,
            Ok = Option<BuyRequest>,
            Err = Traced<database::Error>,
        > + Database<Update<BuyRequest>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    /// Expires the [`Offer`] if it's still pending and due, returning it
    /// if it was expired.
    async fn expire_offer(
        &self,
        id: offer::Id,
        reference: offer::Reference,
        at: offer::ResponseDateTime,
    ) -> Result<Option<Offer>, ExecutionError> {
        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::wrap!())?;
        tx.execute(Lock(By::<Offer, _>::new(reference)))
            .await
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let Some(mut offer) = tx
            .execute(Select(By::<Option<Offer>, _>::new(id)))
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };
        if !offer.expire_if_due(at) {
            return Ok(None);
        }

        tx.execute(Update(offer.clone()))
            .await
            .map_err(tracerr::wrap!())
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::wrap!())
            .map(drop)?;

        log::info!(offer_id = %id, "`Offer` expired");
        Ok(Some(offer))
    }

    /// Expires the [`BuyRequest`] if it's still published and due.
    async fn expire_buy_request(
        &self,
        id: buy_request::Id,
        at: offer::ResponseDateTime,
    ) -> Result<(), ExecutionError> {
        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::wrap!())?;
        tx.execute(Lock(By::<BuyRequest, _>::new(id)))
            .await
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let Some(mut request) = tx
            .execute(Select(By::<Option<BuyRequest>, _>::new(id)))
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(());
        };
        if !request.is_due(at) || request.expire().is_err() {
            return Ok(());
        }

        tx.execute(Update(request))
            .await
            .map_err(tracerr::wrap!())
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::wrap!())
            .map(drop)?;

        log::info!(buy_request_id = %id, "`BuyRequest` expired");
        Ok(())
    }
}

/// Error of [`Expire`] execution.
pub type ExecutionError = Traced<database::Error>;
