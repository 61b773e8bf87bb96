//! [`CleanStaleMatches`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::operations::{By, Delete, Perform, Start};
use smart_default::SmartDefault;
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::Match,
    infra::{database, Database},
    read,
    Service,
};

use super::Task;

/// Configuration for [`CleanStaleMatches`] [`Task`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Interval between [`Match`]es cleaning.
    #[default(time::Duration::from_secs(60 * 60))]
    pub interval: time::Duration,
}

/// [`Task`] for deleting [`Match`]es of buy requests which are not published
/// anymore.
#[derive(Clone, Copy, Debug)]
pub struct CleanStaleMatches<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db, Ntf> Task<Start<By<CleanStaleMatches<Self>, Config>>>
    for Service<Db, Ntf>
where
    CleanStaleMatches<Self>: Task<Perform<()>, Ok = (), Err: Error> + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<CleanStaleMatches<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = CleanStaleMatches {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            _ = task.execute(Perform(())).await.map_err(|e| {
                log::error!("`task::CleanStaleMatches` failed: {e}");
            });
        }
    }
}

impl<Db, Ntf> Task<Perform<()>> for CleanStaleMatches<Service<Db, Ntf>>
where
    Db: Database<
        Delete<By<Match, read::matching::Stale>>,
        Ok = u64,
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let deleted = self
            .service
            .database()
            .execute(Delete(By::new(read::matching::Stale)))
            .await
            .map_err(tracerr::map_from_and_wrap!())?;
        if deleted > 0 {
            log::debug!(deleted, "stale `Match`es cleaned");
        }
        Ok(())
    }
}

/// Error of [`CleanStaleMatches`] execution.
pub type ExecutionError = Traced<database::Error>;
