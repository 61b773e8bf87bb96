//! Livestock marketplace core: matching buy requests against listings,
//! negotiating offers and settling transactions.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod error;
pub mod infra;
pub mod query;
pub mod read;
pub mod task;

use std::time::Duration;

use common::{
    operations::{By, Emit, Start},
    Distance,
};
use smart_default::SmartDefault;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::Notification,
    infra::{notifier, Notifier},
};
#[cfg(doc)]
use crate::{
    domain::{BuyRequest, Offer},
    infra::Database,
};

pub use self::{
    command::Command,
    error::{Classify, Kind as ErrorKind},
    query::Query,
    task::Task,
};

/// [`Service`] configuration.
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// [`Marketplace`] rules.
    pub marketplace: Marketplace,

    /// [`task::Expire`] configuration.
    pub expire: task::expire::Config,

    /// [`task::CleanStaleMatches`] configuration.
    pub clean_stale_matches: task::clean_stale_matches::Config,
}

/// Rules of the marketplace.
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Marketplace {
    /// Time an [`Offer`] stays pending before it expires.
    #[default(Duration::from_secs(7 * 24 * 60 * 60))]
    pub offer_ttl: Duration,

    /// Time a [`BuyRequest`] stays published, unless requested otherwise.
    #[default(Duration::from_secs(30 * 24 * 60 * 60))]
    pub buy_request_ttl: Duration,

    /// Delivery radius of a [`BuyRequest`] not specifying its own one.
    #[default(Distance::from_km(50))]
    pub default_delivery_radius: Distance,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db, Ntf> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// [`Notifier`] of this [`Service`].
    notifier: Ntf,
}

impl<Db, Ntf> Service<Db, Ntf> {
    /// Creates a new [`Service`] with the provided parameters, returning it
    /// along with its [`task::Background`] to be run by the caller.
    pub fn new(
        config: Config,
        database: Db,
        notifier: Ntf,
    ) -> (Self, task::Background)
    where
        Self: Task<
                Start<By<task::Expire<Self>, task::expire::Config>>,
                Ok = (),
                Err: std::error::Error,
            > + Task<
                Start<
                    By<
                        task::CleanStaleMatches<Self>,
                        task::clean_stale_matches::Config,
                    >,
                >,
                Ok = (),
                Err: std::error::Error,
            > + Clone
            + 'static,
    {
        let this = Self::without_tasks(config, database, notifier);

        let mut bg = task::Background::default();
        let svc = this.clone();
        bg.spawn(async move {
            svc.execute(Start(By::<task::Expire<_>, _>::new(
                svc.config().expire,
            )))
            .await
        });
        let svc = this.clone();
        bg.spawn(async move {
            svc.execute(Start(By::<task::CleanStaleMatches<_>, _>::new(
                svc.config().clean_stale_matches,
            )))
            .await
        });

        (this, bg)
    }

    /// Creates a new [`Service`] with the provided parameters, without
    /// starting any background [`Task`].
    #[must_use]
    pub const fn without_tasks(
        config: Config,
        database: Db,
        notifier: Ntf,
    ) -> Self {
        Self {
            config,
            database,
            notifier,
        }
    }

    /// Returns [`Config`] of this [`Service`].
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub const fn database(&self) -> &Db {
        &self.database
    }

    /// Returns [`Notifier`] of this [`Service`].
    #[must_use]
    pub const fn notifier(&self) -> &Ntf {
        &self.notifier
    }
}

impl<Db, Ntf> Service<Db, Ntf>
where
    Ntf: Notifier<
        Emit<Notification>,
        Ok = (),
        Err = Traced<notifier::Error>,
    >,
{
    /// Delivers the provided [`Notification`].
    ///
    /// Delivery failures are logged and never propagated, returning `false`
    /// instead.
    pub(crate) async fn notify(&self, notification: Notification) -> bool {
        let recipient_id = notification.recipient_id;
        let kind = notification.event.kind();
        self.notifier
            .execute(Emit(notification))
            .await
            .map_err(|e| {
                log::error!(
                    recipient = %recipient_id,
                    event = kind,
                    "failed to deliver notification: {e}",
                );
            })
            .is_ok()
    }

    /// Delivers all the provided [`Notification`]s one by one.
    ///
    /// Delivery failures are logged and don't stop the following deliveries.
    pub(crate) async fn dispatch(
        &self,
        notifications: impl IntoIterator<Item = Notification>,
    ) {
        for n in notifications {
            _ = self.notify(n).await;
        }
    }
}
