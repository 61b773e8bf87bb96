//! [`Command`] for matching a [`BuyRequest`] against available [`Listing`]s.

use std::collections::{HashMap, HashSet};

use common::{
    operations::{
        By, Commit, Emit, Insert, Lock, Select, Transact, Transacted, Update,
    },
    DateTime, Distance,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        buy_request, farm,
        matching::{self, Evaluation, Score},
        subject, BuyRequest, Farm, Listing, Match, Notification,
    },
    error::{Classify, Kind},
    infra::{database, notifier, Database, Notifier},
    read,
    Service,
};

use super::Command;

/// [`Command`] for matching a [`BuyRequest`] against all the available
/// [`Listing`]s.
///
/// Idempotent: re-running it never creates a second [`Match`] for the same
/// pair, nor notifies the seller twice.
#[derive(Clone, Copy, Debug)]
pub struct FindMatchesForRequest {
    /// ID of the [`BuyRequest`] to find [`Match`]es for.
    pub buy_request_id: buy_request::Id,
}

impl<Db, Ntf> Command<FindMatchesForRequest> for Service<Db, Ntf>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<BuyRequest>, buy_request::Id>>,
            Ok = Option<BuyRequest>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Listing>, read::listing::Available>>,
            Ok = Vec<Listing>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HashMap<farm::Id, Farm>, Vec<farm::Id>>>,
            Ok = HashMap<farm::Id, Farm>,
            Err = Traced<database::Error>,
        > + Database<
            Select<
                By<HashMap<subject::Id, subject::Snapshot>, Vec<subject::Id>>,
            >,
            Ok = HashMap<subject::Id, subject::Snapshot>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Match, matching::Key>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Match>, matching::Key>>,
            Ok = Option<Match>,
            Err = Traced<database::Error>,
        > + Database<Insert<Match>, Err = Traced<database::Error>>
        + Database<Update<Match>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Ntf: Notifier<
        Emit<Notification>,
        Ok = (),
        Err = Traced<notifier::Error>,
    >,
{
    type Ok = Vec<Match>;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: FindMatchesForRequest,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let FindMatchesForRequest { buy_request_id } = cmd;
        let now = DateTime::now();

        let request = self
            .database()
            .execute(Select(By::<Option<BuyRequest>, _>::new(buy_request_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BuyRequestNotExists(buy_request_id))
            .map_err(tracerr::wrap!())?;
        if !request.is_open(now) {
            return Err(tracerr::new!(E::BuyRequestNotPublished(
                buy_request_id
            )));
        }

        let listings = self
            .database()
            .execute(Select(By::<Vec<Listing>, _>::new(
                read::listing::Available,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let farm_ids = listings
            .iter()
            .map(|l| l.farm_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        let farms = self
            .database()
            .execute(Select(By::<HashMap<_, Farm>, _>::new(farm_ids)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Buyers never match their own listings.
        let listings = listings
            .into_iter()
            .filter(|l| {
                !l.is_owned_by(request.buyer_id, farms.get(&l.farm_id))
            })
            .collect::<Vec<_>>();

        let subject_ids = listings
            .iter()
            .flat_map(|l| l.subject_ids().iter().copied())
            .collect::<Vec<_>>();
        let snapshots = self
            .database()
            .execute(Select(By::<HashMap<_, subject::Snapshot>, _>::new(
                subject_ids,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let radius = self.config().marketplace.default_delivery_radius;
        let mut matches = Vec::new();
        for listing in &listings {
            let Some(score) = best_score(
                &request,
                listing,
                &snapshots,
                now,
                radius,
            ) else {
                continue;
            };

            let m = self
                .register_match(&request, listing, score)
                .await
                .map_err(tracerr::wrap!())?;
            matches.push(m);
        }

        matches.sort_by(|a, b| b.score.cmp(&a.score));
        Ok(matches)
    }
}

impl<Db, Ntf> Service<Db, Ntf>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Match, matching::Key>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Match>, matching::Key>>,
            Ok = Option<Match>,
            Err = Traced<database::Error>,
        > + Database<Insert<Match>, Err = Traced<database::Error>>
        + Database<Update<Match>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Ntf: Notifier<
        Emit<Notification>,
        Ok = (),
        Err = Traced<notifier::Error>,
    >,
{
    /// Records the [`Match`] of the provided pair unless it exists already,
    /// and notifies the seller about it, unless notified before.
    async fn register_match(
        &self,
        request: &BuyRequest,
        listing: &Listing,
        score: Score,
    ) -> Result<Match, Traced<ExecutionError>> {
        use ExecutionError as E;

        let key = matching::Key {
            buy_request_id: request.id,
            listing_id: listing.id,
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Concurrent runs must agree on a single `Match` per pair.
        tx.execute(Lock(By::new(key)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let existing = tx
            .execute(Select(By::<Option<Match>, _>::new(key)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let mut m = if let Some(m) = existing {
            m
        } else {
            let m = Match {
                id: matching::Id::new(),
                buy_request_id: request.id,
                listing_id: listing.id,
                seller_id: listing.seller_id,
                score,
                notified: false,
                created_at: matching::CreationDateTime::now(),
            };
            tx.execute(Insert(m))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            log::info!(
                buy_request_id = %m.buy_request_id,
                listing_id = %m.listing_id,
                score = %m.score,
                "new `Match` recorded",
            );
            m
        };

        // Notified under the lock, so the seller hears about it only once.
        if !m.notified && self.notify(Notification::match_found(&m)).await {
            m.notified = true;
            tx.execute(Update(m))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(m)
    }
}

/// Evaluates every subject of the provided [`Listing`] against the
/// [`BuyRequest`], returning the best [`Score`] among the matching ones.
fn best_score(
    request: &BuyRequest,
    listing: &Listing,
    snapshots: &HashMap<subject::Id, subject::Snapshot>,
    now: DateTime,
    default_radius: Distance,
) -> Option<Score> {
    listing
        .subject_ids()
        .iter()
        .filter_map(|id| {
            let snapshot = snapshots.get(id).cloned().unwrap_or_else(|| {
                subject::Snapshot::unknown(*id, listing.farm_id)
            });
            match matching::evaluate(
                request,
                listing,
                &snapshot,
                now,
                default_radius,
            ) {
                Evaluation::Match(score) => Some(score),
                Evaluation::Mismatch(reason) => {
                    log::debug!(
                        buy_request_id = %request.id,
                        listing_id = %listing.id,
                        subject_id = %id,
                        "no match: {reason}",
                    );
                    None
                }
            }
        })
        .max()
}

/// Error of [`FindMatchesForRequest`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`BuyRequest`] with the provided ID does not exist.
    #[display("`BuyRequest(id: {_0})` does not exist")]
    BuyRequestNotExists(#[error(not(source))] buy_request::Id),

    /// [`BuyRequest`] is not published, or past its expiration.
    #[display("`BuyRequest(id: {_0})` is not published")]
    BuyRequestNotPublished(#[error(not(source))] buy_request::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),
}

impl Classify for ExecutionError {
    fn kind(&self) -> Kind {
        match self {
            Self::BuyRequestNotExists(_) => Kind::NotFound,
            Self::BuyRequestNotPublished(_) => Kind::InvalidState,
            Self::Db(e) => e.kind(),
        }
    }
}
