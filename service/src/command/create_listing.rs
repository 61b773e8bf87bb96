//! [`Command`] for creating a new [`Listing`].

use std::collections::{HashMap, HashSet};

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    Coordinates, Money, Weight,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        farm, listing, subject, transaction, user, Farm, Listing, Transaction,
    },
    error::{Classify, Kind},
    infra::{database, Database},
    read,
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Listing`].
#[derive(Clone, Debug)]
pub struct CreateListing {
    /// ID of the user selling the animals.
    pub seller_id: user::Id,

    /// ID of the [`Farm`] the animals are raised on.
    pub farm_id: farm::Id,

    /// What is sold by the [`Listing`].
    pub kind: listing::Kind,

    /// Declared [`subject::Breed`], if any.
    pub breed: Option<subject::Breed>,

    /// Asked price per kilogram of live weight.
    pub price_per_kg: Money,

    /// Declared [`Weight`] per head, if any.
    pub current_weight: Option<Weight>,

    /// When the declared [`Weight`] was measured, if known.
    pub weighed_at: Option<subject::WeighingDateTime>,

    /// Pick-up [`Coordinates`], if known.
    pub location: Option<Coordinates>,
}

impl<Db, Ntf> Command<CreateListing> for Service<Db, Ntf>
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
        >,
    Transacted<Db>: Database<
            Lock<By<subject::Snapshot, subject::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Listing>, read::listing::Holding>>,
            Ok = Vec<Listing>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Transaction>, read::transaction::Holding>>,
            Ok = Vec<Transaction>,
            Err = Traced<database::Error>,
        > + Database<Insert<Listing>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Listing;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateListing) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateListing {
            seller_id,
            farm_id,
            kind,
            breed,
            price_per_kg,
            current_weight,
            weighed_at,
            location,
        } = cmd;

        if !price_per_kg.is_positive() {
            return Err(tracerr::new!(E::NonPositivePrice(price_per_kg)));
        }
        let subject_ids = kind.subject_ids().to_vec();
        if subject_ids.is_empty() {
            return Err(tracerr::new!(E::EmptyBatch));
        }
        let mut seen = HashSet::with_capacity(subject_ids.len());
        if let Some(dup) = subject_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(tracerr::new!(E::DuplicateSubject(*dup)));
        }

        self.database()
            .execute(Select(By::<HashMap<_, Farm>, _>::new(vec![farm_id])))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .remove(&farm_id)
            .ok_or(E::FarmNotExists(farm_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let snapshots = self
            .database()
            .execute(Select(By::<HashMap<_, subject::Snapshot>, _>::new(
                subject_ids.clone(),
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        for id in &subject_ids {
            let snapshot = snapshots
                .get(id)
                .ok_or(E::SubjectNotExists(*id))
                .map_err(tracerr::wrap!())?;
            if snapshot.farm_id != farm_id {
                return Err(tracerr::new!(E::SubjectNotOnFarm {
                    subject_id: *id,
                    farm_id,
                }));
            }
            if !snapshot.is_sellable() {
                return Err(tracerr::new!(E::SubjectNotSellable(*id)));
            }
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Sorted, so concurrent listings of overlapping batches don't
        // deadlock.
        let mut lock_order = subject_ids.clone();
        lock_order.sort_unstable();
        for id in lock_order {
            tx.execute(Lock(By::<subject::Snapshot, _>::new(id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        if let Some(holding) = tx
            .execute(Select(By::<Vec<Listing>, _>::new(
                read::listing::Holding(subject_ids.clone()),
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .into_iter()
            .next()
        {
            let subject_id = subject_ids
                .iter()
                .copied()
                .find(|id| holding.subject_ids().contains(id))
                .unwrap_or(subject_ids[0]);
            return Err(tracerr::new!(E::SubjectAlreadyListed {
                subject_id,
                listing_id: holding.id,
            }));
        }

        if let Some(t) = tx
            .execute(Select(By::<Vec<Transaction>, _>::new(
                read::transaction::Holding(subject_ids.clone()),
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .into_iter()
            .next()
        {
            return Err(tracerr::new!(E::SubjectInTransaction(t.id)));
        }

        let listing = Listing {
            id: listing::Id::new(),
            seller_id,
            farm_id,
            kind,
            breed,
            price_per_kg,
            current_weight,
            weighed_at,
            location,
            status: listing::Status::Available,
            inquiries: 0,
            created_at: listing::CreationDateTime::now(),
        };

        tx.execute(Insert(listing.clone()))
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

/// Error of [`CreateListing`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Subject is listed more than once.
    #[display("Subject `{_0}` is listed more than once")]
    DuplicateSubject(#[error(not(source))] subject::Id),

    /// Batch contains no subjects.
    #[display("Batch contains no subjects")]
    EmptyBatch,

    /// [`Farm`] with the provided ID does not exist.
    #[display("`Farm(id: {_0})` does not exist")]
    FarmNotExists(#[error(not(source))] farm::Id),

    /// Price is not positive.
    #[display("Price `{_0}` is not positive")]
    NonPositivePrice(#[error(not(source))] Money),

    /// Subject is already on an active [`Listing`].
    #[display(
        "Subject `{subject_id}` is already listed by `Listing(id: \
         {listing_id})`"
    )]
    SubjectAlreadyListed {
        /// ID of the subject.
        subject_id: subject::Id,

        /// ID of the [`Listing`] holding the subject.
        listing_id: listing::Id,
    },

    /// Subjects are traded by a [`Transaction`] already.
    #[display("Subjects are traded by `Transaction(id: {_0})`")]
    SubjectInTransaction(#[error(not(source))] transaction::Id),

    /// Subject with the provided ID does not exist.
    #[display("Subject `{_0}` does not exist")]
    SubjectNotExists(#[error(not(source))] subject::Id),

    /// Subject belongs to another [`Farm`].
    #[display("Subject `{subject_id}` is not on `Farm(id: {farm_id})`")]
    SubjectNotOnFarm {
        /// ID of the subject.
        subject_id: subject::Id,

        /// ID of the [`Farm`] of the [`Listing`].
        farm_id: farm::Id,
    },

    /// Subject is sold already or not healthy.
    #[display("Subject `{_0}` cannot be sold")]
    SubjectNotSellable(#[error(not(source))] subject::Id),
}

impl Classify for ExecutionError {
    fn kind(&self) -> Kind {
        match self {
            Self::Db(e) => e.kind(),
            Self::DuplicateSubject(_)
            | Self::EmptyBatch
            | Self::NonPositivePrice(_)
            | Self::SubjectNotOnFarm { .. } => Kind::Validation,
            Self::FarmNotExists(_) | Self::SubjectNotExists(_) => {
                Kind::NotFound
            }
            Self::SubjectAlreadyListed { .. } => Kind::Conflict,
            Self::SubjectInTransaction(_) | Self::SubjectNotSellable(_) => {
                Kind::InvalidState
            }
        }
    }
}
