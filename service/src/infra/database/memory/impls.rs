//! [`Database`] implementations of the [`Memory`] database.

use std::{collections::HashMap, sync::atomic::Ordering};

use common::operations::{
    By, Commit, Delete, Insert, Lock, Select, Transact, Update,
};
use tracerr::Traced;

use crate::{
    domain::{
        buy_request, farm, listing, matching, offer, subject, transaction,
        user, BuyRequest, Farm, Listing, Match, Offer, Transaction,
    },
    infra::{
        database::{self, LockKey},
        Database,
    },
    read,
};

use super::{Error, Memory, NonTx, Tx};

impl Database<Transact> for Memory<NonTx> {
    type Ok = Memory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(Memory {
            store: self.store.clone(),
            tx: Tx::default(),
        })
    }
}

impl Database<Transact> for Memory<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.release().await;
        Ok(())
    }
}

impl<W, B> Database<Lock<By<W, B>>> for Memory<Tx>
where
    B: Into<LockKey>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<W, B>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.acquire(by.into_inner().into()).await;
        Ok(())
    }
}

impl<T> Database<Insert<Farm>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(farm): Insert<Farm>,
    ) -> Result<Self::Ok, Self::Err> {
        drop(self.store.data.lock().await.farms.insert(farm.id, farm));
        Ok(())
    }
}

impl<T> Database<Select<By<HashMap<farm::Id, Farm>, Vec<farm::Id>>>>
    for Memory<T>
{
    type Ok = HashMap<farm::Id, Farm>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<farm::Id, Farm>, Vec<farm::Id>>>,
    ) -> Result<Self::Ok, Self::Err> {
        let data = self.store.data.lock().await;
        Ok(by
            .into_inner()
            .into_iter()
            .filter_map(|id| data.farms.get(&id).map(|f| (id, *f)))
            .collect())
    }
}

impl<T> Database<Insert<subject::Snapshot>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(snapshot): Insert<subject::Snapshot>,
    ) -> Result<Self::Ok, Self::Err> {
        drop(
            self.store
                .data
                .lock()
                .await
                .subjects
                .insert(snapshot.id, snapshot),
        );
        Ok(())
    }
}

impl<T>
    Database<
        Select<By<HashMap<subject::Id, subject::Snapshot>, Vec<subject::Id>>>,
    > for Memory<T>
{
    type Ok = HashMap<subject::Id, subject::Snapshot>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<HashMap<subject::Id, subject::Snapshot>, Vec<subject::Id>>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let data = self.store.data.lock().await;
        Ok(by
            .into_inner()
            .into_iter()
            .filter_map(|id| data.subjects.get(&id).map(|s| (id, s.clone())))
            .collect())
    }
}

impl<T> Database<Update<subject::Sold>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(sold): Update<subject::Sold>,
    ) -> Result<Self::Ok, Self::Err> {
        if self.store.failing_sales.load(Ordering::Acquire) {
            return Err(tracerr::new!(database::Error::from(
                Error::SaleNotRecorded(sold.subject_id)
            )));
        }

        let mut data = self.store.data.lock().await;
        let snapshot =
            data.subjects.get_mut(&sold.subject_id).ok_or_else(|| {
                tracerr::new!(database::Error::from(Error::UnknownSubject(
                    sold.subject_id
                )))
            })?;
        snapshot.sold_at = Some(sold.sold_at);
        Ok(())
    }
}

impl<T> Database<Insert<Listing>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(listing): Insert<Listing>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(listing)).await
    }
}

impl<T> Database<Update<Listing>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(listing): Update<Listing>,
    ) -> Result<Self::Ok, Self::Err> {
        drop(
            self.store
                .data
                .lock()
                .await
                .listings
                .insert(listing.id, listing),
        );
        Ok(())
    }
}

impl<T> Database<Select<By<Option<Listing>, listing::Id>>> for Memory<T> {
    type Ok = Option<Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Listing>, listing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .store
            .data
            .lock()
            .await
            .listings
            .get(&by.into_inner())
            .cloned())
    }
}

impl<T> Memory<T> {
    /// Selects all the [`Listing`]s satisfying the provided predicate,
    /// oldest first.
    async fn listings(&self, pred: impl Fn(&Listing) -> bool) -> Vec<Listing> {
        let mut listings: Vec<_> = self
            .store
            .data
            .lock()
            .await
            .listings
            .values()
            .filter(|l| pred(l))
            .cloned()
            .collect();
        listings.sort_by_key(|l| (l.created_at, l.id));
        listings
    }

    /// Selects all the [`Offer`]s satisfying the provided predicate, oldest
    /// first.
    async fn offers(&self, pred: impl Fn(&Offer) -> bool) -> Vec<Offer> {
        let mut offers: Vec<_> = self
            .store
            .data
            .lock()
            .await
            .offers
            .values()
            .filter(|o| pred(o))
            .cloned()
            .collect();
        offers.sort_by_key(|o| o.created_at);
        offers
    }
}

impl<T> Database<Select<By<Vec<Listing>, user::Id>>> for Memory<T> {
    type Ok = Vec<Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Listing>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let seller_id = by.into_inner();
        Ok(self.listings(|l| l.seller_id == seller_id).await)
    }
}

impl<T> Database<Select<By<Vec<Listing>, read::listing::Available>>>
    for Memory<T>
{
    type Ok = Vec<Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<Listing>, read::listing::Available>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .listings(|l| l.status == listing::Status::Available)
            .await)
    }
}

impl<T> Database<Select<By<Vec<Listing>, read::listing::Holding>>>
    for Memory<T>
{
    type Ok = Vec<Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Listing>, read::listing::Holding>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::listing::Holding(ids) = by.into_inner();
        Ok(self
            .listings(|l| {
                matches!(
                    l.status,
                    listing::Status::Available | listing::Status::Reserved,
                ) && l.subject_ids().iter().any(|id| ids.contains(id))
            })
            .await)
    }
}

impl<T> Database<Insert<BuyRequest>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(request): Insert<BuyRequest>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(request)).await
    }
}

impl<T> Database<Update<BuyRequest>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(request): Update<BuyRequest>,
    ) -> Result<Self::Ok, Self::Err> {
        drop(
            self.store
                .data
                .lock()
                .await
                .buy_requests
                .insert(request.id, request),
        );
        Ok(())
    }
}

impl<T> Database<Select<By<Option<BuyRequest>, buy_request::Id>>>
    for Memory<T>
{
    type Ok = Option<BuyRequest>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<BuyRequest>, buy_request::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .store
            .data
            .lock()
            .await
            .buy_requests
            .get(&by.into_inner())
            .cloned())
    }
}

impl<T> Database<Select<By<Vec<BuyRequest>, read::buy_request::Due>>>
    for Memory<T>
{
    type Ok = Vec<BuyRequest>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<BuyRequest>, read::buy_request::Due>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::buy_request::Due(at) = by.into_inner();
        let mut due: Vec<_> = self
            .store
            .data
            .lock()
            .await
            .buy_requests
            .values()
            .filter(|r| {
                r.status == buy_request::Status::Published && r.is_due(at)
            })
            .cloned()
            .collect();
        due.sort_by_key(|r| r.expires_at);
        Ok(due)
    }
}

impl<T> Database<Insert<Match>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(m): Insert<Match>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(m)).await
    }
}

impl<T> Database<Update<Match>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(m): Update<Match>,
    ) -> Result<Self::Ok, Self::Err> {
        drop(self.store.data.lock().await.matches.insert(m.key(), m));
        Ok(())
    }
}

impl<T> Database<Select<By<Option<Match>, matching::Key>>> for Memory<T> {
    type Ok = Option<Match>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Match>, matching::Key>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .store
            .data
            .lock()
            .await
            .matches
            .get(&by.into_inner())
            .copied())
    }
}

impl<T> Database<Select<By<Vec<Match>, buy_request::Id>>> for Memory<T> {
    type Ok = Vec<Match>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Match>, buy_request::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let request_id = by.into_inner();
        let mut matches: Vec<_> = self
            .store
            .data
            .lock()
            .await
            .matches
            .values()
            .filter(|m| m.buy_request_id == request_id)
            .copied()
            .collect();
        matches.sort_by(|a, b| {
            b.score.cmp(&a.score).then(a.created_at.cmp(&b.created_at))
        });
        Ok(matches)
    }
}

impl<T> Database<Delete<By<Match, read::matching::Stale>>> for Memory<T> {
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Delete<By<Match, read::matching::Stale>>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut data = self.store.data.lock().await;
        let data = &mut *data;
        let before = data.matches.len();
        let requests = &data.buy_requests;
        data.matches.retain(|_, m| {
            requests.get(&m.buy_request_id).is_some_and(|r| {
                r.status == buy_request::Status::Published
            })
        });
        Ok(u64::try_from(before - data.matches.len()).unwrap_or(u64::MAX))
    }
}

impl<T> Database<Insert<Offer>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(offer): Insert<Offer>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(offer)).await
    }
}

impl<T> Database<Update<Offer>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(offer): Update<Offer>,
    ) -> Result<Self::Ok, Self::Err> {
        drop(self.store.data.lock().await.offers.insert(offer.id, offer));
        Ok(())
    }
}

impl<T> Database<Select<By<Option<Offer>, offer::Id>>> for Memory<T> {
    type Ok = Option<Offer>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Offer>, offer::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .store
            .data
            .lock()
            .await
            .offers
            .get(&by.into_inner())
            .cloned())
    }
}

impl<T> Database<Select<By<Vec<Offer>, read::offer::Pending>>> for Memory<T> {
    type Ok = Vec<Offer>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Offer>, read::offer::Pending>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::offer::Pending(reference) = by.into_inner();
        Ok(self
            .offers(|o| {
                o.reference == reference && o.status == offer::Status::Pending
            })
            .await)
    }
}

impl<T> Database<Select<By<Vec<Offer>, read::offer::Due>>> for Memory<T> {
    type Ok = Vec<Offer>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Offer>, read::offer::Due>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::offer::Due(at) = by.into_inner();
        Ok(self
            .offers(|o| o.status == offer::Status::Pending && o.is_due(at))
            .await)
    }
}

impl<T> Database<Insert<Transaction>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(transaction): Insert<Transaction>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(transaction)).await
    }
}

impl<T> Database<Update<Transaction>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(transaction): Update<Transaction>,
    ) -> Result<Self::Ok, Self::Err> {
        drop(
            self.store
                .data
                .lock()
                .await
                .transactions
                .insert(transaction.id, transaction),
        );
        Ok(())
    }
}

impl<T> Database<Select<By<Option<Transaction>, transaction::Id>>>
    for Memory<T>
{
    type Ok = Option<Transaction>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Transaction>, transaction::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .store
            .data
            .lock()
            .await
            .transactions
            .get(&by.into_inner())
            .cloned())
    }
}

impl<T> Database<Select<By<Vec<Transaction>, read::transaction::Holding>>>
    for Memory<T>
{
    type Ok = Vec<Transaction>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Transaction>, read::transaction::Holding>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::transaction::Holding(ids) = by.into_inner();
        let mut transactions: Vec<_> = self
            .store
            .data
            .lock()
            .await
            .transactions
            .values()
            .filter(|t| {
                t.status != transaction::Status::Cancelled
                    && t.subject_ids.iter().any(|id| ids.contains(id))
            })
            .cloned()
            .collect();
        transactions.sort_by_key(|t| t.created_at);
        Ok(transactions)
    }
}
