//! In-memory [`Database`] implementation.
//!
//! Writes are applied immediately and are never rolled back, while locks
//! taken in a transaction are held until it's committed or dropped.

mod impls;

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use derive_more::{Display, Error as StdError};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    domain::{
        buy_request, farm, listing, matching, offer, subject, transaction,
        BuyRequest, Farm, Listing, Match, Offer, Transaction,
    },
    infra::database::LockKey,
};
#[cfg(doc)]
use crate::infra::Database;

/// In-memory [`Database`].
#[derive(Clone, Debug, Default)]
pub struct Memory<T = NonTx> {
    /// Shared [`Store`] of this [`Memory`] database.
    store: Arc<Store>,

    /// Transactional state.
    tx: T,
}

impl Memory {
    /// Creates a new empty [`Memory`] database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T> Memory<T> {
    /// Makes all the following [`subject::Sold`] updates fail or succeed.
    pub fn set_failing_sales(&self, failing: bool) {
        self.store.failing_sales.store(failing, Ordering::Release);
    }
}

/// Marker of a non-transactional [`Memory`] client.
#[derive(Clone, Copy, Debug, Default)]
pub struct NonTx;

/// State of a transactional [`Memory`] client.
#[derive(Clone, Debug, Default)]
pub struct Tx {
    /// Locks held by this transaction.
    held: Arc<Mutex<HashMap<LockKey, OwnedMutexGuard<()>>>>,
}

/// Data and locks shared by all the [`Memory`] clients.
#[derive(Debug, Default)]
struct Store {
    /// Stored entities.
    data: Mutex<Data>,

    /// Per-resource locks.
    locks: Mutex<HashMap<LockKey, Arc<Mutex<()>>>>,

    /// Indicator whether recording subject sales fails.
    failing_sales: AtomicBool,
}

/// Entities of a [`Store`].
#[derive(Debug, Default)]
struct Data {
    /// Stored [`Farm`]s.
    farms: HashMap<farm::Id, Farm>,

    /// Stored [`subject::Snapshot`]s.
    subjects: HashMap<subject::Id, subject::Snapshot>,

    /// Stored [`Listing`]s.
    listings: HashMap<listing::Id, Listing>,

    /// Stored [`BuyRequest`]s.
    buy_requests: HashMap<buy_request::Id, BuyRequest>,

    /// Stored [`Match`]es by their natural key.
    matches: HashMap<matching::Key, Match>,

    /// Stored [`Offer`]s.
    offers: HashMap<offer::Id, Offer>,

    /// Stored [`Transaction`]s.
    transactions: HashMap<transaction::Id, Transaction>,
}

impl Memory<Tx> {
    /// Acquires the lock of the provided [`LockKey`], unless this
    /// transaction holds it already.
    async fn acquire(&self, key: LockKey) {
        if self.tx.held.lock().await.contains_key(&key) {
            return;
        }

        let lock = Arc::clone(
            self.store.locks.lock().await.entry(key).or_default(),
        );
        let guard = lock.lock_owned().await;
        drop(self.tx.held.lock().await.insert(key, guard));

        // Let concurrent transactions make progress up to this lock.
        tokio::task::yield_now().await;
    }

    /// Releases all the locks held by this transaction.
    async fn release(&self) {
        self.tx.held.lock().await.clear();
    }
}

/// [`Memory`] database error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Updated subject is not known.
    #[display("`subject::Snapshot(id: {_0})` doesn't exist")]
    UnknownSubject(#[error(not(source))] subject::Id),

    /// Recording subject sales is switched to fail.
    #[display("sale of `subject::Snapshot(id: {_0})` is not recorded")]
    SaleNotRecorded(#[error(not(source))] subject::Id),
}
