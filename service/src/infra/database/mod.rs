//! [`Database`]-related implementations.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

use crate::domain::{
    buy_request, listing, matching, offer, subject, transaction,
};
#[cfg(doc)]
use crate::domain::{BuyRequest, Listing, Match, Transaction};

pub use self::memory::Memory;
#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Database operation.
pub use common::Handler as Database;

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// [`Memory`] error.
    Memory(memory::Error),

    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),

    /// Transaction is used after being committed.
    #[display("Transaction is already committed")]
    #[from(ignore)]
    Committed,
}

/// Resource guarded by a per-resource lock of a [`Database`] transaction.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum LockKey {
    /// [`Listing`] and the offers made on it.
    #[display("listing:{_0}")]
    Listing(listing::Id),

    /// [`BuyRequest`] and the offers made on it.
    #[display("buy_request:{_0}")]
    BuyRequest(buy_request::Id),

    /// Listing of a subject.
    #[display("subject:{_0}")]
    Subject(subject::Id),

    /// [`Match`] creation.
    #[display("match:{}:{}", _0.buy_request_id, _0.listing_id)]
    Match(matching::Key),

    /// [`Transaction`] settlement.
    #[display("transaction:{_0}")]
    Transaction(transaction::Id),
}

impl From<listing::Id> for LockKey {
    fn from(id: listing::Id) -> Self {
        Self::Listing(id)
    }
}

impl From<buy_request::Id> for LockKey {
    fn from(id: buy_request::Id) -> Self {
        Self::BuyRequest(id)
    }
}

impl From<offer::Reference> for LockKey {
    fn from(reference: offer::Reference) -> Self {
        match reference {
            offer::Reference::Listing(id) => Self::Listing(id),
            offer::Reference::BuyRequest(id) => Self::BuyRequest(id),
        }
    }
}

impl From<subject::Id> for LockKey {
    fn from(id: subject::Id) -> Self {
        Self::Subject(id)
    }
}

impl From<matching::Key> for LockKey {
    fn from(key: matching::Key) -> Self {
        Self::Match(key)
    }
}

impl From<transaction::Id> for LockKey {
    fn from(id: transaction::Id) -> Self {
        Self::Transaction(id)
    }
}
