//! Typed operations dispatched through a [`Handler`].

use std::marker::PhantomData;

use crate::Handler;

/// Operation inserting a new value.
#[derive(Clone, Copy, Debug)]
pub struct Insert<T>(pub T);

/// Operation overwriting an existing value.
#[derive(Clone, Copy, Debug)]
pub struct Update<T>(pub T);

/// Operation deleting values.
#[derive(Clone, Copy, Debug)]
pub struct Delete<T>(pub T);

/// Operation selecting values.
#[derive(Clone, Copy, Debug)]
pub struct Select<T>(pub T);

/// Operation acquiring an exclusive lock until the end of a transaction.
#[derive(Clone, Copy, Debug)]
pub struct Lock<T>(pub T);

/// Operation starting a long-running process.
#[derive(Clone, Copy, Debug)]
pub struct Start<T>(pub T);

/// Operation performing a single iteration of a process.
#[derive(Clone, Copy, Debug)]
pub struct Perform<T>(pub T);

/// Operation emitting a value to some outer party.
#[derive(Clone, Debug)]
pub struct Emit<T>(pub T);

/// Operation opening a transaction.
#[derive(Clone, Copy, Debug)]
pub struct Transact;

/// Handle produced by [`Transact`]ing the `T`.
pub type Transacted<T> = <T as Handler<Transact>>::Ok;

/// Operation committing a transaction.
#[derive(Clone, Copy, Debug)]
pub struct Commit;

/// Selector of a `W`hat by a `B` key.
#[derive(Clone, Copy, Debug)]
pub struct By<W, B> {
    /// Type of the selected value.
    _what: PhantomData<W>,

    /// Key to select by.
    by: B,
}

impl<W, B> By<W, B> {
    /// Creates a new [`By`] selector with the provided key.
    #[must_use]
    pub fn new(by: B) -> Self {
        Self {
            _what: PhantomData,
            by,
        }
    }

    /// Returns the key of this [`By`] selector.
    #[must_use]
    pub fn into_inner(self) -> B {
        self.by
    }
}
