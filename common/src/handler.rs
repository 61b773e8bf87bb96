//! [`Handler`] abstraction.
//!
//! Commands, queries, background tasks, database operations and
//! notifications are all expressed as a [`Handler`] of some argument type,
//! so the same value may handle many differently typed operations.

use std::future::Future;

/// Something able to handle `Args` asynchronously.
pub trait Handler<Args = ()> {
    /// Result of a successful handling.
    type Ok;

    /// Error of a failed handling.
    type Err;

    /// Handles the provided `args`.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
