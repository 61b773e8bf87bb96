//! Classification of [`Service`] errors.
//!
//! [`Service`]: crate::Service

use std::convert::Infallible;

use derive_more::Display;
use tracerr::Traced;

use crate::infra::{database, notifier};

/// Stable category of an operation failure.
///
/// Callers map these onto user-facing messages without matching on error
/// texts.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Kind {
    /// Referenced entity doesn't exist.
    #[display("not found")]
    NotFound,

    /// Entity is not in a state allowing the operation.
    #[display("invalid state")]
    InvalidState,

    /// Acting user is not allowed to perform the operation.
    #[display("unauthorized")]
    Unauthorized,

    /// Operation collides with an existing entity.
    #[display("conflict")]
    Conflict,

    /// Provided input is malformed.
    #[display("validation error")]
    Validation,

    /// Infrastructure failure.
    #[display("internal error")]
    Internal,
}

/// Error able to report its [`Kind`].
pub trait Classify {
    /// Returns the [`Kind`] of this error.
    fn kind(&self) -> Kind;
}

impl<E: Classify> Classify for Traced<E> {
    fn kind(&self) -> Kind {
        self.as_ref().kind()
    }
}

impl Classify for database::Error {
    fn kind(&self) -> Kind {
        Kind::Internal
    }
}

impl Classify for notifier::Error {
    fn kind(&self) -> Kind {
        Kind::Internal
    }
}

impl Classify for Infallible {
    fn kind(&self) -> Kind {
        match *self {}
    }
}
