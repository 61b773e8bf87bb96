//! [`Offer`]-related read definitions.

use crate::domain::offer;
#[cfg(doc)]
use crate::domain::{offer::Status, Offer};

/// Selector of the [`Status::Pending`] [`Offer`]s made on the wrapped
/// [`offer::Reference`], including the ones already past their expiration.
#[derive(Clone, Copy, Debug)]
pub struct Pending(pub offer::Reference);

/// Selector of the [`Status::Pending`] [`Offer`]s expiring not later than
/// the wrapped moment.
#[derive(Clone, Copy, Debug)]
pub struct Due(pub offer::ExpirationDateTime);
