//! [`Listing`]-related read definitions.

use crate::domain::subject;
#[cfg(doc)]
use crate::domain::{listing::Status, Listing};

/// Selector of all the [`Status::Available`] [`Listing`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct Available;

/// Selector of the [`Status::Available`] or [`Status::Reserved`]
/// [`Listing`]s holding any of the subjects.
#[derive(Clone, Debug)]
pub struct Holding(pub Vec<subject::Id>);
