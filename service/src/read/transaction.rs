//! [`Transaction`]-related read definitions.

use crate::domain::subject;
#[cfg(doc)]
use crate::domain::{transaction::Status, Transaction};

/// Selector of the not [`Status::Cancelled`] [`Transaction`]s trading any of
/// the subjects.
#[derive(Clone, Debug)]
pub struct Holding(pub Vec<subject::Id>);
