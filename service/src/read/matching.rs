//! [`Match`]-related read definitions.

#[cfg(doc)]
use crate::domain::{buy_request::Status, Match};

/// Selector of the [`Match`]es whose buy request is not
/// [`Status::Published`] anymore.
#[derive(Clone, Copy, Debug, Default)]
pub struct Stale;
