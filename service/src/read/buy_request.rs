//! [`BuyRequest`]-related read definitions.

use crate::domain::buy_request;
#[cfg(doc)]
use crate::domain::{buy_request::Status, BuyRequest};

/// Selector of the [`Status::Published`] [`BuyRequest`]s expiring not later
/// than the wrapped moment.
#[derive(Clone, Copy, Debug)]
pub struct Due(pub buy_request::ExpirationDateTime);
