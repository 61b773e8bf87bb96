//! [`Query`] collection related to a single [`BuyRequest`].

use common::operations::By;

use crate::domain::{buy_request, BuyRequest};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`BuyRequest`] by its [`buy_request::Id`].
pub type ById = DatabaseQuery<By<Option<BuyRequest>, buy_request::Id>>;
