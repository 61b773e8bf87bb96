//! [`Query`] collection related to [`Match`]es.

use common::operations::By;

use crate::domain::{buy_request, Match};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries [`Match`]es of a buy request, the best scored first.
pub type ByBuyRequest = DatabaseQuery<By<Vec<Match>, buy_request::Id>>;
