//! [`Query`] collection related to [`Offer`]s.

use common::operations::By;

use crate::{
    domain::{offer, Offer},
    read,
};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries an [`Offer`] by its [`offer::Id`].
pub type ById = DatabaseQuery<By<Option<Offer>, offer::Id>>;

/// Queries pending [`Offer`]s made on an [`offer::Reference`].
pub type Pending = DatabaseQuery<By<Vec<Offer>, read::offer::Pending>>;
