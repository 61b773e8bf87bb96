//! [`Query`] collection related to [`Listing`]s.

use common::operations::By;

use crate::{
    domain::{listing, user, Listing},
    read,
};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`Listing`] by its [`listing::Id`].
pub type ById = DatabaseQuery<By<Option<Listing>, listing::Id>>;

/// Queries all the [`Listing`]s of the seller with the provided
/// [`user::Id`].
pub type BySeller = DatabaseQuery<By<Vec<Listing>, user::Id>>;

/// Queries all the [`Listing`]s open for matching.
pub type Available = DatabaseQuery<By<Vec<Listing>, read::listing::Available>>;
