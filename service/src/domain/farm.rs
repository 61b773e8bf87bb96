//! [`Farm`] definitions.

use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user;

/// Farm (project) raising the animals offered on the marketplace.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Farm {
    /// ID of this [`Farm`].
    pub id: Id,

    /// ID of the user owning this [`Farm`].
    pub owner_id: user::Id,
}

/// ID of a [`Farm`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}
