//! [`Match`] definitions.

pub mod engine;

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{buy_request, listing, user};
#[cfg(doc)]
use crate::domain::{BuyRequest, Listing};

pub use self::engine::{evaluate, Evaluation, Mismatch};

/// Durable verdict that a [`Listing`] satisfies a [`BuyRequest`].
#[derive(Clone, Copy, Debug)]
pub struct Match {
    /// ID of this [`Match`].
    pub id: Id,

    /// ID of the matched [`BuyRequest`].
    pub buy_request_id: buy_request::Id,

    /// ID of the matched [`Listing`].
    pub listing_id: listing::Id,

    /// ID of the seller of the matched [`Listing`].
    pub seller_id: user::Id,

    /// [`Score`] of this [`Match`].
    pub score: Score,

    /// Indicator whether the seller was notified about this [`Match`].
    pub notified: bool,

    /// [`DateTime`] when this [`Match`] was created.
    pub created_at: CreationDateTime,
}

impl Match {
    /// Returns the [`Key`] of this [`Match`].
    #[must_use]
    pub const fn key(&self) -> Key {
        Key {
            buy_request_id: self.buy_request_id,
            listing_id: self.listing_id,
        }
    }
}

/// Natural key of a [`Match`]: at most one [`Match`] exists per [`Key`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Key {
    /// ID of the matched [`BuyRequest`].
    pub buy_request_id: buy_request::Id,

    /// ID of the matched [`Listing`].
    pub listing_id: listing::Id,
}

/// ID of a [`Match`].
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

/// Score of a [`Match`] within `0..=100`.
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd,
)]
pub struct Score(u8);

impl Score {
    /// Highest possible [`Score`].
    pub const MAX: Self = Self(100);

    /// Creates a new [`Score`] if it doesn't exceed [`Score::MAX`].
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value > Self::MAX.0 {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Creates a new [`Score`] out of the provided points, capping them to
    /// `0..=100` and rounding to the nearest integer.
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "clamped to `0..=100` before casting"
    )]
    #[must_use]
    pub fn from_points(points: f64) -> Self {
        if points.is_nan() {
            return Self(0);
        }
        Self(points.clamp(0.0, 100.0).round() as u8)
    }

    /// Returns this [`Score`] as a plain number.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

/// [`DateTime`] when a [`Match`] was created.
pub type CreationDateTime = DateTimeOf<(Match, unit::Creation)>;
