//! Read selectors of the [`Database`].
//!
//! [`Database`]: crate::infra::Database

pub mod buy_request;
pub mod listing;
pub mod matching;
pub mod offer;
pub mod transaction;
