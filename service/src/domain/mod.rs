//! Domain definitions.

pub mod buy_request;
pub mod farm;
pub mod listing;
pub mod matching;
pub mod notification;
pub mod offer;
pub mod role;
pub mod subject;
pub mod transaction;
pub mod user;

pub use self::{
    buy_request::BuyRequest, farm::Farm, listing::Listing, matching::Match,
    notification::Notification, offer::Offer, role::Role,
    transaction::Transaction,
};
