//! [`Command`] definition.

pub mod accept_offer;
pub mod archive_buy_request;
pub mod confirm_delivery;
pub mod counter_offer;
pub mod create_buy_request;
pub mod create_listing;
pub mod create_offer;
pub mod find_matches_for_request;
pub mod reject_offer;
pub mod remove_listing;
pub mod restore_buy_request;
pub mod withdraw_offer;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    accept_offer::AcceptOffer, archive_buy_request::ArchiveBuyRequest,
    confirm_delivery::ConfirmDelivery, counter_offer::CounterOffer,
    create_buy_request::CreateBuyRequest, create_listing::CreateListing,
    create_offer::CreateOffer,
    find_matches_for_request::FindMatchesForRequest, reject_offer::RejectOffer,
    remove_listing::RemoveListing, restore_buy_request::RestoreBuyRequest,
    withdraw_offer::WithdrawOffer,
};
