//! Marker types tagging [`DateTimeOf`] values.
//!
//! [`DateTimeOf`]: crate::DateTimeOf

/// Marker of an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker of an entity expiration.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;

/// Marker of a response given to an entity.
#[derive(Clone, Copy, Debug)]
pub struct Response;

/// Marker of an entity completion.
#[derive(Clone, Copy, Debug)]
pub struct Completion;
