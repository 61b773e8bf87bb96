//! Application wiring the [`Service`] with its infrastructure and running
//! its background tasks.
//!
//! [`Service`]: service::Service

#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod args;
pub mod config;

// Used in binary.
use futures as _;
use refinery as _;
use tokio as _;
use tracing_subscriber as _;

use service::infra::{notifier, Postgres};

pub use self::{args::Args, config::Config};

/// [`service::Service`] with filled infrastructure dependencies.
pub type Service = service::Service<Postgres, notifier::Log>;
