#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Analytical views over the normalized impact layer.
//!
//! Every view is a pure function of the feature slice, so running the
//! views twice, or re-deriving them from a persisted layer read back with
//! [`export::read_features`], gives identical output.

pub mod export;
pub mod hotspots;
pub mod ranking;
pub mod rollup;

pub use export::{
    ExportError, read_features, write_features, write_hotspots, write_ranked, write_rollup,
};
pub use hotspots::aggregate_hotspots;
pub use ranking::{TOP_N, rank_by_year};
pub use rollup::rollup_by_year;
