#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Measurement normalization and geographic feature building.
//!
//! - [`units`]: µg/L normalization of raw results
//! - [`thresholds`]: sanitary threshold resolution
//! - [`department`]: target-department membership
//! - [`geometry`]: point extraction from embedded `GeoJSON` or coordinates
//! - [`features`]: the [`features::FeatureBuilder`] tying it all together
//! - [`progress`]: progress reporting trait

pub mod department;
pub mod features;
pub mod geometry;
pub mod progress;
pub mod thresholds;
pub mod units;

pub use department::DepartmentFilter;
pub use features::{BuildOptions, BuildReport, DropReason, FeatureBuilder, recency_cutoff};
pub use thresholds::{DEFAULT_SANITARY_THRESHOLD_UGL, ThresholdResolver};
