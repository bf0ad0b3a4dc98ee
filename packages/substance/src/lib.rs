#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Substance metadata resolution for measured parameters.
//!
//! [`resolver::SubstanceResolver`] turns a parameter code, its label, and
//! its catalog entry into display name, plant-protection usage, typical
//! uses, authorization status, and reference links.
//! [`dictionary::write_usage_dictionary`] regenerates the manual usage
//! table from the catalog, and
//! [`sources::write_usage_dictionary_from_sources`] from the BNV-D
//! substance exports, regulatory columns included.

pub mod dictionary;
pub mod resolver;
pub mod sources;
pub mod usage_mapping;

pub use dictionary::{DictionaryError, write_usage_dictionary};
pub use resolver::SubstanceResolver;
pub use sources::write_usage_dictionary_from_sources;
pub use usage_mapping::detect_usage;
