//! Usage category detection from substance labels.
//!
//! Catalog labels often embed the product function ("Herbicide
//! sélectif…", "fongicide de contact"). The first matching rule in
//! [`USAGE_KEYWORDS`] wins, so the order of the slice is the detection
//! priority.

use phyto_map_substance_models::UsageCategory;

/// Keyword rules in priority order. Keywords are matched against
/// lower-cased text.
pub const USAGE_KEYWORDS: &[(&[&str], UsageCategory)] = &[
    (&["herbicide"], UsageCategory::Herbicide),
    (&["insecticide"], UsageCategory::Insecticide),
    (&["fongicide", "fungicide"], UsageCategory::Fungicide),
    (&["acaricide"], UsageCategory::Acaricide),
    (&["rodenticide"], UsageCategory::Rodenticide),
    (&["nématicide", "nematicide"], UsageCategory::Nematicide),
    (&["phéromone", "pheromone"], UsageCategory::SexPheromone),
];

/// Detects the usage category of a piece of text. Case-insensitive.
///
/// Returns `None` when no keyword matches.
#[must_use]
pub fn detect_usage(text: &str) -> Option<UsageCategory> {
    let lower = text.to_lowercase();

    USAGE_KEYWORDS
        .iter()
        .find(|(keywords, _)| contains_any(&lower, keywords))
        .map(|&(_, category)| category)
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
