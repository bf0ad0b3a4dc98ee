//! Location × substance × year rollup.

use std::collections::BTreeMap;

use phyto_map_measurement_models::{ImpactFeature, WaterBodyType};
use phyto_map_views_models::YearlyRollup;

/// Sort and grouping key: year first so the CSV reads chronologically.
type RollupKey = (String, Option<WaterBodyType>, String, String);

/// Counts features and averages known concentrations per (water type,
/// location, substance, year).
///
/// Features missing a location, substance, or year are skipped. Rows come
/// out sorted by year, then water type, location, and substance.
#[must_use]
pub fn rollup_by_year(features: &[ImpactFeature]) -> Vec<YearlyRollup> {
    let mut groups: BTreeMap<RollupKey, YearlyRollup> = BTreeMap::new();

    for feature in features {
        let p = &feature.properties;
        let (Some(location), Some(substance), Some(year)) = (
            p.location.as_deref().filter(|v| !v.is_empty()),
            p.substance.as_deref().map(str::trim).filter(|v| !v.is_empty()),
            p.year.as_deref().map(str::trim).filter(|v| !v.is_empty()),
        ) else {
            continue;
        };

        let row = groups
            .entry((
                year.to_string(),
                p.water_type,
                location.to_string(),
                substance.to_string(),
            ))
            .or_insert_with(|| YearlyRollup {
                water_type: p.water_type,
                location: location.to_string(),
                commune: p.commune.clone(),
                substance: substance.to_string(),
                usage: p.usage.clone(),
                year: year.to_string(),
                sample_count: 0,
                concentration_sum: 0.0,
                concentration_count: 0,
            });

        row.sample_count += 1;
        if let Some(concentration) = p.concentration_ugl {
            row.concentration_sum += concentration;
            row.concentration_count += 1;
        }
    }

    log::info!("Rolled {} features into {} rows", features.len(), groups.len());

    groups.into_values().collect()
}
