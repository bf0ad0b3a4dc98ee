//! Exceedance hotspots per (water type, location, substance).

use std::collections::BTreeMap;

use phyto_map_measurement_models::{ImpactFeature, WaterBodyType};
use phyto_map_views_models::{ExceedanceType, HotspotAggregate};

/// Symbol size of a hotspot with no ratio above 1 and no environmental
/// exceedance.
pub const BASE_SIZE_MM: f64 = 4.0;
/// Growth per unit of sanitary ratio above 1.
pub const SIZE_PER_RATIO_MM: f64 = 0.75;
/// Ratio excess beyond which the symbol stops growing.
pub const MAX_RATIO_EXCESS: f64 = 9.0;
/// Extra size for an environmental exceedance, also the inner ring margin.
pub const ENVIRONMENTAL_BONUS_MM: f64 = 1.5;

type HotspotKey = (Option<WaterBodyType>, String, String);

struct Accumulator {
    first: ImpactFeature,
    substance: String,
    location: String,
    measurement_count: usize,
    exceedance_count: usize,
    environmental: bool,
    max_concentration: f64,
    max_ratio: Option<f64>,
    sampling_date: Option<String>,
    year_min: Option<String>,
    year_max: Option<String>,
}

impl Accumulator {
    fn new(feature: &ImpactFeature, location: &str, substance: &str) -> Self {
        Self {
            first: feature.clone(),
            substance: substance.to_string(),
            location: location.to_string(),
            measurement_count: 0,
            exceedance_count: 0,
            environmental: false,
            max_concentration: 0.0,
            max_ratio: None,
            sampling_date: None,
            year_min: None,
            year_max: None,
        }
    }

    fn add(&mut self, feature: &ImpactFeature) {
        let p = &feature.properties;

        if p.environmental_exceedance == Some(true) {
            self.environmental = true;
        }

        if let Some(ratio) = p.sanitary_ratio
            && self.max_ratio.is_none_or(|max| ratio > max)
        {
            self.max_ratio = Some(ratio);
            self.sampling_date.clone_from(&p.sampling_date);
        }

        let Some(concentration) = p.concentration_ugl else {
            return;
        };

        self.measurement_count += 1;
        if let Some(year) = p.year.as_deref() {
            if self.year_min.as_deref().is_none_or(|min| year < min) {
                self.year_min = Some(year.to_string());
            }
            if self.year_max.as_deref().is_none_or(|max| year > max) {
                self.year_max = Some(year.to_string());
            }
        }
        if concentration > self.max_concentration {
            self.max_concentration = concentration;
            if self.sampling_date.is_none() {
                self.sampling_date.clone_from(&p.sampling_date);
            }
        }
        if p.sanitary_exceedance == Some(true) {
            self.exceedance_count += 1;
        }
    }

    fn finish(self) -> Option<HotspotAggregate> {
        let sanitary = self.exceedance_count > 0;
        if !sanitary && !self.environmental {
            return None;
        }

        let size = size_mm(self.max_ratio, self.environmental);
        let p = self.first.properties;

        Some(HotspotAggregate {
            point: self.first.point,
            water_type: p.water_type,
            location: self.location,
            substance: self.substance,
            parameter_code: p.parameter_code,
            usage: p.usage,
            authorized: p.authorized,
            commune: p.commune,
            river: p.river,
            water_body: p.water_body,
            reference_link: p.reference_link,
            measurement_count: self.measurement_count,
            exceedance_count: self.exceedance_count,
            sanitary_exceedance: sanitary,
            environmental_exceedance: self.environmental,
            max_concentration_ugl: self.max_concentration,
            sanitary_ratio: self.max_ratio.map(round2),
            sampling_date: self.sampling_date,
            year_min: self.year_min,
            year_max: self.year_max,
            size_mm: size,
            inner_size_mm: inner_size_mm(size),
            size_class: size_class(size),
            exceedance_type: ExceedanceType::from_flags(sanitary, self.environmental),
        })
    }
}

/// Aggregates features into hotspots, in (water type, location, substance)
/// order.
///
/// Features without a location or substance are skipped. A group becomes a
/// hotspot when at least one of its measured features exceeds the sanitary
/// threshold or any of its features exceeds an environmental standard.
#[must_use]
pub fn aggregate_hotspots(features: &[ImpactFeature]) -> Vec<HotspotAggregate> {
    let mut groups: BTreeMap<HotspotKey, Accumulator> = BTreeMap::new();

    for feature in features {
        let p = &feature.properties;
        let Some(location) = p.location.as_deref().filter(|l| !l.is_empty()) else {
            continue;
        };
        let Some(substance) = p.substance.as_deref().filter(|s| !s.trim().is_empty()) else {
            continue;
        };

        groups
            .entry((p.water_type, location.to_string(), substance.trim().to_string()))
            .or_insert_with(|| Accumulator::new(feature, location, substance))
            .add(feature);
    }

    let group_count = groups.len();
    let hotspots: Vec<_> = groups.into_values().filter_map(Accumulator::finish).collect();
    log::info!("{} hotspots out of {group_count} groups", hotspots.len());

    hotspots
}

/// Outer symbol size for a hotspot.
#[must_use]
pub fn size_mm(max_ratio: Option<f64>, environmental: bool) -> f64 {
    let excess = (max_ratio.unwrap_or(1.0) - 1.0).clamp(0.0, MAX_RATIO_EXCESS);
    let bonus = if environmental {
        ENVIRONMENTAL_BONUS_MM
    } else {
        0.0
    };
    round1(SIZE_PER_RATIO_MM.mul_add(excess, BASE_SIZE_MM) + bonus)
}

/// Inner ring size for an outer symbol size.
#[must_use]
pub fn inner_size_mm(size: f64) -> f64 {
    round1((size - ENVIRONMENTAL_BONUS_MM).max(ENVIRONMENTAL_BONUS_MM))
}

/// Fixed size bucket, 1 to 4.
#[must_use]
pub fn size_class(size: f64) -> u8 {
    if size >= 9.5 {
        4
    } else if size >= 7.5 {
        3
    } else if size >= 5.5 {
        2
    } else {
        1
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use phyto_map_measurement_models::{ImpactProperties, Point};

    use super::*;

    fn feature(
        location: &str,
        concentration: Option<f64>,
        ratio: Option<f64>,
        date: &str,
    ) -> ImpactFeature {
        ImpactFeature {
            point: Point {
                longitude: 5.04,
                latitude: 47.32,
            },
            properties: ImpactProperties {
                location: Some(location.to_string()),
                substance: Some("Atrazine".to_string()),
                parameter_code: Some("1107".to_string()),
                water_type: Some(WaterBodyType::Surface),
                concentration_ugl: concentration,
                sanitary_ratio: ratio,
                sanitary_exceedance: ratio.map(|r| r > 1.0),
                sampling_date: Some(date.to_string()),
                year: Some(date[..4].to_string()),
                ..ImpactProperties::default()
            },
        }
    }

    #[test]
    fn no_exceedance_means_no_hotspot() {
        let features = vec![
            feature("Dijon", Some(0.05), Some(0.5), "2020-01-01"),
            feature("Dijon", Some(0.08), Some(0.8), "2021-01-01"),
            feature("Beaune", None, None, "2021-01-01"),
        ];
        assert!(aggregate_hotspots(&features).is_empty());
        assert!(aggregate_hotspots(&[]).is_empty());
    }

    #[test]
    fn aggregates_one_location_and_substance() {
        let features = vec![
            feature("Dijon", Some(0.05), Some(0.5), "2019-03-01"),
            feature("Dijon", Some(0.35), Some(3.5), "2021-06-03"),
            feature("Dijon", Some(0.2), Some(2.0), "2020-09-12"),
            feature("Dijon", None, None, "2022-01-01"),
        ];

        let hotspots = aggregate_hotspots(&features);
        assert_eq!(hotspots.len(), 1);
        let h = &hotspots[0];

        assert_eq!(h.measurement_count, 3);
        assert_eq!(h.exceedance_count, 2);
        assert!(h.sanitary_exceedance);
        assert!(!h.environmental_exceedance);
        assert_eq!(h.max_concentration_ugl, 0.35);
        assert_eq!(h.sanitary_ratio, Some(3.5));
        assert_eq!(h.sampling_date.as_deref(), Some("2021-06-03"));
        assert_eq!(h.year_min.as_deref(), Some("2019"));
        assert_eq!(h.year_max.as_deref(), Some("2021"));
        assert_eq!(h.size_mm, 5.9);
        assert_eq!(h.inner_size_mm, 4.4);
        assert_eq!(h.size_class, 2);
        assert_eq!(h.exceedance_type, ExceedanceType::SanitaryOnly);
    }

    #[test]
    fn environmental_flag_alone_makes_a_hotspot() {
        let mut a = feature("Dijon", Some(0.01), Some(0.1), "2020-01-01");
        a.properties.environmental_exceedance = Some(true);

        let hotspots = aggregate_hotspots(&[a]);
        assert_eq!(hotspots.len(), 1);
        let h = &hotspots[0];
        assert_eq!(h.exceedance_count, 0);
        assert_eq!(h.exceedance_type, ExceedanceType::EnvironmentalOnly);
        assert_eq!(h.size_mm, 5.5);
        assert_eq!(h.size_class, 2);
    }

    #[test]
    fn concentration_sets_the_date_only_while_unset() {
        let mut first = feature("Dijon", Some(0.02), None, "2019-01-01");
        first.properties.environmental_exceedance = Some(true);
        let features = vec![
            first,
            feature("Dijon", Some(0.05), None, "2020-01-01"),
        ];

        let hotspots = aggregate_hotspots(&features);
        assert_eq!(hotspots.len(), 1);
        let h = &hotspots[0];
        assert_eq!(h.sanitary_ratio, None);
        assert_eq!(h.max_concentration_ugl, 0.05);
        assert_eq!(h.sampling_date.as_deref(), Some("2019-01-01"));
        assert_eq!(h.exceedance_type, ExceedanceType::EnvironmentalOnly);
    }

    #[test]
    fn ratio_raise_replaces_a_concentration_date() {
        let features = vec![
            feature("Dijon", Some(0.02), None, "2019-01-01"),
            feature("Dijon", Some(0.01), Some(2.0), "2020-07-14"),
        ];

        let h = &aggregate_hotspots(&features)[0];
        assert_eq!(h.max_concentration_ugl, 0.02);
        assert_eq!(h.sanitary_ratio, Some(2.0));
        assert_eq!(h.sampling_date.as_deref(), Some("2020-07-14"));
    }

    #[test]
    fn equal_ratio_keeps_the_earlier_date() {
        let features = vec![
            feature("Dijon", Some(0.3), Some(3.0), "2020-05-01"),
            feature("Dijon", Some(0.3), Some(3.0), "2022-01-01"),
        ];

        let h = &aggregate_hotspots(&features)[0];
        assert_eq!(h.exceedance_count, 2);
        assert_eq!(h.sampling_date.as_deref(), Some("2020-05-01"));
        assert_eq!(h.year_max.as_deref(), Some("2022"));
    }

    #[test]
    fn groups_are_emitted_in_key_order() {
        let features = vec![
            feature("Semur", Some(0.5), Some(5.0), "2020-01-01"),
            feature("Auxonne", Some(0.5), Some(5.0), "2020-01-01"),
        ];
        let locations: Vec<_> = aggregate_hotspots(&features)
            .into_iter()
            .map(|h| h.location)
            .collect();
        assert_eq!(locations, ["Auxonne", "Semur"]);
    }

    #[test]
    fn size_is_capped() {
        assert_eq!(size_mm(Some(50.0), true), 12.3);
        assert_eq!(size_mm(Some(50.0), false), 10.8);
        assert_eq!(size_mm(None, false), 4.0);
        assert_eq!(size_class(10.8), 4);
        assert_eq!(size_class(7.5), 3);
        assert_eq!(size_class(4.0), 1);
        assert_eq!(inner_size_mm(2.0), 1.5);
    }
}
