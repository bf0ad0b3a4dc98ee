//! Top-N parameters per year.

use std::collections::BTreeMap;

use phyto_map_measurement_models::ImpactFeature;
use phyto_map_views_models::RankedFeature;

/// Parameters kept per year.
pub const TOP_N: usize = 10;

/// Keeps the features of the [`TOP_N`] most frequently measured parameters
/// of each year.
#[must_use]
pub fn rank_by_year(features: &[ImpactFeature]) -> Vec<RankedFeature> {
    rank_top_n_by_year(features, TOP_N)
}

/// Keeps the features of the `n` most frequently measured parameters of
/// each year.
///
/// Parameters are ranked per year by feature count, descending, ties broken
/// by parameter code ascending. Features without a year or parameter code
/// never rank. Output preserves input order.
#[must_use]
pub fn rank_top_n_by_year(features: &[ImpactFeature], n: usize) -> Vec<RankedFeature> {
    let mut counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for key in features.iter().filter_map(year_and_code) {
        *counts.entry(key).or_default() += 1;
    }

    let mut by_year: BTreeMap<&str, Vec<(&str, usize)>> = BTreeMap::new();
    for (&(year, code), &count) in &counts {
        by_year.entry(year).or_default().push((code, count));
    }

    let mut ranks: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for (year, mut codes) in by_year {
        codes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        for (rank, (code, _)) in codes.into_iter().take(n).enumerate() {
            ranks.insert((year, code), rank + 1);
        }
    }

    let ranked: Vec<RankedFeature> = features
        .iter()
        .filter_map(|feature| {
            let rank = ranks.get(&year_and_code(feature)?)?;
            Some(RankedFeature {
                feature: feature.clone(),
                yearly_rank: *rank,
                yearly_top: true,
            })
        })
        .collect();

    log::info!(
        "Ranking kept {} of {} features across {} years",
        ranked.len(),
        features.len(),
        ranks.keys().map(|(year, _)| year).collect::<std::collections::BTreeSet<_>>().len()
    );

    ranked
}

fn year_and_code(feature: &ImpactFeature) -> Option<(&str, &str)> {
    let properties = &feature.properties;
    let year = properties.year.as_deref().filter(|y| !y.is_empty())?;
    let code = properties.parameter_code.as_deref().filter(|c| !c.is_empty())?;
    Some((year, code))
}

#[cfg(test)]
mod tests {
    use phyto_map_measurement_models::{ImpactProperties, Point};

    use super::*;

    fn feature(year: Option<&str>, code: &str) -> ImpactFeature {
        ImpactFeature {
            point: Point {
                longitude: 5.0,
                latitude: 47.0,
            },
            properties: ImpactProperties {
                year: year.map(str::to_string),
                parameter_code: Some(code.to_string()),
                ..ImpactProperties::default()
            },
        }
    }

    #[test]
    fn keeps_exactly_the_top_ten_codes() {
        let mut features = Vec::new();
        for i in 1..=15 {
            for _ in 0..i {
                features.push(feature(Some("2020"), &format!("C{i:02}")));
            }
        }

        let ranked = rank_by_year(&features);
        let kept: std::collections::BTreeSet<&str> = ranked
            .iter()
            .filter_map(|r| r.feature.properties.parameter_code.as_deref())
            .collect();

        assert_eq!(kept.len(), 10);
        for i in 1..=5 {
            assert!(!kept.contains(format!("C{i:02}").as_str()));
        }
        for i in 6..=15 {
            assert!(kept.contains(format!("C{i:02}").as_str()));
        }
        assert_eq!(ranked.len(), (6..=15).sum::<usize>());

        let top = ranked
            .iter()
            .find(|r| r.feature.properties.parameter_code.as_deref() == Some("C15"))
            .unwrap();
        assert_eq!(top.yearly_rank, 1);
        assert!(ranked.iter().all(|r| r.yearly_top));
    }

    #[test]
    fn ties_break_on_code_and_order_is_preserved() {
        let features = vec![
            feature(Some("2021"), "B"),
            feature(Some("2021"), "A"),
            feature(Some("2021"), "C"),
        ];

        let ranked = rank_top_n_by_year(&features, 2);
        let codes: Vec<_> = ranked
            .iter()
            .map(|r| {
                (
                    r.feature.properties.parameter_code.as_deref().unwrap(),
                    r.yearly_rank,
                )
            })
            .collect();
        assert_eq!(codes, [("B", 2), ("A", 1)]);
    }

    #[test]
    fn years_rank_independently() {
        let features = vec![
            feature(Some("2020"), "A"),
            feature(Some("2020"), "A"),
            feature(Some("2021"), "B"),
            feature(None, "A"),
        ];

        let ranked = rank_top_n_by_year(&features, 1);
        assert_eq!(ranked.len(), 3);
        assert!(ranked.iter().all(|r| r.yearly_rank == 1));
    }

    #[test]
    fn ranking_is_idempotent() {
        let features: Vec<_> = ["A", "B", "A", "C", "B", "A"]
            .iter()
            .map(|code| feature(Some("2022"), code))
            .collect();
        assert_eq!(rank_by_year(&features), rank_by_year(&features));
    }
}
