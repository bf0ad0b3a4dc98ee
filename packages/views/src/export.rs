//! Reading and writing layers.
//!
//! The normalized layer, the ranking, and the hotspots are pretty-printed
//! `GeoJSON` `FeatureCollection`s; the rollup is a `;`-delimited CSV.

use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::Path;

use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject};
use phyto_map_measurement_models::{ImpactFeature, ImpactProperties, Point};
use phyto_map_views_models::{HotspotAggregate, RankedFeature, YearlyRollup};
use serde::Serialize;
use thiserror::Error;

/// Header of the rollup CSV.
pub const ROLLUP_HEADER: [&str; 8] = [
    "type_eau",
    "lieu",
    "commune",
    "substance",
    "usage_ppp",
    "annee",
    "n_prelevements",
    "concentration_moyenne_ugl",
];

/// Errors reading or writing a layer.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Input is not valid `GeoJSON`
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
    /// CSV writing failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// Valid `GeoJSON` that is not an impact layer
    #[error("Malformed layer: {message}")]
    Malformed { message: String },
}

/// Writes the normalized impact layer.
///
/// # Errors
///
/// Returns [`ExportError`] if the file cannot be written.
pub fn write_features(path: &Path, features: &[ImpactFeature]) -> Result<(), ExportError> {
    let features = features
        .iter()
        .map(|f| point_feature(f.point, &f.properties))
        .collect::<Result<Vec<_>, _>>()?;
    write_collection(path, features)
}

/// Writes the yearly ranking, adding `yearly_rank` and `yearly_top` to each
/// feature's properties.
///
/// # Errors
///
/// Returns [`ExportError`] if the file cannot be written.
pub fn write_ranked(path: &Path, ranked: &[RankedFeature]) -> Result<(), ExportError> {
    let features = ranked
        .iter()
        .map(|r| {
            let mut feature = point_feature(r.feature.point, &r.feature.properties)?;
            if let Some(properties) = feature.properties.as_mut() {
                properties.insert("yearly_rank".to_string(), r.yearly_rank.into());
                properties.insert("yearly_top".to_string(), r.yearly_top.into());
            }
            Ok(feature)
        })
        .collect::<Result<Vec<_>, ExportError>>()?;
    write_collection(path, features)
}

/// Writes the hotspot layer.
///
/// # Errors
///
/// Returns [`ExportError`] if the file cannot be written.
pub fn write_hotspots(path: &Path, hotspots: &[HotspotAggregate]) -> Result<(), ExportError> {
    let features = hotspots
        .iter()
        .map(|h| point_feature(h.point, h))
        .collect::<Result<Vec<_>, _>>()?;
    write_collection(path, features)
}

/// Writes the rollup CSV. An empty rollup still gets its header.
///
/// # Errors
///
/// Returns [`ExportError`] if the file cannot be written.
pub fn write_rollup(path: &Path, rows: &[YearlyRollup]) -> Result<(), ExportError> {
    create_parent(path)?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)?;

    writer.write_record(ROLLUP_HEADER)?;
    for row in rows {
        let mean = row
            .mean_concentration()
            .map(|m| format!("{m:.4}"))
            .unwrap_or_default();
        writer.write_record([
            row.water_type.as_ref().map_or("", AsRef::as_ref),
            row.location.as_str(),
            row.commune.as_deref().unwrap_or_default(),
            row.substance.as_str(),
            row.usage.as_deref().unwrap_or_default(),
            row.year.as_str(),
            row.sample_count.to_string().as_str(),
            mean.as_str(),
        ])?;
    }
    writer.flush()?;

    log::info!("Wrote {} rollup rows to {}", rows.len(), path.display());
    Ok(())
}

/// Reads a normalized impact layer back.
///
/// # Errors
///
/// Returns [`ExportError`] if the file cannot be read, is not a
/// `FeatureCollection`, or holds a feature without point geometry.
pub fn read_features(path: &Path) -> Result<Vec<ImpactFeature>, ExportError> {
    let text = std::fs::read_to_string(path)?;
    let GeoJson::FeatureCollection(collection) = text.parse::<GeoJson>()? else {
        return Err(ExportError::Malformed {
            message: format!("{} is not a FeatureCollection", path.display()),
        });
    };

    let features = collection
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| impact_feature(index, feature))
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!("Read {} features from {}", features.len(), path.display());
    Ok(features)
}

fn impact_feature(index: usize, feature: Feature) -> Result<ImpactFeature, ExportError> {
    let point = match feature.geometry.map(|g| g.value) {
        Some(geojson::Value::Point(coordinates)) if coordinates.len() >= 2 => Point {
            longitude: coordinates[0],
            latitude: coordinates[1],
        },
        _ => {
            return Err(ExportError::Malformed {
                message: format!("feature {index} has no point geometry"),
            });
        }
    };

    let properties = match feature.properties {
        Some(object) => serde_json::from_value(serde_json::Value::Object(object))?,
        None => ImpactProperties::default(),
    };

    Ok(ImpactFeature { point, properties })
}

fn point_feature(point: Point, properties: &impl Serialize) -> Result<Feature, ExportError> {
    let properties: JsonObject = serde_json::from_value(serde_json::to_value(properties)?)?;
    Ok(Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::Point(vec![
            point.longitude,
            point.latitude,
        ]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    })
}

fn write_collection(path: &Path, features: Vec<Feature>) -> Result<(), ExportError> {
    create_parent(path)?;
    let count = features.len();
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &collection)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    log::info!("Wrote {count} features to {}", path.display());
    Ok(())
}

fn create_parent(path: &Path) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use phyto_map_measurement_models::WaterBodyType;

    use super::*;
    use crate::{aggregate_hotspots, rank_by_year, rollup_by_year};

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "phyto_map_views_{name}_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn features() -> Vec<ImpactFeature> {
        let rows = [
            ("Dijon", "1107", "Atrazine", Some(0.35), "2021-06-03"),
            ("Dijon", "1107", "Atrazine", Some(0.05), "2021-07-01"),
            ("Beaune", "1506", "Glyphosate", None, "2020-03-12"),
            ("Beaune", "1506", "Glyphosate", Some(0.0005), "2020-04-12"),
        ];
        rows.into_iter()
            .map(|(location, code, substance, concentration, date)| ImpactFeature {
                point: Point {
                    longitude: 5.041_234,
                    latitude: 47.322_1,
                },
                properties: ImpactProperties {
                    location: Some(location.to_string()),
                    substance: Some(substance.to_string()),
                    parameter_code: Some(code.to_string()),
                    concentration_ugl: concentration,
                    threshold_ugl: concentration.map(|_| 0.1),
                    sanitary_ratio: concentration.map(|c| c / 0.1),
                    sanitary_exceedance: concentration.map(|c| c / 0.1 > 1.0),
                    sampling_date: Some(date.to_string()),
                    year: Some(date[..4].to_string()),
                    water_type: Some(WaterBodyType::Surface),
                    ..ImpactProperties::default()
                },
            })
            .collect()
    }

    #[test]
    fn views_rederive_identically_from_the_persisted_layer() {
        let dir = temp_dir("roundtrip");
        let path = dir.join("layer.geojson");
        let features = features();

        write_features(&path, &features).unwrap();
        let read = read_features(&path).unwrap();

        assert_eq!(read, features);
        assert_eq!(rank_by_year(&read), rank_by_year(&features));
        assert_eq!(aggregate_hotspots(&read), aggregate_hotspots(&features));
        assert_eq!(rollup_by_year(&read), rollup_by_year(&features));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn writing_twice_is_byte_identical() {
        let dir = temp_dir("idempotent");
        let features = features();

        let first = dir.join("a.geojson");
        let second = dir.join("b.geojson");
        write_hotspots(&first, &aggregate_hotspots(&features)).unwrap();
        write_hotspots(&second, &aggregate_hotspots(&features)).unwrap();
        assert_eq!(
            std::fs::read(&first).unwrap(),
            std::fs::read(&second).unwrap()
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn ranked_features_carry_rank_properties() {
        let dir = temp_dir("ranked");
        let path = dir.join("top10.geojson");
        write_ranked(&path, &rank_by_year(&features())).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let first = &json["features"][0]["properties"];
        assert_eq!(first["yearly_rank"], 1);
        assert_eq!(first["yearly_top"], true);
        assert_eq!(json["features"].as_array().unwrap().len(), 4);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn hotspot_properties_use_integer_exceedance_type() {
        let dir = temp_dir("hotspots");
        let path = dir.join("hotspots.geojson");
        write_hotspots(&path, &aggregate_hotspots(&features())).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let features = json["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0]["geometry"]["type"], "Point");
        assert_eq!(features[0]["properties"]["exceedance_type"], 3);
        assert_eq!(features[0]["properties"]["location"], "Dijon");
        assert_eq!(features[0]["properties"]["water_type"], "surface");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_hotspots_write_an_empty_collection() {
        let dir = temp_dir("empty");
        let path = dir.join("nested").join("hotspots.geojson");
        write_hotspots(&path, &[]).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert!(json["features"].as_array().unwrap().is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn rollup_csv_formats_the_mean() {
        let dir = temp_dir("rollup");
        let path = dir.join("rollup.csv");
        write_rollup(&path, &rollup_by_year(&features())).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "type_eau;lieu;commune;substance;usage_ppp;annee;n_prelevements;concentration_moyenne_ugl",
                "surface;Beaune;;Glyphosate;;2020;2;0.0005",
                "surface;Dijon;;Atrazine;;2021;2;0.2000",
            ]
        );

        write_rollup(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn rejects_non_point_geometry() {
        let dir = temp_dir("malformed");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("lines.geojson");
        std::fs::write(
            &path,
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"LineString","coordinates":[[0,0],[1,1]]},"properties":{}}]}"#,
        )
        .unwrap();

        assert!(matches!(
            read_features(&path),
            Err(ExportError::Malformed { .. })
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
