#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Water-quality measurement types.
//!
//! The two upstream schemas (Naïades surface-water analyses and ADES
//! groundwater analyses) are deserialized as-is and mapped once into
//! [`RawMeasurement`]. The feature builder only ever sees that shape and
//! produces [`ImpactFeature`]s, whose attribute set is fixed.

use phyto_map_substance_models::lenient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};

/// Kind of water body a measurement was taken in.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WaterBodyType {
    /// Rivers, lakes (Naïades)
    Surface,
    /// Aquifers (ADES)
    Groundwater,
}

/// One Naïades surface-water analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceWaterRecord {
    #[serde(default, deserialize_with = "lenient::scalar")]
    pub code_station: Option<String>,
    #[serde(default, deserialize_with = "lenient::scalar")]
    pub libelle_station: Option<String>,
    #[serde(default, deserialize_with = "lenient::scalar")]
    pub code_commune: Option<String>,
    #[serde(default, deserialize_with = "lenient::scalar")]
    pub libelle_commune: Option<String>,
    #[serde(default, deserialize_with = "lenient::scalar")]
    pub code_departement: Option<String>,
    #[serde(default, deserialize_with = "lenient::scalar")]
    pub nom_cours_eau: Option<String>,
    #[serde(default, deserialize_with = "lenient::scalar")]
    pub nom_masse_deau: Option<String>,
    #[serde(default, deserialize_with = "lenient::scalar")]
    pub code_parametre: Option<String>,
    #[serde(default, deserialize_with = "lenient::scalar")]
    pub libelle_parametre: Option<String>,
    /// Measured value, number or numeric string.
    #[serde(default, deserialize_with = "lenient::raw")]
    pub resultat: Option<Value>,
    #[serde(default, deserialize_with = "lenient::scalar")]
    pub symbole_unite: Option<String>,
    #[serde(default, deserialize_with = "lenient::scalar")]
    pub date_prelevement: Option<String>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub latitude: Option<f64>,
    /// Embedded GeoJSON geometry.
    #[serde(default, deserialize_with = "lenient::raw")]
    pub geometry: Option<Value>,
}

/// One ADES groundwater analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundwaterRecord {
    #[serde(default, deserialize_with = "lenient::scalar")]
    pub bss_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::scalar")]
    pub code_bss: Option<String>,
    #[serde(default, deserialize_with = "lenient::scalar")]
    pub nom_commune_actuel: Option<String>,
    #[serde(default, deserialize_with = "lenient::scalar")]
    pub code_insee_actuel: Option<String>,
    #[serde(default, deserialize_with = "lenient::scalar")]
    pub num_departement: Option<String>,
    #[serde(default, deserialize_with = "lenient::scalar")]
    pub code_departement: Option<String>,
    #[serde(default, deserialize_with = "lenient::scalar")]
    pub code_param: Option<String>,
    #[serde(default, deserialize_with = "lenient::scalar")]
    pub nom_param: Option<String>,
    /// Measured value, number or numeric string.
    #[serde(default, deserialize_with = "lenient::raw")]
    pub resultat: Option<Value>,
    #[serde(default, deserialize_with = "lenient::scalar")]
    pub symbole_unite: Option<String>,
    #[serde(default, deserialize_with = "lenient::scalar")]
    pub date_debut_prelevement: Option<String>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub latitude: Option<f64>,
}

/// Source-independent measurement record.
///
/// Every field is optional; `None` means "absent upstream", never zero or
/// empty.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMeasurement {
    pub water_type: WaterBodyType,
    /// Station identifier (Sandre station code or BSS id).
    pub station_code: Option<String>,
    /// Human-facing location name.
    pub location: Option<String>,
    pub commune: Option<String>,
    /// INSEE commune code.
    pub commune_code: Option<String>,
    pub department_code: Option<String>,
    pub department_number: Option<String>,
    pub river: Option<String>,
    pub water_body: Option<String>,
    pub parameter_code: Option<String>,
    pub parameter_label: Option<String>,
    pub result: Option<Value>,
    pub unit: Option<String>,
    pub sampling_date: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub geometry: Option<Value>,
}

impl From<SurfaceWaterRecord> for RawMeasurement {
    fn from(record: SurfaceWaterRecord) -> Self {
        Self {
            water_type: WaterBodyType::Surface,
            station_code: record.code_station,
            location: record.libelle_station,
            commune: record
                .libelle_commune
                .or_else(|| record.code_commune.clone()),
            commune_code: record.code_commune,
            department_code: record.code_departement,
            department_number: None,
            river: record.nom_cours_eau,
            water_body: record.nom_masse_deau,
            parameter_code: record.code_parametre,
            parameter_label: record.libelle_parametre,
            result: record.resultat,
            unit: record.symbole_unite,
            sampling_date: record.date_prelevement,
            longitude: record.longitude,
            latitude: record.latitude,
            geometry: record.geometry,
        }
    }
}

impl From<GroundwaterRecord> for RawMeasurement {
    fn from(record: GroundwaterRecord) -> Self {
        let station = record.bss_id.or(record.code_bss);
        Self {
            water_type: WaterBodyType::Groundwater,
            location: station.clone(),
            station_code: station,
            commune: record.nom_commune_actuel,
            commune_code: record.code_insee_actuel,
            department_code: record.code_departement,
            department_number: record.num_departement,
            river: None,
            water_body: None,
            parameter_code: record.code_param,
            parameter_label: record.nom_param,
            result: record.resultat,
            unit: record.symbole_unite,
            sampling_date: record.date_debut_prelevement,
            longitude: record.longitude,
            latitude: record.latitude,
            geometry: None,
        }
    }
}

/// A WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub longitude: f64,
    pub latitude: f64,
}

impl Point {
    /// WKT form, e.g. `Point (4.72 47.52)`.
    #[must_use]
    pub fn to_wkt(self) -> String {
        format!("Point ({} {})", self.longitude, self.latitude)
    }
}

/// Attribute table of an [`ImpactFeature`].
///
/// Every key is always serialized; absent values are `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactProperties {
    pub location: Option<String>,
    pub commune: Option<String>,
    pub river: Option<String>,
    pub water_body: Option<String>,
    pub substance: Option<String>,
    pub parameter_code: Option<String>,
    pub usage: Option<String>,
    pub typical_uses: Option<String>,
    pub authorized: Option<bool>,
    pub concentration_ugl: Option<f64>,
    pub threshold_ugl: Option<f64>,
    pub sanitary_ratio: Option<f64>,
    pub sanitary_exceedance: Option<bool>,
    pub environmental_exceedance: Option<bool>,
    pub sampling_date: Option<String>,
    pub year: Option<String>,
    pub water_type: Option<WaterBodyType>,
    pub station_code: Option<String>,
    pub reference_link: Option<String>,
    pub wkt_geom: Option<String>,
}

/// A normalized, department-filtered measurement with point geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactFeature {
    pub point: Point,
    pub properties: ImpactProperties,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_record_maps_commune_fallback() {
        let record: SurfaceWaterRecord = serde_json::from_value(serde_json::json!({
            "code_station": "06012000",
            "libelle_station": "L'Ouche à Dijon",
            "code_commune": "21231",
            "libelle_commune": null,
            "code_departement": 21,
            "code_parametre": 1105,
            "resultat": "0.05",
            "symbole_unite": "µg/L",
            "longitude": "5.04",
            "latitude": 47.32,
            "geometry": {"type": "Point", "coordinates": [5.04, 47.32]}
        }))
        .unwrap();

        let raw = RawMeasurement::from(record);
        assert_eq!(raw.water_type, WaterBodyType::Surface);
        assert_eq!(raw.commune.as_deref(), Some("21231"));
        assert_eq!(raw.department_code.as_deref(), Some("21"));
        assert_eq!(raw.parameter_code.as_deref(), Some("1105"));
        assert_eq!(raw.longitude, Some(5.04));
        assert!(raw.geometry.is_some());
    }

    #[test]
    fn groundwater_record_prefers_bss_id() {
        let record: GroundwaterRecord = serde_json::from_value(serde_json::json!({
            "bss_id": "BSS001ABCD",
            "code_bss": "04998X0012/F",
            "num_departement": "21",
            "code_param": "1107",
            "date_debut_prelevement": "2021-06-03"
        }))
        .unwrap();

        let raw = RawMeasurement::from(record);
        assert_eq!(raw.location.as_deref(), Some("BSS001ABCD"));
        assert_eq!(raw.station_code.as_deref(), Some("BSS001ABCD"));
        assert_eq!(raw.department_number.as_deref(), Some("21"));
        assert_eq!(raw.river, None);
    }

    #[test]
    fn malformed_scalars_degrade_to_none() {
        let record: GroundwaterRecord = serde_json::from_value(serde_json::json!({
            "longitude": "east",
            "latitude": {"deg": 47},
            "code_param": ["x"],
            "resultat": null
        }))
        .unwrap();

        assert_eq!(record.longitude, None);
        assert_eq!(record.latitude, None);
        assert_eq!(record.code_param, None);
        assert_eq!(record.resultat, None);
    }

    #[test]
    fn properties_serialize_every_key() {
        let value = serde_json::to_value(ImpactProperties::default()).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 20);
        assert!(object.values().all(Value::is_null));
    }

    #[test]
    fn wkt_point() {
        let point = Point {
            longitude: 4.72,
            latitude: 47.52,
        };
        assert_eq!(point.to_wkt(), "Point (4.72 47.52)");
    }
}
