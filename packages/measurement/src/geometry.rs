//! Point geometry extraction.

use geojson::Geometry;
use phyto_map_measurement_models::Point;
use serde_json::Value;

/// Extracts a point from an embedded `GeoJSON` geometry.
///
/// Only `Point` geometries with at least two finite coordinates qualify.
#[must_use]
pub fn point_from_geojson(value: &Value) -> Option<Point> {
    let geometry = Geometry::from_json_value(value.clone()).ok()?;
    let geojson::Value::Point(coordinates) = geometry.value else {
        return None;
    };

    finite_point(coordinates.first().copied(), coordinates.get(1).copied())
}

/// Embedded geometry when it is a valid point, else the longitude/latitude
/// pair.
#[must_use]
pub fn resolve_point(
    geometry: Option<&Value>,
    longitude: Option<f64>,
    latitude: Option<f64>,
) -> Option<Point> {
    geometry
        .and_then(point_from_geojson)
        .or_else(|| finite_point(longitude, latitude))
}

fn finite_point(longitude: Option<f64>, latitude: Option<f64>) -> Option<Point> {
    let (longitude, latitude) = (longitude?, latitude?);
    (longitude.is_finite() && latitude.is_finite()).then_some(Point {
        longitude,
        latitude,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn embedded_point_wins() {
        let geometry = json!({"type": "Point", "coordinates": [5.04, 47.32]});
        let point = resolve_point(Some(&geometry), Some(1.0), Some(2.0)).unwrap();
        assert!((point.longitude - 5.04).abs() < f64::EPSILON);
        assert!((point.latitude - 47.32).abs() < f64::EPSILON);
    }

    #[test]
    fn non_point_geometry_falls_back_to_coordinates() {
        let geometry = json!({"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]});
        let point = resolve_point(Some(&geometry), Some(4.8), Some(47.1)).unwrap();
        assert!((point.longitude - 4.8).abs() < f64::EPSILON);
    }

    #[test]
    fn short_coordinates_are_rejected() {
        assert_eq!(
            point_from_geojson(&json!({"type": "Point", "coordinates": [5.0]})),
            None
        );
        assert_eq!(point_from_geojson(&json!({"type": "Point"})), None);
        assert_eq!(point_from_geojson(&json!("POINT (5 47)")), None);
    }

    #[test]
    fn missing_everything_is_none() {
        assert_eq!(resolve_point(None, Some(4.8), None), None);
        assert_eq!(resolve_point(None, None, None), None);
        assert_eq!(resolve_point(None, Some(f64::NAN), Some(47.0)), None);
    }
}
