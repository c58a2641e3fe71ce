use std::fmt;

use foundation::math::Vec3;
use layers::{Attributes, Geometry};
use serde::Deserialize;
use serde_json::Value;

use crate::scene_ingest::SourceFeature;

#[derive(Debug)]
pub enum GeoJsonError {
    Parse(serde_json::Error),
    NotAFeatureCollection { found: String },
}

impl fmt::Display for GeoJsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoJsonError::Parse(err) => write!(f, "GeoJSON parse error: {err}"),
            GeoJsonError::NotAFeatureCollection { found } => {
                write!(f, "expected GeoJSON FeatureCollection, found {found:?}")
            }
        }
    }
}

impl std::error::Error for GeoJsonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeoJsonError::Parse(err) => Some(err),
            GeoJsonError::NotAFeatureCollection { .. } => None,
        }
    }
}

#[derive(Deserialize)]
struct RawCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<RawFeature>,
}

#[derive(Deserialize)]
struct RawFeature {
    #[serde(default)]
    properties: Option<Attributes>,
    #[serde(default)]
    geometry: Option<Value>,
}

/// Parses a FeatureCollection. Only the envelope is validated here; each
/// feature's geometry is parsed independently so one bad record leaves its
/// siblings intact.
pub fn parse_feature_collection(payload: &str) -> Result<Vec<SourceFeature>, GeoJsonError> {
    let raw: RawCollection = serde_json::from_str(payload).map_err(GeoJsonError::Parse)?;
    if raw.kind != "FeatureCollection" {
        return Err(GeoJsonError::NotAFeatureCollection { found: raw.kind });
    }

    Ok(raw
        .features
        .into_iter()
        .map(|f| {
            let attributes = f
                .properties
                .map(|p| Attributes::from_source(p.iter().map(|(k, v)| (k, v.clone()))))
                .unwrap_or_default();
            let geometry = match &f.geometry {
                Some(g) => parse_geometry(g),
                None => Err("feature missing geometry".to_string()),
            };
            SourceFeature { attributes, geometry }
        })
        .collect())
}

fn parse_geometry(value: &Value) -> Result<Geometry, String> {
    let ty = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or("geometry missing type".to_string())?;
    let coords = value
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;

    match ty {
        "Point" => Ok(Geometry::Point(parse_position(coords)?)),
        "MultiPoint" => Ok(Geometry::MultiPoint(parse_positions(coords)?)),
        "Polygon" => Ok(Geometry::Polygon(parse_rings(coords)?)),
        "MultiPolygon" => Ok(Geometry::MultiPolygon(
            as_array(coords, "MultiPolygon")?
                .iter()
                .map(parse_rings)
                .collect::<Result<_, _>>()?,
        )),
        other => Err(format!("unsupported geometry type: {other}")),
    }
}

fn as_array<'a>(value: &'a Value, what: &str) -> Result<&'a Vec<Value>, String> {
    value
        .as_array()
        .ok_or_else(|| format!("{what} coordinates must be an array"))
}

fn parse_position(value: &Value) -> Result<Vec3, String> {
    let arr = as_array(value, "position")?;
    let num = |i: usize| arr.get(i).and_then(Value::as_f64);
    match (num(0), num(1)) {
        (Some(x), Some(y)) => Ok(Vec3::new(x, y, num(2).unwrap_or(0.0))),
        _ => Err("position must start with two numbers".to_string()),
    }
}

fn parse_positions(value: &Value) -> Result<Vec<Vec3>, String> {
    as_array(value, "MultiPoint")?.iter().map(parse_position).collect()
}

fn parse_rings(value: &Value) -> Result<Vec<Vec<Vec3>>, String> {
    let rings: Vec<Vec<Vec3>> = as_array(value, "Polygon")?
        .iter()
        .map(parse_positions)
        .collect::<Result<_, _>>()?;
    if rings.first().is_none_or(|r| r.len() < 3) {
        return Err("polygon outer ring needs at least three positions".to_string());
    }
    Ok(rings)
}

#[cfg(test)]
mod tests {
    use super::{GeoJsonError, parse_feature_collection};
    use foundation::math::Vec3;
    use layers::{AttrValue, Geometry};

    const COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"kms:navn": "A", "hoejde": 7},
             "geometry": {"type": "Point", "coordinates": [10.0, 20.0]}},
            {"type": "Feature", "properties": null,
             "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]}},
            {"type": "Feature", "properties": {"id": 3},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "MultiPolygon", "coordinates": [[[[0,0],[1,0],[1,1]]], [[[5,5],[6,5],[6,6]]]]}}
        ]
    }"#;

    #[test]
    fn parses_each_feature_independently() {
        let features = parse_feature_collection(COLLECTION).expect("collection");
        assert_eq!(features.len(), 4);

        assert_eq!(features[0].geometry, Ok(Geometry::Point(Vec3::new(10.0, 20.0, 0.0))));
        assert_eq!(features[0].attributes.get("navn"), Some(&AttrValue::from("A")));
        assert_eq!(features[0].attributes.get("hoejde"), Some(&AttrValue::Number(7.0)));

        assert!(features[1].geometry.as_ref().is_err_and(|e| e.contains("LineString")));
        assert!(features[1].attributes.is_empty());

        assert!(matches!(&features[2].geometry, Ok(Geometry::Polygon(r)) if r[0].len() == 5));
        assert!(matches!(&features[3].geometry, Ok(Geometry::MultiPolygon(p)) if p.len() == 2));
    }

    #[test]
    fn rejects_other_documents() {
        let err = parse_feature_collection(r#"{"type": "Feature"}"#).expect_err("not a collection");
        assert!(matches!(err, GeoJsonError::NotAFeatureCollection { found } if found == "Feature"));
        assert!(matches!(parse_feature_collection("{"), Err(GeoJsonError::Parse(_))));
    }

    #[test]
    fn short_ring_is_a_feature_error() {
        let payload = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[0,0],[1,1]]]}}]}"#;
        let features = parse_feature_collection(payload).expect("collection");
        assert!(features[0].geometry.is_err());
    }
}
