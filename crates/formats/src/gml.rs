//! GML 2 building documents (WFS `GetFeature` on `kms:Bygning`).
//!
//! Each `Bygning` element becomes one feature. Only `coordinates` inside a
//! `LinearRing` count as geometry: the one under `outerBoundaryIs` is the
//! outer ring, those under `innerBoundaryIs` are holes. `boundedBy` boxes,
//! per feature or per document, are skipped entirely. Every other
//! descendant element contributes an attribute named after the element
//! (namespace stripped) holding its own text.

use std::fmt;

use foundation::math::Vec3;
use layers::{Attributes, Geometry, strip_namespace};
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::scene_ingest::SourceFeature;

pub const FEATURE_ELEMENT: &str = "Bygning";
pub const COORDINATES_ELEMENT: &str = "coordinates";
const RING_ELEMENT: &str = "LinearRing";
const INNER_ELEMENT: &str = "innerBoundaryIs";
const POLYGON_ELEMENT: &str = "Polygon";
const BOUNDS_ELEMENT: &str = "boundedBy";

#[derive(Debug, Clone, PartialEq)]
pub enum GmlError {
    Xml(String),
}

impl fmt::Display for GmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GmlError::Xml(msg) => write!(f, "GML parse error: {msg}"),
        }
    }
}

impl std::error::Error for GmlError {}

#[derive(Default)]
struct Pending {
    attributes: Attributes,
    outer: Option<Result<Vec<Vec3>, String>>,
    holes: Vec<Result<Vec<Vec3>, String>>,
}

impl Pending {
    fn push_ring(&mut self, ring: Result<Vec<Vec3>, String>, inner: bool) {
        if inner || self.outer.is_some() {
            self.holes.push(ring);
        } else {
            self.outer = Some(ring);
        }
    }

    fn finish(self) -> SourceFeature {
        let geometry = match self.outer {
            None => Err("building without coordinates".to_string()),
            Some(outer) => std::iter::once(outer)
                .chain(self.holes)
                .collect::<Result<Vec<_>, _>>()
                .and_then(|rings| match rings.first() {
                    Some(outer) if outer.len() >= 3 => Ok(Geometry::Polygon(rings)),
                    _ => Err("outer ring needs at least three positions".to_string()),
                }),
        };
        SourceFeature {
            attributes: self.attributes,
            geometry,
        }
    }
}

fn local_name(qualified: &str) -> &str {
    qualified.rsplit(':').next().unwrap_or(qualified)
}

fn within(path: &[String], element: &str) -> bool {
    path.iter().any(|n| local_name(n) == element)
}

/// Reads every building in `xml`, in document order.
pub fn parse_buildings(xml: &str) -> Result<Vec<SourceFeature>, GmlError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut out = Vec::new();
    // Element names from the document root down to the current element.
    let mut path: Vec<String> = Vec::new();
    // Depth of the open `Bygning` element, if any.
    let mut feature_depth: Option<usize> = None;
    let mut pending = Pending::default();
    // Rings outside a building form their own feature.
    let mut loose: Option<Pending> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if feature_depth.is_none() && local_name(&name) == FEATURE_ELEMENT {
                    feature_depth = Some(path.len());
                    pending = Pending::default();
                } else if feature_depth.is_some()
                    && local_name(&name) != BOUNDS_ELEMENT
                    && !within(&path, BOUNDS_ELEMENT)
                {
                    pending.attributes.insert(strip_namespace(&name), "");
                }
                path.push(name);
            }
            Ok(Event::Empty(e)) => {
                if feature_depth.is_some() && !within(&path, BOUNDS_ELEMENT) {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    pending.attributes.insert(strip_namespace(&name), "");
                }
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| GmlError::Xml(e.to_string()))?;
                let Some(current) = path.last() else {
                    continue;
                };
                if within(&path, BOUNDS_ELEMENT) {
                    continue;
                }
                let in_feature = feature_depth.is_some_and(|d| path.len() > d + 1);
                if in_feature {
                    pending.attributes.insert(strip_namespace(current), text.as_ref());
                }
                if local_name(current) == COORDINATES_ELEMENT && within(&path, RING_ELEMENT) {
                    let ring = parse_coordinates(&text);
                    let inner = within(&path, INNER_ELEMENT);
                    if feature_depth.is_some() {
                        pending.push_ring(ring, inner);
                    } else {
                        loose.get_or_insert_with(Pending::default).push_ring(ring, inner);
                    }
                }
            }
            Ok(Event::End(_)) => {
                path.pop();
                if feature_depth == Some(path.len()) {
                    feature_depth = None;
                    out.push(std::mem::take(&mut pending).finish());
                } else if feature_depth.is_none() && !within(&path, POLYGON_ELEMENT) {
                    if let Some(p) = loose.take() {
                        out.push(p.finish());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(GmlError::Xml(e.to_string())),
        }
    }

    Ok(out)
}

/// Parses a GML 2 coordinate list: whitespace-separated `x,y[,z]` tuples.
pub fn parse_coordinates(text: &str) -> Result<Vec<Vec3>, String> {
    text.split_whitespace()
        .map(|tuple| {
            let mut parts = tuple.split(',').map(|s| s.trim().parse::<f64>());
            match (parts.next(), parts.next(), parts.next()) {
                (Some(Ok(x)), Some(Ok(y)), None) => Ok(Vec3::new(x, y, 0.0)),
                (Some(Ok(x)), Some(Ok(y)), Some(Ok(z))) => Ok(Vec3::new(x, y, z)),
                _ => Err(format!("bad coordinate tuple {tuple:?}")),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{parse_buildings, parse_coordinates};
    use foundation::math::Vec3;
    use layers::{AttrValue, Geometry};

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs" xmlns:gml="http://www.opengis.net/gml" xmlns:kms="http://www.kms.dk">
  <gml:featureMember>
    <kms:Bygning fid="b1">
      <kms:FOTID>1001</kms:FOTID>
      <kms:BYGNINGSTYPE>Bygning &amp; tilbygning</kms:BYGNINGSTYPE>
      <kms:geometri>
        <gml:Polygon>
          <gml:outerBoundaryIs><gml:LinearRing>
            <gml:coordinates>0,0,8 10,0,8 10,10,8 0,10,8 0,0,8</gml:coordinates>
          </gml:LinearRing></gml:outerBoundaryIs>
        </gml:Polygon>
      </kms:geometri>
    </kms:Bygning>
  </gml:featureMember>
  <gml:featureMember>
    <kms:Bygning fid="b2">
      <kms:FOTID>1002</kms:FOTID>
      <kms:geometri><gml:Polygon><gml:outerBoundaryIs><gml:LinearRing>
        <gml:coordinates>0,0 5,0 oops</gml:coordinates>
      </gml:LinearRing></gml:outerBoundaryIs></gml:Polygon></kms:geometri>
    </kms:Bygning>
  </gml:featureMember>
</wfs:FeatureCollection>"#;

    #[test]
    fn buildings_keep_document_order_and_attributes() {
        let features = parse_buildings(DOC).expect("parse");
        assert_eq!(features.len(), 2);

        let first = &features[0];
        assert_eq!(first.attributes.get("FOTID"), Some(&AttrValue::from("1001")));
        assert_eq!(
            first.attributes.get("BYGNINGSTYPE"),
            Some(&AttrValue::from("Bygning & tilbygning"))
        );
        assert!(first.attributes.get("Polygon").is_some());
        assert!(first.attributes.get("coordinates").is_some());
        match &first.geometry {
            Ok(Geometry::Polygon(rings)) => {
                assert_eq!(rings.len(), 1);
                assert_eq!(rings[0][1], Vec3::new(10.0, 0.0, 8.0));
            }
            other => panic!("unexpected {other:?}"),
        }

        assert_eq!(features[1].attributes.get("FOTID"), Some(&AttrValue::from("1002")));
        assert!(features[1].geometry.is_err());
    }

    #[test]
    fn bounding_boxes_are_not_geometry() {
        let doc = r#"<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs" xmlns:gml="http://www.opengis.net/gml" xmlns:kms="http://www.kms.dk">
  <gml:boundedBy><gml:Box srsName="EPSG:25832">
    <gml:coordinates>0,0 100,100</gml:coordinates>
  </gml:Box></gml:boundedBy>
  <gml:featureMember>
    <kms:Bygning fid="b1">
      <gml:boundedBy><gml:Box><gml:coordinates>10,10 30,30</gml:coordinates></gml:Box></gml:boundedBy>
      <kms:FOTID>2001</kms:FOTID>
      <kms:geometri><gml:Polygon>
        <gml:outerBoundaryIs><gml:LinearRing>
          <gml:coordinates>10,10 30,10 30,30 10,30 10,10</gml:coordinates>
        </gml:LinearRing></gml:outerBoundaryIs>
        <gml:innerBoundaryIs><gml:LinearRing>
          <gml:coordinates>15,15 20,15 20,20 15,15</gml:coordinates>
        </gml:LinearRing></gml:innerBoundaryIs>
      </gml:Polygon></kms:geometri>
    </kms:Bygning>
  </gml:featureMember>
</wfs:FeatureCollection>"#;
        let features = parse_buildings(doc).expect("parse");
        assert_eq!(features.len(), 1);
        let building = &features[0];
        assert_eq!(building.attributes.get("FOTID"), Some(&AttrValue::from("2001")));
        assert!(building.attributes.get("Box").is_none());
        assert!(building.attributes.get("boundedBy").is_none());
        match &building.geometry {
            Ok(Geometry::Polygon(rings)) => {
                assert_eq!(rings.len(), 2);
                assert_eq!(rings[0].len(), 5);
                assert_eq!(rings[0][1], Vec3::new(30.0, 10.0, 0.0));
                assert_eq!(rings[1][0], Vec3::new(15.0, 15.0, 0.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn coordinate_tuples_accept_two_or_three_values() {
        assert_eq!(
            parse_coordinates("1,2 3,4,5").expect("coords"),
            vec![Vec3::new(1.0, 2.0, 0.0), Vec3::new(3.0, 4.0, 5.0)]
        );
        assert!(parse_coordinates("1,2,3,4").is_err());
        assert!(parse_coordinates("1").is_err());
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(parse_buildings("<a><b></a>").is_err());
    }
}
