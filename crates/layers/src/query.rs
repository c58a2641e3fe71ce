use foundation::ids::{FeatureId, FeatureTag};
use foundation::math::Vec3;
use scene::World;

use crate::layer::Layer;
use crate::project::Project;

/// Geometry-carrying keys left out of popups.
pub const GEOMETRY_KEYS: [&str; 6] = [
    "Polygon",
    "geometri",
    "outerBoundaryIs",
    "innerBoundaryIs",
    "LinearRing",
    "coordinates",
];

/// Map coordinates as `"x, y, z"` with two decimals.
pub fn format_coordinates(p: Vec3) -> String {
    format!("{:.2}, {:.2}, {:.2}", p.x, p.y, p.z)
}

/// Contents of the attribute popup for one click.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryReport {
    pub layer_name: String,
    pub coordinates: String,
    pub rows: Vec<(String, String)>,
}

impl QueryReport {
    /// Popup for a click on `feature` of `layer` at map point `map_point`.
    pub fn for_feature(layer: &Layer, feature: FeatureId, map_point: Vec3) -> Option<Self> {
        let feature = layer.feature(feature)?;
        let rows = feature
            .attributes
            .iter()
            .filter(|(k, _)| !GEOMETRY_KEYS.contains(k))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Some(Self {
            layer_name: layer.name.clone(),
            coordinates: format_coordinates(map_point),
            rows,
        })
    }

    /// Popup for a click that hit no feature.
    pub fn for_point(map_point: Vec3) -> Self {
        Self {
            layer_name: String::new(),
            coordinates: format_coordinates(map_point),
            rows: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyOp {
    Eq,
    Contains,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyFilter {
    pub key: String,
    pub op: PropertyOp,
    pub value: String,
}

impl PropertyFilter {
    pub fn eq(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            op: PropertyOp::Eq,
            value: value.into(),
        }
    }

    fn matches(&self, layer: &Layer, feature: FeatureId) -> bool {
        let Some(v) = layer.feature(feature).and_then(|f| f.attributes.get(&self.key)) else {
            return false;
        };
        let text = v.to_string();
        match self.op {
            PropertyOp::Eq => text == self.value,
            PropertyOp::Contains => text.contains(&self.value),
        }
    }
}

/// First feature, in layer then feature order, passing `filter`.
pub fn find_feature(project: &Project, filter: &PropertyFilter) -> Option<FeatureTag> {
    project.layers().find_map(|layer| {
        layer
            .features()
            .find(|(id, _)| filter.matches(layer, *id))
            .map(|(id, _)| FeatureTag::new(layer.id, id))
    })
}

/// Scene-space point a camera should look at to show `tag`.
pub fn focus_point(project: &Project, world: &World, tag: FeatureTag) -> Option<Vec3> {
    let feature = project.layer(tag.layer)?.feature(tag.feature)?;
    world.world_bounds(feature.entity).map(|b| b.center())
}
