use std::fmt;

use foundation::ids::{FeatureId, LayerId};
use foundation::math::Vec3;
use scene::entity::EntityId;
use serde::{Deserialize, Serialize};

use crate::attributes::Attributes;
use crate::symbology::LayerStyle;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Terrain,
    Point,
    Line,
    Polygon,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LayerKind::Terrain => "terrain",
            LayerKind::Point => "point",
            LayerKind::Line => "line",
            LayerKind::Polygon => "polygon",
        })
    }
}

/// Source geometry in map coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Vec3),
    MultiPoint(Vec<Vec3>),
    /// Outer ring first, then holes.
    Polygon(Vec<Vec<Vec3>>),
    MultiPolygon(Vec<Vec<Vec<Vec3>>>),
}

impl Geometry {
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    pub fn points(&self) -> Box<dyn Iterator<Item = Vec3> + '_> {
        match self {
            Geometry::Point(p) => Box::new(std::iter::once(*p)),
            Geometry::MultiPoint(ps) => Box::new(ps.iter().copied()),
            Geometry::Polygon(rings) => Box::new(rings.iter().flatten().copied()),
            Geometry::MultiPolygon(polys) => Box::new(polys.iter().flatten().flatten().copied()),
        }
    }
}

/// One ingested record: the rendered entity and the attributes it was built
/// from travel together, so the two can never drift apart.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub entity: EntityId,
    pub attributes: Attributes,
    pub geometry: Geometry,
    /// Map-space anchor (footprint centroid or point position).
    pub center: Vec3,
    /// Extrusion height in scene units before the layer's height factor.
    pub base_height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub kind: LayerKind,
    pub url: Option<String>,
    /// Group entity every feature entity is parented to.
    pub root: EntityId,
    pub style: LayerStyle,
    features: Vec<Feature>,
}

impl Layer {
    pub fn new(id: LayerId, name: impl Into<String>, kind: LayerKind, root: EntityId) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            url: None,
            root,
            style: LayerStyle::default(),
            features: Vec::new(),
        }
    }

    /// Appends `feature`; its id is its position and never changes.
    pub fn push_feature(&mut self, feature: Feature) -> FeatureId {
        let id = FeatureId(self.features.len() as u32);
        self.features.push(feature);
        id
    }

    pub fn feature(&self, id: FeatureId) -> Option<&Feature> {
        self.features.get(id.index())
    }

    pub fn feature_mut(&mut self, id: FeatureId) -> Option<&mut Feature> {
        self.features.get_mut(id.index())
    }

    pub fn features(&self) -> impl Iterator<Item = (FeatureId, &Feature)> {
        self.features
            .iter()
            .enumerate()
            .map(|(i, f)| (FeatureId(i as u32), f))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Feature entities in feature order (`model[i]`).
    pub fn model(&self) -> Vec<EntityId> {
        self.features.iter().map(|f| f.entity).collect()
    }

    /// Attribute maps in feature order (`a[i]`).
    pub fn attribute_rows(&self) -> Vec<&Attributes> {
        self.features.iter().map(|f| &f.attributes).collect()
    }
}
