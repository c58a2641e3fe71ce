use std::sync::Arc;

use foundation::bounds::Extent;
use foundation::ids::{FeatureId, FeatureTag, LayerId};
use foundation::math::{SceneProjection, Vec2, Vec3};
use layers::vector::{extrude_polygon, marker_mesh};
use layers::{AttrValue, Attributes, Feature, Geometry, LayerKind, Project, ProjectError};
use scene::World;
use scene::components::{Material, Mesh, Transform};
use tracing::{debug, warn};

/// One record from a feature source, before placement. A geometry error
/// skips just this record.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFeature {
    pub attributes: Attributes,
    pub geometry: Result<Geometry, String>,
}

/// How tall an extruded footprint becomes, in scene units.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtrudeRule {
    Fixed(f64),
    /// `attribute * scale`, or `fallback` when missing or non-numeric.
    Attribute { key: String, scale: f64, fallback: f64 },
    /// `ring z * zScale * factor`; `fallback * zScale` when z is not positive.
    RingZ { factor: f64, fallback: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestOptions {
    pub extrude: ExtrudeRule,
    pub polygon_color: u32,
    pub marker_color: u32,
    /// Per-axis scale of the point marker mesh.
    pub marker_scale: Vec3,
    pub marker_z: f64,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            extrude: ExtrudeRule::Fixed(1.2),
            polygon_color: 0xffffff,
            marker_color: 0xffaaaa,
            marker_scale: Vec3::new(0.05, 0.05, 0.25),
            marker_z: 0.5,
        }
    }
}

impl IngestOptions {
    /// Building footprints: grey, height from the ring's z.
    pub fn buildings() -> Self {
        Self {
            extrude: ExtrudeRule::RingZ {
                factor: 0.5,
                fallback: 12.0,
            },
            polygon_color: 0xaaaaaa,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub ingested: Vec<FeatureId>,
    /// `(source index, reason)` for every record left out.
    pub skipped: Vec<(usize, String)>,
}

/// Places `features` into layer `layer_id`, appending one `Feature` per
/// accepted record in source order.
pub fn ingest(
    project: &mut Project,
    world: &mut World,
    layer_id: LayerId,
    features: Vec<SourceFeature>,
    opts: &IngestOptions,
) -> Result<IngestReport, ProjectError> {
    let projection = project.projection().clone();
    let layer = project
        .layer_mut(layer_id)
        .ok_or(ProjectError::UnknownLayer(layer_id))?;

    let mut report = IngestReport::default();
    for (index, source) in features.into_iter().enumerate() {
        let geometry = match source.geometry {
            Ok(g) => g,
            Err(reason) => {
                warn!(layer = %layer_id, index, %reason, "feature skipped");
                report.skipped.push((index, reason));
                continue;
            }
        };

        let Some(placed) = place(&projection, &geometry, &source.attributes, opts) else {
            let reason = format!("{} does not triangulate", geometry.type_name());
            warn!(layer = %layer_id, index, geometry = geometry.type_name(), "feature skipped");
            report.skipped.push((index, reason));
            continue;
        };

        let id = FeatureId(layer.len() as u32);
        let entity = world.spawn();
        world.set_parent(entity, Some(layer.root));
        world.set_mesh(entity, Arc::new(placed.mesh));
        world.set_transform(entity, placed.transform);
        world.set_material(entity, Material::color(placed.color));
        world.set_tag(entity, FeatureTag::new(layer_id, id));
        world.set_queryable(entity, true);

        layer.push_feature(Feature {
            entity,
            attributes: source.attributes,
            center: placed.center,
            base_height: placed.transform.scale.z,
            geometry,
        });
        report.ingested.push(id);
    }

    debug!(
        layer = %layer_id,
        ingested = report.ingested.len(),
        skipped = report.skipped.len(),
        "ingest finished"
    );
    Ok(report)
}

/// Suggested layer kind for a batch, from its first placeable record.
pub fn layer_kind_of(features: &[SourceFeature]) -> LayerKind {
    features
        .iter()
        .find_map(|f| f.geometry.as_ref().ok())
        .map_or(LayerKind::Polygon, |g| match g {
            Geometry::Point(_) | Geometry::MultiPoint(_) => LayerKind::Point,
            Geometry::Polygon(_) | Geometry::MultiPolygon(_) => LayerKind::Polygon,
        })
}

struct Placed {
    mesh: Mesh,
    transform: Transform,
    color: u32,
    center: Vec3,
}

fn place(
    projection: &SceneProjection,
    geometry: &Geometry,
    attributes: &Attributes,
    opts: &IngestOptions,
) -> Option<Placed> {
    let center = map_center(geometry)?;
    let polygons: Vec<&Vec<Vec<Vec3>>> = match geometry {
        Geometry::Point(p) => return Some(place_markers(projection, &[*p], center, opts)),
        Geometry::MultiPoint(ps) => return Some(place_markers(projection, ps, center, opts)),
        Geometry::Polygon(rings) => vec![rings],
        Geometry::MultiPolygon(polys) => polys.iter().collect(),
    };

    let anchor = projection.to_scene_xy(center.xy());
    let mut mesh = Mesh::default();
    for rings in &polygons {
        let local: Vec<Vec<Vec2>> = rings
            .iter()
            .map(|ring| {
                ring.iter()
                    .map(|p| projection.to_scene_xy(p.xy()) - anchor)
                    .collect()
            })
            .collect();
        let part = extrude_polygon(&local)?;
        append(&mut mesh, &part);
    }

    let height = extrude_height(projection, &opts.extrude, attributes, polygons.first()?);
    Some(Placed {
        mesh,
        transform: Transform::translate(Vec3::new(anchor.x, anchor.y, 0.0))
            .with_scale(Vec3::new(1.0, 1.0, height)),
        color: opts.polygon_color,
        center,
    })
}

fn place_markers(projection: &SceneProjection, points: &[Vec3], center: Vec3, opts: &IngestOptions) -> Placed {
    let anchor = projection.to_scene_xy(center.xy());
    let s = opts.marker_scale;
    let offsets: Vec<Vec2> = points
        .iter()
        .map(|p| {
            let d = projection.to_scene_xy(p.xy()) - anchor;
            Vec2::new(d.x / s.x, d.y / s.y)
        })
        .collect();
    Placed {
        mesh: marker_mesh(&offsets),
        transform: Transform::translate(Vec3::new(anchor.x, anchor.y, opts.marker_z)).with_scale(s),
        color: opts.marker_color,
        center,
    }
}

fn extrude_height(
    projection: &SceneProjection,
    rule: &ExtrudeRule,
    attributes: &Attributes,
    rings: &[Vec<Vec3>],
) -> f64 {
    match rule {
        ExtrudeRule::Fixed(h) => *h,
        ExtrudeRule::Attribute { key, scale, fallback } => attributes
            .get(key)
            .and_then(AttrValue::as_f64)
            .map_or(*fallback, |v| v * scale),
        ExtrudeRule::RingZ { factor, fallback } => {
            let z = rings.first().and_then(|r| r.first()).map_or(0.0, |p| p.z);
            if z > 0.0 {
                z * projection.z_scale() * factor
            } else {
                fallback * projection.z_scale()
            }
        }
    }
}

/// Center of the geometry's map-space bounding box, at z = 0.
fn map_center(geometry: &Geometry) -> Option<Vec3> {
    let extent: Extent = Extent::from_points(geometry.points().map(|p| p.xy()))?;
    let c = extent.center();
    Some(Vec3::new(c.x, c.y, 0.0))
}

fn append(into: &mut Mesh, part: &Mesh) {
    let base = into.positions.len() as u32;
    into.positions.extend_from_slice(&part.positions);
    into.indices.extend(part.indices.iter().map(|i| base + i));
}
