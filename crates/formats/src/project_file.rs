use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use foundation::bounds::Extent;
use foundation::ids::{FeatureId, FeatureTag, LayerId};
use foundation::math::{ProjectionError, SceneProjection, Vec3};
use layers::{Attributes, Feature, Geometry, Layer, LayerKind, Project};
use scene::World;
use scene::components::{Material, Mesh, Transform};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug)]
pub enum ProjectFileError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Projection(ProjectionError),
    LayerMismatch {
        layer: String,
        model: usize,
        attributes: usize,
    },
}

impl fmt::Display for ProjectFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectFileError::Io(err) => write!(f, "I/O error: {err}"),
            ProjectFileError::Parse(err) => write!(f, "Project parse error: {err}"),
            ProjectFileError::Projection(err) => write!(f, "Invalid project: {err}"),
            ProjectFileError::LayerMismatch {
                layer,
                model,
                attributes,
            } => write!(
                f,
                "Layer {layer:?} has {model} meshes but {attributes} attribute rows"
            ),
        }
    }
}

impl std::error::Error for ProjectFileError {}

/// On-disk project: scene parameters plus every layer's meshes and
/// attribute rows, `model[i]` paired with `a[i]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub title: String,
    pub crs: String,
    pub origin: [f64; 3],
    pub base_extent: [f64; 4],
    pub height: f64,
    pub width: f64,
    pub scale: f64,
    pub z_exaggeration: f64,
    pub z_shift: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub layers: Vec<LayerFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayerFile {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub model: Vec<MeshFile>,
    #[serde(default)]
    pub a: Vec<Attributes>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeshFile {
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub position: [f64; 3],
    pub scale: [f64; 3],
    pub color: u32,
    pub base_height: f64,
    pub map_center: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<GeometryFile>,
}

/// GeoJSON-shaped geometry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "coordinates")]
pub enum GeometryFile {
    Point([f64; 3]),
    MultiPoint(Vec<[f64; 3]>),
    Polygon(Vec<Vec<[f64; 3]>>),
    MultiPolygon(Vec<Vec<Vec<[f64; 3]>>>),
}

fn ring_out(ring: &[Vec3]) -> Vec<[f64; 3]> {
    ring.iter().map(|p| p.as_array()).collect()
}

fn ring_in(ring: &[[f64; 3]]) -> Vec<Vec3> {
    ring.iter().map(|p| Vec3::from(*p)).collect()
}

impl From<&Geometry> for GeometryFile {
    fn from(g: &Geometry) -> Self {
        match g {
            Geometry::Point(p) => GeometryFile::Point(p.as_array()),
            Geometry::MultiPoint(ps) => GeometryFile::MultiPoint(ring_out(ps)),
            Geometry::Polygon(rings) => GeometryFile::Polygon(rings.iter().map(|r| ring_out(r)).collect()),
            Geometry::MultiPolygon(polys) => GeometryFile::MultiPolygon(
                polys
                    .iter()
                    .map(|rings| rings.iter().map(|r| ring_out(r)).collect())
                    .collect(),
            ),
        }
    }
}

impl From<&GeometryFile> for Geometry {
    fn from(g: &GeometryFile) -> Self {
        match g {
            GeometryFile::Point(p) => Geometry::Point(Vec3::from(*p)),
            GeometryFile::MultiPoint(ps) => Geometry::MultiPoint(ring_in(ps)),
            GeometryFile::Polygon(rings) => Geometry::Polygon(rings.iter().map(|r| ring_in(r)).collect()),
            GeometryFile::MultiPolygon(polys) => Geometry::MultiPolygon(
                polys
                    .iter()
                    .map(|rings| rings.iter().map(|r| ring_in(r)).collect())
                    .collect(),
            ),
        }
    }
}

impl ProjectFile {
    pub fn from_project(project: &Project, world: &World) -> Self {
        let p = project.projection();
        Self {
            title: project.title.clone(),
            crs: project.crs.clone(),
            origin: p.origin().as_array(),
            base_extent: p.extent().as_array(),
            height: p.height(),
            width: p.width(),
            scale: p.scale(),
            z_exaggeration: p.z_exaggeration(),
            z_shift: p.z_shift(),
            rotation: p.rotation_deg(),
            layers: project.layers().map(|l| layer_out(l, world)).collect(),
        }
    }

    /// Rebuilds the project, re-spawning every stored mesh into `world`.
    pub fn into_project(self, world: &mut World) -> Result<Project, ProjectFileError> {
        let projection = SceneProjection::new(
            Extent::from_array(self.base_extent),
            self.width,
            self.z_exaggeration,
            self.z_shift,
            self.rotation,
        )
        .map_err(ProjectFileError::Projection)?;

        let mut project = Project::new(self.title, self.crs, projection);
        for layer in self.layers {
            if layer.model.len() != layer.a.len() {
                return Err(ProjectFileError::LayerMismatch {
                    layer: layer.name,
                    model: layer.model.len(),
                    attributes: layer.a.len(),
                });
            }
            let id = project.add_layer(world, layer.name, layer.kind);
            if let Some(target) = project.layer_mut(id) {
                target.url = layer.url;
                for (mesh, attributes) in layer.model.into_iter().zip(layer.a) {
                    layer_in(target, world, id, mesh, attributes);
                }
            }
        }
        Ok(project)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectFileError> {
        let payload = fs::read_to_string(path.as_ref()).map_err(ProjectFileError::Io)?;
        serde_json::from_str(&payload).map_err(ProjectFileError::Parse)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ProjectFileError> {
        let payload = serde_json::to_string_pretty(self).map_err(ProjectFileError::Parse)?;
        fs::write(path.as_ref(), payload).map_err(ProjectFileError::Io)?;
        info!(path = %path.as_ref().display(), layers = self.layers.len(), "project saved");
        Ok(())
    }
}

fn layer_out(layer: &Layer, world: &World) -> LayerFile {
    let model = layer
        .features()
        .map(|(_, f)| {
            let transform = world.transform(f.entity).unwrap_or_default();
            let mesh = world.mesh(f.entity);
            MeshFile {
                positions: mesh.map(|m| m.positions.clone()).unwrap_or_default(),
                indices: mesh.map(|m| m.indices.clone()).unwrap_or_default(),
                position: transform.position.as_array(),
                scale: transform.scale.as_array(),
                color: world.material(f.entity).map_or(0xffffff, |m| m.color),
                base_height: f.base_height,
                map_center: f.center.as_array(),
                geometry: Some(GeometryFile::from(&f.geometry)),
            }
        })
        .collect();

    LayerFile {
        name: layer.name.clone(),
        kind: layer.kind,
        url: layer.url.clone(),
        model,
        a: layer.attribute_rows().into_iter().cloned().collect(),
    }
}

fn layer_in(layer: &mut Layer, world: &mut World, id: LayerId, mesh: MeshFile, attributes: Attributes) {
    let feature = FeatureId(layer.len() as u32);
    let entity = world.spawn();
    world.set_parent(entity, Some(layer.root));
    world.set_mesh(entity, Arc::new(Mesh::new(mesh.positions, mesh.indices)));
    world.set_transform(
        entity,
        Transform::translate(Vec3::from(mesh.position)).with_scale(Vec3::from(mesh.scale)),
    );
    world.set_material(entity, Material::color(mesh.color));
    world.set_tag(entity, FeatureTag::new(id, feature));
    world.set_queryable(entity, true);

    let center = Vec3::from(mesh.map_center);
    layer.push_feature(Feature {
        entity,
        attributes,
        geometry: mesh
            .geometry
            .as_ref()
            .map_or(Geometry::Point(center), Geometry::from),
        center,
        base_height: mesh.base_height,
    });
}

#[cfg(test)]
mod tests {
    use super::{ProjectFile, ProjectFileError};
    use crate::scene_ingest::{ExtrudeRule, IngestOptions, SourceFeature, ingest};
    use foundation::bounds::Extent;
    use foundation::math::{SceneProjection, Vec3};
    use layers::{Attributes, Geometry, LayerKind, Project};
    use pretty_assertions::assert_eq;
    use scene::World;

    fn sample(world: &mut World) -> Project {
        let p = SceneProjection::new(Extent::new(550000.0, 6200000.0, 551000.0, 6200500.0), 100.0, 1.5, 2.0, 0.0)
            .expect("projection");
        let mut project = Project::new("Aalborg", "EPSG:25832", p);
        let id = project.add_layer(world, "Bygninger", LayerKind::Polygon);
        let mut attributes = Attributes::new();
        attributes.insert("FOTID", "42");
        let ring = vec![
            Vec3::new(550100.0, 6200100.0, 0.0),
            Vec3::new(550110.0, 6200100.0, 0.0),
            Vec3::new(550110.0, 6200110.0, 0.0),
        ];
        ingest(
            &mut project,
            world,
            id,
            vec![SourceFeature {
                attributes,
                geometry: Ok(Geometry::Polygon(vec![ring])),
            }],
            &IngestOptions {
                extrude: ExtrudeRule::Fixed(3.0),
                ..IngestOptions::default()
            },
        )
        .expect("ingest");
        project
    }

    #[test]
    fn save_and_load_rebuilds_project() {
        let mut world = World::new();
        let project = sample(&mut world);
        let file = ProjectFile::from_project(&project, &world);
        assert_eq!(file.width, 100.0);
        assert_eq!(file.height, 50.0);
        assert_eq!(file.origin, [550500.0, 6200250.0, -2.0]);

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("project.json");
        file.save(&path).expect("save");
        let loaded = ProjectFile::load(&path).expect("load");
        assert_eq!(loaded, file);

        let mut fresh = World::new();
        let rebuilt = loaded.into_project(&mut fresh).expect("rebuild");
        assert_eq!(rebuilt.projection(), project.projection());
        let layer = rebuilt.layer_by_name("Bygninger").expect("layer");
        assert_eq!(layer.len(), 1);
        let e = layer.model()[0];
        assert_eq!(fresh.transform(e).map(|t| t.scale.z), Some(3.0));
        assert_eq!(fresh.queryable_entities(), vec![e]);
        assert_eq!(ProjectFile::from_project(&rebuilt, &fresh), file);
    }

    #[test]
    fn uses_camel_case_keys() {
        let mut world = World::new();
        let json = serde_json::to_value(ProjectFile::from_project(&sample(&mut world), &world)).expect("json");
        for key in ["title", "crs", "origin", "baseExtent", "height", "width", "scale", "zExaggeration", "zShift", "layers"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        let layer = &json["layers"][0];
        assert_eq!(layer["type"], "polygon");
        assert_eq!(layer["a"][0]["FOTID"], "42");
        assert_eq!(layer["model"][0]["geometry"]["type"], "Polygon");
    }

    #[test]
    fn degenerate_extent_is_rejected() {
        let mut world = World::new();
        let mut file = ProjectFile::from_project(&sample(&mut world), &world);
        file.base_extent = [0.0, 0.0, 0.0, 10.0];
        assert!(matches!(
            file.into_project(&mut World::new()),
            Err(ProjectFileError::Projection(_))
        ));
    }

    #[test]
    fn mismatched_rows_are_rejected() {
        let mut world = World::new();
        let mut file = ProjectFile::from_project(&sample(&mut world), &world);
        file.layers[0].a.clear();
        assert!(matches!(
            file.into_project(&mut World::new()),
            Err(ProjectFileError::LayerMismatch { model: 1, attributes: 0, .. })
        ));
    }
}
