use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use foundation::ids::{LayerId, TileId};
use foundation::math::{ProjectionError, SceneProjection, Vec3};
use scene::World;
use scene::components::{Material, Mesh, TileRef, Transform};
use scene::entity::EntityId;
use tracing::info;

use crate::layer::{Layer, LayerKind};
use crate::tiles::{GridError, Tile, extend_grid, generate_tiles};

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectError {
    Projection(ProjectionError),
    UnknownLayer(LayerId),
    UnknownTile(TileId),
    Grid(GridError),
}

impl fmt::Display for ProjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectError::Projection(e) => write!(f, "projection: {e}"),
            ProjectError::UnknownLayer(id) => write!(f, "unknown layer {id}"),
            ProjectError::UnknownTile(id) => write!(f, "unknown tile {}", id.0),
            ProjectError::Grid(e) => write!(f, "tile grid: {e}"),
        }
    }
}

impl std::error::Error for ProjectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProjectError::Projection(e) => Some(e),
            ProjectError::Grid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ProjectionError> for ProjectError {
    fn from(e: ProjectionError) -> Self {
        ProjectError::Projection(e)
    }
}

impl From<GridError> for ProjectError {
    fn from(e: GridError) -> Self {
        ProjectError::Grid(e)
    }
}

/// A loaded project: the scene projection plus the layers and tiles placed
/// with it. Layers are keyed by id so removal never renumbers the rest.
#[derive(Debug)]
pub struct Project {
    pub title: String,
    pub crs: String,
    projection: SceneProjection,
    layers: BTreeMap<LayerId, Layer>,
    next_layer: u64,
    tiles: Vec<Tile>,
    tile_entities: BTreeMap<TileId, EntityId>,
    next_tile: u32,
}

impl Project {
    pub fn new(title: impl Into<String>, crs: impl Into<String>, projection: SceneProjection) -> Self {
        Self {
            title: title.into(),
            crs: crs.into(),
            projection,
            layers: BTreeMap::new(),
            next_layer: 0,
            tiles: Vec::new(),
            tile_entities: BTreeMap::new(),
            next_tile: 0,
        }
    }

    pub fn projection(&self) -> &SceneProjection {
        &self.projection
    }

    /// Registers an empty layer and spawns its group entity.
    pub fn add_layer(&mut self, world: &mut World, name: impl Into<String>, kind: LayerKind) -> LayerId {
        let id = LayerId(self.next_layer);
        self.next_layer += 1;

        let root = world.spawn();
        world.set_transform(root, Transform::identity());
        let layer = Layer::new(id, name, kind, root);
        info!(layer = %id, name = %layer.name, %kind, "layer added");
        self.layers.insert(id, layer);
        id
    }

    /// Deletes the layer and despawns every entity it owns.
    pub fn remove_layer(&mut self, world: &mut World, id: LayerId) -> Result<Layer, ProjectError> {
        let layer = self.layers.remove(&id).ok_or(ProjectError::UnknownLayer(id))?;
        for entity in layer.model() {
            world.despawn(entity);
        }
        world.despawn(layer.root);
        info!(layer = %id, name = %layer.name, features = layer.len(), "layer removed");
        Ok(layer)
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(&id)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.get_mut(&id)
    }

    pub fn layer_by_name(&self, name: &str) -> Option<&Layer> {
        self.layers.values().find(|l| l.name == name)
    }

    /// Layers in id (arrival) order.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.id == id)
    }

    pub fn tile_entity(&self, id: TileId) -> Option<EntityId> {
        self.tile_entities.get(&id).copied()
    }

    /// Replaces the tile set with an `n` x `n` grid over the base extent.
    /// An out-of-range `n` leaves the current tiles in place.
    pub fn generate_tiles(
        &mut self,
        world: &mut World,
        n: u32,
        url_template: Option<&str>,
    ) -> Result<Vec<TileId>, ProjectError> {
        let tiles = generate_tiles(
            &self.projection,
            self.projection.extent(),
            n,
            url_template,
            self.next_tile,
        )?;

        for (_, entity) in std::mem::take(&mut self.tile_entities) {
            world.despawn(entity);
        }
        self.tiles.clear();
        Ok(self.place_tiles(world, tiles))
    }

    /// Adds the ring of neighbors around `center`.
    pub fn extend_grid(&mut self, world: &mut World, center: TileId, radius: u32) -> Result<Vec<TileId>, ProjectError> {
        let center = self.tile(center).ok_or(ProjectError::UnknownTile(center))?;
        let tiles = extend_grid(center, radius, self.next_tile)?;
        Ok(self.place_tiles(world, tiles))
    }

    fn place_tiles(&mut self, world: &mut World, tiles: Vec<Tile>) -> Vec<TileId> {
        let mut ids = Vec::with_capacity(tiles.len());
        for tile in tiles {
            let e = world.spawn();
            world.set_transform(
                e,
                Transform::translate(Vec3::new(tile.scene_center.x, tile.scene_center.y, 0.0)),
            );
            world.set_mesh(e, Arc::new(Mesh::quad(tile.scene_size.x, tile.scene_size.y)));
            world.set_material(e, Material::default());
            world.set_tile_ref(
                e,
                TileRef {
                    tile: tile.id,
                    extent: tile.extent,
                    row: tile.row,
                    column: tile.column,
                    source_url: tile.url_template.clone(),
                },
            );
            world.set_queryable(e, true);

            self.next_tile = self.next_tile.max(tile.id.0 + 1);
            self.tile_entities.insert(tile.id, e);
            ids.push(tile.id);
            self.tiles.push(tile);
        }
        ids
    }
}
