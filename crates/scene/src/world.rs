use std::sync::Arc;

use foundation::bounds::Aabb3;
use foundation::handles::Handle;
use foundation::ids::FeatureTag;
use foundation::math::Vec3;

use crate::components::{Material, Mesh, TileRef, Transform, Visibility};
use crate::entity::EntityId;

/// Parent chains deeper than this are treated as cycles.
const MAX_PARENT_DEPTH: usize = 64;

/// Scene graph: one slot per entity, one optional component column per kind.
///
/// Slots are recycled after `despawn`; the generation in `EntityId` keeps a
/// stale id from reaching the slot's next occupant.
#[derive(Debug, Default)]
pub struct World {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: Vec<u32>,
    transforms: Vec<Option<Transform>>,
    meshes: Vec<Option<Arc<Mesh>>>,
    materials: Vec<Option<Material>>,
    visibility: Vec<Option<Visibility>>,
    parents: Vec<Option<EntityId>>,
    tags: Vec<Option<FeatureTag>>,
    tile_refs: Vec<Option<TileRef>>,
    queryable: Vec<bool>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self) -> EntityId {
        if let Some(index) = self.free.pop() {
            let idx = index as usize;
            self.alive[idx] = true;
            return EntityId(Handle::new(index, self.generations[idx]));
        }

        let index = self.generations.len() as u32;
        self.generations.push(0);
        self.alive.push(true);
        self.transforms.push(None);
        self.meshes.push(None);
        self.materials.push(None);
        self.visibility.push(None);
        self.parents.push(None);
        self.tags.push(None);
        self.tile_refs.push(None);
        self.queryable.push(false);
        EntityId(Handle::new(index, 0))
    }

    /// Removes `entity` and all of its components. Returns `false` for stale ids.
    pub fn despawn(&mut self, entity: EntityId) -> bool {
        let Some(idx) = self.slot(entity) else {
            return false;
        };
        self.alive[idx] = false;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.transforms[idx] = None;
        self.meshes[idx] = None;
        self.materials[idx] = None;
        self.visibility[idx] = None;
        self.parents[idx] = None;
        self.tags[idx] = None;
        self.tile_refs[idx] = None;
        self.queryable[idx] = false;
        self.free.push(entity.index());
        true
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.slot(entity).is_some()
    }

    pub fn len(&self) -> usize {
        self.alive.iter().filter(|a| **a).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live entities in ascending index order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(idx, _)| EntityId(Handle::new(idx as u32, self.generations[idx])))
    }

    pub fn set_transform(&mut self, entity: EntityId, transform: Transform) {
        if let Some(idx) = self.slot(entity) {
            self.transforms[idx] = Some(transform);
        }
    }

    pub fn transform(&self, entity: EntityId) -> Option<Transform> {
        self.slot(entity).and_then(|idx| self.transforms[idx])
    }

    pub fn set_mesh(&mut self, entity: EntityId, mesh: Arc<Mesh>) {
        if let Some(idx) = self.slot(entity) {
            self.meshes[idx] = Some(mesh);
        }
    }

    pub fn mesh(&self, entity: EntityId) -> Option<&Arc<Mesh>> {
        self.slot(entity).and_then(|idx| self.meshes[idx].as_ref())
    }

    pub fn set_material(&mut self, entity: EntityId, material: Material) {
        if let Some(idx) = self.slot(entity) {
            self.materials[idx] = Some(material);
        }
    }

    pub fn material(&self, entity: EntityId) -> Option<&Material> {
        self.slot(entity).and_then(|idx| self.materials[idx].as_ref())
    }

    pub fn material_mut(&mut self, entity: EntityId) -> Option<&mut Material> {
        let idx = self.slot(entity)?;
        self.materials[idx].as_mut()
    }

    pub fn set_visibility(&mut self, entity: EntityId, visibility: Visibility) {
        if let Some(idx) = self.slot(entity) {
            self.visibility[idx] = Some(visibility);
        }
    }

    /// Visible itself and along its whole parent chain. Unset means visible.
    pub fn is_visible(&self, entity: EntityId) -> bool {
        let mut current = Some(entity);
        let mut depth = 0;
        while let Some(e) = current {
            let Some(idx) = self.slot(e) else {
                return false;
            };
            if self.visibility[idx].is_some_and(|v| !v.visible) {
                return false;
            }
            depth += 1;
            if depth > MAX_PARENT_DEPTH {
                return false;
            }
            current = self.parents[idx];
        }
        true
    }

    pub fn set_parent(&mut self, entity: EntityId, parent: Option<EntityId>) {
        if let Some(idx) = self.slot(entity) {
            self.parents[idx] = parent;
        }
    }

    pub fn parent(&self, entity: EntityId) -> Option<EntityId> {
        self.slot(entity).and_then(|idx| self.parents[idx])
    }

    pub fn set_tag(&mut self, entity: EntityId, tag: FeatureTag) {
        if let Some(idx) = self.slot(entity) {
            self.tags[idx] = Some(tag);
        }
    }

    pub fn tag(&self, entity: EntityId) -> Option<FeatureTag> {
        self.slot(entity).and_then(|idx| self.tags[idx])
    }

    pub fn set_tile_ref(&mut self, entity: EntityId, tile: TileRef) {
        if let Some(idx) = self.slot(entity) {
            self.tile_refs[idx] = Some(tile);
        }
    }

    pub fn tile_ref(&self, entity: EntityId) -> Option<&TileRef> {
        self.slot(entity).and_then(|idx| self.tile_refs[idx].as_ref())
    }

    /// Marks `entity` as a pick target.
    pub fn set_queryable(&mut self, entity: EntityId, queryable: bool) {
        if let Some(idx) = self.slot(entity) {
            self.queryable[idx] = queryable;
        }
    }

    /// Visible, meshed, queryable entities in ascending index order.
    pub fn queryable_entities(&self) -> Vec<EntityId> {
        self.entities()
            .filter(|e| {
                let idx = e.index() as usize;
                self.queryable[idx] && self.meshes[idx].is_some() && self.is_visible(*e)
            })
            .collect()
    }

    /// Walks `entity` and its ancestors, returning the first `(entity, value)`
    /// for which `f` yields something.
    pub fn find_in_ancestors<T>(
        &self,
        entity: EntityId,
        mut f: impl FnMut(EntityId) -> Option<T>,
    ) -> Option<(EntityId, T)> {
        let mut current = Some(entity);
        let mut depth = 0;
        while let Some(e) = current {
            if let Some(v) = f(e) {
                return Some((e, v));
            }
            depth += 1;
            if depth > MAX_PARENT_DEPTH {
                return None;
            }
            current = self.parent(e);
        }
        None
    }

    /// Transform composed with every ancestor's transform.
    pub fn world_transform(&self, entity: EntityId) -> Option<Transform> {
        let mut out = self.transform(entity).unwrap_or_default();
        let mut current = self.parent(entity);
        let mut depth = 0;
        while let Some(p) = current {
            if let Some(t) = self.transform(p) {
                out = out.then_parent(&t);
            }
            depth += 1;
            if depth > MAX_PARENT_DEPTH {
                return None;
            }
            current = self.parent(p);
        }
        self.slot(entity).map(|_| out)
    }

    /// Scene-space box around the entity's mesh.
    pub fn world_bounds(&self, entity: EntityId) -> Option<Aabb3> {
        let local = self.mesh(entity)?.local_bounds()?;
        let t = self.world_transform(entity)?;
        let corners = (0..8).map(|i| {
            Vec3::new(
                if i & 1 == 0 { local.min[0] } else { local.max[0] },
                if i & 2 == 0 { local.min[1] } else { local.max[1] },
                if i & 4 == 0 { local.min[2] } else { local.max[2] },
            )
        });
        Aabb3::from_points(corners.map(|c| t.apply(c)))
    }

    /// Spawns a detached copy sharing the mesh, placed at the source's world
    /// transform. Tags, tile references and pickability are not copied.
    pub fn clone_entity(&mut self, source: EntityId) -> Option<EntityId> {
        let mesh = self.mesh(source)?.clone();
        let transform = self.world_transform(source)?;
        let material = self.material(source).cloned().unwrap_or_default();

        let clone = self.spawn();
        self.set_transform(clone, transform);
        self.set_mesh(clone, mesh);
        self.set_material(clone, material);
        Some(clone)
    }

    fn slot(&self, entity: EntityId) -> Option<usize> {
        let idx = entity.index() as usize;
        let live = self.alive.get(idx).copied().unwrap_or(false)
            && self.generations[idx] == entity.generation();
        live.then_some(idx)
    }
}
