use foundation::ids::{FeatureTag, LayerId};
use foundation::math::Vec3;
use tracing::debug;

use crate::components::{Material, TileRef};
use crate::entity::EntityId;
use crate::picking::PickHit;
use crate::World;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    Selected(FeatureTag),
}

/// What a click did to the selection.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// Nothing tagged was hit.
    Missed { cleared: Option<FeatureTag> },
    /// A feature became the selection. `point` is in scene space.
    Selected {
        tag: FeatureTag,
        entity: EntityId,
        point: Vec3,
        replaced: Option<FeatureTag>,
    },
    /// The selected feature was clicked again.
    Deselected { tag: FeatureTag },
    /// A tile plane was hit; the caller loads that tile's features.
    Tile {
        tile: TileRef,
        point: Vec3,
        cleared: Option<FeatureTag>,
    },
}

/// Single-selection controller.
///
/// Owns at most one highlight entity: a non-queryable clone of the picked
/// mesh drawn with the highlight material. Any transition out of
/// `Selected` despawns it before anything else is spawned.
#[derive(Debug)]
pub struct HighlightController {
    state: SelectionState,
    highlight: Option<EntityId>,
    material: Material,
}

impl Default for HighlightController {
    fn default() -> Self {
        Self::new()
    }
}

impl HighlightController {
    pub fn new() -> Self {
        Self {
            state: SelectionState::Idle,
            highlight: None,
            material: Material::highlight(),
        }
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn selected(&self) -> Option<FeatureTag> {
        match self.state {
            SelectionState::Idle => None,
            SelectionState::Selected(tag) => Some(tag),
        }
    }

    pub fn highlight_entity(&self) -> Option<EntityId> {
        self.highlight
    }

    /// Recolors the current and future highlight clones.
    pub fn set_highlight_color(&mut self, world: &mut World, color: u32) {
        self.material.color = color;
        if let Some(m) = self.highlight.and_then(|e| world.material_mut(e)) {
            m.color = color;
        }
    }

    pub fn click(&mut self, world: &mut World, hit: Option<PickHit>) -> ClickOutcome {
        let Some(hit) = hit else {
            return ClickOutcome::Missed {
                cleared: self.clear(world),
            };
        };

        if let Some((_, tag)) = world.find_in_ancestors(hit.entity, |e| world.tag(e)) {
            if self.state == SelectionState::Selected(tag) {
                self.clear(world);
                return ClickOutcome::Deselected { tag };
            }

            let replaced = self.clear(world);
            if let Some(clone) = world.clone_entity(hit.entity) {
                world.set_material(clone, self.material.clone());
                self.highlight = Some(clone);
            }
            self.state = SelectionState::Selected(tag);
            debug!(layer = tag.layer.0, feature = tag.feature.0, "feature selected");
            return ClickOutcome::Selected {
                tag,
                entity: hit.entity,
                point: hit.point,
                replaced,
            };
        }

        let tile = world
            .find_in_ancestors(hit.entity, |e| world.tile_ref(e).cloned())
            .map(|(_, t)| t);
        let cleared = self.clear(world);
        match tile {
            Some(tile) => ClickOutcome::Tile {
                tile,
                point: hit.point,
                cleared,
            },
            None => ClickOutcome::Missed { cleared },
        }
    }

    /// Drops the selection and despawns its highlight.
    pub fn clear(&mut self, world: &mut World) -> Option<FeatureTag> {
        if let Some(e) = self.highlight.take() {
            world.despawn(e);
        }
        let previous = self.selected();
        self.state = SelectionState::Idle;
        previous
    }

    /// Clears only when the selection belongs to `layer`.
    pub fn clear_if_layer(&mut self, world: &mut World, layer: LayerId) -> Option<FeatureTag> {
        match self.state {
            SelectionState::Selected(tag) if tag.layer == layer => self.clear(world),
            _ => None,
        }
    }
}
