use foundation::bounds::Extent;
use foundation::ids::TileId;
use runtime::generation::{Generation, Generations};

use crate::request::features_url;

/// A vector feature fetch scoped to one tile's box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRequest {
    pub tile: TileId,
    pub url: String,
    pub generation: Generation,
}

/// Stamps lazy per-tile feature loads so that only the latest load for a
/// tile is ingested.
#[derive(Debug, Default)]
pub struct TileFeatureLoads {
    generations: Generations<TileId>,
}

impl TileFeatureLoads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, tile: TileId, base_url: &str, extent: &Extent) -> FeatureRequest {
        FeatureRequest {
            tile,
            url: features_url(base_url, extent),
            generation: self.generations.bump(&tile),
        }
    }

    /// True when `req` is still the newest load for its tile. Accepting a
    /// load consumes it; a duplicate delivery is rejected.
    pub fn accept(&mut self, req: &FeatureRequest) -> bool {
        if self.generations.is_current(&req.tile, req.generation) {
            self.generations.retire(&req.tile);
            true
        } else {
            false
        }
    }

    pub fn retire_all(&mut self) {
        self.generations.retire_all();
    }
}
