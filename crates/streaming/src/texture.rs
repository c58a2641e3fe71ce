use std::collections::BTreeMap;
use std::fmt;

use foundation::bounds::Extent;
use foundation::ids::TileId;
use layers::tiles::Tile;
use runtime::generation::{Generation, Generations};
use tracing::{debug, error};

use crate::request::imagery_url;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Pixel size of the first request for a tile.
    pub start_resolution: u32,
    /// Refinement stops once doubling would exceed this height.
    pub max_resolution: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            start_resolution: 256,
            max_resolution: 1024,
        }
    }
}

/// One imagery fetch for one tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRequest {
    pub tile: TileId,
    pub width: u32,
    pub height: u32,
    pub url: String,
    pub generation: Generation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureOutcome {
    /// The texture should be applied; `next` is the refinement to issue.
    Apply { next: Option<TextureRequest> },
    /// The tile was regenerated or restarted since the request was issued.
    Stale,
}

#[derive(Debug, Clone)]
struct Target {
    template: String,
    extent: Extent,
}

/// Progressive refinement of tile imagery.
///
/// Each tile runs one chain of requests at doubling resolution. Restarting a
/// tile or retiring it bumps its generation, so responses of the old chain
/// are rejected when they arrive.
#[derive(Debug, Default)]
pub struct TextureResolver {
    config: ResolverConfig,
    generations: Generations<TileId>,
    targets: BTreeMap<TileId, Target>,
    issued: u64,
}

impl TextureResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> ResolverConfig {
        self.config
    }

    /// Total requests handed out since construction.
    pub fn issued(&self) -> u64 {
        self.issued
    }

    /// Starts (or restarts) the chain for `tile`. Tiles without an imagery
    /// template have nothing to fetch.
    pub fn start(&mut self, tile: &Tile) -> Option<TextureRequest> {
        let template = tile.url_template.clone()?;
        let generation = self.generations.bump(&tile.id);
        self.targets.insert(
            tile.id,
            Target {
                template,
                extent: tile.extent,
            },
        );
        let size = self.config.start_resolution;
        self.request(tile.id, size, size, generation)
    }

    /// Records a successful load and yields the next refinement step.
    pub fn on_loaded(&mut self, req: &TextureRequest) -> TextureOutcome {
        if !self.generations.is_current(&req.tile, req.generation) {
            return TextureOutcome::Stale;
        }
        let next = match (req.width.checked_mul(2), req.height.checked_mul(2)) {
            (Some(w), Some(h)) if h <= self.config.max_resolution => {
                self.request(req.tile, w, h, req.generation)
            }
            _ => {
                debug!(tile = req.tile.0, height = req.height, "texture refinement complete");
                None
            }
        };
        TextureOutcome::Apply { next }
    }

    /// Logs a failed load. The tile keeps whatever texture it already has and
    /// the chain ends; there is no retry.
    pub fn on_failed(&mut self, req: &TextureRequest, err: &dyn fmt::Display) {
        error!(tile = req.tile.0, url = %req.url, "imagery request failed: {err}");
    }

    pub fn retire(&mut self, tile: TileId) {
        self.generations.retire(&tile);
        self.targets.remove(&tile);
    }

    /// Drops every chain. In-flight responses become stale.
    pub fn retire_all(&mut self) {
        self.generations.retire_all();
        self.targets.clear();
    }

    fn request(
        &mut self,
        tile: TileId,
        width: u32,
        height: u32,
        generation: Generation,
    ) -> Option<TextureRequest> {
        let target = self.targets.get(&tile)?;
        self.issued += 1;
        Some(TextureRequest {
            tile,
            width,
            height,
            url: imagery_url(&target.template, width, height, &target.extent),
            generation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ResolverConfig, TextureOutcome, TextureResolver};
    use foundation::bounds::Extent;
    use foundation::ids::TileId;
    use foundation::math::Vec2;
    use layers::tiles::Tile;

    fn tile(id: u32, template: Option<&str>) -> Tile {
        Tile {
            id: TileId(id),
            extent: Extent::new(0.0, 0.0, 1000.0, 1000.0),
            row: 0,
            column: 0,
            scene_center: Vec2::new(0.0, 0.0),
            scene_size: Vec2::new(100.0, 100.0),
            url_template: template.map(str::to_string),
        }
    }

    #[test]
    fn refinement_issues_three_requests_then_stops() {
        let mut r = TextureResolver::new(ResolverConfig::default());
        let mut req = r.start(&tile(0, Some("http://wms/map?width=1&height=1"))).expect("start");
        let mut heights = vec![req.height];
        loop {
            match r.on_loaded(&req) {
                TextureOutcome::Apply { next: Some(next) } => {
                    heights.push(next.height);
                    req = next;
                }
                TextureOutcome::Apply { next: None } => break,
                TextureOutcome::Stale => panic!("chain went stale"),
            }
        }
        assert_eq!(heights, vec![256, 512, 1024]);
        assert_eq!(r.issued(), 3);
        assert!(req.url.contains("width=1024&height=1024"));
        assert!(req.url.ends_with("bbox=0,0,1000,1000"));
    }

    #[test]
    fn restart_rejects_old_chain() {
        let mut r = TextureResolver::default();
        let t = tile(3, Some("http://wms/{width}/{height}"));
        let old = r.start(&t).expect("start");
        let fresh = r.start(&t).expect("restart");
        assert_eq!(r.on_loaded(&old), TextureOutcome::Stale);
        assert!(matches!(r.on_loaded(&fresh), TextureOutcome::Apply { .. }));
    }

    #[test]
    fn retired_tiles_reject_completions() {
        let mut r = TextureResolver::new(ResolverConfig {
            start_resolution: 256,
            max_resolution: 1024,
        });
        let req = r.start(&tile(1, Some("http://wms"))).expect("start");
        r.retire_all();
        assert_eq!(r.on_loaded(&req), TextureOutcome::Stale);
    }

    #[test]
    fn tiles_without_imagery_are_not_requested() {
        let mut r = TextureResolver::default();
        assert!(r.start(&tile(2, None)).is_none());
        assert_eq!(r.issued(), 0);
    }

    #[test]
    fn failure_does_not_disturb_siblings() {
        let mut r = TextureResolver::default();
        let a = r.start(&tile(1, Some("http://wms"))).expect("a");
        let b = r.start(&tile(2, Some("http://wms"))).expect("b");
        r.on_failed(&a, &"connection refused");
        assert!(matches!(r.on_loaded(&b), TextureOutcome::Apply { next: Some(_) }));
    }
}
