use std::collections::BTreeMap;
use std::path::Path;

use formats::address::{parse_address, reverse_url, ADDRESS_KEY};
use formats::geojson::parse_feature_collection;
use formats::gml::parse_buildings;
use formats::project_file::ProjectFile;
use formats::scene_ingest::{ingest, layer_kind_of, IngestOptions, SourceFeature};
use formats::snapshot::{save_png, SnapshotError, SnapshotOptions};
use formats::view_params::current_view_fragment;
use foundation::ids::{FeatureTag, LayerId, TileId};
use image::RgbaImage;
use layers::query::{find_feature, focus_point, PropertyFilter, QueryReport};
use layers::rise::RiseAnimations;
use layers::symbology::{apply_style, LayerStyle};
use layers::{Layer, LayerKind, Project, ProjectError};
use runtime::frame::Frame;
use scene::camera::{Camera, Viewport};
use scene::components::Texture;
use scene::picking::{pick_screen, PickOptions};
use scene::selection::{ClickOutcome, HighlightController, SelectionState};
use scene::World;
use streaming::client::{fetch_image, fetch_text, Backend, FetchError};
use streaming::features::{FeatureRequest, TileFeatureLoads};
use streaming::request::features_url;
use streaming::texture::{TextureOutcome, TextureRequest, TextureResolver};
use tracing::{debug, error, info, warn};

use crate::config::ViewerConfig;
use crate::render;

pub const FRAME_RATE: f64 = 60.0;
/// Name of the layer filled from the startup feature endpoint.
pub const FEATURES_LAYER: &str = "Features";
/// Snapshots are rendered at `1 / SNAPSHOT_DOWNSAMPLE` of the output size.
pub const SNAPSHOT_DOWNSAMPLE: u32 = 8;

/// Network work requested by the context.
#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    Texture(TextureRequest),
    TileFeatures(FeatureRequest),
    Address { tag: FeatureTag, url: String },
    Layer { name: String, url: String },
}

impl Job {
    pub fn url(&self) -> &str {
        match self {
            Job::Texture(req) => &req.url,
            Job::TileFeatures(req) => &req.url,
            Job::Address { url, .. } | Job::Layer { url, .. } => url,
        }
    }
}

/// A finished job, successful or not.
#[derive(Debug)]
pub enum Completion {
    Texture(TextureRequest, Result<RgbaImage, FetchError>),
    TileFeatures(FeatureRequest, Result<String, FetchError>),
    Address {
        tag: FeatureTag,
        url: String,
        result: Result<String, FetchError>,
    },
    Layer {
        name: String,
        url: String,
        result: Result<String, FetchError>,
    },
}

pub async fn fetch<B: Backend>(backend: &B, job: Job) -> Completion {
    match job {
        Job::Texture(req) => {
            let result = fetch_image(backend, &req.url).await;
            Completion::Texture(req, result)
        }
        Job::TileFeatures(req) => {
            let result = fetch_text(backend, &req.url).await;
            Completion::TileFeatures(req, result)
        }
        Job::Address { tag, url } => {
            let result = fetch_text(backend, &url).await;
            Completion::Address { tag, url, result }
        }
        Job::Layer { name, url } => {
            let result = fetch_text(backend, &url).await;
            Completion::Layer { name, url, result }
        }
    }
}

/// All state of one viewer session.
///
/// Mutated only from the driver loop: user input through `click` and the
/// style/search calls, network results through `complete`, time through
/// `tick`. Methods that need the network return `Job`s instead of doing it.
#[derive(Debug)]
pub struct AppContext {
    config: ViewerConfig,
    project: Project,
    world: World,
    camera: Camera,
    viewport: Viewport,
    highlight: HighlightController,
    resolver: TextureResolver,
    feature_loads: TileFeatureLoads,
    rise: RiseAnimations,
    textures: BTreeMap<TileId, RgbaImage>,
    frame: Frame,
    popup: Option<QueryReport>,
    wireframe: bool,
}

impl AppContext {
    pub fn new(project: Project, world: World, config: ViewerConfig) -> Self {
        let mut camera = Camera::default();
        if let Some(p) = config.view.camera {
            camera.position = p;
        }
        if let Some(t) = config.view.target {
            camera.target = t;
        }
        if let Some(u) = config.view.up {
            camera.up = u;
        }
        let (w, h) = config.canvas;

        Self {
            viewport: Viewport::new(w as f64, h as f64),
            resolver: TextureResolver::new(config.resolver),
            config,
            project,
            world,
            camera,
            highlight: HighlightController::new(),
            feature_loads: TileFeatureLoads::new(),
            rise: RiseAnimations::new(),
            textures: BTreeMap::new(),
            frame: Frame::first(FRAME_RATE),
            popup: None,
            wireframe: false,
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn viewport_size(&self) -> (u32, u32) {
        self.config.canvas
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn selection(&self) -> SelectionState {
        self.highlight.state()
    }

    pub fn highlight(&self) -> &HighlightController {
        &self.highlight
    }

    /// The popup of the last click, if it produced one.
    pub fn popup(&self) -> Option<&QueryReport> {
        self.popup.as_ref()
    }

    /// Latest imagery applied to `tile`.
    pub fn texture(&self, tile: TileId) -> Option<&RgbaImage> {
        self.textures.get(&tile)
    }

    pub fn is_animating(&self) -> bool {
        self.rise.is_active()
    }

    pub fn wireframe(&self) -> bool {
        self.wireframe
    }

    /// Switches every layer and tile between filled and edge-only drawing.
    pub fn set_wireframe(&mut self, on: bool) {
        if on == self.wireframe {
            return;
        }
        self.wireframe = on;
        self.mark_wireframe();
        info!(wireframe = on, "wireframe mode");
    }

    /// Pushes the current mode onto every material except the highlight.
    fn mark_wireframe(&mut self) {
        let highlight = self.highlight.highlight_entity();
        let entities: Vec<_> = self.world.entities().filter(|e| Some(*e) != highlight).collect();
        for e in entities {
            if let Some(m) = self.world.material_mut(e) {
                m.wireframe = self.wireframe;
            }
        }
    }

    /// Tile grid plus the optional startup feature layer.
    pub fn startup(&mut self) -> Vec<Job> {
        let mut jobs = self.build_grid();
        if let Some(base) = &self.config.features_url {
            jobs.push(Job::Layer {
                name: FEATURES_LAYER.to_string(),
                url: features_url(base, &self.project.projection().extent()),
            });
        }
        jobs
    }

    /// Replaces the tile grid and starts imagery for every tile. Loads still
    /// in flight for the old grid are dropped when they land.
    pub fn build_grid(&mut self) -> Vec<Job> {
        self.resolver.retire_all();
        self.feature_loads.retire_all();
        self.textures.clear();

        let template = self.config.imagery_url.clone();
        let mut ids = match self
            .project
            .generate_tiles(&mut self.world, self.config.grid, template.as_deref())
        {
            Ok(ids) => ids,
            Err(err) => {
                error!("tile grid rejected: {err}");
                return Vec::new();
            }
        };
        if self.config.grid == 1 && self.config.radius > 0 {
            if let Some(&center) = ids.first() {
                match self.project.extend_grid(&mut self.world, center, self.config.radius) {
                    Ok(more) => ids.extend(more),
                    Err(err) => warn!("grid extension failed: {err}"),
                }
            }
        }
        info!(tiles = ids.len(), "tile grid built");
        self.mark_wireframe();

        ids.iter()
            .filter_map(|id| self.project.tile(*id))
            .filter_map(|tile| self.resolver.start(tile))
            .map(Job::Texture)
            .collect()
    }

    /// Handles a click at canvas pixel `(x, y)`.
    pub fn click(&mut self, x: f64, y: f64) -> Vec<Job> {
        let hit = pick_screen(&self.world, &self.camera, self.viewport, x, y, PickOptions::default());
        match self.highlight.click(&mut self.world, hit) {
            ClickOutcome::Selected { tag, point, .. } => {
                let map = self.project.projection().to_map(point);
                self.popup = self
                    .project
                    .layer(tag.layer)
                    .and_then(|layer| QueryReport::for_feature(layer, tag.feature, map));
                self.address_job(tag).into_iter().collect()
            }
            ClickOutcome::Deselected { .. } | ClickOutcome::Missed { .. } => {
                self.popup = None;
                Vec::new()
            }
            ClickOutcome::Tile { tile, point, .. } => {
                let map = self.project.projection().to_map(point);
                self.popup = Some(QueryReport::for_point(map));
                match &self.config.buildings_url {
                    Some(base) => {
                        let req = self.feature_loads.request(tile.tile, base, &tile.extent);
                        info!(tile = tile.tile.0, row = tile.row, column = tile.column, "loading tile features");
                        vec![Job::TileFeatures(req)]
                    }
                    None => Vec::new(),
                }
            }
        }
    }

    fn address_job(&self, tag: FeatureTag) -> Option<Job> {
        let base = self.config.address_url.as_deref()?;
        let feature = self.project.layer(tag.layer)?.feature(tag.feature)?;
        if feature.attributes.get(ADDRESS_KEY).is_some() {
            return None;
        }
        Some(Job::Address {
            tag,
            url: reverse_url(base, feature.center.x, feature.center.y, self.config.srid),
        })
    }

    /// Applies a finished job and returns the follow-up work.
    pub fn complete(&mut self, completion: Completion) -> Vec<Job> {
        match completion {
            Completion::Texture(req, Ok(image)) => match self.resolver.on_loaded(&req) {
                TextureOutcome::Stale => Vec::new(),
                TextureOutcome::Apply { next } => {
                    self.apply_texture(&req, image);
                    next.map(Job::Texture).into_iter().collect()
                }
            },
            Completion::Texture(req, Err(err)) => {
                self.resolver.on_failed(&req, &err);
                Vec::new()
            }
            Completion::TileFeatures(req, result) => {
                if !self.feature_loads.accept(&req) {
                    return Vec::new();
                }
                match result {
                    Ok(xml) => self.load_tile_features(&req, &xml),
                    Err(err) => error!(tile = req.tile.0, url = %req.url, "feature request failed: {err}"),
                }
                Vec::new()
            }
            Completion::Address { tag, url, result } => {
                match result {
                    Ok(json) => self.apply_address(tag, &json),
                    Err(err) => error!(%url, "address lookup failed: {err}"),
                }
                Vec::new()
            }
            Completion::Layer { name, url, result } => {
                match result {
                    Ok(json) => match parse_feature_collection(&json) {
                        Ok(features) => {
                            self.add_feature_layer(&name, Some(url), features, &IngestOptions::default());
                        }
                        Err(err) => error!(%url, "feature collection rejected: {err}"),
                    },
                    Err(err) => error!(%url, "feature request failed: {err}"),
                }
                Vec::new()
            }
        }
    }

    fn apply_texture(&mut self, req: &TextureRequest, image: RgbaImage) {
        let Some(entity) = self.project.tile_entity(req.tile) else {
            debug!(tile = req.tile.0, "texture for a tile that is gone");
            return;
        };
        if let Some(material) = self.world.material_mut(entity) {
            material.texture = Some(Texture {
                source: req.url.clone(),
                width: image.width(),
                height: image.height(),
            });
        }
        self.textures.insert(req.tile, image);
    }

    fn load_tile_features(&mut self, req: &FeatureRequest, xml: &str) {
        let features = match parse_buildings(xml) {
            Ok(f) => f,
            Err(err) => {
                error!(tile = req.tile.0, url = %req.url, "building document rejected: {err}");
                return;
            }
        };
        let Some(tile) = self.project.tile(req.tile) else {
            return;
        };
        let name = format!("Bygninger {},{}", tile.row, tile.column);

        // A reload of the same tile replaces its buildings.
        if let Some(old) = self.project.layer_by_name(&name).map(|l| l.id) {
            if let Err(err) = self.remove_layer(old) {
                warn!("could not replace {name}: {err}");
            }
        }
        self.add_feature_layer(&name, Some(req.url.clone()), features, &IngestOptions::buildings());
    }

    /// Creates a layer from `features`, styles it and starts its rise.
    pub fn add_feature_layer(
        &mut self,
        name: &str,
        url: Option<String>,
        features: Vec<SourceFeature>,
        opts: &IngestOptions,
    ) -> Option<LayerId> {
        let kind = if features.is_empty() {
            LayerKind::Polygon
        } else {
            layer_kind_of(&features)
        };
        let id = self.project.add_layer(&mut self.world, name, kind);
        if let Some(layer) = self.project.layer_mut(id) {
            layer.url = url;
        }

        match ingest(&mut self.project, &mut self.world, id, features, opts) {
            Ok(report) => info!(
                layer = %id,
                layer_name = name,
                features = report.ingested.len(),
                skipped = report.skipped.len(),
                "layer loaded"
            ),
            Err(err) => {
                error!(layer = %id, "ingest failed: {err}");
                return None;
            }
        }

        let layer = self.project.layer(id)?;
        apply_style(&mut self.world, layer);
        self.rise.start(&mut self.world, layer);
        self.mark_wireframe();
        Some(id)
    }

    fn apply_address(&mut self, tag: FeatureTag, json: &str) {
        let address = match parse_address(json) {
            Ok(a) => a,
            Err(err) => {
                warn!(%tag, "address lookup: {err}");
                return;
            }
        };
        let label = address.label();
        let Some(feature) = self
            .project
            .layer_mut(tag.layer)
            .and_then(|l| l.feature_mut(tag.feature))
        else {
            debug!(%tag, "address for a feature that is gone");
            return;
        };
        feature.attributes.insert(ADDRESS_KEY, label.as_str());
        if let Some(color) = address.accuracy.color() {
            if let Some(m) = self.world.material_mut(feature.entity) {
                m.color = color;
            }
        }

        if self.highlight.selected() == Some(tag) {
            if let Some(popup) = &mut self.popup {
                popup.rows.push((ADDRESS_KEY.to_string(), label));
            }
        }
    }

    /// Advances one render frame.
    pub fn tick(&mut self) -> Frame {
        self.frame = self.frame.next();
        self.rise.step(&mut self.world, self.frame);
        self.frame
    }

    /// Points the camera at the first feature matching `filter`.
    pub fn search(&mut self, filter: &PropertyFilter) -> Option<FeatureTag> {
        let tag = find_feature(&self.project, filter)?;
        let target = focus_point(&self.project, &self.world, tag)?;
        self.camera.focus(target);
        info!(%tag, "camera focused");
        Some(tag)
    }

    pub fn set_layer_style(&mut self, id: LayerId, style: LayerStyle) -> Result<(), ProjectError> {
        let layer = self.project.layer_mut(id).ok_or(ProjectError::UnknownLayer(id))?;
        layer.style = style;
        if !style.visible {
            self.highlight.clear_if_layer(&mut self.world, id);
            if self.highlight.selected().is_none() {
                self.popup = None;
            }
        }
        let layer = self.project.layer(id).ok_or(ProjectError::UnknownLayer(id))?;
        apply_style(&mut self.world, layer);
        Ok(())
    }

    pub fn set_selection_color(&mut self, color: u32) {
        self.highlight.set_highlight_color(&mut self.world, color);
    }

    pub fn remove_layer(&mut self, id: LayerId) -> Result<Layer, ProjectError> {
        if self.highlight.clear_if_layer(&mut self.world, id).is_some() {
            self.popup = None;
        }
        self.project.remove_layer(&mut self.world, id)
    }

    pub fn current_view(&self) -> String {
        current_view_fragment(self.camera.position, self.camera.target, self.camera.up, self.wireframe)
    }

    pub fn export(&self) -> ProjectFile {
        ProjectFile::from_project(&self.project, &self.world)
    }

    /// Renders the view and writes it as a PNG of `opts.width` x `opts.height`.
    pub fn save_snapshot(&self, path: impl AsRef<Path>, opts: SnapshotOptions) -> Result<(), SnapshotError> {
        let cols = (opts.width / SNAPSHOT_DOWNSAMPLE).max(1);
        let rows = (opts.height / SNAPSHOT_DOWNSAMPLE).max(1);
        save_png(path, &render::render(self, cols, rows), opts)
    }
}

#[cfg(test)]
mod tests {
    use super::{AppContext, Completion, Job};
    use crate::config::ViewerConfig;
    use formats::project_file::ProjectFile;
    use formats::scene_ingest::{IngestOptions, SourceFeature};
    use formats::snapshot::SnapshotOptions;
    use formats::view_params::ViewParams;
    use foundation::bounds::Extent;
    use foundation::ids::FeatureId;
    use foundation::math::{SceneProjection, Vec3};
    use image::{Rgba, RgbaImage};
    use layers::{Attributes, Geometry, LayerKind, Project};
    use pretty_assertions::assert_eq;
    use scene::selection::SelectionState;
    use scene::World;
    use streaming::client::FetchError;

    const TOP_DOWN: &str = "#cx=0&cy=0&cz=100&ux=0&uy=1&uz=0";

    fn context(config: ViewerConfig) -> AppContext {
        let projection = SceneProjection::new(Extent::new(0.0, 0.0, 1000.0, 1000.0), 100.0, 1.0, 0.0, 0.0)
            .expect("projection");
        let config = ViewerConfig {
            view: ViewParams::parse(TOP_DOWN),
            ..config
        };
        AppContext::new(Project::new("test", "EPSG:25832", projection), World::new(), config)
    }

    fn square(attrs: &[(&str, &str)]) -> SourceFeature {
        let mut attributes = Attributes::new();
        for (k, v) in attrs {
            attributes.insert(*k, *v);
        }
        let ring = vec![
            Vec3::new(480.0, 480.0, 0.0),
            Vec3::new(520.0, 480.0, 0.0),
            Vec3::new(520.0, 520.0, 0.0),
            Vec3::new(480.0, 520.0, 0.0),
        ];
        SourceFeature {
            attributes,
            geometry: Ok(Geometry::Polygon(vec![ring])),
        }
    }

    /// Runs frames until freshly added layers have risen into place.
    fn settle_rise(ctx: &mut AppContext) {
        for _ in 0..200 {
            ctx.tick();
        }
        assert!(!ctx.is_animating());
    }

    #[test]
    fn center_click_on_tile_reports_map_center() {
        let mut ctx = context(ViewerConfig {
            radius: 0,
            ..ViewerConfig::default()
        });
        ctx.startup();
        ctx.click(640.0, 360.0);
        let popup = ctx.popup().expect("popup");
        assert!(popup.coordinates.starts_with("500.00, 500.00"), "{}", popup.coordinates);
        assert!(popup.rows.is_empty());
    }

    #[test]
    fn tile_click_requests_scoped_buildings() {
        let mut ctx = context(ViewerConfig {
            radius: 0,
            buildings_url: Some("http://wfs/service?TYPENAME=kms:Bygning".into()),
            ..ViewerConfig::default()
        });
        ctx.startup();
        let jobs = ctx.click(640.0, 360.0);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].url(), "http://wfs/service?TYPENAME=kms:Bygning&Bbox=0,0,1000,1000");
    }

    #[test]
    fn feature_click_selects_then_toggles_off() {
        let mut ctx = context(ViewerConfig {
            radius: 0,
            ..ViewerConfig::default()
        });
        ctx.startup();
        let id = ctx
            .add_feature_layer("Bygninger", None, vec![square(&[("FOTID", "7")])], &IngestOptions::default())
            .expect("layer");
        settle_rise(&mut ctx);

        ctx.click(640.0, 360.0);
        assert!(matches!(ctx.selection(), SelectionState::Selected(tag) if tag.layer == id));
        let popup = ctx.popup().expect("popup");
        assert_eq!(popup.layer_name, "Bygninger");
        assert_eq!(popup.rows, vec![("FOTID".to_string(), "7".to_string())]);
        assert!(ctx.highlight().highlight_entity().is_some());

        ctx.click(640.0, 360.0);
        assert_eq!(ctx.selection(), SelectionState::Idle);
        assert!(ctx.highlight().highlight_entity().is_none());
        assert!(ctx.popup().is_none());
    }

    #[test]
    fn selection_triggers_address_lookup_and_recolor() {
        let mut ctx = context(ViewerConfig {
            radius: 0,
            address_url: Some("http://dawa.aws.dk".into()),
            ..ViewerConfig::default()
        });
        ctx.startup();
        let id = ctx
            .add_feature_layer("Bygninger", None, vec![square(&[])], &IngestOptions::default())
            .expect("layer");
        settle_rise(&mut ctx);
        let jobs = ctx.click(640.0, 360.0);
        let Some(Job::Address { tag, url }) = jobs.into_iter().next() else {
            panic!("expected an address lookup");
        };
        assert_eq!(url, "http://dawa.aws.dk/adgangsadresser/reverse?x=500&y=500&srid=25832");

        let body = r#"{"vejstykke":{"adresseringsnavn":"Vestergade"},"husnr":"12","postnummer":{"nr":"8000"},"adgangspunkt":{"nøjagtighed":"B"}}"#;
        ctx.complete(Completion::Address {
            tag,
            url,
            result: Ok(body.to_string()),
        });

        let layer = ctx.project().layer(id).expect("layer");
        let feature = layer.feature(tag.feature).expect("feature");
        assert_eq!(
            feature.attributes.get("Adresse").map(|v| v.to_string()),
            Some("Vestergade 12, 8000".to_string())
        );
        assert_eq!(ctx.world().material(feature.entity).map(|m| m.color), Some(0xffff00));
        let popup = ctx.popup().expect("popup");
        assert_eq!(popup.rows.last().map(|(k, _)| k.as_str()), Some("Adresse"));
    }

    #[test]
    fn failed_texture_keeps_tile_untextured() {
        let mut ctx = context(ViewerConfig {
            radius: 0,
            imagery_url: Some("http://wms/map".into()),
            ..ViewerConfig::default()
        });
        let jobs = ctx.startup();
        let Some(Job::Texture(req)) = jobs.into_iter().next() else {
            panic!("expected a texture request");
        };
        let tile = req.tile;
        let next = ctx.complete(Completion::Texture(
            req,
            Err(FetchError::Status {
                url: "http://wms/map".into(),
                status: 500,
            }),
        ));
        assert!(next.is_empty());
        assert!(ctx.texture(tile).is_none());
    }

    #[test]
    fn regenerated_grid_discards_old_textures() {
        let mut ctx = context(ViewerConfig {
            radius: 0,
            imagery_url: Some("http://wms/map".into()),
            ..ViewerConfig::default()
        });
        let old = ctx.startup();
        ctx.build_grid();
        let Some(Job::Texture(req)) = old.into_iter().next() else {
            panic!("expected a texture request");
        };
        let tile = req.tile;
        let image = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]));
        assert!(ctx.complete(Completion::Texture(req, Ok(image))).is_empty());
        assert!(ctx.texture(tile).is_none());
    }

    #[test]
    fn hidden_layer_drops_its_selection() {
        let mut ctx = context(ViewerConfig {
            radius: 0,
            ..ViewerConfig::default()
        });
        ctx.startup();
        let id = ctx
            .add_feature_layer("Bygninger", None, vec![square(&[])], &IngestOptions::default())
            .expect("layer");
        settle_rise(&mut ctx);
        ctx.click(640.0, 360.0);
        assert!(ctx.highlight().selected().is_some());

        let mut style = ctx.project().layer(id).expect("layer").style;
        style.visible = false;
        ctx.set_layer_style(id, style).expect("style");
        assert_eq!(ctx.selection(), SelectionState::Idle);

        // Hidden layers are not queryable; the click falls through to the tile.
        ctx.click(640.0, 360.0);
        assert_eq!(ctx.selection(), SelectionState::Idle);
        assert!(ctx.popup().is_some());
    }

    #[test]
    fn empty_feature_batch_still_creates_layer() {
        let mut ctx = context(ViewerConfig::default());
        let id = ctx
            .add_feature_layer("empty", None, Vec::new(), &IngestOptions::default())
            .expect("layer");
        let layer = ctx.project().layer(id).expect("layer");
        assert_eq!(layer.kind, LayerKind::Polygon);
        assert!(layer.is_empty());
    }

    #[test]
    fn wireframe_covers_every_layer_but_the_highlight() {
        let mut ctx = context(ViewerConfig {
            radius: 0,
            ..ViewerConfig::default()
        });
        ctx.startup();
        ctx.add_feature_layer("Bygninger", None, vec![square(&[("FOTID", "7")])], &IngestOptions::default())
            .expect("layer");
        settle_rise(&mut ctx);
        ctx.click(640.0, 360.0);
        let highlight = ctx.highlight().highlight_entity().expect("highlight");

        ctx.set_wireframe(true);
        let late = ctx
            .add_feature_layer("Senere", None, vec![square(&[("FOTID", "8")])], &IngestOptions::default())
            .expect("layer");
        let world = ctx.world();
        for e in world.entities().filter(|e| world.material(*e).is_some()) {
            assert_eq!(world.material(e).map(|m| m.wireframe), Some(e != highlight), "{e:?}");
        }
        let late_entity = ctx.project().layer(late).and_then(|l| l.feature(FeatureId(0))).map(|f| f.entity);
        assert_eq!(late_entity.and_then(|e| ctx.world().material(e)).map(|m| m.wireframe), Some(true));
        assert!(ctx.current_view().ends_with("&wireframe"));

        ctx.set_wireframe(false);
        let world = ctx.world();
        assert!(world.entities().all(|e| world.material(e).is_none_or(|m| !m.wireframe)));
        assert!(!ctx.current_view().contains("wireframe"));
    }

    #[test]
    fn snapshot_is_written_at_requested_size() {
        let mut ctx = context(ViewerConfig {
            radius: 0,
            ..ViewerConfig::default()
        });
        ctx.startup();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("view.png");
        ctx.save_snapshot(
            &path,
            SnapshotOptions {
                width: 64,
                height: 32,
                sky: true,
            },
        )
        .expect("snapshot");

        let written = image::open(&path).expect("png").to_rgba8();
        assert_eq!(written.dimensions(), (64, 32));
        assert!(written.pixels().all(|p| p.0[3] == 255));
    }

    #[test]
    fn exported_project_reloads() {
        let mut ctx = context(ViewerConfig {
            radius: 0,
            ..ViewerConfig::default()
        });
        ctx.startup();
        ctx.add_feature_layer("Bygninger", None, vec![square(&[("FOTID", "7")])], &IngestOptions::default())
            .expect("layer");

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("project.json");
        ctx.export().save(&path).expect("save");

        let mut world = World::new();
        let project = ProjectFile::load(&path)
            .expect("load")
            .into_project(&mut world)
            .expect("project");
        let layer = project.layer_by_name("Bygninger").expect("layer");
        assert_eq!(layer.len(), 1);
        assert_eq!(
            layer
                .feature(FeatureId(0))
                .and_then(|f| f.attributes.get("FOTID"))
                .map(|v| v.to_string()),
            Some("7".to_string())
        );
    }
}
