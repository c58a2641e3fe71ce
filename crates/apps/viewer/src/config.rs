use std::env;
use std::fmt;
use std::path::PathBuf;

use clap::Parser;
use formats::address::DEFAULT_SRID;
use formats::view_params::ViewParams;
use layers::tiles::{MAX_GRID, MAX_RADIUS};
use layers::query::PropertyFilter;
use layers::symbology::LayerStyle;
use scene::components::parse_hex_color;
use streaming::texture::ResolverConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless viewer for exported 3D GIS projects")]
pub struct Args {
    /// Project JSON to load
    #[arg(long)]
    pub project: PathBuf,

    /// Imagery URL template ({width}/{height} placeholders, or width=/height= params)
    #[arg(long)]
    pub imagery_url: Option<String>,

    /// GML building endpoint used for per-tile loads
    #[arg(long)]
    pub buildings_url: Option<String>,

    /// GeoJSON feature endpoint fetched once over the base extent
    #[arg(long)]
    pub features_url: Option<String>,

    /// Address lookup base URL
    #[arg(long)]
    pub address_url: Option<String>,

    #[arg(long, default_value_t = DEFAULT_SRID)]
    pub srid: u32,

    /// Tiles per side of the base grid
    #[arg(long, default_value_t = 1)]
    pub grid: u32,

    /// Neighbor rings around a single center tile
    #[arg(long, default_value_t = 2)]
    pub radius: u32,

    #[arg(long, default_value_t = 256)]
    pub start_resolution: u32,

    #[arg(long, default_value_t = 1024)]
    pub max_resolution: u32,

    /// Query string / fragment with view parameters (cx,cy,cz,tx,ty,tz,ux,uy,uz,width,height)
    #[arg(long)]
    pub view: Option<String>,

    /// Canvas size, WxH
    #[arg(long, default_value = "1280x720", value_parser = parse_canvas)]
    pub canvas: (u32, u32),

    /// Canvas click, x,y in pixels (repeatable)
    #[arg(long = "click", value_parser = parse_click)]
    pub clicks: Vec<(f64, f64)>,

    /// Focus the first feature whose attribute matches, KEY=VALUE
    #[arg(long, value_parser = parse_search)]
    pub search: Option<PropertyFilter>,

    /// Layer style edit, NAME:key=value[,key=value] with keys visible, opacity, color, height
    #[arg(long = "style", value_parser = parse_style)]
    pub styles: Vec<StyleEdit>,

    /// Highlight color for the selection, #RRGGBB
    #[arg(long, value_parser = parse_color)]
    pub selection_color: Option<u32>,

    /// Frames to run before exiting
    #[arg(long, default_value_t = 120)]
    pub frames: u64,

    /// Write a PNG snapshot of the final view
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Draw every layer and tile as triangle edges only
    #[arg(long)]
    pub wireframe: bool,

    /// Leave the snapshot background transparent
    #[arg(long)]
    pub no_sky: bool,

    /// Export the project on exit
    #[arg(long)]
    pub save: Option<PathBuf>,
}

/// Runtime settings of one viewer session.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub imagery_url: Option<String>,
    pub buildings_url: Option<String>,
    pub features_url: Option<String>,
    pub address_url: Option<String>,
    pub srid: u32,
    pub grid: u32,
    pub radius: u32,
    pub resolver: ResolverConfig,
    pub view: ViewParams,
    pub canvas: (u32, u32),
    pub wireframe: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            imagery_url: None,
            buildings_url: None,
            features_url: None,
            address_url: None,
            srid: DEFAULT_SRID,
            grid: 1,
            radius: 2,
            resolver: ResolverConfig::default(),
            view: ViewParams::default(),
            canvas: (1280, 720),
            wireframe: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Grid(u32),
    Radius(u32),
    Resolution { start: u32, max: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Grid(n) => write!(f, "--grid {n} outside 1..={MAX_GRID}"),
            ConfigError::Radius(d) => write!(f, "--radius {d} above {MAX_RADIUS}"),
            ConfigError::Resolution { start, max } => {
                write!(f, "start resolution {start} exceeds max resolution {max}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Args {
    /// Flags win over `VIEWER_*` environment variables.
    pub fn config(&self) -> Result<ViewerConfig, ConfigError> {
        if self.grid == 0 || self.grid > MAX_GRID {
            return Err(ConfigError::Grid(self.grid));
        }
        if self.radius > MAX_RADIUS {
            return Err(ConfigError::Radius(self.radius));
        }
        if self.start_resolution == 0 || self.start_resolution > self.max_resolution {
            return Err(ConfigError::Resolution {
                start: self.start_resolution,
                max: self.max_resolution,
            });
        }

        let view = self.view.as_deref().map(ViewParams::parse).unwrap_or_default();
        Ok(ViewerConfig {
            imagery_url: or_env(&self.imagery_url, "VIEWER_IMAGERY_URL"),
            buildings_url: or_env(&self.buildings_url, "VIEWER_BUILDINGS_URL"),
            features_url: self.features_url.clone(),
            address_url: or_env(&self.address_url, "VIEWER_ADDRESS_URL"),
            srid: self.srid,
            grid: self.grid,
            radius: self.radius,
            resolver: ResolverConfig {
                start_resolution: self.start_resolution,
                max_resolution: self.max_resolution,
            },
            canvas: view.canvas().unwrap_or(self.canvas),
            wireframe: self.wireframe || view.wireframe,
            view,
        })
    }
}

fn or_env(flag: &Option<String>, key: &str) -> Option<String> {
    flag.clone().or_else(|| env::var(key).ok().filter(|v| !v.is_empty()))
}

/// Partial style override from the command line.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyleEdit {
    pub layer: String,
    pub visible: Option<bool>,
    pub opacity: Option<f32>,
    pub color: Option<u32>,
    pub height: Option<f64>,
}

impl StyleEdit {
    pub fn apply(&self, style: &mut LayerStyle) {
        if let Some(v) = self.visible {
            style.visible = v;
        }
        if let Some(o) = self.opacity {
            style.opacity = o.clamp(0.0, 1.0);
        }
        if self.color.is_some() {
            style.color = self.color;
        }
        if let Some(h) = self.height {
            style.height = h;
        }
    }
}

pub fn parse_canvas(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got {s:?}"))?;
    let w: u32 = w.trim().parse().map_err(|_| format!("bad width in {s:?}"))?;
    let h: u32 = h.trim().parse().map_err(|_| format!("bad height in {s:?}"))?;
    if w == 0 || h == 0 {
        return Err(format!("canvas must be non-empty, got {s:?}"));
    }
    Ok((w, h))
}

pub fn parse_click(s: &str) -> Result<(f64, f64), String> {
    let (x, y) = s.split_once(',').ok_or_else(|| format!("expected x,y, got {s:?}"))?;
    let x: f64 = x.trim().parse().map_err(|_| format!("bad x in {s:?}"))?;
    let y: f64 = y.trim().parse().map_err(|_| format!("bad y in {s:?}"))?;
    Ok((x, y))
}

pub fn parse_search(s: &str) -> Result<PropertyFilter, String> {
    let (k, v) = s.split_once('=').ok_or_else(|| format!("expected KEY=VALUE, got {s:?}"))?;
    if k.is_empty() {
        return Err(format!("empty key in {s:?}"));
    }
    Ok(PropertyFilter::eq(k, v))
}

pub fn parse_color(s: &str) -> Result<u32, String> {
    parse_hex_color(s).ok_or_else(|| format!("expected #RRGGBB, got {s:?}"))
}

pub fn parse_style(s: &str) -> Result<StyleEdit, String> {
    let (layer, rest) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("expected NAME:key=value, got {s:?}"))?;
    let mut edit = StyleEdit {
        layer: layer.to_string(),
        ..StyleEdit::default()
    };
    for pair in rest.split(',').filter(|p| !p.is_empty()) {
        let (k, v) = pair.split_once('=').ok_or_else(|| format!("bad style entry {pair:?}"))?;
        match k.trim() {
            "visible" => edit.visible = Some(v.parse().map_err(|_| format!("bad bool {v:?}"))?),
            "opacity" => edit.opacity = Some(v.parse().map_err(|_| format!("bad opacity {v:?}"))?),
            "color" => edit.color = Some(parse_color(v)?),
            "height" => edit.height = Some(v.parse().map_err(|_| format!("bad height {v:?}"))?),
            other => return Err(format!("unknown style key {other:?}")),
        }
    }
    Ok(edit)
}

#[cfg(test)]
mod tests {
    use super::{parse_canvas, parse_click, parse_style, Args, ConfigError};
    use clap::Parser;
    use layers::symbology::LayerStyle;
    use pretty_assertions::assert_eq;

    #[test]
    fn canvas_and_clicks_parse() {
        assert_eq!(parse_canvas("800x600"), Ok((800, 600)));
        assert!(parse_canvas("0x600").is_err());
        assert_eq!(parse_click("400, 300.5"), Ok((400.0, 300.5)));
        assert!(parse_click("400").is_err());
    }

    #[test]
    fn style_edits_apply_only_given_keys() {
        let edit = parse_style("Bygninger:opacity=0.5,color=#ff0000").expect("style");
        assert_eq!(edit.layer, "Bygninger");
        let mut style = LayerStyle::default();
        edit.apply(&mut style);
        assert_eq!(style.opacity, 0.5);
        assert_eq!(style.color, Some(0xff0000));
        assert!(style.visible);
        assert_eq!(style.height, 1.0);
        assert!(parse_style("x:weight=2").is_err());
    }

    #[test]
    fn view_canvas_overrides_flag() {
        let args = Args::parse_from([
            "viewer",
            "--project",
            "p.json",
            "--view",
            "index.html#cx=1&cy=2&cz=3&width=640&height=480",
        ]);
        let config = args.config().expect("config");
        assert_eq!(config.canvas, (640, 480));
        assert_eq!(config.view.camera.map(|c| c.z), Some(3.0));
        assert_eq!(config.resolver.max_resolution, 1024);
        assert!(!config.wireframe);
    }

    #[test]
    fn wireframe_from_flag_or_view() {
        let flag = Args::parse_from(["viewer", "--project", "p.json", "--wireframe"]);
        assert!(flag.config().expect("config").wireframe);

        let view = Args::parse_from(["viewer", "--project", "p.json", "--view", "#wireframe"]);
        assert!(view.config().expect("config").wireframe);
    }

    #[test]
    fn grid_and_radius_are_bounded() {
        let config = |extra: &[&str]| {
            let mut argv = vec!["viewer", "--project", "p.json"];
            argv.extend_from_slice(extra);
            Args::parse_from(argv).config()
        };
        assert_eq!(config(&["--grid", "0"]), Err(ConfigError::Grid(0)));
        assert_eq!(config(&["--grid", "70000"]), Err(ConfigError::Grid(70000)));
        assert_eq!(config(&["--radius", "65"]), Err(ConfigError::Radius(65)));
        assert_eq!(config(&["--grid", "256", "--radius", "64"]).map(|c| c.grid), Ok(256));
    }

    #[test]
    fn bad_resolution_is_rejected() {
        let args = Args::parse_from([
            "viewer",
            "--project",
            "p.json",
            "--start-resolution",
            "2048",
        ]);
        assert_eq!(
            args.config(),
            Err(ConfigError::Resolution {
                start: 2048,
                max: 1024
            })
        );
    }
}
