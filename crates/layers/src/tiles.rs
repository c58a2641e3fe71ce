use std::fmt;

use foundation::bounds::Extent;
use foundation::ids::TileId;
use foundation::math::{SceneProjection, Vec2};

/// Largest grid side `generate_tiles` accepts.
pub const MAX_GRID: u32 = 256;
/// Largest neighbor radius `extend_grid` accepts.
pub const MAX_RADIUS: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    Size(u32),
    Radius(u32),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::Size(n) => write!(f, "grid size {n} outside 1..={MAX_GRID}"),
            GridError::Radius(d) => write!(f, "grid radius {d} above {MAX_RADIUS}"),
        }
    }
}

impl std::error::Error for GridError {}

/// One grid cell: its map-space box, grid position and scene placement.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub id: TileId,
    pub extent: Extent,
    pub row: i32,
    pub column: i32,
    /// Scene-space center of the tile plane.
    pub scene_center: Vec2,
    pub scene_size: Vec2,
    /// Imagery URL template the tile's texture requests are built from.
    pub url_template: Option<String>,
}

/// Splits `extent` into an `n` x `n` grid, row-major from the south-west
/// corner. Ids count up from `first_id`.
///
/// Every tile's scene size is `(projection.width / n, projection.height / n)`.
pub fn generate_tiles(
    projection: &SceneProjection,
    extent: Extent,
    n: u32,
    url_template: Option<&str>,
    first_id: u32,
) -> Result<Vec<Tile>, GridError> {
    if n == 0 || n > MAX_GRID {
        return Err(GridError::Size(n));
    }
    let tile_w = extent.width() / n as f64;
    let tile_h = extent.height() / n as f64;
    let scene_size = Vec2::new(projection.width() / n as f64, projection.height() / n as f64);

    let mut out = Vec::with_capacity((n * n) as usize);
    for row in 0..n {
        for col in 0..n {
            let (r, c) = (row as f64, col as f64);
            let cell = Extent::new(
                extent.xmin + c * tile_w,
                extent.ymin + r * tile_h,
                extent.xmin + (c + 1.0) * tile_w,
                extent.ymin + (r + 1.0) * tile_h,
            );
            out.push(Tile {
                id: TileId(first_id + out.len() as u32),
                extent: cell,
                row: row as i32,
                column: col as i32,
                scene_center: projection.to_scene_xy(cell.center()),
                scene_size,
                url_template: url_template.map(str::to_string),
            });
        }
    }
    Ok(out)
}

/// Neighbors of `center` out to `radius` rings, skipping `(0, 0)`.
///
/// Neighbors are placed by whole multiples of the center's scene size and
/// cover map boxes offset by whole multiples of the center's map size.
pub fn extend_grid(center: &Tile, radius: u32, first_id: u32) -> Result<Vec<Tile>, GridError> {
    if radius > MAX_RADIUS {
        return Err(GridError::Radius(radius));
    }
    let d = radius as i32;
    let (w, h) = (center.extent.width(), center.extent.height());

    let mut out = Vec::new();
    for row in -d..=d {
        for col in -d..=d {
            if row == 0 && col == 0 {
                continue;
            }
            let (r, c) = (row as f64, col as f64);
            out.push(Tile {
                id: TileId(first_id + out.len() as u32),
                extent: Extent::new(
                    center.extent.xmin + c * w,
                    center.extent.ymin + r * h,
                    center.extent.xmax + c * w,
                    center.extent.ymax + r * h,
                ),
                row: center.row + row,
                column: center.column + col,
                scene_center: Vec2::new(
                    center.scene_center.x + c * center.scene_size.x,
                    center.scene_center.y + r * center.scene_size.y,
                ),
                scene_size: center.scene_size,
                url_template: center.url_template.clone(),
            });
        }
    }
    Ok(out)
}
