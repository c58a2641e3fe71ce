use image::{Rgba, RgbaImage};
use scene::picking::{pick_screen, PickHit, PickOptions};

use crate::app::AppContext;

/// Barycentric weight below which a wireframe sample lies on an edge.
const WIRE_EDGE: f64 = 0.04;

/// Ray-cast raster of the current view, `cols` x `rows` samples across the
/// canvas. Tile planes show their imagery once loaded; everything else is
/// drawn in its flat material color. Misses stay transparent, as do
/// wireframe surfaces away from their triangle edges.
pub fn render(ctx: &AppContext, cols: u32, rows: u32) -> RgbaImage {
    let viewport = ctx.viewport();
    let (sx, sy) = (viewport.width / cols as f64, viewport.height / rows as f64);

    RgbaImage::from_fn(cols, rows, |c, r| {
        let x = (c as f64 + 0.5) * sx;
        let y = (r as f64 + 0.5) * sy;
        pick_screen(ctx.world(), ctx.camera(), viewport, x, y, PickOptions::default())
            .map_or(Rgba([0, 0, 0, 0]), |hit| shade(ctx, &hit))
    })
}

fn shade(ctx: &AppContext, hit: &PickHit) -> Rgba<u8> {
    let world = ctx.world();
    let wireframe = world.material(hit.entity).is_some_and(|m| m.wireframe);
    if wireframe && hit.edge.is_some_and(|e| e > WIRE_EDGE) {
        return Rgba([0, 0, 0, 0]);
    }
    if let Some(texel) = sample_tile(ctx, hit) {
        return texel;
    }
    let Some(material) = world.material(hit.entity) else {
        return Rgba([255, 255, 255, 255]);
    };
    let [r, g, b] = [
        (material.color >> 16) as u8,
        (material.color >> 8) as u8,
        material.color as u8,
    ];
    let a = (material.opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba([r, g, b, a])
}

/// Imagery texel under `hit` when it landed on a textured tile. Image rows
/// run north to south.
fn sample_tile(ctx: &AppContext, hit: &PickHit) -> Option<Rgba<u8>> {
    let world = ctx.world();
    let tile = world.tile_ref(hit.entity)?;
    let image = ctx.texture(tile.tile)?;
    let bounds = world.world_bounds(hit.entity)?;

    let w = bounds.max[0] - bounds.min[0];
    let h = bounds.max[1] - bounds.min[1];
    if w <= 0.0 || h <= 0.0 || image.width() == 0 || image.height() == 0 {
        return None;
    }
    let u = ((hit.point.x - bounds.min[0]) / w).clamp(0.0, 1.0);
    let v = 1.0 - ((hit.point.y - bounds.min[1]) / h).clamp(0.0, 1.0);
    let px = (u * (image.width() - 1) as f64).round() as u32;
    let py = (v * (image.height() - 1) as f64).round() as u32;
    Some(*image.get_pixel(px, py))
}
