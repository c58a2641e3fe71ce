use earcutr::earcut;
use foundation::math::Vec2;
use scene::components::Mesh;
use tracing::debug;

/// Marker mesh used for point features, before footprint scaling.
pub const MARKER_RADIUS: f64 = 5.0;
pub const MARKER_HEIGHT: f64 = 20.0;
const MARKER_SEGMENTS: u32 = 12;

/// Prism of unit height over a polygon footprint.
///
/// `rings[0]` is the outer ring, the rest are holes; all in the caller's
/// local plane. The top sits at `z = 1` so callers set the extrusion height
/// through `Transform::scale.z`. Returns `None` when the footprint does not
/// triangulate.
pub fn extrude_polygon(rings: &[Vec<Vec2>]) -> Option<Mesh> {
    let rings: Vec<Vec<Vec2>> = rings
        .iter()
        .map(|r| open_ring(r))
        .filter(|r| r.len() >= 3)
        .collect();
    if rings.is_empty() {
        return None;
    }

    let mut coords = Vec::new();
    let mut holes = Vec::new();
    for (i, ring) in rings.iter().enumerate() {
        if i > 0 {
            holes.push(coords.len() / 2);
        }
        for p in ring {
            coords.push(p.x);
            coords.push(p.y);
        }
    }

    let triangles = match earcut(&coords, &holes, 2) {
        Ok(ix) if !ix.is_empty() => ix,
        Ok(_) => return None,
        Err(_) => {
            debug!(vertices = coords.len() / 2, "polygon triangulation failed");
            return None;
        }
    };

    let n = (coords.len() / 2) as u32;
    let mut positions = Vec::with_capacity(n as usize * 4);
    for z in [0.0f32, 1.0] {
        for pair in coords.chunks_exact(2) {
            positions.push([pair[0] as f32, pair[1] as f32, z]);
        }
    }

    let mut indices = Vec::with_capacity(triangles.len() * 2 + n as usize * 6);
    for tri in triangles.chunks_exact(3) {
        let (a, b, c) = (tri[0] as u32, tri[1] as u32, tri[2] as u32);
        indices.extend_from_slice(&[n + a, n + b, n + c]);
        indices.extend_from_slice(&[a, c, b]);
    }

    let mut start = 0u32;
    for ring in &rings {
        let len = ring.len() as u32;
        for i in 0..len {
            let b0 = start + i;
            let b1 = start + (i + 1) % len;
            indices.extend_from_slice(&[b0, b1, n + b1, b0, n + b1, n + b0]);
        }
        start += len;
    }

    Some(Mesh::new(positions, indices))
}

/// Marker cylinders at each `offsets` point merged into one mesh.
pub fn marker_mesh(offsets: &[Vec2]) -> Mesh {
    let unit = Mesh::cylinder(MARKER_RADIUS, MARKER_HEIGHT, MARKER_SEGMENTS);
    let mut out = Mesh::default();
    for o in offsets {
        let base = out.positions.len() as u32;
        out.positions.extend(
            unit.positions
                .iter()
                .map(|p| [p[0] + o.x as f32, p[1] + o.y as f32, p[2]]),
        );
        out.indices.extend(unit.indices.iter().map(|i| base + i));
    }
    out
}

fn open_ring(ring: &[Vec2]) -> Vec<Vec2> {
    let mut pts = ring.to_vec();
    if pts.len() >= 2 {
        let (first, last) = (pts[0], pts[pts.len() - 1]);
        if (first.x - last.x).abs() < 1e-9 && (first.y - last.y).abs() < 1e-9 {
            pts.pop();
        }
    }
    pts
}
