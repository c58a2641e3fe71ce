use foundation::bounds::Aabb3;
use foundation::math::Vec3;

/// Indexed triangle mesh in local coordinates.
///
/// Vertex data is single precision, like the GPU buffers it feeds; scene
/// placement stays in `f64` on the owning entity's `Transform`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new(positions: Vec<[f32; 3]>, indices: Vec<u32>) -> Self {
        Self { positions, indices }
    }

    /// Flat `width` x `height` rectangle in the XY plane, centred on the origin.
    pub fn quad(width: f64, height: f64) -> Self {
        let hw = (width / 2.0) as f32;
        let hh = (height / 2.0) as f32;
        Self::new(
            vec![[-hw, -hh, 0.0], [hw, -hh, 0.0], [hw, hh, 0.0], [-hw, hh, 0.0]],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    /// Closed cylinder standing on the XY plane along +Z.
    pub fn cylinder(radius: f64, height: f64, segments: u32) -> Self {
        let segments = segments.max(3);
        let r = radius as f32;
        let h = height as f32;
        let mut positions = Vec::with_capacity(segments as usize * 2 + 2);
        for i in 0..segments {
            let a = i as f32 / segments as f32 * std::f32::consts::TAU;
            let (s, c) = a.sin_cos();
            positions.push([r * c, r * s, 0.0]);
            positions.push([r * c, r * s, h]);
        }
        let bottom = positions.len() as u32;
        positions.push([0.0, 0.0, 0.0]);
        let top = positions.len() as u32;
        positions.push([0.0, 0.0, h]);

        let mut indices = Vec::with_capacity(segments as usize * 12);
        for i in 0..segments {
            let b0 = i * 2;
            let t0 = b0 + 1;
            let b1 = ((i + 1) % segments) * 2;
            let t1 = b1 + 1;
            indices.extend_from_slice(&[b0, b1, t1, b0, t1, t0]);
            indices.extend_from_slice(&[bottom, b1, b0]);
            indices.extend_from_slice(&[top, t0, t1]);
        }
        Self::new(positions, indices)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn local_bounds(&self) -> Option<Aabb3> {
        Aabb3::from_points(
            self.positions
                .iter()
                .map(|p| Vec3::new(p[0] as f64, p[1] as f64, p[2] as f64)),
        )
    }
}
