//! Map <-> scene coordinate transform.
//!
//! Scene space is a uniformly scaled copy of map space centred on the base
//! extent, with an independent vertical exaggeration and shift. An optional
//! planar rotation (degrees, counter-clockwise) is applied about the extent
//! centre before scaling.

use std::fmt;

use super::{Vec2, Vec3};
use crate::bounds::Extent;

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionError {
    DegenerateExtent(Extent),
    InvalidParameter { name: &'static str, value: f64 },
}

impl fmt::Display for ProjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionError::DegenerateExtent(e) => write!(
                f,
                "degenerate extent [{}, {}, {}, {}]: width and height must be positive",
                e.xmin, e.ymin, e.xmax, e.ymax
            ),
            ProjectionError::InvalidParameter { name, value } => {
                write!(f, "invalid projection parameter {name}={value}")
            }
        }
    }
}

impl std::error::Error for ProjectionError {}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneProjection {
    extent: Extent,
    origin: Vec3,
    width: f64,
    height: f64,
    scale: f64,
    z_exaggeration: f64,
    z_shift: f64,
    rotation_deg: f64,
}

impl SceneProjection {
    /// `scene_width` scene units span the extent's width; the scene height
    /// follows from the extent's aspect ratio.
    pub fn new(
        extent: Extent,
        scene_width: f64,
        z_exaggeration: f64,
        z_shift: f64,
        rotation_deg: f64,
    ) -> Result<Self, ProjectionError> {
        if extent.is_degenerate() {
            return Err(ProjectionError::DegenerateExtent(extent));
        }
        if !(scene_width.is_finite() && scene_width > 0.0) {
            return Err(ProjectionError::InvalidParameter {
                name: "width",
                value: scene_width,
            });
        }
        if !(z_exaggeration.is_finite() && z_exaggeration != 0.0) {
            return Err(ProjectionError::InvalidParameter {
                name: "zExaggeration",
                value: z_exaggeration,
            });
        }
        for (name, value) in [("zShift", z_shift), ("rotation", rotation_deg)] {
            if !value.is_finite() {
                return Err(ProjectionError::InvalidParameter { name, value });
            }
        }

        let scale = scene_width / extent.width();
        let center = extent.center();
        Ok(Self {
            extent,
            origin: Vec3::new(center.x, center.y, -z_shift),
            width: scene_width,
            height: scene_width * extent.height() / extent.width(),
            scale,
            z_exaggeration,
            z_shift,
            rotation_deg,
        })
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Map-space point that lands on the scene origin (vertical: `-zShift`).
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Scene units per map unit, horizontally.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Scene units per map unit, vertically.
    pub fn z_scale(&self) -> f64 {
        self.scale * self.z_exaggeration
    }

    pub fn z_exaggeration(&self) -> f64 {
        self.z_exaggeration
    }

    pub fn z_shift(&self) -> f64 {
        self.z_shift
    }

    pub fn rotation_deg(&self) -> f64 {
        self.rotation_deg
    }

    pub fn to_scene(&self, map: Vec3) -> Vec3 {
        let p = self.rotate(map.xy(), self.rotation_deg);
        Vec3::new(
            (p.x - self.origin.x) * self.scale,
            (p.y - self.origin.y) * self.scale,
            (map.z - self.origin.z) * self.z_scale(),
        )
    }

    pub fn to_map(&self, scene: Vec3) -> Vec3 {
        let p = Vec2::new(
            scene.x / self.scale + self.origin.x,
            scene.y / self.scale + self.origin.y,
        );
        let p = self.rotate(p, -self.rotation_deg);
        Vec3::new(p.x, p.y, scene.z / self.z_scale() + self.origin.z)
    }

    /// Horizontal-only forward transform.
    pub fn to_scene_xy(&self, map: Vec2) -> Vec2 {
        self.to_scene(Vec3::new(map.x, map.y, self.origin.z)).xy()
    }

    fn rotate(&self, p: Vec2, degrees: f64) -> Vec2 {
        if degrees == 0.0 {
            return p;
        }
        p.rotated_about(self.extent.center(), degrees)
    }
}

#[cfg(test)]
mod tests {
    use super::{ProjectionError, SceneProjection};
    use crate::bounds::Extent;
    use crate::math::{Vec3, approx_eq};

    fn assert_vec_close(a: Vec3, b: Vec3) {
        assert!(
            approx_eq(a.x, b.x, 1e-6) && approx_eq(a.y, b.y, 1e-6) && approx_eq(a.z, b.z, 1e-6),
            "expected {a:?} ~= {b:?}"
        );
    }

    fn projection(rotation: f64) -> SceneProjection {
        SceneProjection::new(
            Extent::new(720_000.0, 6_170_000.0, 726_000.0, 6_174_000.0),
            100.0,
            1.5,
            12.0,
            rotation,
        )
        .expect("projection")
    }

    #[test]
    fn scale_and_height_follow_extent() {
        let p = SceneProjection::new(Extent::new(0.0, 0.0, 1000.0, 500.0), 100.0, 2.0, 0.0, 0.0)
            .expect("projection");
        assert_eq!(p.scale(), 0.1);
        assert_eq!(p.height(), 50.0);
        assert_eq!(p.z_scale(), 0.2);
    }

    #[test]
    fn extent_center_maps_to_scene_origin() {
        let p = projection(0.0);
        let s = p.to_scene(Vec3::new(723_000.0, 6_172_000.0, -12.0));
        assert_vec_close(s, Vec3::ZERO);
    }

    #[test]
    fn round_trip_over_rotations() {
        let points = [
            Vec3::new(720_000.0, 6_170_000.0, 0.0),
            Vec3::new(725_431.25, 6_173_999.5, 87.5),
            Vec3::new(719_000.0, 6_175_000.0, -3.0),
        ];
        let mut r = 0.0;
        while r < 360.0 {
            let proj = projection(r);
            for p in points {
                assert_vec_close(proj.to_map(proj.to_scene(p)), p);
            }
            r += 22.5;
        }
    }

    #[test]
    fn zero_rotation_is_identity_rotation() {
        let a = projection(0.0);
        let b = projection(360.0);
        let p = Vec3::new(721_234.5, 6_171_000.0, 4.0);
        assert_vec_close(a.to_scene(p), b.to_scene(p));
    }

    #[test]
    fn quarter_turn_rotates_counter_clockwise() {
        let p = SceneProjection::new(Extent::new(0.0, 0.0, 100.0, 100.0), 100.0, 1.0, 0.0, 90.0)
            .expect("projection");
        // (60, 50) is 10 east of the centre; a quarter turn puts it 10 north.
        let s = p.to_scene(Vec3::new(60.0, 50.0, 0.0));
        assert_vec_close(s, Vec3::new(0.0, 10.0, 0.0));
    }

    #[test]
    fn degenerate_extent_fails_fast() {
        let err = SceneProjection::new(Extent::new(10.0, 0.0, 10.0, 5.0), 100.0, 1.0, 0.0, 0.0)
            .expect_err("degenerate");
        assert!(matches!(err, ProjectionError::DegenerateExtent(_)));
    }

    #[test]
    fn rejects_zero_exaggeration() {
        let err = SceneProjection::new(Extent::new(0.0, 0.0, 1.0, 1.0), 100.0, 0.0, 0.0, 0.0)
            .expect_err("invalid");
        assert!(matches!(
            err,
            ProjectionError::InvalidParameter {
                name: "zExaggeration",
                ..
            }
        ));
    }
}
