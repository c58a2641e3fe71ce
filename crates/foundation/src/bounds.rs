use crate::math::{Vec2, Vec3};

/// Axis-aligned rectangle in map coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Extent {
    pub const fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    pub fn from_array(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.xmin, self.ymin, self.xmax, self.ymax]
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            self.xmin + self.width() / 2.0,
            self.ymin + self.height() / 2.0,
        )
    }

    /// Zero (or negative) width or height, or any non-finite bound.
    pub fn is_degenerate(&self) -> bool {
        let finite = self.as_array().iter().all(|v| v.is_finite());
        !finite || self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.xmin && p.x <= self.xmax && p.y >= self.ymin && p.y <= self.ymax
    }

    pub fn union(&self, other: &Extent) -> Extent {
        Extent::new(
            self.xmin.min(other.xmin),
            self.ymin.min(other.ymin),
            self.xmax.max(other.xmax),
            self.ymax.max(other.ymax),
        )
    }

    /// Smallest extent covering `points`, or `None` when empty.
    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Option<Extent> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut e = Extent::new(first.x, first.y, first.x, first.y);
        for p in iter {
            e.xmin = e.xmin.min(p.x);
            e.ymin = e.ymin.min(p.y);
            e.xmax = e.xmax.max(p.x);
            e.ymax = e.ymax.max(p.y);
        }
        Some(e)
    }

    /// `xmin,ymin,xmax,ymax` with no spaces, as backends expect in `bbox=`.
    pub fn bbox_param(&self) -> String {
        format!("{},{},{},{}", self.xmin, self.ymin, self.xmax, self.ymax)
    }
}

/// Axis-aligned box in scene coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3 {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Aabb3 {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Aabb3 { min, max }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Aabb3> {
        let mut iter = points.into_iter();
        let first = iter.next()?.as_array();
        let mut b = Aabb3::new(first, first);
        for p in iter {
            b = b.expanded(p);
        }
        Some(b)
    }

    pub fn expanded(&self, p: Vec3) -> Aabb3 {
        let p = p.as_array();
        let mut out = *self;
        for axis in 0..3 {
            out.min[axis] = out.min[axis].min(p[axis]);
            out.max[axis] = out.max[axis].max(p[axis]);
        }
        out
    }

    pub fn union(&self, other: &Aabb3) -> Aabb3 {
        let mut out = *self;
        for axis in 0..3 {
            out.min[axis] = out.min[axis].min(other.min[axis]);
            out.max[axis] = out.max[axis].max(other.max[axis]);
        }
        out
    }

    pub fn intersects(&self, other: &Aabb3) -> bool {
        (0..3).all(|axis| self.min[axis] <= other.max[axis] && other.min[axis] <= self.max[axis])
    }

    pub fn contains(&self, p: Vec3) -> bool {
        let p = p.as_array();
        (0..3).all(|axis| p[axis] >= self.min[axis] && p[axis] <= self.max[axis])
    }

    pub fn center(&self) -> Vec3 {
        Vec3::new(
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        )
    }
}
