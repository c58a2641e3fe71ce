use foundation::math::Vec3;

use crate::picking::Ray;

/// Canvas size in pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f64 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

/// Perspective look-at camera in scene space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_deg: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, -100.0, 100.0),
            target: Vec3::ZERO,
            up: Vec3::Z,
            fov_y_deg: 45.0,
        }
    }
}

impl Camera {
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3) -> Self {
        Self {
            position,
            target,
            up,
            ..Self::default()
        }
    }

    /// Orthonormal `(forward, right, up)` basis, or `None` when position and
    /// target coincide or `up` is parallel to the view direction.
    pub fn basis(&self) -> Option<(Vec3, Vec3, Vec3)> {
        let forward = (self.target - self.position).normalized()?;
        let right = forward.cross(self.up).normalized()?;
        let up = right.cross(forward);
        Some((forward, right, up))
    }

    /// Ray through canvas pixel `(x_px, y_px)`; `(0, 0)` is the top-left corner.
    pub fn ray_from_screen(&self, viewport: Viewport, x_px: f64, y_px: f64) -> Option<Ray> {
        if viewport.width <= 0.0 || viewport.height <= 0.0 {
            return None;
        }
        let (forward, right, up) = self.basis()?;
        let ndc_x = x_px / viewport.width * 2.0 - 1.0;
        let ndc_y = -(y_px / viewport.height) * 2.0 + 1.0;
        let tan = (self.fov_y_deg.to_radians() * 0.5).tan();

        let dir = forward + right * (ndc_x * tan * viewport.aspect()) + up * (ndc_y * tan);
        Some(Ray::new(self.position, dir.normalized()?))
    }

    /// Keeps the viewing offset and re-centres on `target`.
    pub fn focus(&mut self, target: Vec3) {
        let offset = self.position - self.target;
        self.target = target;
        self.position = target + offset;
    }
}

#[cfg(test)]
mod tests {
    use super::{Camera, Viewport};
    use foundation::math::Vec3;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn centre_pixel_looks_at_target() {
        let cam = Camera::look_at(Vec3::new(0.0, 0.0, 100.0), Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0));
        let ray = cam
            .ray_from_screen(Viewport::new(800.0, 600.0), 400.0, 300.0)
            .expect("ray");
        assert_close(ray.dir.x, 0.0);
        assert_close(ray.dir.y, 0.0);
        assert_close(ray.dir.z, -1.0);
    }

    #[test]
    fn top_left_pixel_points_up_and_left() {
        let cam = Camera::look_at(Vec3::new(0.0, 0.0, 100.0), Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0));
        let ray = cam
            .ray_from_screen(Viewport::new(800.0, 600.0), 0.0, 0.0)
            .expect("ray");
        assert!(ray.dir.x < 0.0);
        assert!(ray.dir.y > 0.0);
    }

    #[test]
    fn degenerate_camera_has_no_basis() {
        let cam = Camera::look_at(Vec3::ZERO, Vec3::ZERO, Vec3::Z);
        assert!(cam.basis().is_none());
    }

    #[test]
    fn focus_keeps_offset() {
        let mut cam = Camera::look_at(Vec3::new(0.0, -10.0, 10.0), Vec3::ZERO, Vec3::Z);
        cam.focus(Vec3::new(5.0, 5.0, 0.0));
        assert_eq!(cam.position, Vec3::new(5.0, -5.0, 10.0));
    }
}
