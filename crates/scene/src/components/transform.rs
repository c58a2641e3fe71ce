use foundation::math::Vec3;

/// Translation plus per-axis scale. Extruded meshes are built one unit tall
/// and get their height from `scale.z`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    pub fn translate(position: Vec3) -> Self {
        Self {
            position,
            scale: Vec3::ONE,
        }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn apply(&self, local: Vec3) -> Vec3 {
        self.position + local.mul_elem(self.scale)
    }

    /// `parent * self`: the child's frame expressed in the parent's space.
    pub fn then_parent(&self, parent: &Transform) -> Transform {
        Transform {
            position: parent.apply(self.position),
            scale: self.scale.mul_elem(parent.scale),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::Transform;
    use foundation::math::Vec3;

    #[test]
    fn identity_is_origin_with_unit_scale() {
        let transform = Transform::identity();
        assert_eq!(transform.position, Vec3::ZERO);
        assert_eq!(transform.scale, Vec3::ONE);
    }

    #[test]
    fn apply_scales_then_translates() {
        let t = Transform::translate(Vec3::new(10.0, 0.0, -2.0)).with_scale(Vec3::new(1.0, 1.0, 5.0));
        assert_eq!(t.apply(Vec3::new(1.0, 2.0, 1.0)), Vec3::new(11.0, 2.0, 3.0));
    }

    #[test]
    fn parent_chain_composes() {
        let parent = Transform::translate(Vec3::new(100.0, 0.0, 0.0)).with_scale(Vec3::new(2.0, 2.0, 2.0));
        let child = Transform::translate(Vec3::new(1.0, 1.0, 0.0));
        let world = child.then_parent(&parent);
        assert_eq!(world.position, Vec3::new(102.0, 2.0, 0.0));
        assert_eq!(world.scale, Vec3::new(2.0, 2.0, 2.0));
    }
}
