use foundation::ids::LayerId;
use runtime::frame::Frame;
use runtime::tween::{Easing, Tween};
use scene::World;
use scene::components::Transform;
use scene::entity::EntityId;

use crate::layer::Layer;

pub const RISE_FROM_Z: f64 = -2.0;
pub const RISE_DURATION_S: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
struct Rise {
    layer: LayerId,
    root: EntityId,
    tween: Tween,
}

/// Layers lifting into place after ingest.
#[derive(Debug, Clone, Default)]
pub struct RiseAnimations {
    active: Vec<Rise>,
}

impl RiseAnimations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops `layer` to the start height and queues its rise. Restarting a
    /// layer that is already rising replaces its animation.
    pub fn start(&mut self, world: &mut World, layer: &Layer) {
        self.active.retain(|r| r.layer != layer.id);
        let mut t = world.transform(layer.root).unwrap_or_else(Transform::identity);
        t.position.z = RISE_FROM_Z;
        world.set_transform(layer.root, t);
        self.active.push(Rise {
            layer: layer.id,
            root: layer.root,
            tween: Tween::new(RISE_FROM_Z, 0.0, RISE_DURATION_S).with_easing(Easing::ExponentialInOut),
        });
    }

    /// Advances every rise by one frame and drops finished ones.
    pub fn step(&mut self, world: &mut World, frame: Frame) {
        self.active.retain_mut(|rise| {
            let z = rise.tween.step(frame);
            let Some(mut t) = world.transform(rise.root) else {
                return false;
            };
            t.position.z = z;
            world.set_transform(rise.root, t);
            !rise.tween.is_finished()
        });
    }

    pub fn is_active(&self) -> bool {
        !self.active.is_empty()
    }
}
