use scene::World;
use scene::components::Visibility;

use crate::layer::{Layer, LayerKind};

/// Per-layer display controls.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LayerStyle {
    pub visible: bool,
    pub opacity: f32,
    /// Overrides every feature's own color when set (0xRRGGBB).
    pub color: Option<u32>,
    /// Multiplier on each feature's extrusion height.
    pub height: f64,
}

impl LayerStyle {
    pub const fn new(visible: bool, opacity: f32, color: Option<u32>, height: f64) -> Self {
        Self {
            visible,
            opacity,
            color,
            height,
        }
    }
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            visible: true,
            opacity: 1.0,
            color: None,
            height: 1.0,
        }
    }
}

/// Pushes `layer.style` onto the layer's entities. Hiding the root also
/// removes every feature from picking.
pub fn apply_style(world: &mut World, layer: &Layer) {
    let style = layer.style;
    world.set_visibility(layer.root, Visibility::from(style.visible));

    for (_, feature) in layer.features() {
        if let Some(m) = world.material_mut(feature.entity) {
            m.opacity = style.opacity.clamp(0.0, 1.0);
            if let Some(color) = style.color {
                m.color = color;
            }
        }
        if layer.kind == LayerKind::Polygon
            && let Some(mut t) = world.transform(feature.entity)
        {
            t.scale.z = feature.base_height * style.height;
            world.set_transform(feature.entity, t);
        }
    }
}
