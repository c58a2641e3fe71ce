/// Loaded raster bound to a material.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub source: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// 0xRRGGBB
    pub color: u32,
    pub emissive: u32,
    pub opacity: f32,
    pub texture: Option<Texture>,
    /// Draw triangle edges only.
    pub wireframe: bool,
}

impl Material {
    pub fn color(color: u32) -> Self {
        Self {
            color,
            emissive: 0x000000,
            opacity: 1.0,
            texture: None,
            wireframe: false,
        }
    }

    /// Translucent emissive yellow used for the selection clone.
    pub fn highlight() -> Self {
        Self {
            color: 0xffffff,
            emissive: 0x999900,
            opacity: 0.5,
            texture: None,
            wireframe: false,
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::color(0xffffff)
    }
}

/// Parses `#rrggbb` (or `rrggbb`, `0xrrggbb`) into 0xRRGGBB.
pub fn parse_hex_color(s: &str) -> Option<u32> {
    let s = s.trim();
    let digits = s
        .strip_prefix('#')
        .or_else(|| s.strip_prefix("0x"))
        .unwrap_or(s);
    if digits.len() != 6 {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}
