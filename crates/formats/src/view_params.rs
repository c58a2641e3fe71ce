use std::collections::BTreeMap;

use foundation::math::Vec3;

/// Startup view overrides carried in a URL's query string and fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewParams {
    pub camera: Option<Vec3>,
    pub target: Option<Vec3>,
    pub up: Option<Vec3>,
    pub popup: bool,
    pub wireframe: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ViewParams {
    /// Parses `[base][?query][#fragment]`; a key in the fragment overrides
    /// the same key in the query. Unparseable values are ignored.
    pub fn parse(url: &str) -> Self {
        let (head, fragment) = url.split_once('#').unwrap_or((url, ""));
        let query = head.split_once('?').map_or(
            if head.contains('=') { head } else { "" },
            |(_, q)| q,
        );

        let mut vars: BTreeMap<&str, &str> = BTreeMap::new();
        for pair in query.split('&').chain(fragment.split('&')) {
            if pair.is_empty() {
                continue;
            }
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            vars.insert(k, v);
        }

        let num = |k: &str| vars.get(k).and_then(|v| v.parse::<f64>().ok());
        let vec3 = |x: &str, y: &str, z: &str| Some(Vec3::new(num(x)?, num(y)?, num(z)?));
        let size = |k: &str| vars.get(k).and_then(|v| v.parse::<u32>().ok());

        Self {
            camera: vec3("cx", "cy", "cz"),
            target: vec3("tx", "ty", "tz"),
            up: vec3("ux", "uy", "uz"),
            popup: vars.contains_key("popup"),
            wireframe: vars.contains_key("wireframe"),
            width: size("width"),
            height: size("height"),
        }
    }

    /// Explicit canvas size, only when both dimensions are given.
    pub fn canvas(&self) -> Option<(u32, u32)> {
        self.width.zip(self.height)
    }
}

/// Fragment reproducing a view: camera always, target unless at the origin,
/// up unless it is +Z, and the `wireframe` flag when set.
pub fn current_view_fragment(camera: Vec3, target: Vec3, up: Vec3, wireframe: bool) -> String {
    let mut hash = format!("#cx={}&cy={}&cz={}", camera.x, camera.y, camera.z);
    if target != Vec3::ZERO {
        hash.push_str(&format!("&tx={}&ty={}&tz={}", target.x, target.y, target.z));
    }
    if up != Vec3::Z {
        hash.push_str(&format!("&ux={}&uy={}&uz={}", up.x, up.y, up.z));
    }
    if wireframe {
        hash.push_str("&wireframe");
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::{ViewParams, current_view_fragment};
    use foundation::math::Vec3;
    use pretty_assertions::assert_eq;

    #[test]
    fn fragment_overrides_query() {
        let p = ViewParams::parse("http://host/index.html?cx=1&cy=2&cz=3&width=800&height=600#cx=9");
        assert_eq!(p.camera, Some(Vec3::new(9.0, 2.0, 3.0)));
        assert_eq!(p.canvas(), Some((800, 600)));
        assert!(!p.popup);
        assert_eq!(p.target, None);
    }

    #[test]
    fn partial_vectors_and_flags() {
        let p = ViewParams::parse("?popup&tx=1&ty=2&ux=0&uy=0&uz=1&width=300");
        assert!(p.popup);
        assert_eq!(p.target, None);
        assert_eq!(p.up, Some(Vec3::Z));
        assert_eq!(p.canvas(), None);
    }

    #[test]
    fn bare_query_is_accepted() {
        let p = ViewParams::parse("cx=1&cy=1&cz=1");
        assert_eq!(p.camera, Some(Vec3::ONE));
    }

    #[test]
    fn fragment_round_trips() {
        let camera = Vec3::new(10.5, -20.0, 30.0);
        let target = Vec3::new(1.0, 2.0, 0.0);
        let up = Vec3::new(0.0, 1.0, 0.0);

        assert_eq!(current_view_fragment(camera, Vec3::ZERO, Vec3::Z, false), "#cx=10.5&cy=-20&cz=30");

        let hash = current_view_fragment(camera, target, up, false);
        let p = ViewParams::parse(&hash);
        assert_eq!(p.camera, Some(camera));
        assert_eq!(p.target, Some(target));
        assert_eq!(p.up, Some(up));
        assert!(!p.wireframe);
    }

    #[test]
    fn wireframe_flag_round_trips() {
        assert!(ViewParams::parse("index.html?wireframe").wireframe);
        assert!(ViewParams::parse("index.html#cx=1&cy=1&cz=1&wireframe").wireframe);

        let hash = current_view_fragment(Vec3::ONE, Vec3::ZERO, Vec3::Z, true);
        assert_eq!(hash, "#cx=1&cy=1&cz=1&wireframe");
        let p = ViewParams::parse(&hash);
        assert!(p.wireframe);
        assert_eq!(p.camera, Some(Vec3::ONE));
    }
}
