use foundation::bounds::Extent;

/// Builds an imagery request for `extent` at `width` x `height` pixels.
///
/// `{width}`/`{height}` placeholders in `template` are substituted; otherwise
/// existing `width=`/`height=` parameters are rewritten, or appended when the
/// template has none. The box always lands in `bbox=xmin,ymin,xmax,ymax`.
pub fn imagery_url(template: &str, width: u32, height: u32, extent: &Extent) -> String {
    let (w, h) = (width.to_string(), height.to_string());
    let url = if template.contains("{width}") || template.contains("{height}") {
        template.replace("{width}", &w).replace("{height}", &h)
    } else {
        let url = set_param(template, "width", &w);
        set_param(&url, "height", &h)
    };
    set_param(&url, "bbox", &extent.bbox_param())
}

/// Vector feature request scoped to `extent` (`Bbox=` parameter).
pub fn features_url(base: &str, extent: &Extent) -> String {
    set_param(base, "Bbox", &extent.bbox_param())
}

/// Replaces the value of `key` in the query string of `url`, appending the
/// parameter when absent. Keys match exactly.
pub fn set_param(url: &str, key: &str, value: &str) -> String {
    let (base, fragment) = match url.split_once('#') {
        Some((b, f)) => (b, Some(f)),
        None => (url, None),
    };
    let (path, query) = match base.split_once('?') {
        Some((p, q)) => (p, q),
        None => (base, ""),
    };

    let mut found = false;
    let mut params: Vec<String> = query
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|p| {
            let name = p.split_once('=').map_or(p, |(k, _)| k);
            if name == key {
                found = true;
                format!("{key}={value}")
            } else {
                p.to_string()
            }
        })
        .collect();
    if !found {
        params.push(format!("{key}={value}"));
    }

    let mut out = format!("{path}?{}", params.join("&"));
    if let Some(f) = fragment {
        out.push('#');
        out.push_str(f);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{features_url, imagery_url, set_param};
    use foundation::bounds::Extent;

    #[test]
    fn placeholders_are_substituted() {
        let e = Extent::new(0.0, 0.0, 500.0, 250.0);
        let url = imagery_url("http://wms/map?w={width}&h={height}&format=image%2Fpng", 256, 128, &e);
        assert_eq!(url, "http://wms/map?w=256&h=128&format=image%2Fpng&bbox=0,0,500,250");
    }

    #[test]
    fn existing_size_params_are_rewritten_in_place() {
        let e = Extent::new(10.0, 20.0, 30.0, 40.0);
        let url = imagery_url("http://wms/map?service=WMS&width=256&height=256&srs=EPSG%3A25832", 512, 512, &e);
        assert_eq!(
            url,
            "http://wms/map?service=WMS&width=512&height=512&srs=EPSG%3A25832&bbox=10,20,30,40"
        );
    }

    #[test]
    fn missing_size_params_are_appended() {
        let e = Extent::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(
            imagery_url("http://wms/map", 256, 256, &e),
            "http://wms/map?width=256&height=256&bbox=0,0,1,1"
        );
    }

    #[test]
    fn refined_request_replaces_previous_bbox() {
        let e = Extent::new(0.0, 0.0, 1.0, 1.0);
        let first = imagery_url("http://wms/map?layers=orto", 256, 256, &e);
        let second = imagery_url(&first, 512, 512, &e);
        assert_eq!(second, "http://wms/map?layers=orto&width=512&height=512&bbox=0,0,1,1");
    }

    #[test]
    fn features_use_capitalised_bbox() {
        let e = Extent::new(1.5, 2.0, 3.0, 4.0);
        assert_eq!(
            features_url("http://wfs/service?TYPENAME=kms:Bygning", &e),
            "http://wfs/service?TYPENAME=kms:Bygning&Bbox=1.5,2,3,4"
        );
    }

    #[test]
    fn fragment_survives_parameter_edits() {
        assert_eq!(set_param("http://a/b?x=1#top", "y", "2"), "http://a/b?x=1&y=2#top");
    }
}
