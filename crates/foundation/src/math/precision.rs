//! Deterministic float ordering.
//!
//! Picking and BVH construction sort by distances and centroids; both go
//! through `stable_total_cmp_f64` so equal inputs always produce the same order.

use core::cmp::Ordering;

/// Collapses `-0.0` into `0.0` and every NaN payload into one NaN.
pub fn canonical_f64(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

/// Total ordering over canonicalized floats.
pub fn stable_total_cmp_f64(a: f64, b: f64) -> Ordering {
    canonical_f64(a).total_cmp(&canonical_f64(b))
}

/// Relative-or-absolute closeness check used across the workspace tests and
/// for tolerance comparisons on transformed coordinates.
pub fn approx_eq(a: f64, b: f64, rel: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= rel * scale
}
