use foundation::math::Vec3;
use foundation::math::precision::stable_total_cmp_f64;

use crate::camera::{Camera, Viewport};
use crate::entity::EntityId;
use crate::spatial::{ray_aabb_entry, Bvh, Item as BvhItem};
use crate::World;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.dir * t
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickHit {
    pub entity: EntityId,
    pub distance: f64,
    /// Scene-space intersection point.
    pub point: Vec3,
    /// Smallest barycentric weight of the hit inside its triangle, 0 on an
    /// edge. `None` when the surface is a bare bounding box.
    pub edge: Option<f64>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickOptions {
    pub max_distance: f64,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self {
            max_distance: 1.0e30,
        }
    }
}

/// Nearest queryable mesh along `ray`.
///
/// Candidates come from a BVH over world bounds; each candidate is then
/// tested triangle by triangle. Equal distances resolve to the lower
/// `EntityId::index()`.
pub fn pick_ray(world: &World, ray: Ray, opts: PickOptions) -> Option<PickHit> {
    let dir = ray.dir.normalized()?;
    let ray = Ray::new(ray.origin, dir);

    let items: Vec<BvhItem> = world
        .queryable_entities()
        .into_iter()
        .filter_map(|entity| {
            world
                .world_bounds(entity)
                .map(|bounds| BvhItem { entity, bounds })
        })
        .collect();
    if items.is_empty() {
        return None;
    }

    let bvh = Bvh::build(items);
    let origin = ray.origin.as_array();
    let dir_a = dir.as_array();

    let mut best: Option<(f64, Option<f64>, EntityId)> = None;
    for entity in bvh.query_ray(origin, dir_a, 0.0, opts.max_distance) {
        let Some((t, edge)) = hit_mesh(world, entity, ray, opts.max_distance) else {
            continue;
        };
        best = match best {
            Some((bt, bedge, be))
                if stable_total_cmp_f64(bt, t)
                    .then_with(|| be.index().cmp(&entity.index()))
                    .is_le() =>
            {
                Some((bt, bedge, be))
            }
            _ => Some((t, edge, entity)),
        };
    }

    let (distance, edge, entity) = best?;
    Some(PickHit {
        entity,
        distance,
        point: ray.at(distance),
        edge,
    })
}

/// Casts through canvas pixel `(x_px, y_px)` and picks.
pub fn pick_screen(
    world: &World,
    camera: &Camera,
    viewport: Viewport,
    x_px: f64,
    y_px: f64,
    opts: PickOptions,
) -> Option<PickHit> {
    let ray = camera.ray_from_screen(viewport, x_px, y_px)?;
    pick_ray(world, ray, opts)
}

fn hit_mesh(world: &World, entity: EntityId, ray: Ray, max_distance: f64) -> Option<(f64, Option<f64>)> {
    let mesh = world.mesh(entity)?;
    let transform = world.world_transform(entity)?;

    if mesh.indices.is_empty() {
        // Bounds only: treat the box itself as the surface.
        let bounds = world.world_bounds(entity)?;
        return ray_aabb_entry(ray.origin.as_array(), ray.dir.as_array(), &bounds, 0.0, max_distance)
            .map(|t| (t, None));
    }

    let vertex = |i: u32| {
        mesh.positions.get(i as usize).map(|p| {
            transform.apply(Vec3::new(p[0] as f64, p[1] as f64, p[2] as f64))
        })
    };

    let mut nearest: Option<(f64, Option<f64>)> = None;
    for tri in mesh.indices.chunks_exact(3) {
        let (Some(a), Some(b), Some(c)) = (vertex(tri[0]), vertex(tri[1]), vertex(tri[2])) else {
            continue;
        };
        if let Some((t, edge)) = ray_triangle(ray, a, b, c) {
            if t <= max_distance && nearest.map_or(true, |(n, _)| t < n) {
                nearest = Some((t, Some(edge)));
            }
        }
    }
    nearest
}

/// Two-sided Möller-Trumbore intersection. Returns the distance and the
/// smallest barycentric weight.
fn ray_triangle(ray: Ray, a: Vec3, b: Vec3, c: Vec3) -> Option<(f64, f64)> {
    const EPS: f64 = 1e-12;
    let e1 = b - a;
    let e2 = c - a;
    let p = ray.dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() < EPS {
        return None;
    }
    let inv = 1.0 / det;
    let s = ray.origin - a;
    let u = s.dot(p) * inv;
    if !(-EPS..=1.0 + EPS).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = ray.dir.dot(q) * inv;
    if v < -EPS || u + v > 1.0 + EPS {
        return None;
    }
    let t = e2.dot(q) * inv;
    let edge = u.min(v).min(1.0 - u - v).max(0.0);
    (t >= 0.0).then_some((t, edge))
}
