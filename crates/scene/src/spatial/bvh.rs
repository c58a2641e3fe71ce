use foundation::bounds::Aabb3;
use foundation::math::precision::stable_total_cmp_f64;

use crate::entity::EntityId;

/// Bounding volume hierarchy over pickable entity bounds.
///
/// Rebuilt from the queryable set on every pick; `query_ray` returns
/// candidates in ascending `EntityId::index()` order regardless of insertion
/// order.
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        bounds: Aabb3,
        items: Vec<Item>,
    },
    Internal {
        bounds: Aabb3,
        left: usize,
        right: usize,
    },
}

impl Node {
    fn bounds(&self) -> &Aabb3 {
        match self {
            Node::Leaf { bounds, .. } | Node::Internal { bounds, .. } => bounds,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Item {
    pub entity: EntityId,
    pub bounds: Aabb3,
}

const LEAF_MAX: usize = 8;

impl Bvh {
    pub fn build(mut items: Vec<Item>) -> Self {
        let mut nodes = Vec::new();
        if !items.is_empty() {
            build_node(&mut nodes, &mut items);
        }
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Entities whose bounds the ray `origin + t*dir`, `t in [t_min, t_max]`, crosses.
    pub fn query_ray(&self, origin: [f64; 3], dir: [f64; 3], t_min: f64, t_max: f64) -> Vec<EntityId> {
        let mut hits = Vec::new();
        if self.nodes.is_empty() {
            return hits;
        }

        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if ray_aabb_entry(origin, dir, node.bounds(), t_min, t_max).is_none() {
                continue;
            }
            match node {
                Node::Leaf { items, .. } => {
                    hits.extend(
                        items
                            .iter()
                            .filter(|item| {
                                ray_aabb_entry(origin, dir, &item.bounds, t_min, t_max).is_some()
                            })
                            .map(|item| item.entity),
                    );
                }
                Node::Internal { left, right, .. } => {
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }

        hits.sort_by_key(|e| e.index());
        hits.dedup();
        hits
    }
}

fn build_node(nodes: &mut Vec<Node>, items: &mut [Item]) -> usize {
    let bounds = items[1..]
        .iter()
        .fold(items[0].bounds, |acc, item| acc.union(&item.bounds));

    if items.len() <= LEAF_MAX {
        let idx = nodes.len();
        nodes.push(Node::Leaf {
            bounds,
            items: items.to_vec(),
        });
        return idx;
    }

    let axis = longest_axis(&bounds);
    items.sort_by(|a, b| {
        let ca = (a.bounds.min[axis] + a.bounds.max[axis]) * 0.5;
        let cb = (b.bounds.min[axis] + b.bounds.max[axis]) * 0.5;
        stable_total_cmp_f64(ca, cb).then_with(|| a.entity.index().cmp(&b.entity.index()))
    });

    let idx = nodes.len();
    // Patched once both children exist.
    nodes.push(Node::Leaf {
        bounds,
        items: Vec::new(),
    });

    let (left_items, right_items) = items.split_at_mut(items.len() / 2);
    let left = build_node(nodes, left_items);
    let right = build_node(nodes, right_items);
    nodes[idx] = Node::Internal {
        bounds,
        left,
        right,
    };
    idx
}

// Ties prefer X, then Y.
fn longest_axis(bounds: &Aabb3) -> usize {
    let ex = bounds.max[0] - bounds.min[0];
    let ey = bounds.max[1] - bounds.min[1];
    let ez = bounds.max[2] - bounds.min[2];
    if ex >= ey && ex >= ez {
        0
    } else if ey >= ez {
        1
    } else {
        2
    }
}

/// Slab test. Returns the entry parameter clamped to `t_min`, or `None` on a miss.
pub fn ray_aabb_entry(
    origin: [f64; 3],
    dir: [f64; 3],
    aabb: &Aabb3,
    mut t_min: f64,
    mut t_max: f64,
) -> Option<f64> {
    for axis in 0..3 {
        let o = origin[axis];
        let d = dir[axis];
        let (min, max) = (aabb.min[axis], aabb.max[axis]);

        if d.abs() < 1e-12 {
            if o < min || o > max {
                return None;
            }
            continue;
        }

        let inv = 1.0 / d;
        let mut t1 = (min - o) * inv;
        let mut t2 = (max - o) * inv;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        t_min = t_min.max(t1);
        t_max = t_max.min(t2);
        if t_max < t_min {
            return None;
        }
    }
    Some(t_min)
}

#[cfg(test)]
mod tests {
    use super::{ray_aabb_entry, Bvh, Item};
    use crate::entity::EntityId;
    use foundation::bounds::Aabb3;
    use foundation::handles::Handle;

    fn e(idx: u32) -> EntityId {
        EntityId(Handle::new(idx, 0))
    }

    fn row_of_boxes(n: u32) -> Vec<Item> {
        (0..n)
            .map(|i| Item {
                entity: e(i),
                bounds: Aabb3::new([i as f64 * 2.0, 0.0, 0.0], [i as f64 * 2.0 + 1.0, 1.0, 1.0]),
            })
            .collect()
    }

    #[test]
    fn vertical_ray_finds_single_box_among_many() {
        let bvh = Bvh::build(row_of_boxes(40));
        let hits = bvh.query_ray([20.5, 0.5, 10.0], [0.0, 0.0, -1.0], 0.0, f64::MAX);
        assert_eq!(hits, vec![e(10)]);
    }

    #[test]
    fn results_do_not_depend_on_insertion_order() {
        let a = row_of_boxes(20);
        let mut b = a.clone();
        b.reverse();
        let origin = [-5.0, 0.5, 0.5];
        let dir = [1.0, 0.0, 0.0];
        let ha = Bvh::build(a).query_ray(origin, dir, 0.0, 9.5);
        let hb = Bvh::build(b).query_ray(origin, dir, 0.0, 9.5);
        assert_eq!(ha, hb);
        assert_eq!(ha, vec![e(0), e(1), e(2)]);
    }

    #[test]
    fn slab_entry_distance() {
        let b = Aabb3::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        assert_eq!(ray_aabb_entry([0.5, 0.5, 5.0], [0.0, 0.0, -1.0], &b, 0.0, 100.0), Some(4.0));
        assert_eq!(ray_aabb_entry([5.0, 5.0, 5.0], [0.0, 0.0, -1.0], &b, 0.0, 100.0), None);
    }

    #[test]
    fn empty_tree_has_no_hits() {
        assert!(Bvh::build(Vec::new()).query_ray([0.0; 3], [1.0, 0.0, 0.0], 0.0, 1.0).is_empty());
    }
}
