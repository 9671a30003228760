//! Bounding volume hierarchy.

use crate::core::geometry::*;
use crate::core::primitive::*;
use crate::core::prism::*;
use glam::Vec3;
use rayon::prelude::*;

/// Extent below which an axis is considered degenerate and splitting
/// stops.
const SPLIT_LIMIT: Float = 1e-4;

/// Which children of a node are populated.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Branch {
    /// `left` is a primitive index.
    Leaf,

    /// Only `left` holds a child node.
    Left,

    /// Only `right` holds a child node.
    Right,

    /// Both children hold nodes.
    Both,
}

/// A node in the flattened hierarchy. Interior nodes index other nodes
/// through `left`/`right`; leaves index a primitive through `left`.
#[derive(Copy, Clone, Debug)]
pub struct Node {
    pub min: Vec3,
    pub max: Vec3,
    pub config: Branch,
    pub left: usize,
    pub right: usize,
}

/// A spatial-median BVH stored as a contiguous node sequence with the
/// root at index 0.
#[derive(Clone, Debug, Default)]
pub struct Bvh {
    nodes: Vec<Node>,
}

impl Bvh {
    /// Build a hierarchy over a primitive list. Splits happen at the
    /// midpoint of the widest axis, partitioning by bounding-box
    /// centroid; every box is tightened to its children once the
    /// recursion returns.
    ///
    /// * `primitives` - The primitives; leaves index into this slice.
    pub fn build(primitives: &[Primitive]) -> Self {
        if primitives.is_empty() {
            return Self::default();
        }
        let aabbs: Vec<Aabb> = primitives.par_iter().map(|p| p.aabb()).collect();

        let mut root = Node {
            min: Vec3::splat(Float::MAX),
            max: Vec3::splat(-Float::MAX),
            config: Branch::Leaf,
            left: 0,
            right: 0,
        };
        for bb in aabbs.iter() {
            root.min = root.min.min(bb.min);
            root.max = root.max.max(bb.max);
        }

        let mut nodes = vec![root];
        let children: Vec<usize> = (0..primitives.len()).collect();
        split(&mut nodes, 0, &children, &aabbs);
        Self { nodes }
    }

    /// True when the hierarchy holds no geometry.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The flattened nodes.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Slab-test a ray against one node's box. A ray is accepted when
    /// its exit is no earlier than its (non-negative) entry.
    ///
    /// * `ray` - The ray.
    /// * `ind` - Node index.
    pub fn hit_node(&self, ray: &Ray, ind: usize) -> bool {
        let node = &self.nodes[ind];
        let dfrac = Vec3::new(1.0 / ray.d.x, 1.0 / ray.d.y, 1.0 / ray.d.z);
        let t1 = (node.min.x - ray.p.x) * dfrac.x;
        let t2 = (node.max.x - ray.p.x) * dfrac.x;
        let t3 = (node.min.y - ray.p.y) * dfrac.y;
        let t4 = (node.max.y - ray.p.y) * dfrac.y;
        let t5 = (node.min.z - ray.p.z) * dfrac.z;
        let t6 = (node.max.z - ray.p.z) * dfrac.z;
        let tmin = t1.min(t2).max(t3.min(t4)).max(t5.min(t6));
        let tmax = t1.max(t2).min(t3.max(t4)).min(t5.max(t6));
        !(tmax < 0.0 || tmin > tmax)
    }

    /// Trace a ray through the hierarchy, returning the nearest
    /// positive-t intersection or a miss.
    ///
    /// * `ray`        - The ray.
    /// * `primitives` - The slice the hierarchy was built over.
    pub fn intersect(&self, ray: &Ray, primitives: &[Primitive]) -> Hit {
        if self.is_empty() || !self.hit_node(ray, 0) {
            return Hit::miss();
        }
        self.traverse(ray, 0, primitives)
    }

    fn traverse(&self, ray: &Ray, ind: usize, primitives: &[Primitive]) -> Hit {
        let node = self.nodes[ind];
        if node.config == Branch::Leaf {
            return primitives[node.left].intersect(ray);
        }
        let mut hl = Hit::miss();
        let mut hr = Hit::miss();
        if (node.config == Branch::Left || node.config == Branch::Both)
            && self.hit_node(ray, node.left)
        {
            hl = self.traverse(ray, node.left, primitives);
        }
        if (node.config == Branch::Right || node.config == Branch::Both)
            && self.hit_node(ray, node.right)
        {
            hr = self.traverse(ray, node.right, primitives);
        }
        let mut h = Hit::miss();
        if hl.t > 0.0 && (h.t < 0.0 || hl.t < h.t) {
            h = hl;
        }
        if hr.t > 0.0 && (h.t < 0.0 || hr.t < h.t) {
            h = hr;
        }
        h
    }
}

/// Recursively partition `children` under `nodes[index]`.
fn split(nodes: &mut Vec<Node>, index: usize, children: &[usize], aabbs: &[Aabb]) {
    let (node_min, node_max) = (nodes[index].min, nodes[index].max);
    let extent = [
        node_max.x - node_min.x,
        node_max.y - node_min.y,
        node_max.z - node_min.z,
    ];
    let axis = if extent[0] > extent[1] {
        if extent[0] > extent[2] {
            0
        } else {
            2
        }
    } else if extent[1] > extent[2] {
        1
    } else {
        2
    };

    // Degenerate extent: attach the remaining primitives as a
    // right-leaning chain of leaves.
    if extent[axis] < SPLIT_LIMIT {
        let mut stream = index;
        for (i, child) in children.iter().enumerate() {
            nodes.push(Node {
                min: aabbs[*child].min,
                max: aabbs[*child].max,
                config: Branch::Leaf,
                left: *child,
                right: 0,
            });
            nodes[stream].left = nodes.len() - 1;
            if i + 1 >= children.len() {
                nodes[stream].config = Branch::Left;
            } else {
                nodes[stream].config = Branch::Both;
                nodes.push(Node {
                    min: node_min,
                    max: node_max,
                    config: Branch::Leaf,
                    left: 0,
                    right: 0,
                });
                nodes[stream].right = nodes.len() - 1;
                stream = nodes.len() - 1;
            }
        }
        resize(nodes, index);
        return;
    }

    let mid = extent[axis] / 2.0;
    let mut left = Node {
        min: node_min,
        max: node_max,
        config: Branch::Leaf,
        left: 0,
        right: 0,
    };
    let mut right = left;
    left.max[axis] -= mid;
    right.min[axis] += mid;

    let (left_children, right_children): (Vec<usize>, Vec<usize>) = children
        .iter()
        .copied()
        .partition(|c| aabbs[*c].centroid[axis] < left.max[axis]);

    nodes[index].config = match (left_children.is_empty(), right_children.is_empty()) {
        (false, false) => Branch::Both,
        (false, true) => Branch::Left,
        (true, false) => Branch::Right,
        (true, true) => panic!("BVH split produced two empty partitions"),
    };

    if left_children.len() > 1 {
        nodes.push(left);
        let child = nodes.len() - 1;
        nodes[index].left = child;
        split(nodes, child, &left_children, aabbs);
    } else if left_children.len() == 1 {
        left.config = Branch::Leaf;
        left.left = left_children[0];
        left.min = aabbs[left.left].min;
        left.max = aabbs[left.left].max;
        nodes.push(left);
        nodes[index].left = nodes.len() - 1;
    }
    if right_children.len() > 1 {
        nodes.push(right);
        let child = nodes.len() - 1;
        nodes[index].right = child;
        split(nodes, child, &right_children, aabbs);
    } else if right_children.len() == 1 {
        right.config = Branch::Leaf;
        right.left = right_children[0];
        right.min = aabbs[right.left].min;
        right.max = aabbs[right.left].max;
        nodes.push(right);
        nodes[index].right = nodes.len() - 1;
    }

    // Tighten this box around whatever was actually populated.
    if nodes[index].config == Branch::Both || nodes[index].config == Branch::Left {
        let child = nodes[index].left;
        nodes[index].min = nodes[child].min.min(nodes[index].min);
        nodes[index].max = nodes[child].max.max(nodes[index].max);
    }
    if nodes[index].config == Branch::Both || nodes[index].config == Branch::Right {
        let child = nodes[index].right;
        nodes[index].min = nodes[child].min.min(nodes[index].min);
        nodes[index].max = nodes[child].max.max(nodes[index].max);
    }
}

/// Tighten every box under `index` to the union of its populated
/// children.
fn resize(nodes: &mut [Node], index: usize) {
    let (l, r) = (nodes[index].left, nodes[index].right);
    match nodes[index].config {
        Branch::Both => {
            resize(nodes, l);
            resize(nodes, r);
            nodes[index].min = nodes[l].min.min(nodes[index].min);
            nodes[index].max = nodes[l].max.max(nodes[index].max);
            nodes[index].min = nodes[r].min.min(nodes[index].min);
            nodes[index].max = nodes[r].max.max(nodes[index].max);
        }
        Branch::Left => {
            resize(nodes, l);
            nodes[index].min = nodes[l].min.min(nodes[index].min);
            nodes[index].max = nodes[l].max.max(nodes[index].max);
        }
        Branch::Right => {
            resize(nodes, r);
            nodes[index].min = nodes[r].min.min(nodes[index].min);
            nodes[index].max = nodes[r].max.max(nodes[index].max);
        }
        Branch::Leaf => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_grid() -> Vec<Primitive> {
        let mut prims = Vec::new();
        for i in 0..4 {
            for j in 0..4 {
                prims.push(Primitive::sphere(
                    Vec3::new(i as Float * 2.0, j as Float * 2.0, 0.0),
                    0.5,
                    -1,
                ));
            }
        }
        prims
    }

    #[test]
    fn root_is_first_node() {
        let prims = quad_grid();
        let bvh = Bvh::build(&prims);
        assert!(!bvh.is_empty());
        let root = bvh.nodes()[0];
        assert_eq!(root.min, Vec3::new(-0.5, -0.5, -0.5));
        assert_eq!(root.max, Vec3::new(6.5, 6.5, 0.5));
    }

    #[test]
    fn every_node_contains_its_leaves() {
        let prims = quad_grid();
        let bvh = Bvh::build(&prims);

        fn leaves(bvh: &Bvh, ind: usize, out: &mut Vec<usize>) {
            let node = bvh.nodes()[ind];
            match node.config {
                Branch::Leaf => out.push(ind),
                Branch::Left => leaves(bvh, node.left, out),
                Branch::Right => leaves(bvh, node.right, out),
                Branch::Both => {
                    leaves(bvh, node.left, out);
                    leaves(bvh, node.right, out);
                }
            }
        }

        for ind in 0..bvh.nodes().len() {
            let node = bvh.nodes()[ind];
            let mut reachable = Vec::new();
            leaves(&bvh, ind, &mut reachable);
            for leaf in reachable {
                let leaf = bvh.nodes()[leaf];
                assert!(node.min.cmple(leaf.min).all(), "leaf box escapes node box");
                assert!(node.max.cmpge(leaf.max).all(), "leaf box escapes node box");
            }
        }
    }

    #[test]
    fn coincident_primitives_fall_back_to_a_leaf_chain() {
        // Identical boxes give a degenerate split extent on every
        // axis.
        let prims = vec![Primitive::sphere(Vec3::ZERO, 0.5, -1); 5];
        let bvh = Bvh::build(&prims);
        let h = bvh.intersect(
            &Ray::new(Vec3::new(0.0, 0.0, 3.0), Vec3::new(0.0, 0.0, -1.0)),
            &prims,
        );
        assert!(h.is_hit());
    }

    #[test]
    fn empty_scene_always_misses() {
        let prims: Vec<Primitive> = Vec::new();
        let bvh = Bvh::build(&prims);
        assert!(bvh.is_empty());
        let h = bvh.intersect(&Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0)), &prims);
        assert!(!h.is_hit());
    }
}
