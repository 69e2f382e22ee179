//! Bounding Volume Hierarchy over world-space triangles
//!
//! Built top-down: each node splits its triangles at the median centroid
//! along the longest axis of the centroid bounds. Leaves hold at most
//! [`MAX_LEAF_TRIANGLES`] triangles; recursion stops at [`MAX_DEPTH`].

use std::cmp::Ordering;

use crate::foundation::math::{utils, Vec3};
use super::primitives::{Ray, RayHit, Triangle, TriangleContact, AABB};

/// Maximum triangles stored in one leaf
pub const MAX_LEAF_TRIANGLES: usize = 4;

/// Maximum tree depth; deeper subsets become oversized leaves
pub const MAX_DEPTH: usize = 32;

/// BVH node containing either leaf triangles or child nodes
#[derive(Debug, Clone)]
pub enum BvhNode {
    /// Leaf node containing triangle indices
    Leaf {
        /// Bounding box of all triangles in this leaf
        bounds: AABB,
        /// Indices into the owning tree's triangle list
        triangles: Vec<u32>,
    },
    /// Internal node with two children
    Internal {
        /// Bounding box of all triangles in this subtree
        bounds: AABB,
        /// Left child node
        left: Box<BvhNode>,
        /// Right child node
        right: Box<BvhNode>,
    },
}

impl BvhNode {
    /// Get the bounding box of this node
    pub fn bounds(&self) -> &AABB {
        match self {
            Self::Leaf { bounds, .. } | Self::Internal { bounds, .. } => bounds,
        }
    }

    fn translate(&mut self, offset: Vec3) {
        match self {
            Self::Leaf { bounds, .. } => *bounds = bounds.translated(offset),
            Self::Internal { bounds, left, right } => {
                *bounds = bounds.translated(offset);
                left.translate(offset);
                right.translate(offset);
            }
        }
    }
}

/// Bounding volume hierarchy that owns its triangles
#[derive(Debug, Clone)]
pub struct Bvh {
    triangles: Vec<Triangle>,
    root: Option<BvhNode>,
}

impl Bvh {
    /// Build a BVH over the given triangles
    pub fn build(triangles: Vec<Triangle>) -> Self {
        if triangles.is_empty() {
            return Self { triangles, root: None };
        }

        let indices: Vec<u32> = (0..triangles.len() as u32).collect();
        let root = Self::build_recursive(&triangles, indices, 0);
        Self {
            triangles,
            root: Some(root),
        }
    }

    fn build_recursive(triangles: &[Triangle], mut indices: Vec<u32>, depth: usize) -> BvhNode {
        let bounds = indices
            .iter()
            .map(|&i| triangles[i as usize].bounds())
            .reduce(|a, b| a.merge(&b))
            .unwrap_or_else(|| AABB::new(Vec3::zeros(), Vec3::zeros()));

        if indices.len() <= MAX_LEAF_TRIANGLES || depth >= MAX_DEPTH {
            return BvhNode::Leaf { bounds, triangles: indices };
        }

        // Split along the longest axis of the centroid bounds
        let centroid_bounds = AABB::from_points(indices.iter().map(|&i| triangles[i as usize].centroid()))
            .unwrap_or(bounds);
        let size = centroid_bounds.size();
        let axis = if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        };

        indices.sort_by(|&a, &b| {
            let va = utils::axis(&triangles[a as usize].centroid(), axis);
            let vb = utils::axis(&triangles[b as usize].centroid(), axis);
            va.partial_cmp(&vb).unwrap_or(Ordering::Equal)
        });

        let right_indices = indices.split_off(indices.len() / 2);
        let left = Self::build_recursive(triangles, indices, depth + 1);
        let right = Self::build_recursive(triangles, right_indices, depth + 1);

        BvhNode::Internal {
            bounds,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Triangles in world space
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Number of triangles in the tree
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Root node, `None` for an empty tree
    pub fn root(&self) -> Option<&BvhNode> {
        self.root.as_ref()
    }

    /// Bounds of the whole tree
    pub fn bounds(&self) -> Option<AABB> {
        self.root.as_ref().map(|root| *root.bounds())
    }

    /// Copy of this tree shifted by `offset`, without re-splitting
    pub fn translated(&self, offset: Vec3) -> Self {
        let mut moved = self.clone();
        for triangle in &mut moved.triangles {
            *triangle = triangle.translated(offset);
        }
        if let Some(root) = moved.root.as_mut() {
            root.translate(offset);
        }
        moved
    }

    /// Nearest triangle hit within `max_distance`
    ///
    /// The reported normal faces the ray origin.
    pub fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<RayHit> {
        let root = self.root.as_ref()?;
        let mut best: Option<(f32, usize)> = None;
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            let limit = best.map_or(max_distance, |(t, _)| t);
            match node.bounds().intersect_ray(ray.origin, ray.direction) {
                Some(entry) if entry <= limit => {}
                _ => continue,
            }

            match node {
                BvhNode::Leaf { triangles, .. } => {
                    for &index in triangles {
                        let index = index as usize;
                        if let Some((t, _, _)) = self.triangles[index].intersect_ray(ray) {
                            if t <= best.map_or(max_distance, |(b, _)| b) {
                                best = Some((t, index));
                            }
                        }
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }

        best.map(|(distance, index)| {
            let mut normal = self.triangles[index].normal();
            if normal.dot(&ray.direction) > 0.0 {
                normal = -normal;
            }
            RayHit {
                distance,
                point: ray.point_at(distance),
                normal,
            }
        })
    }

    /// True when any triangle touches the box
    pub fn overlaps_aabb(&self, aabb: &AABB) -> bool {
        let mut found = false;
        self.visit_aabb(aabb, &mut |triangle| {
            found = triangle.intersect_aabb(aabb).is_some();
            found
        });
        found
    }

    /// Deepest triangle contact with the box
    pub fn contact_aabb(&self, aabb: &AABB) -> Option<TriangleContact> {
        let mut deepest: Option<TriangleContact> = None;
        self.visit_aabb(aabb, &mut |triangle| {
            if let Some(contact) = triangle.intersect_aabb(aabb) {
                if deepest.map_or(true, |d| contact.depth > d.depth) {
                    deepest = Some(contact);
                }
            }
            false
        });
        deepest
    }

    /// Calls `visit` for every triangle in a leaf overlapping `aabb`
    /// until it returns `true`
    fn visit_aabb(&self, aabb: &AABB, visit: &mut dyn FnMut(&Triangle) -> bool) {
        let Some(root) = self.root.as_ref() else {
            return;
        };
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            if !node.bounds().intersects(aabb) {
                continue;
            }
            match node {
                BvhNode::Leaf { triangles, .. } => {
                    for &index in triangles {
                        let triangle = &self.triangles[index as usize];
                        if triangle.bounds().intersects(aabb) && visit(triangle) {
                            return;
                        }
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
    }

    /// True when any triangle pair of the two trees intersects
    pub fn intersects_bvh(&self, other: &Bvh) -> bool {
        let (Some(a), Some(b)) = (self.root.as_ref(), other.root.as_ref()) else {
            return false;
        };
        let mut stack = vec![(a, b)];

        while let Some((node_a, node_b)) = stack.pop() {
            if !node_a.bounds().intersects(node_b.bounds()) {
                continue;
            }
            match (node_a, node_b) {
                (BvhNode::Leaf { triangles: ta, .. }, BvhNode::Leaf { triangles: tb, .. }) => {
                    for &i in ta {
                        let tri_a = &self.triangles[i as usize];
                        let bounds_a = tri_a.bounds();
                        for &j in tb {
                            let tri_b = &other.triangles[j as usize];
                            if bounds_a.intersects(&tri_b.bounds()) && tri_a.intersects_triangle(tri_b) {
                                return true;
                            }
                        }
                    }
                }
                (BvhNode::Internal { left, right, .. }, BvhNode::Leaf { .. }) => {
                    stack.push((&**right, node_b));
                    stack.push((&**left, node_b));
                }
                (BvhNode::Leaf { .. }, BvhNode::Internal { left, right, .. }) => {
                    stack.push((node_a, &**right));
                    stack.push((node_a, &**left));
                }
                (
                    BvhNode::Internal { left: la, right: ra, .. },
                    BvhNode::Internal { left: lb, right: rb, .. },
                ) => {
                    stack.push((&**ra, &**rb));
                    stack.push((&**ra, &**lb));
                    stack.push((&**la, &**rb));
                    stack.push((&**la, &**lb));
                }
            }
        }

        false
    }

    /// Every node's bounds with its depth, root first
    pub fn node_bounds(&self) -> Vec<(usize, AABB)> {
        let mut nodes = Vec::new();
        let mut stack: Vec<(usize, &BvhNode)> = self.root.iter().map(|root| (0, root)).collect();

        while let Some((depth, node)) = stack.pop() {
            nodes.push((depth, *node.bounds()));
            if let BvhNode::Internal { left, right, .. } = node {
                stack.push((depth + 1, &**right));
                stack.push((depth + 1, &**left));
            }
        }

        nodes
    }

    /// Depth of the deepest leaf
    pub fn depth(&self) -> usize {
        self.node_bounds().iter().map(|(depth, _)| *depth).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Flat grid of `n * n` quads (2 triangles each) at height `y`
    fn terrain(n: usize, y: f32) -> Vec<Triangle> {
        let mut triangles = Vec::new();
        for i in 0..n {
            for j in 0..n {
                let (x, z) = (i as f32, j as f32);
                let a = Vec3::new(x, y, z);
                let b = Vec3::new(x + 1.0, y, z);
                let c = Vec3::new(x, y, z + 1.0);
                let d = Vec3::new(x + 1.0, y, z + 1.0);
                triangles.push(Triangle::new(a, c, b));
                triangles.push(Triangle::new(b, c, d));
            }
        }
        triangles
    }

    #[test]
    fn test_leaf_size_and_depth_bounded() {
        let bvh = Bvh::build(terrain(16, 0.0));
        assert_eq!(bvh.triangle_count(), 512);

        let mut stack = vec![bvh.root().unwrap()];
        while let Some(node) = stack.pop() {
            match node {
                BvhNode::Leaf { triangles, .. } => assert!(triangles.len() <= MAX_LEAF_TRIANGLES),
                BvhNode::Internal { left, right, .. } => {
                    stack.push(left);
                    stack.push(right);
                }
            }
        }
        assert!(bvh.depth() <= MAX_DEPTH);
    }

    #[test]
    fn test_depth_cap_with_identical_triangles() {
        let tri = Triangle::new(Vec3::zeros(), Vec3::x(), Vec3::z());
        let bvh = Bvh::build(vec![tri; 4096]);
        assert!(bvh.depth() <= MAX_DEPTH);
        assert_eq!(bvh.triangle_count(), 4096);
    }

    #[test]
    fn test_raycast_nearest_hit() {
        let mut triangles = terrain(8, 0.0);
        triangles.extend(terrain(8, 3.0));
        let bvh = Bvh::build(triangles);

        let hit = bvh.raycast(&Ray::down(Vec3::new(2.3, 10.0, 2.6)), 100.0).unwrap();
        assert_relative_eq!(hit.distance, 7.0, epsilon = 1e-4);
        assert_relative_eq!(hit.point, Vec3::new(2.3, 3.0, 2.6), epsilon = 1e-4);
        assert_relative_eq!(hit.normal, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_raycast_respects_max_distance() {
        let bvh = Bvh::build(terrain(4, 0.0));
        assert!(bvh.raycast(&Ray::down(Vec3::new(1.3, 10.0, 1.6)), 5.0).is_none());
        assert!(bvh.raycast(&Ray::down(Vec3::new(50.0, 10.0, 50.0)), 100.0).is_none());
    }

    #[test]
    fn test_aabb_overlap_and_contact() {
        let bvh = Bvh::build(terrain(8, 0.0));
        let resting = AABB::new(Vec3::new(2.2, -0.1, 2.2), Vec3::new(2.8, 1.9, 2.8));
        let floating = AABB::new(Vec3::new(2.2, 0.5, 2.2), Vec3::new(2.8, 1.5, 2.8));

        assert!(bvh.overlaps_aabb(&resting));
        assert!(!bvh.overlaps_aabb(&floating));

        let contact = bvh.contact_aabb(&resting).unwrap();
        assert_relative_eq!(contact.normal, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(contact.depth, 0.1, epsilon = 1e-4);
    }

    #[test]
    fn test_translated_matches_rebuilt() {
        let offset = Vec3::new(100.0, 5.0, -20.0);
        let bvh = Bvh::build(terrain(4, 0.0));
        let moved = bvh.translated(offset);
        let rebuilt = Bvh::build(terrain(4, 0.0).iter().map(|t| t.translated(offset)).collect());

        let ray = Ray::down(Vec3::new(101.3, 50.0, -18.4));
        let a = moved.raycast(&ray, 100.0).unwrap();
        let b = rebuilt.raycast(&ray, 100.0).unwrap();
        assert_relative_eq!(a.distance, b.distance, epsilon = 1e-4);
        assert_relative_eq!(moved.bounds().unwrap().min, rebuilt.bounds().unwrap().min, epsilon = 1e-4);
    }

    #[test]
    fn test_bvh_vs_bvh() {
        let floor = Bvh::build(terrain(4, 0.0));
        let wall = Bvh::build(vec![Triangle::new(
            Vec3::new(2.0, -1.0, 1.0),
            Vec3::new(2.0, 1.0, 1.0),
            Vec3::new(2.0, -1.0, 3.0),
        )]);
        let raised = Bvh::build(terrain(4, 2.0));

        assert!(floor.intersects_bvh(&wall));
        assert!(!floor.intersects_bvh(&raised));
    }

    #[test]
    fn test_bvh_vs_bvh_coplanar_neighbors() {
        let lower = Bvh::build(vec![Triangle::new(
            Vec3::zeros(),
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 10.0),
        )]);
        let upper = Bvh::build(vec![Triangle::new(
            Vec3::new(10.0, 0.0, 10.0),
            Vec3::new(10.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 10.0),
        )]);
        assert!(!lower.intersects_bvh(&upper));

        // Tiles sharing an edge still touch
        let left = Bvh::build(terrain(2, 0.0));
        let right = Bvh::build(terrain(2, 0.0)).translated(Vec3::new(2.0, 0.0, 0.0));
        assert!(left.intersects_bvh(&right));
    }

    #[test]
    fn test_empty_tree() {
        let bvh = Bvh::build(Vec::new());
        assert!(bvh.bounds().is_none());
        assert!(bvh.raycast(&Ray::down(Vec3::zeros()), 10.0).is_none());
        assert!(bvh.node_bounds().is_empty());
    }
}
