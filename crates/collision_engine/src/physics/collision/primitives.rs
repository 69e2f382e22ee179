//! Primitive collision shapes and intersection algorithms
//!
//! Provides basic geometric primitives (boxes, rays, triangles) with
//! efficient intersection testing algorithms.

use crate::foundation::math::{utils, Point3, Transform, Vec3};

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Smallest box enclosing every point, `None` for an empty iterator
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |mut aabb, p| {
            aabb.expand_to_include(p);
            aabb
        }))
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Full edge lengths of the AABB
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Grow the box so it contains `point`
    pub fn expand_to_include(&mut self, point: Vec3) {
        self.min = utils::vec_min(&self.min, &point);
        self.max = utils::vec_max(&self.max, &point);
    }

    /// Union of two boxes
    pub fn merge(&self, other: &AABB) -> AABB {
        AABB::new(
            utils::vec_min(&self.min, &other.min),
            utils::vec_max(&self.max, &other.max),
        )
    }

    /// Box shifted by `offset`
    pub fn translated(&self, offset: Vec3) -> AABB {
        AABB::new(self.min + offset, self.max + offset)
    }

    /// Box enclosing the eight transformed corners of this box
    pub fn transformed(&self, transform: &Transform) -> AABB {
        let matrix = transform.to_matrix();
        let corners = (0..8).map(|i| {
            let corner = Point3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            matrix.transform_point(&corner).coords
        });
        // Eight corners are always present
        Self::from_points(corners).unwrap_or(*self)
    }

    /// True when every bound is a finite number
    pub fn is_finite(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|v| v.is_finite())
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if this AABB intersects another AABB (touching counts)
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Per-axis overlap depth with another box
    ///
    /// Components are negative on axes where the boxes are apart.
    pub fn overlap(&self, other: &AABB) -> Vec3 {
        utils::vec_min(&self.max, &other.max) - utils::vec_max(&self.min, &other.min)
    }

    /// Test ray intersection with this AABB using slab method
    /// Returns the distance to the entry point if the ray intersects, None otherwise
    /// Based on "An Efficient and Robust Ray–Box Intersection Algorithm"
    pub fn intersect_ray(&self, ray_origin: Vec3, ray_dir: Vec3) -> Option<f32> {
        let inv_dir = Vec3::new(
            if ray_dir.x != 0.0 { 1.0 / ray_dir.x } else { f32::INFINITY },
            if ray_dir.y != 0.0 { 1.0 / ray_dir.y } else { f32::INFINITY },
            if ray_dir.z != 0.0 { 1.0 / ray_dir.z } else { f32::INFINITY },
        );

        let mut tmin = f32::NEG_INFINITY;
        let mut tmax = f32::INFINITY;
        for axis in 0..3 {
            let origin = utils::axis(&ray_origin, axis);
            let lo = utils::axis(&self.min, axis);
            let hi = utils::axis(&self.max, axis);

            if utils::axis(&ray_dir, axis) == 0.0 {
                // Parallel to this slab: inside or never
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }

            let inv = utils::axis(&inv_dir, axis);
            let t1 = (lo - origin) * inv;
            let t2 = (hi - origin) * inv;
            tmin = tmin.max(t1.min(t2));
            tmax = tmax.min(t1.max(t2));
        }

        // Ray intersects if tmax >= tmin and tmax >= 0
        if tmax >= tmin && tmax >= 0.0 {
            // Return entry point distance (or 0 if we're inside the box)
            Some(tmin.max(0.0))
        } else {
            None
        }
    }
}

/// A ray for ray casting and ground raycasts
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// The origin point of the ray in world space
    pub origin: Vec3,
    /// The direction of the ray (normalized)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray with the given origin and direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Straight-down ray from `origin`
    pub fn down(origin: Vec3) -> Self {
        Self {
            origin,
            direction: Vec3::new(0.0, -1.0, 0.0),
        }
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Result of a ray intersection test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// The distance from the ray origin to the hit point
    pub distance: f32,
    /// The point of intersection in world space
    pub point: Vec3,
    /// The surface normal at the intersection point, facing the ray origin
    pub normal: Vec3,
}

/// Penetration of a box into a triangle along the separating axis of least overlap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleContact {
    /// Unit axis pointing from the triangle towards the box
    pub normal: Vec3,
    /// Overlap along `normal`
    pub depth: f32,
}

/// A triangle for collision detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// Triangle vertices in world space
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
}

const EPSILON: f32 = 0.000001;

impl Triangle {
    /// Creates a new triangle
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Calculates the normal of the triangle (right-hand rule)
    ///
    /// Degenerate triangles yield the zero vector.
    pub fn normal(&self) -> Vec3 {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        edge1.cross(&edge2).try_normalize(EPSILON).unwrap_or_else(Vec3::zeros)
    }

    /// Calculates the centroid (center point) of the triangle
    pub fn centroid(&self) -> Vec3 {
        (self.v0 + self.v1 + self.v2) / 3.0
    }

    /// Tight bounding box of the three vertices
    pub fn bounds(&self) -> AABB {
        AABB::new(
            utils::vec_min(&utils::vec_min(&self.v0, &self.v1), &self.v2),
            utils::vec_max(&utils::vec_max(&self.v0, &self.v1), &self.v2),
        )
    }

    /// Triangle with each vertex moved by `transform`
    pub fn transformed(&self, transform: &Transform) -> Triangle {
        let matrix = transform.to_matrix();
        let apply = |v: Vec3| matrix.transform_point(&Point3::from(v)).coords;
        Triangle::new(apply(self.v0), apply(self.v1), apply(self.v2))
    }

    /// Triangle shifted by `offset`
    pub fn translated(&self, offset: Vec3) -> Triangle {
        Triangle::new(self.v0 + offset, self.v1 + offset, self.v2 + offset)
    }

    /// Möller-Trumbore ray-triangle intersection algorithm
    /// Returns (t, u, v) barycentric coordinates if hit, None otherwise
    ///
    /// See: "Fast, Minimum Storage Ray/Triangle Intersection" by Möller & Trumbore
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, f32, f32)> {
        // Calculate edges from v0
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        // Calculate determinant
        let h = ray.direction.cross(&edge2);
        let a = edge1.dot(&h);

        // Ray parallel to triangle?
        if a.abs() < EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(&h);

        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * ray.direction.dot(&q);

        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(&q);

        if t >= 0.0 {
            Some((t, u, v))
        } else {
            None
        }
    }

    /// Separating-axis test against a box
    ///
    /// Tests the 3 box face normals, the triangle normal and the 9 edge
    /// cross products. Returns the axis of least penetration when no
    /// separating axis exists; touching counts as a contact.
    pub fn intersect_aabb(&self, aabb: &AABB) -> Option<TriangleContact> {
        let center = aabb.center();
        let half = aabb.extents();
        let edges = [self.v1 - self.v0, self.v2 - self.v1, self.v0 - self.v2];
        let box_axes = [Vec3::x(), Vec3::y(), Vec3::z()];

        let mut axes: Vec<Vec3> = Vec::with_capacity(13);
        axes.extend_from_slice(&box_axes);
        axes.push(self.normal());
        for edge in &edges {
            for box_axis in &box_axes {
                axes.push(edge.cross(box_axis));
            }
        }

        let mut best: Option<TriangleContact> = None;
        for axis in axes {
            let Some(axis) = axis.try_normalize(EPSILON) else {
                continue; // Degenerate axis
            };

            let p0 = axis.dot(&self.v0);
            let p1 = axis.dot(&self.v1);
            let p2 = axis.dot(&self.v2);
            let tri_min = p0.min(p1).min(p2);
            let tri_max = p0.max(p1).max(p2);

            let box_center = axis.dot(&center);
            let radius = half.x * axis.x.abs() + half.y * axis.y.abs() + half.z * axis.z.abs();
            let box_min = box_center - radius;
            let box_max = box_center + radius;

            // Distance the box must travel along +axis or -axis to separate
            let push_positive = tri_max - box_min;
            let push_negative = box_max - tri_min;
            if push_positive < 0.0 || push_negative < 0.0 {
                return None;
            }

            let (normal, depth) = if push_positive <= push_negative {
                (axis, push_positive)
            } else {
                (-axis, push_negative)
            };
            if best.map_or(true, |b| depth < b.depth) {
                best = Some(TriangleContact { normal, depth });
            }
        }

        best
    }

    /// Test if this triangle intersects another triangle
    /// Uses proper Separating Axis Theorem (SAT)
    /// Tests 11 potential separating axes:
    /// - 2 face normals (one per triangle)
    /// - 9 edge-edge cross products
    ///
    /// Parallel triangles add the 6 in-plane edge normals, since every
    /// edge-edge product collapses onto the shared face normal.
    pub fn intersects_triangle(&self, other: &Triangle) -> bool {
        // Helper to project a triangle onto an axis and get min/max
        fn project_triangle(tri: &Triangle, axis: Vec3) -> (f32, f32) {
            let p0 = axis.dot(&tri.v0);
            let p1 = axis.dot(&tri.v1);
            let p2 = axis.dot(&tri.v2);
            (p0.min(p1).min(p2), p0.max(p1).max(p2))
        }

        // Test axis (returns false if it's a separating axis)
        fn test_axis(tri1: &Triangle, tri2: &Triangle, axis: Vec3) -> bool {
            let Some(axis) = axis.try_normalize(EPSILON) else {
                return true; // Degenerate axis, skip
            };
            let (min1, max1) = project_triangle(tri1, axis);
            let (min2, max2) = project_triangle(tri2, axis);
            max1 >= min2 && max2 >= min1
        }

        let edges1 = [self.v1 - self.v0, self.v2 - self.v1, self.v0 - self.v2];
        let edges2 = [other.v1 - other.v0, other.v2 - other.v1, other.v0 - other.v2];

        let normal1 = edges1[0].cross(&edges1[1]);
        let normal2 = edges2[0].cross(&edges2[1]);
        if !test_axis(self, other, normal1) || !test_axis(self, other, normal2) {
            return false;
        }

        let parallel = normal1.cross(&normal2).norm_squared()
            <= EPSILON * normal1.norm_squared() * normal2.norm_squared();
        if parallel {
            let in_plane = edges1
                .iter()
                .map(|edge| normal1.cross(edge))
                .chain(edges2.iter().map(|edge| normal2.cross(edge)));
            for axis in in_plane {
                if !test_axis(self, other, axis) {
                    return false;
                }
            }
            return true;
        }

        for edge1 in &edges1 {
            for edge2 in &edges2 {
                if !test_axis(self, other, edge1.cross(edge2)) {
                    return false;
                }
            }
        }

        // No separating axis found = triangles intersect
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn floor_triangle() -> Triangle {
        Triangle::new(
            Vec3::new(-5.0, 0.0, -5.0),
            Vec3::new(-5.0, 0.0, 5.0),
            Vec3::new(5.0, 0.0, -5.0),
        )
    }

    #[test]
    fn test_aabb_intersection() {
        let aabb1 = AABB::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 2.0, 2.0));
        let aabb2 = AABB::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(3.0, 3.0, 3.0));
        let aabb3 = AABB::new(Vec3::new(5.0, 5.0, 5.0), Vec3::new(7.0, 7.0, 7.0));

        assert!(aabb1.intersects(&aabb2));
        assert!(aabb2.intersects(&aabb1));
        assert!(!aabb1.intersects(&aabb3));
    }

    #[test]
    fn test_aabb_touching_faces_intersect() {
        let a = AABB::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        let b = AABB::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        assert!(a.intersects(&b));
        assert_relative_eq!(a.overlap(&b).x, 0.0);
    }

    #[test]
    fn test_aabb_from_points() {
        let aabb = AABB::from_points([
            Vec3::new(1.0, -2.0, 3.0),
            Vec3::new(-1.0, 4.0, 0.0),
        ])
        .unwrap();
        assert_relative_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_relative_eq!(aabb.max, Vec3::new(1.0, 4.0, 3.0));
        assert!(AABB::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_aabb_ray_slab() {
        let aabb = AABB::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let hit = aabb.intersect_ray(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        assert_relative_eq!(hit.unwrap(), 9.0);

        let miss = aabb.intersect_ray(Vec3::new(5.0, 10.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        assert!(miss.is_none());
    }

    #[test]
    fn test_ray_triangle_hit() {
        let ray = Ray::down(Vec3::new(1.0, 10.0, -1.0));
        let (t, _, _) = floor_triangle().intersect_ray(&ray).unwrap();
        assert_relative_eq!(t, 10.0);
    }

    #[test]
    fn test_ray_triangle_behind_origin() {
        let ray = Ray::new(Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        assert!(floor_triangle().intersect_ray(&ray).is_none());
    }

    #[test]
    fn test_triangle_aabb_contact_points_up() {
        let aabb = AABB::new(Vec3::new(-1.0, -0.25, -1.0), Vec3::new(0.0, 1.75, 0.0));
        let contact = floor_triangle().intersect_aabb(&aabb).unwrap();
        assert_relative_eq!(contact.normal, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(contact.depth, 0.25, epsilon = 1e-5);
    }

    #[test]
    fn test_triangle_aabb_separated() {
        let aabb = AABB::new(Vec3::new(-1.0, 0.5, -1.0), Vec3::new(0.0, 1.5, 0.0));
        assert!(floor_triangle().intersect_aabb(&aabb).is_none());

        // Beyond the hypotenuse, only an edge axis separates
        let corner = AABB::new(Vec3::new(3.0, -0.5, 3.0), Vec3::new(4.0, 0.5, 4.0));
        assert!(floor_triangle().intersect_aabb(&corner).is_none());
    }

    #[test]
    fn test_triangle_triangle_sat() {
        let wall = Triangle::new(
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(-1.0, -1.0, 1.0),
        );
        assert!(floor_triangle().intersects_triangle(&wall));

        let far_wall = Triangle::new(
            Vec3::new(20.0, -1.0, 0.0),
            Vec3::new(20.0, 1.0, 0.0),
            Vec3::new(20.0, -1.0, 1.0),
        );
        assert!(!floor_triangle().intersects_triangle(&far_wall));
    }

    #[test]
    fn test_coplanar_triangles() {
        let lower = Triangle::new(Vec3::zeros(), Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 10.0));
        let upper = Triangle::new(
            Vec3::new(10.0, 0.0, 10.0),
            Vec3::new(10.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 10.0),
        );
        assert!(!lower.intersects_triangle(&upper));
        assert!(!upper.intersects_triangle(&lower));

        let overlapping = Triangle::new(
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(8.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 8.0),
        );
        assert!(lower.intersects_triangle(&overlapping));
    }

    #[test]
    fn test_degenerate_triangle_normal_is_zero() {
        let sliver = Triangle::new(Vec3::zeros(), Vec3::x(), Vec3::x() * 2.0);
        assert_relative_eq!(sliver.normal(), Vec3::zeros());
    }
}
