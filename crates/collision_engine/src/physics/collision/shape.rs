//! Collision shapes owned by the collision manager
//!
//! Every shape stores its world-space bounding box, computed once at
//! construction. Precise shapes additionally own a BVH over their
//! world-space triangles.

use std::sync::Arc;

use crate::foundation::math::{utils, Transform, Vec3};
use crate::physics::error::CollisionError;
use super::bvh::Bvh;
use super::mesh::ModelMesh;
use super::primitives::{Ray, RayHit, AABB};

/// Which kind of shape to build from a mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionKind {
    /// Axis-aligned bounding box of the transformed mesh
    Box,
    /// BVH over the transformed triangles
    Precise,
}

/// Geometry of a collision shape
#[derive(Debug, Clone)]
pub enum ShapeKind {
    /// Axis-aligned box
    Box {
        /// World-space center
        center: Vec3,
        /// Half size along each axis
        half_extents: Vec3,
    },
    /// Triangle BVH in world space
    Precise {
        /// Tree over the world-space triangles
        bvh: Bvh,
        /// Placement the triangles were built with
        transform: Transform,
    },
}

/// Outcome of a detailed box-vs-shape test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResult {
    /// Whether the shapes touch or overlap
    pub hit: bool,
    /// Translation that moves the query box out of the shape
    pub mtv: Vec3,
    /// Unit direction of `mtv`
    pub normal: Vec3,
    /// Length of `mtv`
    pub depth: f32,
}

impl CollisionResult {
    /// No contact
    pub fn none() -> Self {
        Self {
            hit: false,
            mtv: Vec3::zeros(),
            normal: Vec3::zeros(),
            depth: 0.0,
        }
    }

    fn contact(normal: Vec3, depth: f32) -> Self {
        Self {
            hit: true,
            mtv: normal * depth,
            normal,
            depth,
        }
    }
}

/// One collidable volume
#[derive(Debug, Clone)]
pub struct CollisionShape {
    bounds: AABB,
    kind: ShapeKind,
    model: Option<Arc<str>>,
}

impl CollisionShape {
    /// Creates a box shape from its center and half extents
    pub fn new_box(center: Vec3, half_extents: Vec3) -> Self {
        let half_extents = half_extents.abs();
        Self {
            bounds: AABB::from_center_extents(center, half_extents),
            kind: ShapeKind::Box { center, half_extents },
            model: None,
        }
    }

    /// Creates a box shape covering `aabb`
    pub fn from_aabb(aabb: AABB) -> Self {
        Self::new_box(aabb.center(), aabb.extents())
    }

    /// Builds a box or precise shape from a model-space mesh placed by `transform`
    pub fn from_mesh(
        mesh: &ModelMesh,
        kind: CollisionKind,
        transform: &Transform,
    ) -> Result<Self, CollisionError> {
        mesh.validate()?;
        if !transform.is_finite() {
            return Err(CollisionError::NonFiniteTransform(mesh.name.clone()));
        }

        let shape = match kind {
            CollisionKind::Box => {
                let local = mesh
                    .bounds()
                    .ok_or_else(|| CollisionError::EmptyMesh(mesh.name.clone()))?;
                Self::from_aabb(local.transformed(transform))
            }
            CollisionKind::Precise => {
                let triangles = mesh.triangles().map(|t| t.transformed(transform)).collect();
                Self::precise(Bvh::build(triangles), transform.clone())
                    .ok_or_else(|| CollisionError::EmptyMesh(mesh.name.clone()))?
            }
        };

        Ok(shape.with_model(mesh.name.as_str()))
    }

    fn precise(bvh: Bvh, transform: Transform) -> Option<Self> {
        let bounds = bvh.bounds()?;
        Some(Self {
            bounds,
            kind: ShapeKind::Precise { bvh, transform },
            model: None,
        })
    }

    /// Tag the shape with the model it was generated from
    pub fn with_model(mut self, model: impl Into<Arc<str>>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Copy of this shape moved by `placement`
    ///
    /// Precise shapes only shift their BVH when the placement is a pure
    /// translation; otherwise the triangles are transformed and re-split.
    pub fn placed(&self, placement: &Transform) -> Self {
        let kind_shape = match &self.kind {
            ShapeKind::Box { .. } if placement.is_pure_translation() => {
                Self::from_aabb(self.bounds.translated(placement.position))
            }
            ShapeKind::Box { .. } => Self::from_aabb(self.bounds.transformed(placement)),
            ShapeKind::Precise { bvh, transform } => {
                let moved = if placement.is_pure_translation() {
                    bvh.translated(placement.position)
                } else {
                    Bvh::build(bvh.triangles().iter().map(|t| t.transformed(placement)).collect())
                };
                let transform = placement.combine(transform);
                match Self::precise(moved, transform) {
                    Some(shape) => shape,
                    None => Self::from_aabb(self.bounds.transformed(placement)),
                }
            }
        };

        Self {
            model: self.model.clone(),
            ..kind_shape
        }
    }

    /// Box instance covering this shape's bounds after `placement`
    pub fn placed_box(&self, placement: &Transform) -> Self {
        Self {
            model: self.model.clone(),
            ..Self::from_aabb(self.bounds.transformed(placement))
        }
    }

    /// World-space bounding box
    pub fn bounding_box(&self) -> &AABB {
        &self.bounds
    }

    /// Shape geometry
    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// Model the shape was generated from, if any
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// True for BVH-backed shapes
    pub fn is_precise(&self) -> bool {
        matches!(self.kind, ShapeKind::Precise { .. })
    }

    /// BVH of a precise shape
    pub fn bvh(&self) -> Option<&Bvh> {
        match &self.kind {
            ShapeKind::Precise { bvh, .. } => Some(bvh),
            ShapeKind::Box { .. } => None,
        }
    }

    /// Placement a precise shape was built with
    pub fn transform(&self) -> Option<&Transform> {
        match &self.kind {
            ShapeKind::Precise { transform, .. } => Some(transform),
            ShapeKind::Box { .. } => None,
        }
    }

    /// Test if this shape intersects another shape (touching counts)
    pub fn intersects(&self, other: &CollisionShape) -> bool {
        if !self.bounds.intersects(&other.bounds) {
            return false;
        }

        match (&self.kind, &other.kind) {
            (ShapeKind::Box { .. }, ShapeKind::Box { .. }) => true,
            (ShapeKind::Box { .. }, ShapeKind::Precise { bvh, .. }) => bvh.overlaps_aabb(&self.bounds),
            (ShapeKind::Precise { bvh, .. }, ShapeKind::Box { .. }) => bvh.overlaps_aabb(&other.bounds),
            (ShapeKind::Precise { bvh: a, .. }, ShapeKind::Precise { bvh: b, .. }) => a.intersects_bvh(b),
        }
    }

    /// Detailed test of a query box against this shape
    ///
    /// The translation pushes the query out of this shape.
    pub fn check_detailed(&self, query: &AABB) -> CollisionResult {
        if !self.bounds.intersects(query) {
            return CollisionResult::none();
        }

        match &self.kind {
            ShapeKind::Box { .. } => {
                let overlap = self.bounds.overlap(query);
                let axis = if overlap.x <= overlap.y && overlap.x <= overlap.z {
                    0
                } else if overlap.y <= overlap.z {
                    1
                } else {
                    2
                };

                let mut normal = Vec3::zeros();
                normal[axis] = if utils::axis(&query.center(), axis) >= utils::axis(&self.bounds.center(), axis) {
                    1.0
                } else {
                    -1.0
                };
                CollisionResult::contact(normal, utils::axis(&overlap, axis))
            }
            ShapeKind::Precise { bvh, .. } => bvh
                .contact_aabb(query)
                .map_or_else(CollisionResult::none, |c| CollisionResult::contact(c.normal, c.depth)),
        }
    }

    /// Nearest hit along `ray` within `max_distance`
    pub fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<RayHit> {
        match &self.kind {
            ShapeKind::Precise { bvh, .. } => bvh.raycast(ray, max_distance),
            ShapeKind::Box { center, half_extents } => {
                let distance = self.bounds.intersect_ray(ray.origin, ray.direction)?;
                if distance > max_distance {
                    return None;
                }

                let point = ray.point_at(distance);
                let local = point - center;
                let axis = (0..3)
                    .max_by(|&a, &b| {
                        let ra = (local[a] / half_extents[a].max(f32::EPSILON)).abs();
                        let rb = (local[b] / half_extents[b].max(f32::EPSILON)).abs();
                        ra.total_cmp(&rb)
                    })
                    .unwrap_or(1);
                let mut normal = Vec3::zeros();
                normal[axis] = if local[axis] >= 0.0 { 1.0 } else { -1.0 };
                Some(RayHit { distance, point, normal })
            }
        }
    }
}
