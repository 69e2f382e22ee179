//! Collision geometry
//!
//! # Module Organization
//!
//! - [`primitives`] - Basic geometric primitives (boxes, rays, triangles)
//! - [`mesh`] - Model-space triangle meshes fed into collision building
//! - [`bvh`] - Bounding volume hierarchy over world-space triangles
//! - [`shape`] - Box and precise collision shapes
//!
//! # Key Types
//!
//! - [`CollisionShape`] - One collidable volume with its world-space bounds
//! - [`Bvh`] - Triangle tree backing precise shapes
//! - [`AABB`], [`Ray`], [`Triangle`] - Primitive geometric types

pub mod primitives;
pub mod mesh;
pub mod bvh;
pub mod shape;

// Re-export commonly used types
pub use primitives::{Ray, RayHit, Triangle, TriangleContact, AABB};
pub use mesh::{MeshPart, ModelMesh};
pub use bvh::{Bvh, BvhNode};
pub use shape::{CollisionKind, CollisionResult, CollisionShape, ShapeKind};
