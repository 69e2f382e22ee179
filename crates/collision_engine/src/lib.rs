//! # Collision Engine
//!
//! Collision detection and spatial queries for static level geometry and
//! dynamic entities.
//!
//! ## Features
//!
//! - **Two-tier shapes**: cheap boxes, or BVH-backed triangle meshes for
//!   irregular geometry
//! - **Shape analysis**: automatic box-or-precise decision per model
//! - **Shared base shapes**: one BVH per model and scale, reused by instances
//! - **Uniform grid**: horizontal broad phase with brute-force fallback
//! - **Prediction cache**: short-lived memo of repeated queries
//! - **Ground raycasts**: downward rays against precise geometry
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use collision_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let library = ModelLibrary::new()
//!         .with_mesh(ModelMesh::cuboid("crate", Vec3::zeros(), Vec3::repeat(0.5)))
//!         .with_instance("crate", ModelInstance::new(Vec3::new(2.0, 0.5, 0.0), 1.0));
//!
//!     let mut manager = CollisionManager::new(CollisionConfig::default())?;
//!     manager.create_auto_collisions_from_models(&library)?;
//!
//!     let player = CollisionShape::new_box(Vec3::new(2.0, 1.0, 0.0), Vec3::new(0.3, 0.9, 0.3));
//!     let contact = manager.check_collision_with_response(&player);
//!     if contact.colliding {
//!         println!("push by {:?}", contact.response);
//!     }
//!     manager.update_frame_cache();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod core;
pub mod config;
pub mod foundation;

// Collision subsystems
pub mod physics;
pub mod spatial;
pub mod scene;
pub mod debug;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{
            CollisionConfig, CollisionPrecision, Config, ConfigError, ModelCollisionConfig, ModelConfigTable,
        },
        debug::CollisionDebugVisualizer,
        foundation::{
            collections::ColliderKey,
            math::{Quat, Transform, Vec2, Vec3},
        },
        physics::{
            CollisionError, CollisionKind, CollisionManager, CollisionShape, ContactResponse, EntityId,
            GroundHit, ModelMesh, PopulationReport, Ray, RaycastFilter, AABB,
        },
        scene::{ModelInstance, ModelLibrary, ModelProvider, SceneObject, SceneObjectKind},
        spatial::{SpatialGrid, SpatialQuery},
    };
}
