//! Collision detection and spatial queries
//!
//! Static level geometry is registered once through
//! [`CollisionManager::create_auto_collisions_from_models_selective`] and
//! [`CollisionManager::add_scene_objects`]; dynamic entities register their
//! own colliders. Per-frame queries then go through the manager.

pub mod collision;
pub mod error;
pub mod shape_analyzer;
pub mod collision_cache;
pub mod prediction_cache;
pub mod collision_manager;
pub mod population;

pub use collision::{
    Bvh,
    CollisionKind,
    CollisionResult,
    CollisionShape,
    ModelMesh,
    MeshPart,
    Ray,
    RayHit,
    Triangle,
    AABB,
};
pub use error::CollisionError;
pub use shape_analyzer::{analyze_geometry_irregularity, ShapeAnalyzer, ShapeClass};
pub use collision_cache::{make_collision_cache_key, CollisionCache, CollisionCacheKey};
pub use prediction_cache::{prediction_cache_hash, Prediction, PredictionCache, QueryFingerprint};
pub use collision_manager::{CollisionManager, ContactResponse, EntityId, GroundHit, RaycastFilter};
pub use population::{ModelCollisionTask, PopulationReport};
