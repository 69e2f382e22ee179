//! Scene description consumed by the collision engine
//!
//! The collision engine does not load maps or models itself. It reads
//! primitive scene objects and asks a [`ModelProvider`] for model meshes
//! and placements.
//!
//! ## Architecture
//!
//! ```text
//! Map / model loading (external)
//!      ↓
//! ModelProvider + SceneObject list
//!      ↓
//! CollisionManager
//! ```

mod model_library;

pub use model_library::ModelLibrary;

use std::sync::Arc;

use crate::core::config::ModelCollisionConfig;
use crate::foundation::math::{Quat, Transform, Vec2, Vec3};
use crate::physics::error::CollisionError;
pub use crate::physics::collision::{MeshPart, ModelMesh};

/// Kind of a scene object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneObjectKind {
    /// Axis-aligned cube scaled by the object scale
    Cube,
    /// Sphere with diameter equal to the object scale
    Sphere,
    /// Upright cylinder scaled by the object scale
    Cylinder,
    /// Horizontal plane sized by the object size
    Plane,
    /// Instance of a named model
    Model,
    /// Light source, never collides
    Light,
    /// Player or enemy spawn area, never collides
    SpawnZone,
}

/// One object of a loaded scene
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    /// Object kind
    pub kind: SceneObjectKind,
    /// World position
    pub position: Vec3,
    /// World rotation
    pub rotation: Quat,
    /// Per-axis scale
    pub scale: Vec3,
    /// Width and depth of planes
    pub size: Vec2,
    /// Model name for [`SceneObjectKind::Model`] objects
    pub model: Option<String>,
}

impl SceneObject {
    /// Object of `kind` at `position` with unit scale
    pub fn new(kind: SceneObjectKind, position: Vec3) -> Self {
        Self {
            kind,
            position,
            rotation: Quat::identity(),
            scale: Vec3::repeat(1.0),
            size: Vec2::repeat(1.0),
            model: None,
        }
    }

    /// Model object placing `model` at `position`
    pub fn model(model: impl Into<String>, position: Vec3) -> Self {
        Self {
            model: Some(model.into()),
            ..Self::new(SceneObjectKind::Model, position)
        }
    }

    /// Set the per-axis scale
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Set the plane size
    pub fn with_size(mut self, size: Vec2) -> Self {
        self.size = size;
        self
    }

    /// Set the rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }
}

/// Placement of one model instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelInstance {
    /// World position
    pub position: Vec3,
    /// World rotation
    pub rotation: Quat,
    /// Uniform scale
    pub scale: f32,
}

impl ModelInstance {
    /// Unrotated instance at `position` with uniform `scale`
    pub fn new(position: Vec3, scale: f32) -> Self {
        Self {
            position,
            rotation: Quat::identity(),
            scale,
        }
    }

    /// Set the rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Instance placement of a model scene object
    ///
    /// Non-uniform scales collapse to their largest component.
    pub fn from_scene_object(object: &SceneObject) -> Self {
        Self {
            position: object.position,
            rotation: object.rotation,
            scale: object.scale.max(),
        }
    }

    /// Full placement transform
    pub fn transform(&self) -> Transform {
        Transform::placement(self.position, self.rotation, self.scale)
    }

    /// True when the placement is finite and the scale positive
    pub fn is_valid(&self) -> bool {
        self.transform().is_finite() && self.scale > 0.0
    }
}

/// Source of model meshes, placements and per-model collision settings
///
/// Shared by parallel population tasks.
pub trait ModelProvider: Send + Sync {
    /// Names of every model the provider can load
    fn available_models(&self) -> Vec<String>;

    /// Mesh of a model, `None` if it cannot be loaded
    fn mesh(&self, name: &str) -> Option<Arc<ModelMesh>>;

    /// Mesh of a model, or [`CollisionError::ModelNotFound`]
    fn require_mesh(&self, name: &str) -> Result<Arc<ModelMesh>, CollisionError> {
        self.mesh(name).ok_or_else(|| CollisionError::ModelNotFound(name.to_string()))
    }

    /// Every placement of a model in the scene
    fn instances(&self, name: &str) -> Vec<ModelInstance>;

    /// Collision settings for a model
    fn model_config(&self, name: &str) -> Option<ModelCollisionConfig>;

    /// Whether instances of a model get colliders
    fn has_collision(&self, name: &str) -> bool {
        self.model_config(name).map_or(true, |config| config.has_collision)
    }
}
