//! # Core Engine Module
//!
//! Shared abstractions that the collision subsystems depend on.
//!
//! ## Organization
//!
//! - **Config**: Collision tunables and per-model collision overrides
//! - **Foundation**: Low-level utilities (math, collections, logging)

pub mod config;

// Re-export foundation modules for convenience
pub use crate::foundation;

// Re-export commonly used config types
pub use config::{
    CollisionConfig,
    CollisionPrecision,
    ModelCollisionConfig,
    ModelConfigTable,
    PredictionCacheConfig,
    ShapeAnalyzerConfig,
    SpatialGridConfig,
    Config,
    ConfigError,
};
