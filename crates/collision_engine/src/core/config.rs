//! # Collision Configuration
//!
//! Tunables for the collision engine and the per-model collision overrides
//! consumed from the external model configuration source.
//!
//! ## Configuration Categories
//!
//! - **Spatial**: grid cell size and the oversized-shape cutoff
//! - **Admission**: precise-collision ceiling and per-model instance limit
//! - **Prediction**: prediction cache lifetime and capacity
//! - **Analysis**: shape analyzer thresholds
//! - **Models**: per-model "needs precise collision" overrides

use serde::{Serialize, Deserialize};
use std::collections::HashMap;

pub use crate::config::{Config, ConfigError, ConfigFormat};

/// # Spatial Grid Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialGridConfig {
    /// Edge length of one horizontal grid cell in world units
    pub cell_size: f32,
    /// Shapes covering more cells than this are kept in an always-checked list
    pub max_cells_per_shape: usize,
}

impl Default for SpatialGridConfig {
    fn default() -> Self {
        Self {
            cell_size: 10.0,
            max_cells_per_shape: 1024,
        }
    }
}

/// # Prediction Cache Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionCacheConfig {
    /// Number of frames an entry stays valid
    pub lifetime_frames: u64,
    /// Maximum number of entries before eviction
    pub max_entries: usize,
}

impl Default for PredictionCacheConfig {
    fn default() -> Self {
        Self {
            lifetime_frames: 5,
            max_entries: 1000,
        }
    }
}

/// # Shape Analyzer Configuration
///
/// Thresholds for the box-like vs irregular decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeAnalyzerConfig {
    /// Largest aspect ratio between any two box dimensions still treated as rectangular
    pub max_rectangular_ratio: f32,
    /// Triangle count at or below which a rectangular model is box-like
    pub simple_triangle_limit: usize,
    /// Triangle count above which a model is always irregular
    pub complex_triangle_limit: usize,
}

impl Default for ShapeAnalyzerConfig {
    fn default() -> Self {
        Self {
            max_rectangular_ratio: 10.0,
            simple_triangle_limit: 12,
            complex_triangle_limit: 100,
        }
    }
}

/// # Collision Engine Configuration
///
/// Top-level configuration for the collision manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Spatial grid settings
    pub grid: SpatialGridConfig,
    /// Prediction cache settings
    pub prediction: PredictionCacheConfig,
    /// Shape analyzer thresholds
    pub analyzer: ShapeAnalyzerConfig,
    /// Maximum precise (BVH) collisions per model name
    pub max_precise_per_model: usize,
    /// Maximum number of instances turned into colliders per model
    pub max_instances_per_model: usize,
    /// Maximum number of model names accepted by one population request
    pub max_models_per_request: usize,
}

impl CollisionConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self {
            grid: SpatialGridConfig::default(),
            prediction: PredictionCacheConfig::default(),
            analyzer: ShapeAnalyzerConfig::default(),
            max_precise_per_model: 50,
            max_instances_per_model: 1000,
            max_models_per_request: 1000,
        }
    }

    /// Set the spatial grid cell size
    pub fn with_cell_size(mut self, cell_size: f32) -> Self {
        self.grid.cell_size = cell_size;
        self
    }

    /// Set the per-model precise collision ceiling
    pub fn with_max_precise_per_model(mut self, limit: usize) -> Self {
        self.max_precise_per_model = limit;
        self
    }

    /// Set prediction cache lifetime and capacity
    pub fn with_prediction_cache(mut self, lifetime_frames: u64, max_entries: usize) -> Self {
        self.prediction.lifetime_frames = lifetime_frames;
        self.prediction.max_entries = max_entries;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.grid.cell_size.is_finite() && self.grid.cell_size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "grid cell size must be a positive number, got {}",
                self.grid.cell_size
            )));
        }

        if self.grid.max_cells_per_shape == 0 {
            return Err(ConfigError::Invalid("max cells per shape must be at least 1".to_string()));
        }

        if self.prediction.lifetime_frames == 0 {
            return Err(ConfigError::Invalid("prediction lifetime must be at least 1 frame".to_string()));
        }

        if self.analyzer.max_rectangular_ratio < 1.0 {
            return Err(ConfigError::Invalid("rectangular ratio must be at least 1.0".to_string()));
        }

        if self.analyzer.simple_triangle_limit > self.analyzer.complex_triangle_limit {
            return Err(ConfigError::Invalid(
                "simple triangle limit cannot exceed complex triangle limit".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for CollisionConfig {}

/// Requested collision precision for a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollisionPrecision {
    /// Let the shape analyzer decide
    #[default]
    Auto,
    /// Always use the bounding box
    BoxOnly,
    /// Always build a BVH over the triangles
    Precise,
}

/// Per-model collision configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelCollisionConfig {
    /// Whether instances of this model get colliders at all
    pub has_collision: bool,
    /// Precision override
    pub precision: CollisionPrecision,
}

impl ModelCollisionConfig {
    /// Model without colliders
    pub fn disabled() -> Self {
        Self {
            has_collision: false,
            precision: CollisionPrecision::Auto,
        }
    }

    /// Collidable model with analyzer-driven precision
    pub fn auto() -> Self {
        Self {
            has_collision: true,
            precision: CollisionPrecision::Auto,
        }
    }

    /// Collidable model with an explicit precision
    pub fn with_precision(precision: CollisionPrecision) -> Self {
        Self {
            has_collision: true,
            precision,
        }
    }

    /// The explicit "needs precise collision" answer, if any
    pub fn needs_precise(&self) -> Option<bool> {
        match self.precision {
            CollisionPrecision::Auto => None,
            CollisionPrecision::BoxOnly => Some(false),
            CollisionPrecision::Precise => Some(true),
        }
    }
}

impl Default for ModelCollisionConfig {
    fn default() -> Self {
        Self::auto()
    }
}

/// Model name to collision configuration lookup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfigTable {
    /// Per-model entries
    pub models: HashMap<String, ModelCollisionConfig>,
}

impl ModelConfigTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a model entry
    pub fn with_model(mut self, name: impl Into<String>, config: ModelCollisionConfig) -> Self {
        self.models.insert(name.into(), config);
        self
    }

    /// Look up a model entry
    pub fn get(&self, name: &str) -> Option<&ModelCollisionConfig> {
        self.models.get(name)
    }

    /// Key-to-boolean precision override lookup
    pub fn needs_precise(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ModelCollisionConfig::needs_precise)
    }
}

impl Config for ModelConfigTable {}
