//! Box-like vs irregular model classification
//!
//! A heuristic: models that are roughly rectangular and have few triangles
//! collide as boxes, everything else gets precise triangle collision.
//! Decisions are memoized per model name.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::core::config::ShapeAnalyzerConfig;
use crate::foundation::logging::trace;
use super::collision::ModelMesh;

/// Result of shape analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeClass {
    /// A bounding box describes the model well enough
    BoxLike,
    /// The model needs per-triangle collision
    Irregular,
}

impl ShapeClass {
    /// Whether the model needs precise collision
    pub fn needs_precise(self) -> bool {
        self == Self::Irregular
    }
}

/// Classifies model meshes and remembers the answer per model name
#[derive(Debug, Default)]
pub struct ShapeAnalyzer {
    config: ShapeAnalyzerConfig,
    decisions: Mutex<HashMap<String, ShapeClass>>,
}

impl ShapeAnalyzer {
    /// Create an analyzer with the given thresholds
    pub fn new(config: ShapeAnalyzerConfig) -> Self {
        Self {
            config,
            decisions: Mutex::new(HashMap::new()),
        }
    }

    /// Classify a model mesh, reusing an earlier decision for the same name
    pub fn analyze_model_shape(&self, mesh: &ModelMesh, model_name: &str) -> ShapeClass {
        if let Some(class) = self.lock().get(model_name) {
            return *class;
        }

        let class = self.classify(mesh);
        trace!("Shape analysis for '{}': {:?}", model_name, class);
        self.lock().insert(model_name.to_string(), class);
        class
    }

    fn classify(&self, mesh: &ModelMesh) -> ShapeClass {
        let Some(bounds) = mesh.bounds() else {
            return ShapeClass::BoxLike;
        };

        let size = bounds.size();
        if size.iter().any(|d| !d.is_finite() || *d <= 0.0) {
            return ShapeClass::BoxLike;
        }

        let max_ratio = self.config.max_rectangular_ratio;
        let min_ratio = 1.0 / max_ratio;
        let rectangular = [size.x / size.y, size.x / size.z, size.y / size.z]
            .iter()
            .all(|ratio| (min_ratio..=max_ratio).contains(ratio));

        let triangles = mesh.triangle_count();
        if rectangular && triangles <= self.config.simple_triangle_limit {
            return ShapeClass::BoxLike;
        }

        if !rectangular || triangles > self.config.complex_triangle_limit {
            return ShapeClass::Irregular;
        }

        if analyze_geometry_irregularity(mesh) {
            ShapeClass::Irregular
        } else {
            ShapeClass::BoxLike
        }
    }

    /// Forget every memoized decision
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of memoized decisions
    pub fn memoized(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ShapeClass>> {
        // A poisoned memo only ever holds complete entries
        self.decisions.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// True when more than a third of the mesh's triangles sit in irregular parts
///
/// A part counts as one irregular feature when it has more than two
/// vertices per triangle (unshared, faceted geometry).
pub fn analyze_geometry_irregularity(mesh: &ModelMesh) -> bool {
    let total = mesh.triangle_count();
    let irregular = mesh
        .parts
        .iter()
        .filter(|part| !part.vertices.is_empty())
        .filter(|part| part.vertices.len() > part.triangle_count() * 2)
        .count();

    total > 0 && irregular * 3 > total
}
