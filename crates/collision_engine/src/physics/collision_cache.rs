//! Shared base collision shapes
//!
//! Base shapes are keyed by model name and uniform scale and carry the
//! scale baked into their geometry. Instances are derived from a base by
//! applying rotation and translation only.
//!
//! The cache is shared by parallel population tasks, so the shape map
//! sits behind an `RwLock` and the per-model precise counters behind a
//! `Mutex`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::core::config::ModelCollisionConfig;
use crate::foundation::logging::debug;
use crate::foundation::math::{Quat, Transform, Vec3};
use super::collision::{CollisionKind, CollisionShape, ModelMesh};
use super::error::CollisionError;

/// Identity of a base shape: model name plus scale in thousandths
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollisionCacheKey {
    /// Model name
    pub model: String,
    /// Uniform scale multiplied by 1000 and rounded
    pub scale_milli: i64,
}

impl CollisionCacheKey {
    /// Build a key, quantizing `scale` to thousandths
    pub fn new(model: &str, scale: f32) -> Self {
        Self {
            model: model.to_string(),
            scale_milli: (f64::from(scale) * 1000.0).round() as i64,
        }
    }

    /// The quantized scale the key stands for
    pub fn scale(&self) -> f32 {
        (self.scale_milli as f64 / 1000.0) as f32
    }
}

impl fmt::Display for CollisionCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_s{}", self.model, self.scale_milli)
    }
}

/// Cache key for a model at a uniform scale
pub fn make_collision_cache_key(model_name: &str, scale: f32) -> CollisionCacheKey {
    CollisionCacheKey::new(model_name, scale)
}

/// Base shape cache plus per-model precise admission counters
#[derive(Debug)]
pub struct CollisionCache {
    shapes: RwLock<HashMap<CollisionCacheKey, Arc<CollisionShape>>>,
    precise_counts: Mutex<HashMap<String, usize>>,
    max_precise_per_model: usize,
}

impl CollisionCache {
    /// Create an empty cache with the given precise ceiling per model
    pub fn new(max_precise_per_model: usize) -> Self {
        Self {
            shapes: RwLock::new(HashMap::new()),
            precise_counts: Mutex::new(HashMap::new()),
            max_precise_per_model,
        }
    }

    /// Return the cached base shape for `model_name` at `scale`, building it on a miss
    ///
    /// An explicit precision in `config` wins over `needs_precise`.
    pub fn create_base_collision(
        &self,
        mesh: &ModelMesh,
        model_name: &str,
        scale: f32,
        config: Option<&ModelCollisionConfig>,
        needs_precise: bool,
    ) -> Result<Arc<CollisionShape>, CollisionError> {
        let key = make_collision_cache_key(model_name, scale);
        if let Some(shape) = self.get(&key) {
            return Ok(shape);
        }

        let precise = config.and_then(ModelCollisionConfig::needs_precise).unwrap_or(needs_precise);
        let kind = if precise { CollisionKind::Precise } else { CollisionKind::Box };
        let shape = CollisionShape::from_mesh(mesh, kind, &Transform::from_uniform_scale(key.scale()))?
            .with_model(model_name);
        debug!("Built {:?} base collision {}", kind, key);

        let mut shapes = self.shapes.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(shapes.entry(key).or_insert_with(|| Arc::new(shape))))
    }

    /// Fresh precise instance built straight from the mesh
    pub fn create_precise_instance_collision(
        &self,
        mesh: &ModelMesh,
        position: Vec3,
        rotation: Quat,
        scale: f32,
    ) -> Result<CollisionShape, CollisionError> {
        CollisionShape::from_mesh(
            mesh,
            CollisionKind::Precise,
            &Transform::placement(position, rotation, scale),
        )
    }

    /// Precise instance reusing a cached base's triangles
    ///
    /// The base already carries its scale, so only rotation and
    /// translation are applied.
    pub fn create_precise_instance_collision_from_cached(
        &self,
        base: &CollisionShape,
        position: Vec3,
        rotation: Quat,
    ) -> CollisionShape {
        base.placed(&Transform::from_position_rotation(position, rotation))
    }

    /// Box instance covering a cached base's bounds after placement
    pub fn create_simple_aabb_instance_collision(
        &self,
        base: &CollisionShape,
        position: Vec3,
        rotation: Quat,
    ) -> CollisionShape {
        base.placed_box(&Transform::from_position_rotation(position, rotation))
    }

    /// Claim one precise slot for `model_name`; false once the ceiling is reached
    pub fn try_admit_precise(&self, model_name: &str) -> bool {
        let mut counts = self.counts();
        let count = counts.entry(model_name.to_string()).or_insert(0);
        if *count < self.max_precise_per_model {
            *count += 1;
            true
        } else {
            false
        }
    }

    /// Hand back `count` precise slots claimed for `model_name`
    pub fn release_precise(&self, model_name: &str, count: usize) {
        if let Some(claimed) = self.counts().get_mut(model_name) {
            *claimed = claimed.saturating_sub(count);
        }
    }

    /// Precise instances admitted so far for `model_name`
    pub fn precise_count(&self, model_name: &str) -> usize {
        self.counts().get(model_name).copied().unwrap_or(0)
    }

    /// Look up a base shape
    pub fn get(&self, key: &CollisionCacheKey) -> Option<Arc<CollisionShape>> {
        self.shapes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Number of cached base shapes
    pub fn len(&self) -> usize {
        self.shapes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True when no base shape is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every base shape and reset the precise counters
    pub fn clear(&self) {
        self.shapes.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.counts().clear();
    }

    fn counts(&self) -> MutexGuard<'_, HashMap<String, usize>> {
        self.precise_counts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CollisionCache {
    fn default() -> Self {
        Self::new(50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::CollisionPrecision;
    use approx::assert_relative_eq;

    fn crate_mesh() -> ModelMesh {
        ModelMesh::cuboid("crate", Vec3::new(0.0, 0.5, 0.0), Vec3::new(0.5, 0.5, 0.5))
    }

    #[test]
    fn test_key_quantizes_scale() {
        assert_eq!(make_collision_cache_key("tree", 1.0).to_string(), "tree_s1000");
        assert_eq!(make_collision_cache_key("tree", 1.0001), make_collision_cache_key("tree", 1.0));
        assert_ne!(make_collision_cache_key("tree", 1.5), make_collision_cache_key("tree", 1.0));
        assert_eq!(make_collision_cache_key("tree", 0.0125).scale_milli, 13);
    }

    #[test]
    fn test_base_shape_is_shared() {
        let cache = CollisionCache::default();
        let mesh = crate_mesh();

        let a = cache.create_base_collision(&mesh, "crate", 2.0, None, false).unwrap();
        let b = cache.create_base_collision(&mesh, "crate", 2.0004, None, true).unwrap();
        let c = cache.create_base_collision(&mesh, "crate", 3.0, None, false).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);
        assert_relative_eq!(a.bounding_box().max, Vec3::new(1.0, 2.0, 1.0));
    }

    #[test]
    fn test_config_override_wins() {
        let cache = CollisionCache::default();
        let precise = ModelCollisionConfig::with_precision(CollisionPrecision::Precise);
        let base = cache
            .create_base_collision(&crate_mesh(), "crate", 1.0, Some(&precise), false)
            .unwrap();
        assert!(base.is_precise());
    }

    #[test]
    fn test_instances_from_cached_base() {
        let cache = CollisionCache::default();
        let base = cache.create_base_collision(&crate_mesh(), "crate", 2.0, None, true).unwrap();
        let position = Vec3::new(10.0, 0.0, -4.0);

        let precise = cache.create_precise_instance_collision_from_cached(&base, position, Quat::identity());
        assert!(precise.is_precise());
        assert_relative_eq!(precise.bounding_box().min, Vec3::new(9.0, 0.0, -5.0), epsilon = 1e-5);

        let boxed = cache.create_simple_aabb_instance_collision(&base, position, Quat::identity());
        assert!(!boxed.is_precise());
        assert_relative_eq!(boxed.bounding_box().center(), Vec3::new(10.0, 1.0, -4.0), epsilon = 1e-5);
        assert_relative_eq!(boxed.bounding_box().extents(), Vec3::new(1.0, 1.0, 1.0), epsilon = 1e-5);

        let direct = cache
            .create_precise_instance_collision(&crate_mesh(), position, Quat::identity(), 2.0)
            .unwrap();
        assert_relative_eq!(direct.bounding_box().min, precise.bounding_box().min, epsilon = 1e-5);
    }

    #[test]
    fn test_precise_ceiling() {
        let cache = CollisionCache::new(3);
        let admitted = (0..5).filter(|_| cache.try_admit_precise("rock")).count();
        assert_eq!(admitted, 3);
        assert_eq!(cache.precise_count("rock"), 3);
        assert!(cache.try_admit_precise("tree"));

        cache.release_precise("rock", 2);
        assert_eq!(cache.precise_count("rock"), 1);
        cache.release_precise("rock", 5);
        assert_eq!(cache.precise_count("rock"), 0);
        cache.release_precise("cliff", 1);
        assert_eq!(cache.precise_count("cliff"), 0);
        assert_eq!((0..5).filter(|_| cache.try_admit_precise("rock")).count(), 3);

        cache.clear();
        assert_eq!(cache.precise_count("rock"), 0);
    }
}
