//! Abstract spatial query interface for broad-phase collision detection
//!
//! Lets the collision manager swap partitioning schemes without touching
//! its query code. Implementations hand back candidate keys only; exact
//! tests stay with the caller.

use crate::physics::collision::AABB;

/// Broad-phase index over keyed bounding boxes
pub trait SpatialQuery<K: Copy>: Send + Sync {
    /// Insert a key with its world-space bounds
    fn insert(&mut self, key: K, bounds: &AABB);

    /// Remove a key; unknown keys are ignored
    fn remove(&mut self, key: K);

    /// Move a key to new bounds
    fn update(&mut self, key: K, bounds: &AABB) {
        self.remove(key);
        self.insert(key, bounds);
    }

    /// Candidates that may overlap `aabb`, sorted and without duplicates
    ///
    /// Returns `None` when the structure cannot answer cheaply (for
    /// example a non-finite or very large query); callers then fall back
    /// to a linear scan.
    fn query_aabb(&self, aabb: &AABB) -> Option<Vec<K>>;

    /// Candidates whose footprint covers the horizontal position `(x, z)`
    fn query_column(&self, x: f32, z: f32) -> Vec<K>;

    /// Clear all keys from the spatial structure
    fn clear(&mut self);

    /// Get the number of keys in the structure
    fn entity_count(&self) -> usize;
}
