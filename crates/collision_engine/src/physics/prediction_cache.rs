//! Short-lived memo of collision query results
//!
//! Entries are keyed by a fingerprint of the query's bounding box and are
//! valid for a fixed number of frames after they were stored. A hit also
//! compares the stored bounds bit-for-bit, so two queries sharing a
//! fingerprint never see each other's result.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::core::config::PredictionCacheConfig;
use super::collision::AABB;
use crate::foundation::math::Vec3;

/// Fingerprint of a query bounding box
pub type QueryFingerprint = u64;

/// Exact bit patterns of a bounding box
type BoundsBits = [u32; 6];

fn bounds_bits(bounds: &AABB) -> BoundsBits {
    [
        bounds.min.x.to_bits(),
        bounds.min.y.to_bits(),
        bounds.min.z.to_bits(),
        bounds.max.x.to_bits(),
        bounds.max.y.to_bits(),
        bounds.max.z.to_bits(),
    ]
}

/// Deterministic fingerprint of a query's bounding box
pub fn prediction_cache_hash(bounds: &AABB) -> QueryFingerprint {
    let mut hasher = DefaultHasher::new();
    bounds_bits(bounds).hash(&mut hasher);
    hasher.finish()
}

/// A memoized query result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Whether the query collided
    pub colliding: bool,
    /// Response vector computed for the query
    pub response: Vec3,
    /// Frame the entry was stored on
    pub frame: u64,
}

#[derive(Debug, Clone)]
struct Entry {
    prediction: Prediction,
    bounds: BoundsBits,
}

/// Frame-stamped query result cache
#[derive(Debug, Clone)]
pub struct PredictionCache {
    entries: HashMap<QueryFingerprint, Entry>,
    current_frame: u64,
    lifetime_frames: u64,
    max_entries: usize,
}

impl PredictionCache {
    /// Create an empty cache
    pub fn new(config: &PredictionCacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            current_frame: 0,
            lifetime_frames: config.lifetime_frames.max(1),
            max_entries: config.max_entries.max(1),
        }
    }

    /// Current frame counter
    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    /// Advance the frame counter by one tick
    pub fn update_frame(&mut self) {
        self.current_frame += 1;
    }

    /// Valid entry for this query, if one was stored within the lifetime
    pub fn lookup(&self, bounds: &AABB) -> Option<Prediction> {
        let entry = self.entries.get(&prediction_cache_hash(bounds))?;
        if entry.bounds != bounds_bits(bounds) || self.is_expired(entry) {
            return None;
        }
        Some(entry.prediction)
    }

    /// Store a result for this query at the current frame
    pub fn store(&mut self, bounds: &AABB, colliding: bool, response: Vec3) {
        let key = prediction_cache_hash(bounds);
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.make_room();
        }

        self.entries.insert(
            key,
            Entry {
                prediction: Prediction {
                    colliding,
                    response,
                    frame: self.current_frame,
                },
                bounds: bounds_bits(bounds),
            },
        );
    }

    /// Drop entries at or past the lifetime
    pub fn clear_expired(&mut self) {
        let (frame, lifetime) = (self.current_frame, self.lifetime_frames);
        self.entries
            .retain(|_, entry| frame.saturating_sub(entry.prediction.frame) < lifetime);
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        self.current_frame.saturating_sub(entry.prediction.frame) >= self.lifetime_frames
    }

    /// Evict expired entries, then the oldest until one slot is free
    fn make_room(&mut self) {
        self.clear_expired();
        if self.entries.len() < self.max_entries {
            return;
        }

        let mut by_age: Vec<(u64, QueryFingerprint)> = self
            .entries
            .iter()
            .map(|(key, entry)| (entry.prediction.frame, *key))
            .collect();
        by_age.sort_unstable();

        let excess = self.entries.len() + 1 - self.max_entries;
        for (_, key) in by_age.into_iter().take(excess) {
            self.entries.remove(&key);
        }
    }
}

impl Default for PredictionCache {
    fn default() -> Self {
        Self::new(&PredictionCacheConfig::default())
    }
}
