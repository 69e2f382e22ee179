//! Collision manager
//!
//! Owns every static collider plus the structures that make queries cheap:
//! the shared base-shape cache, the horizontal grid and the prediction
//! cache. Dynamic entity colliders live beside the static ones in their
//! own grid.
//!
//! Queries run on the simulation thread. Pure queries take `&self`;
//! queries that record into the prediction cache take `&mut self`.

use std::collections::HashMap;

use crate::core::config::{CollisionConfig, ConfigError};
use crate::foundation::collections::{ColliderKey, ColliderMap};
use crate::foundation::logging::{debug, trace};
use crate::foundation::math::{Transform, Vec3};
use crate::spatial::{SpatialGrid, SpatialQuery};
use super::collision::{CollisionShape, Ray, RayHit, AABB};
use super::collision_cache::CollisionCache;
use super::prediction_cache::{prediction_cache_hash, PredictionCache, QueryFingerprint};
use super::shape_analyzer::ShapeAnalyzer;

/// Identity of a dynamic entity collider, assigned by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

/// Result of a collision query with response
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactResponse {
    /// Whether the query touches any collider
    pub colliding: bool,
    /// Translation that resolves the contact, zero when not colliding
    pub response: Vec3,
}

impl ContactResponse {
    /// Not colliding
    pub fn none() -> Self {
        Self {
            colliding: false,
            response: Vec3::zeros(),
        }
    }
}

/// Ground found below a point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundHit {
    /// Distance from the ray origin down to the surface
    pub distance: f32,
    /// Surface point
    pub point: Vec3,
    /// Surface normal facing the ray
    pub normal: Vec3,
    /// Collider that was hit
    pub collider: ColliderKey,
}

/// Which colliders a raycast considers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RaycastFilter {
    /// Precise (BVH) colliders only
    #[default]
    PreciseOnly,
    /// Every collider, boxes included
    All,
}

/// Owner of all collision shapes and the public query API
#[derive(Debug)]
pub struct CollisionManager {
    pub(super) config: CollisionConfig,
    colliders: ColliderMap<CollisionShape>,
    order: Vec<ColliderKey>,
    pub(super) cache: CollisionCache,
    pub(super) analyzer: ShapeAnalyzer,
    grid: SpatialGrid<ColliderKey>,
    prediction: PredictionCache,
    entities: HashMap<EntityId, CollisionShape>,
    entity_grid: SpatialGrid<EntityId>,
}

impl CollisionManager {
    /// Create an empty manager after validating `config`
    pub fn new(config: CollisionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: CollisionConfig) -> Self {
        Self {
            colliders: ColliderMap::with_key(),
            order: Vec::new(),
            cache: CollisionCache::new(config.max_precise_per_model),
            analyzer: ShapeAnalyzer::new(config.analyzer.clone()),
            grid: SpatialGrid::new(&config.grid),
            prediction: PredictionCache::new(&config.prediction),
            entities: HashMap::new(),
            entity_grid: SpatialGrid::new(&config.grid),
            config,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    /// Shared base-shape cache
    pub fn collision_cache(&self) -> &CollisionCache {
        &self.cache
    }

    /// Shape analyzer and its memoized decisions
    pub fn shape_analyzer(&self) -> &ShapeAnalyzer {
        &self.analyzer
    }

    /// Static collider grid
    pub fn spatial_grid(&self) -> &SpatialGrid<ColliderKey> {
        &self.grid
    }

    /// Prediction cache
    pub fn prediction_cache(&self) -> &PredictionCache {
        &self.prediction
    }

    // ----- collider list -----

    /// Register a static collider
    pub fn add_collider(&mut self, shape: CollisionShape) -> ColliderKey {
        let key = self.insert_collider(shape);
        self.colliders_changed();
        key
    }

    /// Insert without invalidating derived state; callers invalidate once afterwards
    pub(super) fn insert_collider(&mut self, shape: CollisionShape) -> ColliderKey {
        let key = self.colliders.insert(shape);
        self.order.push(key);
        key
    }

    pub(super) fn colliders_changed(&mut self) {
        self.grid.mark_dirty();
        self.prediction.clear();
    }

    /// Remove a static collider
    pub fn remove_collider(&mut self, key: ColliderKey) -> Option<CollisionShape> {
        let shape = self.colliders.remove(key)?;
        self.order.retain(|&k| k != key);
        self.colliders_changed();
        Some(shape)
    }

    /// Drop every static collider along with the cache, counters, grid,
    /// prediction cache and analyzer memo
    ///
    /// Entity colliders are left alone.
    pub fn clear_colliders(&mut self) {
        self.colliders.clear();
        self.order.clear();
        self.cache.clear();
        self.analyzer.clear();
        self.grid.rebuild(std::iter::empty());
        self.prediction.clear();
        debug!("Cleared all static colliders");
    }

    /// Look up a static collider
    pub fn collider(&self, key: ColliderKey) -> Option<&CollisionShape> {
        self.colliders.get(key)
    }

    /// Static colliders in insertion order
    pub fn colliders(&self) -> impl Iterator<Item = (ColliderKey, &CollisionShape)> + '_ {
        self.order
            .iter()
            .filter_map(|&key| self.colliders.get(key).map(|shape| (key, shape)))
    }

    /// Number of static colliders
    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    /// Rebuild both grids from the current colliders and clear the dirty flag
    pub fn update_spatial_partitioning(&mut self) {
        let colliders = &self.colliders;
        self.grid.rebuild(
            self.order
                .iter()
                .filter_map(|&key| colliders.get(key).map(|shape| (key, *shape.bounding_box()))),
        );
        self.entity_grid
            .rebuild(self.entities.iter().map(|(&id, shape)| (id, *shape.bounding_box())));
        trace!(
            "Spatial grid rebuilt: {} colliders in {} cells",
            self.colliders.len(),
            self.grid.cell_count()
        );
    }

    // ----- static queries -----

    /// Brute-force test of `query` against every static collider
    pub fn check_collision(&self, query: &CollisionShape) -> bool {
        self.colliders.values().any(|shape| shape.intersects(query))
    }

    /// Grid-accelerated test with the same answer as [`Self::check_collision`]
    ///
    /// Falls back to brute force while the grid is out of date or when the
    /// query is too large for the grid to answer.
    pub fn check_collision_spatial(&self, query: &CollisionShape) -> bool {
        match self.spatial_candidates(query.bounding_box()) {
            Some(keys) => keys
                .into_iter()
                .filter_map(|key| self.colliders.get(key))
                .any(|shape| shape.intersects(query)),
            None => self.check_collision(query),
        }
    }

    fn spatial_candidates(&self, bounds: &AABB) -> Option<Vec<ColliderKey>> {
        if self.grid.is_dirty() {
            return None;
        }
        self.grid.query_aabb(bounds)
    }

    /// Collision test that also returns a resolving translation
    ///
    /// The query is treated as its bounding box. Pushes off walkable
    /// surfaces (normal pointing up) win over side pushes; within each
    /// group the shortest translation wins. Results are memoized in the
    /// prediction cache.
    pub fn check_collision_with_response(&mut self, query: &CollisionShape) -> ContactResponse {
        let bounds = *query.bounding_box();
        if let Some(prediction) = self.prediction.lookup(&bounds) {
            return ContactResponse {
                colliding: prediction.colliding,
                response: prediction.response,
            };
        }

        let keys = self
            .spatial_candidates(&bounds)
            .unwrap_or_else(|| self.colliders.keys().collect());

        let mut colliding = false;
        let mut ground: Option<Vec3> = None;
        let mut optimal: Option<Vec3> = None;

        for shape in keys.into_iter().filter_map(|key| self.colliders.get(key)) {
            let result = shape.check_detailed(&bounds);
            if !result.hit {
                continue;
            }
            colliding = true;

            if result.normal.y > 0.5 {
                if ground.map_or(true, |g| result.mtv.norm() < g.norm()) {
                    ground = Some(result.mtv);
                }
            } else if optimal.map_or(true, |o| result.mtv.norm() < o.norm()) {
                optimal = Some(result.mtv);
            }
        }

        let response = ContactResponse {
            colliding,
            response: ground.or(optimal).unwrap_or_else(Vec3::zeros),
        };
        self.prediction.store(&bounds, response.colliding, response.response);
        response
    }

    /// Nearest precise surface straight below `origin` within `max_distance`
    pub fn raycast_down(&self, origin: Vec3, max_distance: f32) -> Option<GroundHit> {
        let ray = Ray::down(origin);
        let keys = if self.grid.is_dirty() {
            self.colliders.keys().collect()
        } else {
            self.grid.query_column(origin.x, origin.z)
        };
        self.nearest_hit(keys, &ray, max_distance, RaycastFilter::PreciseOnly)
    }

    /// Nearest collider hit along `ray` within `max_distance`
    pub fn raycast(&self, ray: &Ray, max_distance: f32, filter: RaycastFilter) -> Option<GroundHit> {
        self.nearest_hit(self.colliders.keys().collect(), ray, max_distance, filter)
    }

    fn nearest_hit(
        &self,
        keys: Vec<ColliderKey>,
        ray: &Ray,
        max_distance: f32,
        filter: RaycastFilter,
    ) -> Option<GroundHit> {
        if max_distance.is_nan() || max_distance < 0.0 || !ray.origin.iter().all(|v| v.is_finite()) {
            return None;
        }

        let mut best: Option<(ColliderKey, RayHit)> = None;
        for key in keys {
            let Some(shape) = self.colliders.get(key) else {
                continue;
            };
            if filter == RaycastFilter::PreciseOnly && !shape.is_precise() {
                continue;
            }
            let limit = best.map_or(max_distance, |(_, hit)| hit.distance);
            if let Some(hit) = shape.raycast(ray, limit) {
                if best.map_or(true, |(_, b)| hit.distance < b.distance) {
                    best = Some((key, hit));
                }
            }
        }

        best.map(|(collider, hit)| GroundHit {
            distance: hit.distance,
            point: hit.point,
            normal: hit.normal,
            collider,
        })
    }

    // ----- prediction cache -----

    /// Fingerprint used to key the prediction cache for `query`
    pub fn prediction_cache_hash(&self, query: &CollisionShape) -> QueryFingerprint {
        prediction_cache_hash(query.bounding_box())
    }

    /// Advance the frame counter
    pub fn update_frame_cache(&mut self) {
        self.prediction.update_frame();
    }

    /// Drop prediction entries that outlived their lifetime
    pub fn clear_expired_cache(&mut self) {
        self.prediction.clear_expired();
    }

    /// Current frame counter
    pub fn current_frame(&self) -> u64 {
        self.prediction.current_frame()
    }

    // ----- entity colliders -----

    /// Register or replace the collider of a dynamic entity
    pub fn add_entity_collider(&mut self, entity: EntityId, shape: CollisionShape) -> Option<CollisionShape> {
        self.entity_grid.insert(entity, shape.bounding_box());
        self.entities.insert(entity, shape)
    }

    /// Remove the collider of a dynamic entity
    pub fn remove_entity_collider(&mut self, entity: EntityId) -> Option<CollisionShape> {
        self.entity_grid.remove(entity);
        self.entities.remove(&entity)
    }

    /// Move an entity collider so its bounding-box center sits at `position`
    ///
    /// Returns false for unknown entities.
    pub fn update_entity_collider(&mut self, entity: EntityId, position: Vec3) -> bool {
        let Some(shape) = self.entities.get_mut(&entity) else {
            return false;
        };

        let offset = position - shape.bounding_box().center();
        *shape = shape.placed(&Transform::from_position(offset));
        self.entity_grid.update(entity, shape.bounding_box());
        true
    }

    /// Collider of a dynamic entity
    pub fn entity_collider(&self, entity: EntityId) -> Option<&CollisionShape> {
        self.entities.get(&entity)
    }

    /// Number of entity colliders
    pub fn entity_collider_count(&self) -> usize {
        self.entities.len()
    }

    /// Entities whose collider touches `shape`, excluding `self_entity`, sorted by id
    pub fn check_entity_collision(&self, self_entity: Option<EntityId>, shape: &CollisionShape) -> Vec<EntityId> {
        let candidates = self
            .entity_grid
            .query_aabb(shape.bounding_box())
            .unwrap_or_else(|| {
                let mut all: Vec<EntityId> = self.entities.keys().copied().collect();
                all.sort_unstable();
                all
            });

        candidates
            .into_iter()
            .filter(|&id| Some(id) != self_entity)
            .filter(|id| self.entities.get(id).is_some_and(|other| other.intersects(shape)))
            .collect()
    }
}

impl Default for CollisionManager {
    fn default() -> Self {
        Self::with_valid_config(CollisionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::collision::{CollisionKind, ModelMesh};
    use approx::assert_relative_eq;

    fn unit_box(x: f32, y: f32, z: f32) -> CollisionShape {
        CollisionShape::new_box(Vec3::new(x, y, z), Vec3::repeat(0.5))
    }

    fn floor(y: f32) -> CollisionShape {
        let mesh = ModelMesh::from_vertices(
            "floor",
            vec![
                Vec3::new(-50.0, 0.0, -50.0),
                Vec3::new(50.0, 0.0, -50.0),
                Vec3::new(-50.0, 0.0, 50.0),
                Vec3::new(50.0, 0.0, 50.0),
            ],
            vec![0, 2, 1, 1, 2, 3],
        );
        CollisionShape::from_mesh(&mesh, CollisionKind::Precise, &Transform::from_position(Vec3::new(0.0, y, 0.0)))
            .unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = CollisionConfig::default().with_cell_size(-1.0);
        assert!(CollisionManager::new(config).is_err());
    }

    #[test]
    fn test_add_remove_and_order() {
        let mut manager = CollisionManager::default();
        let a = manager.add_collider(unit_box(0.0, 0.0, 0.0));
        let b = manager.add_collider(unit_box(5.0, 0.0, 0.0));

        let keys: Vec<ColliderKey> = manager.colliders().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![a, b]);
        assert!(manager.spatial_grid().is_dirty());

        assert!(manager.remove_collider(a).is_some());
        assert!(manager.remove_collider(a).is_none());
        assert!(manager.collider(a).is_none());
        assert_eq!(manager.collider_count(), 1);
    }

    #[test]
    fn test_spatial_matches_brute_force() {
        let mut manager = CollisionManager::default();
        for i in 0..20 {
            manager.add_collider(unit_box(i as f32 * 7.0 - 60.0, 0.0, (i % 5) as f32 * 9.0));
        }

        let queries: Vec<CollisionShape> = (0..40)
            .map(|i| unit_box(i as f32 * 3.3 - 66.0, 0.2, (i % 7) as f32 * 6.1))
            .collect();

        // Dirty grid falls back to brute force
        for query in &queries {
            assert_eq!(manager.check_collision_spatial(query), manager.check_collision(query));
        }

        manager.update_spatial_partitioning();
        assert!(!manager.spatial_grid().is_dirty());
        for query in &queries {
            assert_eq!(manager.check_collision_spatial(query), manager.check_collision(query));
        }
    }

    #[test]
    fn test_response_prefers_ground_push() {
        let mut manager = CollisionManager::default();
        manager.add_collider(floor(0.0));
        manager.add_collider(CollisionShape::new_box(Vec3::new(1.2, 1.0, 0.0), Vec3::new(0.5, 1.0, 5.0)));
        manager.update_spatial_partitioning();

        // Sinks 0.1 into the floor and 0.3 into the wall on its right
        let player = CollisionShape::new_box(Vec3::new(0.0, 0.9, 0.0), Vec3::new(1.0, 1.0, 1.0));
        let contact = manager.check_collision_with_response(&player);

        assert!(contact.colliding);
        assert_relative_eq!(contact.response, Vec3::new(0.0, 0.1, 0.0), epsilon = 1e-4);
    }

    #[test]
    fn test_ground_response_clears_slope() {
        // 45 degree ramp along y = x
        let ramp = ModelMesh::from_vertices(
            "ramp",
            vec![
                Vec3::new(-5.0, -5.0, -5.0),
                Vec3::new(5.0, 5.0, -5.0),
                Vec3::new(5.0, 5.0, 5.0),
                Vec3::new(-5.0, -5.0, 5.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
        );
        let mut manager = CollisionManager::default();
        manager.add_collider(CollisionShape::from_mesh(&ramp, CollisionKind::Precise, &Transform::identity()).unwrap());
        manager.update_spatial_partitioning();

        let player = unit_box(0.0, 0.25, 0.0);
        let contact = manager.check_collision_with_response(&player);
        assert!(contact.colliding);
        assert!(contact.response.x < 0.0 && contact.response.y > 0.0);

        let resolved = player.placed(&Transform::from_position(contact.response));
        for (_, shape) in manager.colliders() {
            let remaining = shape.check_detailed(resolved.bounding_box());
            assert!(!remaining.hit || remaining.depth < 1e-4, "still {} deep", remaining.depth);
        }
    }

    #[test]
    fn test_response_side_push_when_no_ground() {
        let mut manager = CollisionManager::default();
        manager.add_collider(CollisionShape::new_box(Vec3::new(1.2, 1.0, 0.0), Vec3::new(0.5, 5.0, 5.0)));

        let player = CollisionShape::new_box(Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        let contact = manager.check_collision_with_response(&player);

        assert!(contact.colliding);
        assert_relative_eq!(contact.response, Vec3::new(-0.3, 0.0, 0.0), epsilon = 1e-4);
    }

    #[test]
    fn test_response_is_memoized_until_mutation() {
        let mut manager = CollisionManager::default();
        let query = unit_box(0.0, 0.0, 0.0);

        assert!(!manager.check_collision_with_response(&query).colliding);
        assert_eq!(manager.prediction_cache().len(), 1);

        manager.add_collider(unit_box(0.5, 0.0, 0.0));
        assert!(manager.prediction_cache().is_empty());
        assert!(manager.check_collision_with_response(&query).colliding);
    }

    #[test]
    fn test_raycast_down_hits_precise_only() {
        let mut manager = CollisionManager::default();
        manager.add_collider(floor(0.0));
        manager.add_collider(CollisionShape::new_box(Vec3::new(0.0, 5.0, 0.0), Vec3::repeat(1.0)));
        manager.update_spatial_partitioning();

        let hit = manager.raycast_down(Vec3::new(0.1, 10.0, 0.2), 100.0).unwrap();
        assert_relative_eq!(hit.distance, 10.0, epsilon = 1e-4);
        assert_relative_eq!(hit.point, Vec3::new(0.1, 0.0, 0.2), epsilon = 1e-4);
        assert_relative_eq!(hit.normal, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-5);

        let any = manager
            .raycast(&Ray::down(Vec3::new(0.1, 10.0, 0.2)), 100.0, RaycastFilter::All)
            .unwrap();
        assert_relative_eq!(any.distance, 4.0, epsilon = 1e-4);
    }

    #[test]
    fn test_raycast_down_misses() {
        let mut manager = CollisionManager::default();
        manager.add_collider(floor(0.0));
        manager.update_spatial_partitioning();

        assert!(manager.raycast_down(Vec3::new(0.0, 10.0, 0.0), 5.0).is_none());
        assert!(manager.raycast_down(Vec3::new(500.0, 10.0, 0.0), 50.0).is_none());
        assert!(manager.raycast_down(Vec3::new(0.0, -1.0, 0.0), 50.0).is_none());
    }

    #[test]
    fn test_clear_colliders_resets_state() {
        let mut manager = CollisionManager::default();
        manager.add_collider(unit_box(0.0, 0.0, 0.0));
        manager.add_entity_collider(EntityId(1), unit_box(0.0, 0.0, 0.0));
        manager.check_collision_with_response(&unit_box(0.0, 0.0, 0.0));
        manager.clear_colliders();

        assert_eq!(manager.collider_count(), 0);
        assert!(manager.prediction_cache().is_empty());
        assert!(!manager.spatial_grid().is_dirty());
        assert!(!manager.check_collision_spatial(&unit_box(0.0, 0.0, 0.0)));
        assert_eq!(manager.entity_collider_count(), 1);
    }

    #[test]
    fn test_entity_colliders() {
        let mut manager = CollisionManager::default();
        manager.add_entity_collider(EntityId(1), unit_box(0.0, 0.0, 0.0));
        manager.add_entity_collider(EntityId(2), unit_box(0.6, 0.0, 0.0));
        manager.add_entity_collider(EntityId(3), unit_box(40.0, 0.0, 0.0));

        let query = manager.entity_collider(EntityId(1)).unwrap().clone();
        assert_eq!(manager.check_entity_collision(Some(EntityId(1)), &query), vec![EntityId(2)]);

        assert!(manager.update_entity_collider(EntityId(3), Vec3::new(0.3, 0.0, 0.0)));
        assert_relative_eq!(
            manager.entity_collider(EntityId(3)).unwrap().bounding_box().center(),
            Vec3::new(0.3, 0.0, 0.0),
            epsilon = 1e-5
        );
        assert_eq!(
            manager.check_entity_collision(Some(EntityId(1)), &query),
            vec![EntityId(2), EntityId(3)]
        );

        assert!(manager.remove_entity_collider(EntityId(2)).is_some());
        assert!(!manager.update_entity_collider(EntityId(2), Vec3::zeros()));
        assert_eq!(manager.check_entity_collision(None, &query), vec![EntityId(1), EntityId(3)]);

        // Static queries never see entity colliders
        assert!(!manager.check_collision(&query));
    }
}
