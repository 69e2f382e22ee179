//! Collider population from scene objects and model placements
//!
//! Model population runs one [`ModelCollisionTask`] per distinct model on
//! rayon's pool. Tasks share the base-shape cache and the analyzer, both
//! internally synchronized; their shapes are merged into the manager on
//! the calling thread in task order.

use std::collections::HashSet;
use std::sync::Arc;

use rayon::prelude::*;

use crate::core::config::{CollisionConfig, ModelCollisionConfig};
use crate::foundation::logging::{debug, info, warn};
use crate::foundation::math::{Transform, Vec3};
use crate::scene::{ModelInstance, ModelProvider, SceneObject, SceneObjectKind};
use super::collision::{CollisionShape, ModelMesh, AABB};
use super::collision_cache::CollisionCache;
use super::collision_manager::CollisionManager;
use super::error::CollisionError;
use super::shape_analyzer::ShapeAnalyzer;

/// Half height of the thin box standing in for a plane
const PLANE_HALF_THICKNESS: f32 = 0.1;

/// Summary of one population run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulationReport {
    /// Distinct model names requested
    pub models_requested: usize,
    /// Models whose instances were turned into colliders
    pub models_processed: usize,
    /// Models skipped: unknown, collision disabled, or failed to build
    pub models_skipped: usize,
    /// Colliders added to the manager
    pub shapes_created: usize,
    /// Colliders backed by a BVH
    pub precise_shapes: usize,
    /// Colliders that are boxes
    pub box_shapes: usize,
    /// Instances dropped for invalid placement or the per-model limit
    pub instances_skipped: usize,
}

/// Work item building the colliders of one model
#[derive(Debug, Clone)]
pub struct ModelCollisionTask {
    /// Model name
    pub model: String,
    /// Model-space mesh
    pub mesh: Arc<ModelMesh>,
    /// Placements to build colliders for
    pub instances: Vec<ModelInstance>,
    /// Per-model collision settings
    pub config: Option<ModelCollisionConfig>,
}

/// Shapes built by one task
#[derive(Debug, Default)]
struct TaskOutput {
    shapes: Vec<CollisionShape>,
    precise: usize,
    boxes: usize,
    instances_skipped: usize,
    failed: bool,
}

impl ModelCollisionTask {
    fn run(&self, cache: &CollisionCache, analyzer: &ShapeAnalyzer, config: &CollisionConfig) -> TaskOutput {
        let mut output = TaskOutput::default();

        let needs_precise = analyzer.analyze_model_shape(&self.mesh, &self.model).needs_precise();
        debug!(
            "Model '{}': {} triangles, {} instances, analyzer precise={}",
            self.model,
            self.mesh.triangle_count(),
            self.instances.len(),
            needs_precise
        );

        let limit = config.max_instances_per_model;
        if self.instances.len() > limit {
            warn!(
                "Model '{}' has {} instances; only the first {} get colliders",
                self.model,
                self.instances.len(),
                limit
            );
            output.instances_skipped += self.instances.len() - limit;
        }

        for instance in self.instances.iter().take(limit) {
            if !instance.is_valid() {
                warn!("Skipping invalid instance of '{}' at {:?}", self.model, instance.position);
                output.instances_skipped += 1;
                continue;
            }

            let base = match cache.create_base_collision(
                &self.mesh,
                &self.model,
                instance.scale,
                self.config.as_ref(),
                needs_precise,
            ) {
                Ok(base) => base,
                Err(err) => {
                    warn!("Skipping model '{}': {}", self.model, err);
                    cache.release_precise(&self.model, output.precise);
                    return TaskOutput {
                        instances_skipped: output.instances_skipped,
                        failed: true,
                        ..TaskOutput::default()
                    };
                }
            };

            if base.is_precise() && cache.try_admit_precise(&self.model) {
                output.shapes.push(cache.create_precise_instance_collision_from_cached(
                    &base,
                    instance.position,
                    instance.rotation,
                ));
                output.precise += 1;
            } else {
                output.shapes.push(cache.create_simple_aabb_instance_collision(
                    &base,
                    instance.position,
                    instance.rotation,
                ));
                output.boxes += 1;
            }
        }

        output
    }
}

impl CollisionManager {
    /// Build colliders for every instance of the named models
    ///
    /// Unknown models and models with collision disabled are skipped with a
    /// warning. When names were given but none of them could be loaded,
    /// nothing changes and [`CollisionError::NoModelsLoadable`] is returned.
    pub fn create_auto_collisions_from_models_selective(
        &mut self,
        provider: &dyn ModelProvider,
        model_names: &[&str],
    ) -> Result<PopulationReport, CollisionError> {
        let mut seen = HashSet::new();
        let mut names: Vec<&str> = model_names.iter().copied().filter(|name| seen.insert(*name)).collect();
        if names.len() > self.config.max_models_per_request {
            warn!(
                "{} models requested; only the first {} are processed",
                names.len(),
                self.config.max_models_per_request
            );
            names.truncate(self.config.max_models_per_request);
        }

        let mut report = PopulationReport {
            models_requested: names.len(),
            ..PopulationReport::default()
        };

        let mut loaded = 0;
        let mut tasks = Vec::with_capacity(names.len());
        for name in &names {
            let mesh = match provider.require_mesh(name) {
                Ok(mesh) => mesh,
                Err(err) => {
                    warn!("{}; no colliders created", err);
                    report.models_skipped += 1;
                    continue;
                }
            };
            loaded += 1;

            if !provider.has_collision(name) {
                debug!("Model '{}' has collision disabled", name);
                report.models_skipped += 1;
                continue;
            }

            tasks.push(ModelCollisionTask {
                model: (*name).to_string(),
                mesh,
                instances: provider.instances(name),
                config: provider.model_config(name),
            });
        }

        if !names.is_empty() && loaded == 0 {
            return Err(CollisionError::NoModelsLoadable { requested: names.len() });
        }

        let (cache, analyzer, config) = (&self.cache, &self.analyzer, &self.config);
        let outputs: Vec<TaskOutput> = tasks
            .par_iter()
            .map(|task| task.run(cache, analyzer, config))
            .collect();

        for output in outputs {
            report.instances_skipped += output.instances_skipped;
            if output.failed {
                report.models_skipped += 1;
                continue;
            }

            report.models_processed += 1;
            report.precise_shapes += output.precise;
            report.box_shapes += output.boxes;
            report.shapes_created += output.shapes.len();
            for shape in output.shapes {
                self.insert_collider(shape);
            }
        }

        self.colliders_changed();
        self.update_spatial_partitioning();

        info!(
            "Model collision population: {} models processed, {} skipped, {} colliders ({} precise, {} box)",
            report.models_processed,
            report.models_skipped,
            report.shapes_created,
            report.precise_shapes,
            report.box_shapes
        );
        Ok(report)
    }

    /// Build colliders for every model the provider knows
    pub fn create_auto_collisions_from_models(
        &mut self,
        provider: &dyn ModelProvider,
    ) -> Result<PopulationReport, CollisionError> {
        let names = provider.available_models();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        self.create_auto_collisions_from_models_selective(provider, &names)
    }

    /// Register box colliders for primitive scene objects
    ///
    /// Cubes, spheres and cylinders become boxes of half their scale,
    /// planes become thin boxes of half their size. Lights, spawn zones
    /// and model objects are skipped. Returns the number of colliders added.
    pub fn add_scene_objects(&mut self, objects: &[SceneObject]) -> usize {
        let mut added = 0;

        for object in objects {
            let half_extents = match object.kind {
                SceneObjectKind::Cube | SceneObjectKind::Sphere | SceneObjectKind::Cylinder => {
                    object.scale.abs() * 0.5
                }
                SceneObjectKind::Plane => Vec3::new(
                    object.size.x.abs() * 0.5,
                    PLANE_HALF_THICKNESS,
                    object.size.y.abs() * 0.5,
                ),
                SceneObjectKind::Model | SceneObjectKind::Light | SceneObjectKind::SpawnZone => continue,
            };

            let placement = Transform::from_position_rotation(object.position, object.rotation);
            if !placement.is_finite() || !half_extents.iter().all(|v| v.is_finite()) {
                warn!("Skipping {:?} scene object with non-finite placement", object.kind);
                continue;
            }

            let bounds = AABB::from_center_extents(Vec3::zeros(), half_extents).transformed(&placement);
            self.insert_collider(CollisionShape::from_aabb(bounds));
            added += 1;
        }

        if added > 0 {
            self.colliders_changed();
        }
        debug!("Added {} scene object colliders", added);
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::CollisionPrecision;
    use crate::foundation::math::{Quat, Vec2};
    use crate::scene::ModelLibrary;
    use approx::assert_relative_eq;

    fn rock() -> ModelMesh {
        // Long and thin: always precise
        ModelMesh::cuboid("rock", Vec3::zeros(), Vec3::new(10.0, 0.5, 0.5))
    }

    fn crate_mesh() -> ModelMesh {
        ModelMesh::cuboid("crate", Vec3::new(0.0, 0.5, 0.0), Vec3::repeat(0.5))
    }

    #[test]
    fn test_scene_objects_become_boxes() {
        let mut manager = CollisionManager::default();
        let objects = vec![
            SceneObject::new(SceneObjectKind::Cube, Vec3::new(0.0, 1.0, 0.0)).with_scale(Vec3::new(2.0, 2.0, 4.0)),
            SceneObject::new(SceneObjectKind::Plane, Vec3::zeros()).with_size(Vec2::new(20.0, 10.0)),
            SceneObject::new(SceneObjectKind::Light, Vec3::zeros()),
            SceneObject::new(SceneObjectKind::SpawnZone, Vec3::zeros()),
            SceneObject::model("crate", Vec3::zeros()),
        ];

        assert_eq!(manager.add_scene_objects(&objects), 2);
        let shapes: Vec<&CollisionShape> = manager.colliders().map(|(_, s)| s).collect();
        assert_relative_eq!(shapes[0].bounding_box().extents(), Vec3::new(1.0, 1.0, 2.0));
        assert_relative_eq!(shapes[1].bounding_box().extents(), Vec3::new(10.0, 0.1, 5.0));
    }

    #[test]
    fn test_rotated_cube_bounds_cover_corners() {
        let mut manager = CollisionManager::default();
        let quarter = Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::FRAC_PI_2);
        let cube = SceneObject::new(SceneObjectKind::Cube, Vec3::zeros())
            .with_scale(Vec3::new(4.0, 1.0, 2.0))
            .with_rotation(quarter);

        manager.add_scene_objects(&[cube]);
        let (_, shape) = manager.colliders().next().unwrap();
        assert_relative_eq!(shape.bounding_box().extents(), Vec3::new(1.0, 0.5, 2.0), epsilon = 1e-5);
    }

    #[test]
    fn test_population_counts_and_kinds() {
        let library = ModelLibrary::new()
            .with_mesh(rock())
            .with_mesh(crate_mesh())
            .with_instance("rock", ModelInstance::new(Vec3::new(0.0, 0.0, 0.0), 1.0))
            .with_instance("rock", ModelInstance::new(Vec3::new(0.0, 0.0, 30.0), 1.0))
            .with_instance("crate", ModelInstance::new(Vec3::new(5.0, 0.0, 5.0), 2.0));

        let mut manager = CollisionManager::default();
        let report = manager
            .create_auto_collisions_from_models_selective(&library, &["rock", "crate", "rock"])
            .unwrap();

        assert_eq!(report.models_requested, 2);
        assert_eq!(report.models_processed, 2);
        assert_eq!(report.precise_shapes, 2);
        assert_eq!(report.box_shapes, 1);
        assert_eq!(manager.collider_count(), 3);
        assert!(!manager.spatial_grid().is_dirty());
        assert_eq!(manager.collision_cache().precise_count("rock"), 2);

        let models: Vec<Option<&str>> = manager.colliders().map(|(_, s)| s.model()).collect();
        assert_eq!(models, vec![Some("rock"), Some("rock"), Some("crate")]);
    }

    #[test]
    fn test_precise_ceiling_falls_back_to_boxes() {
        let mut library = ModelLibrary::new().with_mesh(rock());
        for i in 0..60 {
            library.add_instance("rock", ModelInstance::new(Vec3::new(0.0, 0.0, i as f32 * 5.0), 1.0));
        }

        let mut manager = CollisionManager::default();
        let report = manager
            .create_auto_collisions_from_models_selective(&library, &["rock"])
            .unwrap();

        assert_eq!(report.precise_shapes, 50);
        assert_eq!(report.box_shapes, 10);
        let precise = manager.colliders().filter(|(_, s)| s.is_precise()).count();
        assert_eq!(precise, 50);
    }

    #[test]
    fn test_config_override_forces_box() {
        let mut library = ModelLibrary::new()
            .with_mesh(rock())
            .with_instance("rock", ModelInstance::new(Vec3::zeros(), 1.0));
        library.set_model_config("rock", ModelCollisionConfig::with_precision(CollisionPrecision::BoxOnly));

        let mut manager = CollisionManager::default();
        let report = manager
            .create_auto_collisions_from_models_selective(&library, &["rock"])
            .unwrap();
        assert_eq!(report.box_shapes, 1);
        assert_eq!(report.precise_shapes, 0);
    }

    #[test]
    fn test_invalid_instances_and_instance_limit() {
        let config = CollisionConfig {
            max_instances_per_model: 3,
            ..CollisionConfig::default()
        };
        let mut library = ModelLibrary::new().with_mesh(crate_mesh());
        library.add_instance("crate", ModelInstance::new(Vec3::new(f32::NAN, 0.0, 0.0), 1.0));
        library.add_instance("crate", ModelInstance::new(Vec3::zeros(), 0.0));
        for i in 0..3 {
            library.add_instance("crate", ModelInstance::new(Vec3::new(i as f32, 0.0, 0.0), 1.0));
        }

        let mut manager = CollisionManager::new(config).unwrap();
        let report = manager
            .create_auto_collisions_from_models_selective(&library, &["crate"])
            .unwrap();

        assert_eq!(report.shapes_created, 1);
        assert_eq!(report.instances_skipped, 4);
    }

    #[test]
    fn test_unknown_models() {
        let library = ModelLibrary::new()
            .with_mesh(crate_mesh())
            .with_instance("crate", ModelInstance::new(Vec3::zeros(), 1.0));
        let mut manager = CollisionManager::default();

        let result = manager.create_auto_collisions_from_models_selective(&library, &["ghost", "phantom"]);
        assert_eq!(result, Err(CollisionError::NoModelsLoadable { requested: 2 }));
        assert_eq!(manager.collider_count(), 0);

        let report = manager
            .create_auto_collisions_from_models_selective(&library, &["ghost", "crate"])
            .unwrap();
        assert_eq!(report.models_skipped, 1);
        assert_eq!(report.shapes_created, 1);

        let empty = manager.create_auto_collisions_from_models_selective(&library, &[]).unwrap();
        assert_eq!(empty, PopulationReport::default());
    }

    #[test]
    fn test_model_without_instances_adds_nothing() {
        let library = ModelLibrary::new().with_mesh(crate_mesh());
        let mut manager = CollisionManager::default();
        let report = manager.create_auto_collisions_from_models(&library).unwrap();

        assert_eq!(report.models_processed, 1);
        assert_eq!(report.shapes_created, 0);
        assert_eq!(manager.collider_count(), 0);
    }

    #[test]
    fn test_broken_mesh_skips_model() {
        let broken = ModelMesh::from_vertices("broken", vec![Vec3::zeros(); 3], vec![0, 1, 9]);
        let library = ModelLibrary::new()
            .with_mesh(broken)
            .with_mesh(crate_mesh())
            .with_instance("broken", ModelInstance::new(Vec3::zeros(), 1.0))
            .with_instance("crate", ModelInstance::new(Vec3::zeros(), 1.0));

        let mut manager = CollisionManager::default();
        let report = manager
            .create_auto_collisions_from_models_selective(&library, &["broken", "crate"])
            .unwrap();

        assert_eq!(report.models_processed, 1);
        assert_eq!(report.models_skipped, 1);
        assert_eq!(manager.collider_count(), 1);
    }
}
