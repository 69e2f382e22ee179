//! In-memory model provider

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::config::{ModelCollisionConfig, ModelConfigTable};
use crate::foundation::logging::warn;
use super::{ModelInstance, ModelMesh, ModelProvider, SceneObject, SceneObjectKind};

/// Model provider backed by meshes and placements held in memory
#[derive(Debug, Clone, Default)]
pub struct ModelLibrary {
    meshes: HashMap<String, Arc<ModelMesh>>,
    instances: HashMap<String, Vec<ModelInstance>>,
    configs: ModelConfigTable,
}

impl ModelLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mesh under its own name
    pub fn add_mesh(&mut self, mesh: ModelMesh) {
        self.meshes.insert(mesh.name.clone(), Arc::new(mesh));
    }

    /// Register a mesh, builder style
    pub fn with_mesh(mut self, mesh: ModelMesh) -> Self {
        self.add_mesh(mesh);
        self
    }

    /// Add one placement of `model`
    pub fn add_instance(&mut self, model: &str, instance: ModelInstance) {
        self.instances.entry(model.to_string()).or_default().push(instance);
    }

    /// Add one placement of `model`, builder style
    pub fn with_instance(mut self, model: &str, instance: ModelInstance) -> Self {
        self.add_instance(model, instance);
        self
    }

    /// Set the per-model collision table
    pub fn with_configs(mut self, configs: ModelConfigTable) -> Self {
        self.configs = configs;
        self
    }

    /// Set one model's collision settings
    pub fn set_model_config(&mut self, model: &str, config: ModelCollisionConfig) {
        self.configs.models.insert(model.to_string(), config);
    }

    /// Add a placement for every model object in `objects`
    ///
    /// Returns the number of placements added.
    pub fn add_scene_objects(&mut self, objects: &[SceneObject]) -> usize {
        let mut added = 0;
        for object in objects.iter().filter(|o| o.kind == SceneObjectKind::Model) {
            match object.model.as_deref() {
                Some(name) => {
                    self.add_instance(name, ModelInstance::from_scene_object(object));
                    added += 1;
                }
                None => warn!("Model object at {:?} has no model name", object.position),
            }
        }
        added
    }
}

impl ModelProvider for ModelLibrary {
    fn available_models(&self) -> Vec<String> {
        let mut names: Vec<String> = self.meshes.keys().cloned().collect();
        names.sort();
        names
    }

    fn mesh(&self, name: &str) -> Option<Arc<ModelMesh>> {
        self.meshes.get(name).cloned()
    }

    fn instances(&self, name: &str) -> Vec<ModelInstance> {
        self.instances.get(name).cloned().unwrap_or_default()
    }

    fn model_config(&self, name: &str) -> Option<ModelCollisionConfig> {
        self.configs.get(name).cloned()
    }
}
