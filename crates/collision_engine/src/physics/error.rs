//! Collision error types

/// Errors raised while building colliders or populating the manager
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CollisionError {
    /// The model provider has no model with this name
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// The mesh has no triangles to build a collider from
    #[error("Mesh '{0}' has no triangles")]
    EmptyMesh(String),

    /// A mesh part references a vertex that does not exist
    #[error("Mesh '{mesh}' index {index} is out of range for {vertex_count} vertices")]
    InvalidMesh {
        /// Mesh name
        mesh: String,
        /// Offending index value
        index: u32,
        /// Number of vertices in the part
        vertex_count: usize,
    },

    /// Position, rotation or scale contains NaN or infinity
    #[error("Transform for '{0}' is not finite")]
    NonFiniteTransform(String),

    /// Models were requested but none of them could be loaded
    #[error("None of the {requested} requested models could be loaded")]
    NoModelsLoadable {
        /// Number of distinct model names requested
        requested: usize,
    },
}
