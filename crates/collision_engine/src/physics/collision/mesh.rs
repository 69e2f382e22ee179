//! Triangle mesh input for collision building
//!
//! A model mesh is a list of parts, each with its own vertex and index
//! buffers in model space. Collision code only ever reads it.

use crate::foundation::math::Vec3;
use crate::physics::error::CollisionError;
use super::primitives::{Triangle, AABB};

/// One vertex/index buffer pair of a model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshPart {
    /// Vertex positions in model space
    pub vertices: Vec<Vec3>,
    /// Triangle list indices into `vertices`
    pub indices: Vec<u32>,
}

impl MeshPart {
    /// Creates a part from model-space vertices and indices
    pub fn new(vertices: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Number of complete triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Iterate the part's triangles, skipping any with an out-of-range index
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.indices.chunks_exact(3).filter_map(|chunk| {
            let v0 = *self.vertices.get(chunk[0] as usize)?;
            let v1 = *self.vertices.get(chunk[1] as usize)?;
            let v2 = *self.vertices.get(chunk[2] as usize)?;
            Some(Triangle::new(v0, v1, v2))
        })
    }
}

/// A named model mesh made of one or more parts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelMesh {
    /// Model name
    pub name: String,
    /// Mesh parts
    pub parts: Vec<MeshPart>,
}

impl ModelMesh {
    /// Creates a mesh from its parts
    pub fn new(name: impl Into<String>, parts: Vec<MeshPart>) -> Self {
        Self {
            name: name.into(),
            parts,
        }
    }

    /// Creates a single-part mesh
    pub fn from_vertices(name: impl Into<String>, vertices: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self::new(name, vec![MeshPart::new(vertices, indices)])
    }

    /// Axis-aligned box mesh (12 triangles) centered on `center`
    pub fn cuboid(name: impl Into<String>, center: Vec3, half_extents: Vec3) -> Self {
        let (c, h) = (center, half_extents);
        let vertices = (0..8)
            .map(|i| {
                Vec3::new(
                    if i & 1 == 0 { c.x - h.x } else { c.x + h.x },
                    if i & 2 == 0 { c.y - h.y } else { c.y + h.y },
                    if i & 4 == 0 { c.z - h.z } else { c.z + h.z },
                )
            })
            .collect();
        let indices = vec![
            0, 2, 1, 1, 2, 3, // -z
            4, 5, 6, 5, 7, 6, // +z
            0, 1, 4, 1, 5, 4, // -y
            2, 6, 3, 3, 6, 7, // +y
            0, 4, 2, 2, 4, 6, // -x
            1, 3, 5, 3, 7, 5, // +x
        ];
        Self::from_vertices(name, vertices, indices)
    }

    /// Total triangle count over all parts
    pub fn triangle_count(&self) -> usize {
        self.parts.iter().map(MeshPart::triangle_count).sum()
    }

    /// Total vertex count over all parts
    pub fn vertex_count(&self) -> usize {
        self.parts.iter().map(|part| part.vertices.len()).sum()
    }

    /// Iterate every triangle of every part in model space
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.parts.iter().flat_map(MeshPart::triangles)
    }

    /// Model-space bounds of all referenced vertices
    pub fn bounds(&self) -> Option<AABB> {
        AABB::from_points(self.triangles().flat_map(|t| [t.v0, t.v1, t.v2]))
    }

    /// Check that every index references a vertex and that there is at least one triangle
    pub fn validate(&self) -> Result<(), CollisionError> {
        for part in &self.parts {
            if let Some(&index) = part
                .indices
                .iter()
                .find(|&&i| i as usize >= part.vertices.len())
            {
                return Err(CollisionError::InvalidMesh {
                    mesh: self.name.clone(),
                    index,
                    vertex_count: part.vertices.len(),
                });
            }
        }

        if self.triangle_count() == 0 {
            return Err(CollisionError::EmptyMesh(self.name.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cuboid_counts_and_bounds() {
        let mesh = ModelMesh::cuboid("crate", Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 1.0, 2.0));
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.vertex_count(), 8);

        let bounds = mesh.bounds().unwrap();
        assert_relative_eq!(bounds.min, Vec3::new(-1.0, 0.0, -2.0));
        assert_relative_eq!(bounds.max, Vec3::new(1.0, 2.0, 2.0));
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let mesh = ModelMesh::from_vertices("broken", vec![Vec3::zeros(); 3], vec![0, 1, 7]);
        assert!(matches!(
            mesh.validate(),
            Err(CollisionError::InvalidMesh { index: 7, vertex_count: 3, .. })
        ));
        assert_eq!(mesh.triangles().count(), 0);
    }

    #[test]
    fn test_empty_mesh_rejected() {
        let mesh = ModelMesh::new("nothing", vec![MeshPart::default()]);
        assert_eq!(mesh.validate(), Err(CollisionError::EmptyMesh("nothing".to_string())));
        assert!(mesh.bounds().is_none());
    }
}
