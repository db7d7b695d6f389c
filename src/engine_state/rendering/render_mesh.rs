//! Consumer-side mesh construction.
//!
//! The mesher emits bare positions. Before a chunk installs its mesh, the
//! positions are paired with normals so the surface shades smoothly: each
//! triangle's face normal, scaled by its area, is summed at every vertex that
//! sits at the same position, and the sum is normalised.

use std::collections::HashMap;

use cgmath::{InnerSpace, Point3, Vector3};

use super::vertex::Vertex;
use crate::engine_state::meshing::MeshData;

/// Normal used where the accumulated area is zero (degenerate triangles only).
const FALLBACK_NORMAL: [f32; 3] = [0.0, 1.0, 0.0];

fn position_key(position: Point3<f32>) -> [u32; 3] {
    [position.x.to_bits(), position.y.to_bits(), position.z.to_bits()]
}

/// Vertex and index buffers ready for upload, shared by a chunk's renderable and
/// collider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderMesh {
    /// Shaded vertices.
    pub vertices: Vec<Vertex>,
    /// Triangle list indices into `vertices`.
    pub indices: Vec<u32>,
}

impl RenderMesh {
    /// Builds buffers from mesher output, deriving area-weighted normals.
    pub fn from_mesh_data(mesh: &MeshData) -> Self {
        let mut accumulated: HashMap<[u32; 3], Vector3<f32>> = HashMap::new();
        for [a, b, c] in mesh.triangles() {
            // The cross product's length is twice the triangle area.
            let face = (b - a).cross(c - a);
            for corner in [a, b, c] {
                *accumulated
                    .entry(position_key(corner))
                    .or_insert_with(|| Vector3::new(0.0, 0.0, 0.0)) += face;
            }
        }

        let vertices = mesh
            .vertices
            .iter()
            .map(|&position| {
                let sum = accumulated
                    .get(&position_key(position))
                    .copied()
                    .unwrap_or_else(|| Vector3::new(0.0, 0.0, 0.0));
                let normal = if sum.magnitude2() > f32::EPSILON {
                    sum.normalize().into()
                } else {
                    FALLBACK_NORMAL
                };
                Vertex::new(position.into(), normal)
            })
            .collect();

        Self {
            vertices,
            indices: mesh.indices.clone(),
        }
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// True when there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Vertex buffer contents.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index buffer contents.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::{meshing::triangulate, voxels::density::DensityField};

    #[test]
    fn flat_floor_normals_point_out_of_the_ground() {
        let density = DensityField::from_fn([4, 3, 4], |_, y, _| if y == 0 { -10 } else { 10 });
        let mesh = RenderMesh::from_mesh_data(&triangulate(&density).unwrap());
        assert_eq!(mesh.triangle_count(), 18);
        for vertex in &mesh.vertices {
            assert!((vertex.normal[1] - 1.0).abs() < 1e-5, "{vertex:?}");
        }
    }

    #[test]
    fn shared_positions_share_normals() {
        let density = DensityField::from_fn([5, 5, 5], |x, y, z| {
            let d = |v: usize| v as i32 - 2;
            d(x) * d(x) + d(y) * d(y) + d(z) * d(z) - 3
        });
        let mesh = RenderMesh::from_mesh_data(&triangulate(&density).unwrap());
        let mut by_position: HashMap<[u32; 3], [f32; 3]> = HashMap::new();
        for vertex in &mesh.vertices {
            let key = vertex.position.map(f32::to_bits);
            let normal = *by_position.entry(key).or_insert(vertex.normal);
            assert_eq!(normal, vertex.normal);
            let length: f32 = vertex.normal.iter().map(|n| n * n).sum::<f32>().sqrt();
            assert!((length - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn byte_views_cover_buffers() {
        let density = DensityField::from_fn([2, 2, 2], |_, y, _| if y == 0 { -1 } else { 1 });
        let mesh = RenderMesh::from_mesh_data(&triangulate(&density).unwrap());
        assert_eq!(mesh.vertex_bytes().len(), mesh.vertices.len() * 24);
        assert_eq!(mesh.index_bytes().len(), mesh.indices.len() * 4);
    }

    #[test]
    fn empty_mesh_builds_empty_buffers() {
        let mesh = RenderMesh::from_mesh_data(&MeshData::default());
        assert!(mesh.is_empty());
        assert!(mesh.vertex_bytes().is_empty());
    }
}
