//! Raw triangulation output.

use cgmath::Point3;

/// Unshared triangle soup produced by the mesher.
///
/// Positions are local to the chunk the density came from. Every three
/// consecutive vertices form one triangle and `indices[i] == i`, which is the
/// layout renderers and collision builders both accept without further work.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Vertex positions in chunk-local space.
    pub vertices: Vec<Point3<f32>>,
    /// Triangle list indices into `vertices`.
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Builds mesh data from a triangle list, generating sequential indices.
    pub fn from_vertices(vertices: Vec<Point3<f32>>) -> Self {
        let indices = (0..vertices.len() as u32).collect();
        Self { vertices, indices }
    }

    /// True when no surface passed through the density.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Iterates over triangles as vertex triples.
    pub fn triangles(&self) -> impl Iterator<Item = [Point3<f32>; 3]> + '_ {
        self.indices.chunks_exact(3).map(|triangle| {
            [
                self.vertices[triangle[0] as usize],
                self.vertices[triangle[1] as usize],
                self.vertices[triangle[2] as usize],
            ]
        })
    }
}
