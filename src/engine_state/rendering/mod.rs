//! # Rendering
//!
//! Consumer-side handling of finished meshes: shading data, GPU-ready vertex
//! layout, and the [`ChunkSurface`] seam through which a chunk installs its
//! mesh into the scene.

pub mod render_mesh;
pub mod surface;
pub mod vertex;

pub use render_mesh::RenderMesh;
pub use surface::{ChunkSurface, HeadlessSurface, HeadlessSurfaceFactory, SurfaceFactory};
pub use vertex::Vertex;
