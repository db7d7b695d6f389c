//! # Chunk
//!
//! One meshable slice of the world. A chunk owns a copy of its density window,
//! the surface it draws into, and the token of its newest mesh request.
//!
//! ## Request Sequencing
//!
//! Every new request cancels the previous one, and dropping a chunk cancels
//! whatever it still has in flight. The dispatcher drops results for cancelled
//! tokens, so a chunk only ever installs the mesh for its latest density and
//! never receives a callback after it is gone. Callbacks also reach the chunk
//! through a weak handle, so an in-flight request never keeps a chunk alive.

use std::{rc::Rc, sync::Arc};

use cgmath::Point3;
use log::debug;

use super::density::DensityField;
use crate::{
    core::{StResource, WeakStResource},
    engine_state::{
        error::MeshError,
        meshing::{MeshData, MeshGenerator, RequestToken},
        rendering::{ChunkSurface, RenderMesh, SurfaceFactory},
    },
};

/// A fixed-size partition of the world density field and the surface built from it.
pub struct Chunk {
    /// Position in the chunk grid.
    pub coordinate: Point3<i32>,
    /// World position of sample `(0, 0, 0)`: `coordinate * (size - 1)`.
    pub world_offset: Point3<i32>,
    density: Arc<DensityField>,
    surface: Box<dyn ChunkSurface>,
    active_request: Option<RequestToken>,
    installed_meshes: usize,
    last_error: Option<MeshError>,
    this: WeakStResource<Chunk>,
}

/// World position of a chunk's local origin.
pub fn chunk_world_offset(coordinate: Point3<i32>, size: [usize; 3]) -> Point3<i32> {
    Point3::new(
        coordinate.x * (size[0] as i32 - 1),
        coordinate.y * (size[1] as i32 - 1),
        coordinate.z * (size[2] as i32 - 1),
    )
}

impl Chunk {
    /// Creates a chunk, asks `surfaces` for its surface and requests its first mesh.
    pub fn spawn(
        density: DensityField,
        coordinate: Point3<i32>,
        surfaces: &mut dyn SurfaceFactory,
        generator: &mut MeshGenerator,
    ) -> StResource<Chunk> {
        let world_offset = chunk_world_offset(coordinate, density.size());
        let surface = surfaces.create_surface(coordinate, world_offset);

        let chunk = StResource::new_cyclic(|this| Chunk {
            coordinate,
            world_offset,
            density: Arc::new(density),
            surface,
            active_request: None,
            installed_meshes: 0,
            last_error: None,
            this,
        });
        chunk.get_mut().request_mesh(generator);
        chunk
    }

    /// Replaces the density and requests a new mesh. The current mesh stays
    /// installed until the new one arrives.
    pub fn update_chunk(&mut self, density: DensityField, generator: &mut MeshGenerator) {
        self.density = Arc::new(density);
        self.request_mesh(generator);
    }

    fn request_mesh(&mut self, generator: &mut MeshGenerator) {
        let target = self.this.clone();
        let token = generator.request_mesh(self.density.clone(), move |result| {
            if let Some(chunk) = target.upgrade() {
                chunk.get_mut().on_mesh_received(result);
            }
        });
        if let Some(previous) = self.active_request.replace(token) {
            debug!(
                "Chunk {:?} superseded mesh request {}",
                self.coordinate,
                previous.sequence()
            );
            previous.cancel();
        }
    }

    /// Installs a finished mesh on the surface, or records why there is none.
    ///
    /// Only called from the dispatcher's per-tick drain.
    pub fn on_mesh_received(&mut self, result: Result<MeshData, MeshError>) {
        self.active_request = None;
        match result {
            Ok(mesh) => {
                self.surface
                    .install_mesh(Rc::new(RenderMesh::from_mesh_data(&mesh)));
                self.installed_meshes += 1;
                self.last_error = None;
            }
            Err(err) => self.last_error = Some(err),
        }
    }

    /// The density window this chunk was last meshed from (or is being meshed from).
    pub fn density(&self) -> &DensityField {
        &self.density
    }

    /// The chunk's renderable and collidable surface.
    pub fn surface(&self) -> &dyn ChunkSurface {
        self.surface.as_ref()
    }

    /// True while a mesh request is outstanding.
    pub fn is_mesh_pending(&self) -> bool {
        self.active_request.is_some()
    }

    /// How many meshes have been installed.
    pub fn installed_meshes(&self) -> usize {
        self.installed_meshes
    }

    /// The failure from the most recent request, if it failed.
    pub fn last_error(&self) -> Option<&MeshError> {
        self.last_error.as_ref()
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        if let Some(request) = self.active_request.take() {
            request.cancel();
        }
    }
}
