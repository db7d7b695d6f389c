//! The seam between terrain chunks and whatever scene they are drawn in.
//!
//! A chunk owns one [`ChunkSurface`]: the object that is both rendered and
//! collided with. The terrain manager asks a [`SurfaceFactory`] for a surface
//! when it creates a chunk, so the scene decides what "renderable" and
//! "collidable" actually mean. [`HeadlessSurface`] keeps the buffers in memory
//! and is what the binary and the tests use.

use std::rc::Rc;

use cgmath::Point3;
use log::debug;

use super::render_mesh::RenderMesh;

/// A renderable, collidable object owned by one chunk.
pub trait ChunkSurface {
    /// Installs `mesh` as both the drawn mesh and the collision mesh.
    fn install_mesh(&mut self, mesh: Rc<RenderMesh>);

    /// The mesh currently drawn, if any.
    fn render_mesh(&self) -> Option<&RenderMesh>;

    /// The mesh currently used for collision, if any.
    fn collision_mesh(&self) -> Option<&RenderMesh>;
}

/// Creates the surface for a newly built chunk.
pub trait SurfaceFactory {
    /// Called once per chunk. `world_offset` is where the chunk's local origin sits.
    fn create_surface(
        &mut self,
        coordinate: Point3<i32>,
        world_offset: Point3<i32>,
    ) -> Box<dyn ChunkSurface>;
}

/// In-memory surface with no scene behind it.
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    /// Grid coordinate of the owning chunk.
    pub coordinate: Point3<i32>,
    /// World position of the chunk's local origin.
    pub world_offset: Point3<i32>,
    render_mesh: Option<Rc<RenderMesh>>,
    collision_mesh: Option<Rc<RenderMesh>>,
    revision: u32,
}

impl HeadlessSurface {
    /// Creates a surface with nothing installed.
    pub fn new(coordinate: Point3<i32>, world_offset: Point3<i32>) -> Self {
        Self {
            coordinate,
            world_offset,
            render_mesh: None,
            collision_mesh: None,
            revision: 0,
        }
    }

    /// How many meshes have been installed so far.
    pub fn revision(&self) -> u32 {
        self.revision
    }
}

impl ChunkSurface for HeadlessSurface {
    fn install_mesh(&mut self, mesh: Rc<RenderMesh>) {
        self.revision += 1;
        debug!(
            "Chunk {:?} installed mesh revision {} ({} triangles)",
            self.coordinate,
            self.revision,
            mesh.triangle_count()
        );
        self.collision_mesh = Some(mesh.clone());
        self.render_mesh = Some(mesh);
    }

    fn render_mesh(&self) -> Option<&RenderMesh> {
        self.render_mesh.as_deref()
    }

    fn collision_mesh(&self) -> Option<&RenderMesh> {
        self.collision_mesh.as_deref()
    }
}

/// Factory producing [`HeadlessSurface`]s.
#[derive(Debug, Default)]
pub struct HeadlessSurfaceFactory {
    created: usize,
}

impl HeadlessSurfaceFactory {
    /// Surfaces created over the factory's lifetime.
    pub fn created(&self) -> usize {
        self.created
    }
}

impl SurfaceFactory for HeadlessSurfaceFactory {
    fn create_surface(
        &mut self,
        coordinate: Point3<i32>,
        world_offset: Point3<i32>,
    ) -> Box<dyn ChunkSurface> {
        self.created += 1;
        Box::new(HeadlessSurface::new(coordinate, world_offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installing_shares_one_mesh_between_render_and_collision() {
        let mut factory = HeadlessSurfaceFactory::default();
        let mut surface = HeadlessSurface::new(Point3::new(1, 0, 2), Point3::new(15, 0, 30));
        assert_eq!(surface.revision(), 0);
        assert!(surface.render_mesh().is_none());

        let first = Rc::new(RenderMesh::default());
        surface.install_mesh(first.clone());
        assert_eq!(surface.revision(), 1);
        assert_eq!(Rc::strong_count(&first), 3);
        assert!(std::ptr::eq(
            surface.render_mesh().unwrap(),
            surface.collision_mesh().unwrap()
        ));

        surface.install_mesh(Rc::new(RenderMesh::default()));
        assert_eq!(surface.revision(), 2);
        assert_eq!(Rc::strong_count(&first), 1);

        factory.create_surface(Point3::new(0, 0, 0), Point3::new(0, 0, 0));
        assert_eq!(factory.created(), 1);
    }
}
