//! # World Module
//!
//! [`TerrainManager`] owns the world density field and the grid of chunks cut
//! from it.
//!
//! ## Chunk Windows
//!
//! The world field has `count * (size - 1) + 1` samples per axis. Chunk
//! `(cx, cy, cz)` copies the `size`-sample window starting at
//! `(cx, cy, cz) * (size - 1)`, so neighbouring chunks read the same boundary
//! layer and their surfaces meet without gaps.
//!
//! ## Regeneration
//!
//! `regenerate_terrain()` drops every chunk, recomputes the field and rebuilds
//! the grid from scratch. Dropping a chunk cancels its in-flight request, so a
//! rebuild never receives results meant for the previous world.

use std::collections::HashMap;

use cgmath::Point3;
use log::{debug, info};

use super::{
    chunk::Chunk,
    density::DensityField,
    generation::{DensitySource, LayeredNoiseDensity},
};
use crate::{
    core::StResource,
    engine_state::{
        config::TerrainConfig,
        error::{DensityError, TerrainError},
        meshing::MeshGenerator,
        rendering::{HeadlessSurfaceFactory, SurfaceFactory},
    },
};

/// Chunk indices along one axis whose window contains world sample `point`.
///
/// A sample on a shared boundary belongs to two chunks.
fn containing_chunks(point: usize, step: usize, count: usize) -> impl Iterator<Item = usize> {
    let upper = point / step;
    let lower = (point % step == 0 && upper > 0).then(|| upper - 1);
    (upper < count).then_some(upper).into_iter().chain(lower)
}

/// Owns the world density field and every chunk meshed from it.
pub struct TerrainManager {
    config: TerrainConfig,
    source: Box<dyn DensitySource>,
    surfaces: Box<dyn SurfaceFactory>,
    density: DensityField,
    chunks: HashMap<Point3<i32>, StResource<Chunk>>,
}

impl TerrainManager {
    /// Creates a manager with layered-noise terrain and headless surfaces.
    pub fn new(config: TerrainConfig) -> Result<Self, TerrainError> {
        let source = Box::new(LayeredNoiseDensity::new(&config));
        Self::with_source(config, source, Box::new(HeadlessSurfaceFactory::default()))
    }

    /// Creates a manager with a custom density source and surface factory.
    ///
    /// No density is generated and no chunk exists until
    /// [`regenerate_terrain`](Self::regenerate_terrain) runs.
    pub fn with_source(
        config: TerrainConfig,
        source: Box<dyn DensitySource>,
        surfaces: Box<dyn SurfaceFactory>,
    ) -> Result<Self, TerrainError> {
        config.validate()?;
        let density = DensityField::filled(config.world_grid_size(), 0);
        Ok(Self {
            config,
            source,
            surfaces,
            density,
            chunks: HashMap::new(),
        })
    }

    /// Drops all chunks, recomputes the density field and rebuilds every chunk.
    ///
    /// Safe to call any number of times. Each call is a complete rebuild.
    pub fn regenerate_terrain(&mut self, generator: &mut MeshGenerator) -> Result<(), TerrainError> {
        self.chunks.clear();
        self.generate_terrain_density();
        self.generate_terrain_mesh(generator)?;
        info!(
            "Regenerated terrain: {} chunks over a {:?} sample grid",
            self.chunks.len(),
            self.density.size()
        );
        Ok(())
    }

    fn generate_terrain_density(&mut self) {
        let start = web_time::Instant::now();
        self.density = self.source.fill(self.config.world_grid_size());
        debug!("Generated terrain density in {:?}", start.elapsed());
    }

    fn generate_terrain_mesh(&mut self, generator: &mut MeshGenerator) -> Result<(), TerrainError> {
        let [count_x, count_y, count_z] = self.config.world_chunk_count;

        let mut windows = Vec::with_capacity((count_x * count_y * count_z) as usize);
        for x in 0..count_x as i32 {
            for y in 0..count_y as i32 {
                for z in 0..count_z as i32 {
                    let coordinate = Point3::new(x, y, z);
                    windows.push((coordinate, self.chunk_window(coordinate)?));
                }
            }
        }

        for (coordinate, window) in windows {
            let chunk = Chunk::spawn(window, coordinate, self.surfaces.as_mut(), generator);
            self.chunks.insert(coordinate, chunk);
        }
        Ok(())
    }

    fn chunk_window(&self, coordinate: Point3<i32>) -> Result<DensityField, DensityError> {
        let size = self.config.chunk_extent();
        let origin = [
            coordinate.x as usize * (size[0] - 1),
            coordinate.y as usize * (size[1] - 1),
            coordinate.z as usize * (size[2] - 1),
        ];
        self.density.window(origin, size)
    }

    /// Writes one world sample and re-meshes every chunk whose window contains it.
    ///
    /// Returns how many chunks were updated. Before the first regeneration there
    /// are no chunks, so only the field changes.
    pub fn set_density(
        &mut self,
        point: [usize; 3],
        value: i32,
        generator: &mut MeshGenerator,
    ) -> Result<usize, TerrainError> {
        self.density.set(point[0], point[1], point[2], value)?;

        let size = self.config.chunk_extent();
        let count = self.config.world_chunk_count.map(|count| count as usize);
        let mut updated = 0;
        for x in containing_chunks(point[0], size[0] - 1, count[0]) {
            for y in containing_chunks(point[1], size[1] - 1, count[1]) {
                for z in containing_chunks(point[2], size[2] - 1, count[2]) {
                    let coordinate = Point3::new(x as i32, y as i32, z as i32);
                    let Some(chunk) = self.chunks.get(&coordinate) else {
                        continue;
                    };
                    let window = self.chunk_window(coordinate)?;
                    chunk.get_mut().update_chunk(window, generator);
                    updated += 1;
                }
            }
        }
        debug!("Density edit at {point:?} updated {updated} chunks");
        Ok(updated)
    }

    /// The chunk at grid coordinate `coordinate`, if it exists.
    pub fn chunk_at(&self, coordinate: Point3<i32>) -> Option<&StResource<Chunk>> {
        self.chunks.get(&coordinate)
    }

    /// Every chunk with its grid coordinate, in no particular order.
    pub fn chunks(&self) -> impl Iterator<Item = (Point3<i32>, &StResource<Chunk>)> {
        self.chunks.iter().map(|(coordinate, chunk)| (*coordinate, chunk))
    }

    /// Number of live chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// The world density field.
    pub fn density(&self) -> &DensityField {
        &self.density
    }

    /// The configuration this manager was built with.
    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::{
        thread,
        time::{Duration, Instant},
    };

    use super::*;
    use crate::engine_state::voxels::generation::PlaneDensity;

    fn wait_idle(generator: &mut MeshGenerator) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !generator.is_idle() {
            assert!(Instant::now() < deadline, "mesh requests did not finish");
            generator.update();
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn small_config() -> TerrainConfig {
        TerrainConfig {
            world_chunk_count: [3, 1, 2],
            chunk_size: [5, 6, 4],
            worker_count: 2,
            ..TerrainConfig::default()
        }
    }

    fn plane_manager(config: TerrainConfig) -> TerrainManager {
        TerrainManager::with_source(
            config,
            Box::new(PlaneDensity { height: 2.5, scale: 10.0 }),
            Box::new(HeadlessSurfaceFactory::default()),
        )
        .unwrap()
    }

    #[test]
    fn boundary_samples_belong_to_both_neighbours() {
        assert_eq!(containing_chunks(0, 4, 3).collect::<Vec<_>>(), vec![0]);
        assert_eq!(containing_chunks(3, 4, 3).collect::<Vec<_>>(), vec![0]);
        assert_eq!(containing_chunks(4, 4, 3).collect::<Vec<_>>(), vec![1, 0]);
        assert_eq!(containing_chunks(12, 4, 3).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn regeneration_builds_full_chunk_grid() {
        let mut generator = MeshGenerator::new(2, 2).unwrap();
        let mut terrain = plane_manager(small_config());
        assert_eq!(terrain.chunk_count(), 0);

        terrain.regenerate_terrain(&mut generator).unwrap();
        assert_eq!(terrain.chunk_count(), 6);
        assert_eq!(terrain.density().size(), [13, 6, 7]);

        let chunk = terrain.chunk_at(Point3::new(2, 0, 1)).unwrap().get();
        assert_eq!(chunk.world_offset, Point3::new(8, 0, 3));
        assert_eq!(chunk.density().size(), [5, 6, 4]);
        assert!(terrain.chunk_at(Point3::new(3, 0, 0)).is_none());
    }

    #[test]
    fn neighbours_share_boundary_samples() {
        let mut generator = MeshGenerator::new(1, 4).unwrap();
        let config = small_config();
        let mut terrain = TerrainManager::new(config).unwrap();
        terrain.regenerate_terrain(&mut generator).unwrap();

        let left = terrain.chunk_at(Point3::new(0, 0, 0)).unwrap().get();
        let right = terrain.chunk_at(Point3::new(1, 0, 0)).unwrap().get();
        for y in 0..6 {
            for z in 0..4 {
                assert_eq!(left.density().get(4, y, z), right.density().get(0, y, z));
                assert_eq!(left.density().get(4, y, z), terrain.density().get(4, y, z));
            }
        }
    }

    #[test]
    fn regeneration_is_idempotent() {
        let mut generator = MeshGenerator::new(2, 2).unwrap();
        let mut terrain = TerrainManager::new(small_config()).unwrap();
        terrain.regenerate_terrain(&mut generator).unwrap();
        let first = terrain.density().clone();

        terrain.regenerate_terrain(&mut generator).unwrap();
        wait_idle(&mut generator);

        assert_eq!(terrain.density(), &first);
        assert_eq!(terrain.chunk_count(), 6);
        for (_, chunk) in terrain.chunks() {
            assert_eq!(chunk.get().installed_meshes(), 1);
        }
        assert_eq!(generator.stats().discarded, 6);
    }

    #[test]
    fn plane_terrain_meshes_every_chunk() {
        let mut generator = MeshGenerator::new(2, 2).unwrap();
        let mut terrain = plane_manager(small_config());
        terrain.regenerate_terrain(&mut generator).unwrap();
        wait_idle(&mut generator);

        for (coordinate, chunk) in terrain.chunks() {
            let chunk = chunk.get();
            let mesh = chunk.surface().render_mesh().unwrap();
            // One quad per column of cubes: (5 - 1) * (4 - 1) columns.
            assert_eq!(mesh.triangle_count(), 24, "chunk {coordinate:?}");
        }
    }

    #[test]
    fn edit_on_shared_boundary_updates_both_chunks() {
        let mut generator = MeshGenerator::new(2, 2).unwrap();
        let mut terrain = plane_manager(small_config());
        terrain.regenerate_terrain(&mut generator).unwrap();
        wait_idle(&mut generator);

        let updated = terrain.set_density([4, 4, 1], -10, &mut generator).unwrap();
        assert_eq!(updated, 2);
        wait_idle(&mut generator);

        let left = terrain.chunk_at(Point3::new(0, 0, 0)).unwrap().get();
        let right = terrain.chunk_at(Point3::new(1, 0, 0)).unwrap().get();
        assert_eq!(left.density().get(4, 4, 1), -10);
        assert_eq!(right.density().get(0, 4, 1), -10);
        assert_eq!(left.installed_meshes(), 2);
        assert_eq!(right.installed_meshes(), 2);

        let untouched = terrain.chunk_at(Point3::new(2, 0, 0)).unwrap().get();
        assert_eq!(untouched.installed_meshes(), 1);
    }

    #[test]
    fn edit_outside_field_is_rejected() {
        let mut generator = MeshGenerator::new(1, 1).unwrap();
        let mut terrain = plane_manager(small_config());
        let err = terrain.set_density([13, 0, 0], -1, &mut generator).unwrap_err();
        assert!(matches!(err, TerrainError::Density(DensityError::OutOfBounds { .. })));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = TerrainConfig {
            chunk_size: [1, 4, 4],
            ..TerrainConfig::default()
        };
        assert!(matches!(
            TerrainManager::new(config),
            Err(TerrainError::Config(_))
        ));
    }
}
