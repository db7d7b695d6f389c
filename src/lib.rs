#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Marching Terrain
//!
//! Chunked voxel terrain meshed with marching cubes on a background worker pool.
//!
//! A world-sized density field is generated from layered noise, cut into
//! chunks that share their boundary samples, and every chunk is triangulated
//! off the tick thread. Finished meshes are handed back once per tick and
//! installed on each chunk's surface.
//!
//! ## Key Modules
//!
//! * `core` - Shared ownership wrappers for tick-thread and cross-thread state
//! * `engine_state` - Configuration, meshing, the worker pool, chunks and the world
//!
//! ## Usage
//!
//! ```no_run
//! fn main() -> Result<(), marching_terrain::TerrainError> {
//!     marching_terrain::run()
//! }
//! ```
//!
//! Or drive the tick yourself:
//!
//! ```
//! use marching_terrain::{triangulate, DensityField};
//!
//! // Bottom four corners solid, top four empty: a flat quad halfway up.
//! let cube = DensityField::from_fn([2, 2, 2], |_, y, _| if y == 0 { -1 } else { 1 });
//! let mesh = triangulate(&cube).unwrap();
//! assert_eq!(mesh.triangle_count(), 2);
//! assert!(mesh.vertices.iter().all(|vertex| vertex.y == 0.5));
//! ```

use std::{env, time::Duration};

use log::{info, warn};

pub mod core;
pub mod engine_state;

pub use engine_state::{
    config::{NoiseOctave, TerrainConfig, CONFIG_PATH_ENV},
    error::{ConfigError, DensityError, MeshError, TaskError, TerrainError},
    meshing::{triangulate, DispatchStats, MeshData, MeshGenerator, RequestToken},
    rendering::{ChunkSurface, HeadlessSurfaceFactory, RenderMesh, SurfaceFactory, Vertex},
    voxels::{
        chunk::Chunk,
        density::DensityField,
        generation::{DensitySource, LayeredNoiseDensity, PlaneDensity},
        world::TerrainManager,
    },
    EngineState,
};

/// Upper bound on how long `run()` waits for the initial meshes.
const MESHING_TIMEOUT: Duration = Duration::from_secs(120);

/// Generates the configured world headlessly and logs what was built.
///
/// The config is read from the file named by `TERRAIN_CONFIG`, or defaulted.
pub fn run() -> Result<(), TerrainError> {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");

    let config = match env::var_os(CONFIG_PATH_ENV) {
        Some(path) => TerrainConfig::load(path)?,
        None => {
            info!("{CONFIG_PATH_ENV} not set, using the default terrain config");
            TerrainConfig::default()
        }
    };

    let start = web_time::Instant::now();
    let mut engine = EngineState::new(config)?;
    engine.regenerate()?;
    if !engine.run_until_idle(MESHING_TIMEOUT) {
        warn!(
            "Gave up waiting for {} mesh requests after {:?}",
            engine.mesh_generator.pending_requests(),
            MESHING_TIMEOUT
        );
    }

    let triangles: usize = engine
        .terrain
        .chunks()
        .filter_map(|(_, chunk)| {
            chunk
                .get()
                .surface()
                .render_mesh()
                .map(RenderMesh::triangle_count)
        })
        .sum();
    let stats = engine.mesh_generator.stats();
    info!(
        "Meshed {} chunks into {triangles} triangles in {:?} ({} failed requests)",
        engine.terrain.chunk_count(),
        start.elapsed(),
        stats.failed
    );
    Ok(())
}
