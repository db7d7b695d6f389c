//! # Engine State Module
//!
//! Ties the terrain subsystem together.
//!
//! ## Key Components
//!
//! * `EngineState` - owns the mesh generator and the terrain manager and runs the tick
//! * `config` - terrain, chunking and worker settings
//! * `error` - error types shared by every component
//! * `meshing` - marching cubes and the mesh request dispatcher
//! * `rendering` - mesh construction and the surface chunks draw into
//! * `task_management` - the worker pool meshing runs on
//! * `voxels` - density fields, chunks and the world
//!
//! ## Tick
//!
//! Nothing here blocks on meshing. The caller drives the subsystem by calling
//! [`EngineState::update`] once per frame, which installs every mesh that
//! finished since the previous call.

use std::{thread, time::Duration};

use log::info;
use web_time::Instant;

use config::TerrainConfig;
use error::TerrainError;
use meshing::MeshGenerator;
use voxels::world::TerrainManager;

pub mod config;
pub mod error;
pub mod meshing;
pub mod rendering;
pub mod task_management;
pub mod voxels;

/// How long `run_until_idle` sleeps between ticks.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// The terrain subsystem: a mesh dispatcher and the world it meshes.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use marching_terrain::{EngineState, TerrainConfig};
///
/// let config = TerrainConfig {
///     world_chunk_count: [2, 1, 2],
///     chunk_size: [8, 8, 8],
///     worker_count: 2,
///     ..TerrainConfig::default()
/// };
/// let mut engine = EngineState::new(config).unwrap();
/// engine.regenerate().unwrap();
/// assert!(engine.run_until_idle(Duration::from_secs(10)));
/// assert_eq!(engine.terrain.chunk_count(), 4);
/// ```
pub struct EngineState {
    /// Runs triangulation off the tick thread and delivers finished meshes
    pub mesh_generator: MeshGenerator,
    /// World density and chunk grid
    pub terrain: TerrainManager,
}

impl EngineState {
    /// Validates `config`, starts the worker pool and builds an empty world.
    pub fn new(config: TerrainConfig) -> Result<Self, TerrainError> {
        config.validate()?;
        let workers = config.resolved_worker_count();
        let mesh_generator = MeshGenerator::new(workers, config.max_tasks_in_flight)?;
        info!("Engine state created with {workers} mesh workers");

        Ok(Self {
            mesh_generator,
            terrain: TerrainManager::new(config)?,
        })
    }

    /// Builds engine state around an existing terrain manager.
    pub fn with_terrain(terrain: TerrainManager) -> Result<Self, TerrainError> {
        let config = terrain.config();
        let mesh_generator =
            MeshGenerator::new(config.resolved_worker_count(), config.max_tasks_in_flight)?;
        Ok(Self {
            mesh_generator,
            terrain,
        })
    }

    /// Rebuilds the whole world and requests a mesh for every chunk.
    pub fn regenerate(&mut self) -> Result<(), TerrainError> {
        self.terrain.regenerate_terrain(&mut self.mesh_generator)
    }

    /// Writes one world sample and re-meshes the chunks that contain it.
    pub fn set_density(&mut self, point: [usize; 3], value: i32) -> Result<usize, TerrainError> {
        self.terrain
            .set_density(point, value, &mut self.mesh_generator)
    }

    /// One tick: installs every mesh finished since the last tick.
    ///
    /// Returns how many completion callbacks ran.
    pub fn update(&mut self) -> usize {
        self.mesh_generator.update()
    }

    /// Ticks until no mesh request is outstanding or `timeout` passes.
    ///
    /// Returns `true` if the dispatcher went idle in time.
    pub fn run_until_idle(&mut self, timeout: Duration) -> bool {
        let start = Instant::now();
        loop {
            self.update();
            if self.mesh_generator.is_idle() {
                return true;
            }
            if start.elapsed() >= timeout {
                return false;
            }
            thread::sleep(IDLE_POLL_INTERVAL);
        }
    }
}
