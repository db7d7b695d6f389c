//! Error types for the terrain subsystem.
//!
//! Nothing in here is meant to be fatal. The worst outcome of any of these is a
//! chunk that keeps its previous mesh or never receives one.

use thiserror::Error;

/// Problems with density input handed to the mesher or the terrain manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DensityError {
    /// An axis has fewer than two samples, so no cube fits.
    #[error("density field needs at least 2 samples on axis {axis}, found {len}")]
    TooSmall {
        /// Axis index, 0 = x, 1 = y, 2 = z.
        axis: usize,
        /// Samples present on that axis.
        len: usize,
    },
    /// The sample data does not form a full rectangular box.
    #[error("density field is not rectangular: expected {expected} samples, found {found}")]
    NotRectangular {
        /// Samples implied by the declared extents.
        expected: usize,
        /// Samples actually supplied.
        found: usize,
    },
    /// A chunk window reaches past the edge of the world field.
    #[error("window at {origin:?} with size {size:?} exceeds field size {field:?}")]
    WindowOutOfBounds {
        /// Window origin in world samples.
        origin: [usize; 3],
        /// Window extents.
        size: [usize; 3],
        /// Extents of the field being sliced.
        field: [usize; 3],
    },
    /// A single-sample access outside the field.
    #[error("sample {point:?} is outside field size {field:?}")]
    OutOfBounds {
        /// The requested sample.
        point: [usize; 3],
        /// Extents of the field.
        field: [usize; 3],
    },
}

/// Failures of the background task machinery itself.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The task panicked on its worker thread.
    #[error("task panicked: {0}")]
    Panicked(String),
    /// A worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Why a mesh request did not produce a mesh.
#[derive(Debug, Error)]
pub enum MeshError {
    /// The density handed to the request cannot be triangulated.
    #[error("invalid density: {0}")]
    InvalidDensity(#[from] DensityError),
    /// The worker running the triangulation failed.
    #[error(transparent)]
    Task(#[from] TaskError),
}

/// Problems loading or validating [`TerrainConfig`](super::config::TerrainConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),
    /// The config file is not valid JSON for the config schema.
    #[error("could not parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is out of its allowed range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors surfaced by terrain manager and engine operations.
#[derive(Debug, Error)]
pub enum TerrainError {
    /// Configuration could not be used.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Density slicing or editing failed.
    #[error(transparent)]
    Density(#[from] DensityError),
    /// The mesh worker pool could not be created.
    #[error(transparent)]
    Task(#[from] TaskError),
}
