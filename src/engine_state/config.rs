//! # Terrain Configuration
//!
//! Every tunable the terrain subsystem recognises lives in [`TerrainConfig`].
//! The struct is serde-backed so a JSON file can override any subset of fields;
//! anything missing falls back to [`TerrainConfig::default`].
//!
//! ```
//! use marching_terrain::TerrainConfig;
//!
//! let config = TerrainConfig::from_json_str(r#"{ "world_chunk_count": [2, 1, 2] }"#).unwrap();
//! assert_eq!(config.world_chunk_count, [2, 1, 2]);
//! assert_eq!(config.chunk_size, [16, 16, 16]);
//! assert_eq!(config.world_grid_size(), [31, 16, 31]);
//! ```

use std::{fs, path::Path};

use log::info;
use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Environment variable `run()` reads the config file path from.
pub const CONFIG_PATH_ENV: &str = "TERRAIN_CONFIG";

/// One band of the height noise: sample at `frequency`, scale by `amplitude`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseOctave {
    /// Multiplier applied to world x/z before sampling.
    pub frequency: f64,
    /// Height contributed by this band at full noise.
    pub amplitude: f32,
}

impl NoiseOctave {
    /// Creates a new octave.
    pub const fn new(frequency: f64, amplitude: f32) -> Self {
        Self {
            frequency,
            amplitude,
        }
    }
}

/// Height bands used when no config overrides them.
pub const DEFAULT_OCTAVES: [NoiseOctave; 5] = [
    NoiseOctave::new(0.01, 130.0),
    NoiseOctave::new(0.03, 10.0),
    NoiseOctave::new(0.09, 5.0),
    NoiseOctave::new(0.018, 2.5),
    NoiseOctave::new(0.036, 1.25),
];

/// Configuration for terrain generation, chunking and mesh dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Number of chunks along each axis.
    pub world_chunk_count: [u32; 3],
    /// Density samples per chunk along each axis. Neighbouring chunks share one layer.
    pub chunk_size: [u32; 3],
    /// `density = (y - height) * density_scale`.
    pub density_scale: f32,
    /// Heights below this value are flattened into a plateau.
    pub plateau_threshold: f32,
    /// Multiplier applied to heights below the threshold.
    pub plateau_compression: f32,
    /// Offset added to heights below the threshold after compression.
    pub plateau_offset: f32,
    /// Noise bands summed into the terrain height.
    pub octaves: Vec<NoiseOctave>,
    /// Seed for the Perlin source.
    pub seed: u32,
    /// Mesh worker threads. `0` means one per available core.
    pub worker_count: usize,
    /// Requests a single worker may hold before further requests wait on the tick thread.
    pub max_tasks_in_flight: usize,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            world_chunk_count: [4, 2, 4],
            chunk_size: [16, 16, 16],
            density_scale: 50.0,
            plateau_threshold: 55.0,
            plateau_compression: 0.05,
            plateau_offset: 52.0,
            octaves: DEFAULT_OCTAVES.to_vec(),
            seed: 0,
            worker_count: 0,
            max_tasks_in_flight: 4,
        }
    }
}

impl TerrainConfig {
    /// Parses and validates a config from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: TerrainConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = Self::from_json_str(&fs::read_to_string(path)?)?;
        info!("Loaded terrain config from {}", path.display());
        Ok(config)
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(axis) = self.chunk_size.iter().position(|&size| size < 2) {
            return Err(ConfigError::Invalid(format!(
                "chunk_size[{axis}] must be at least 2, got {}",
                self.chunk_size[axis]
            )));
        }
        if let Some(axis) = self.world_chunk_count.iter().position(|&count| count == 0) {
            return Err(ConfigError::Invalid(format!(
                "world_chunk_count[{axis}] must be at least 1"
            )));
        }
        if self.octaves.is_empty() {
            return Err(ConfigError::Invalid("at least one noise octave is required".into()));
        }
        let scalars = [
            ("density_scale", self.density_scale),
            ("plateau_threshold", self.plateau_threshold),
            ("plateau_compression", self.plateau_compression),
            ("plateau_offset", self.plateau_offset),
        ];
        for (name, value) in scalars {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(format!("{name} must be finite")));
            }
        }
        if self
            .octaves
            .iter()
            .any(|octave| !octave.frequency.is_finite() || !octave.amplitude.is_finite())
        {
            return Err(ConfigError::Invalid("noise octaves must be finite".into()));
        }
        if self.max_tasks_in_flight == 0 {
            return Err(ConfigError::Invalid("max_tasks_in_flight must be at least 1".into()));
        }
        Ok(())
    }

    /// Samples per axis in the world density field: `count * (size - 1) + 1`.
    pub fn world_grid_size(&self) -> [usize; 3] {
        [0, 1, 2].map(|axis| {
            self.world_chunk_count[axis] as usize * (self.chunk_size[axis] as usize - 1) + 1
        })
    }

    /// Chunk sample extents as `usize`.
    pub fn chunk_extent(&self) -> [usize; 3] {
        self.chunk_size.map(|size| size as usize)
    }

    /// Worker count with `0` resolved to the available parallelism.
    pub fn resolved_worker_count(&self) -> usize {
        if self.worker_count > 0 {
            return self.worker_count;
        }
        std::thread::available_parallelism()
            .map(|count| count.get())
            .unwrap_or(1)
    }
}
