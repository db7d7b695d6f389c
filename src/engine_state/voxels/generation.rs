//! # Density Generation
//!
//! Density sources turn world sample coordinates into signed densities. The
//! terrain manager only ever talks to the [`DensitySource`] trait, so the
//! noise-based heightmap below can be swapped for anything else.

use noise::{NoiseFn, Perlin};

use super::density::DensityField;
use crate::engine_state::config::{NoiseOctave, TerrainConfig};

/// Produces the world density field.
pub trait DensitySource {
    /// Density at world sample `(x, y, z)`. Negative is solid.
    fn density(&self, x: usize, y: usize, z: usize) -> i32;

    /// Fills a whole field of `size` samples starting at the world origin.
    fn fill(&self, size: [usize; 3]) -> DensityField {
        DensityField::from_fn(size, |x, y, z| self.density(x, y, z))
    }
}

/// Converts a height to a density at row `y`.
///
/// The float-to-int cast truncates toward zero and saturates, so the sign still
/// flips exactly where `y` passes `height`.
fn height_to_density(y: usize, height: f32, scale: f32) -> i32 {
    ((y as f32 - height) * scale) as i32
}

/// Heightmap terrain: summed Perlin octaves with low ground pressed into a plateau.
pub struct LayeredNoiseDensity {
    perlin: Perlin,
    octaves: Vec<NoiseOctave>,
    scale: f32,
    plateau_threshold: f32,
    plateau_compression: f32,
    plateau_offset: f32,
}

impl LayeredNoiseDensity {
    /// Builds a source from the noise and plateau settings in `config`.
    pub fn new(config: &TerrainConfig) -> Self {
        Self {
            perlin: Perlin::new(config.seed),
            octaves: config.octaves.clone(),
            scale: config.density_scale,
            plateau_threshold: config.plateau_threshold,
            plateau_compression: config.plateau_compression,
            plateau_offset: config.plateau_offset,
        }
    }

    /// Perlin noise remapped from `[-1, 1]` to `[0, 1]`.
    fn unit_noise(&self, x: f64, z: f64) -> f32 {
        ((self.perlin.get([x, z]) * 0.5 + 0.5) as f32).clamp(0.0, 1.0)
    }

    /// Surface height above column `(x, z)`.
    pub fn height_at(&self, x: usize, z: usize) -> f32 {
        let raw: f32 = self
            .octaves
            .iter()
            .map(|octave| {
                self.unit_noise(x as f64 * octave.frequency, z as f64 * octave.frequency)
                    * octave.amplitude
            })
            .sum();
        self.flatten(raw)
    }

    /// Applies the plateau rule to a raw height.
    pub fn flatten(&self, height: f32) -> f32 {
        if height < self.plateau_threshold {
            height * self.plateau_compression + self.plateau_offset
        } else {
            height
        }
    }
}

impl DensitySource for LayeredNoiseDensity {
    fn density(&self, x: usize, y: usize, z: usize) -> i32 {
        height_to_density(y, self.height_at(x, z), self.scale)
    }

    fn fill(&self, size: [usize; 3]) -> DensityField {
        let [size_x, _, size_z] = size;
        let heights: Vec<f32> = (0..size_x)
            .flat_map(|x| (0..size_z).map(move |z| (x, z)))
            .map(|(x, z)| self.height_at(x, z))
            .collect();
        DensityField::from_fn(size, |x, y, z| {
            height_to_density(y, heights[x * size_z + z], self.scale)
        })
    }
}

/// Flat ground at a fixed height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneDensity {
    /// Height of the ground surface.
    pub height: f32,
    /// Density change per unit of height.
    pub scale: f32,
}

impl DensitySource for PlaneDensity {
    fn density(&self, _x: usize, y: usize, _z: usize) -> i32 {
        height_to_density(y, self.height, self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_ground_is_pressed_into_plateau() {
        let source = LayeredNoiseDensity::new(&TerrainConfig::default());
        assert_eq!(source.flatten(40.0), 40.0 * 0.05 + 52.0);
        assert_eq!(source.flatten(0.0), 52.0);
        assert_eq!(source.flatten(80.0), 80.0);
    }

    const DEFAULT_MAX: f32 = 130.0 + 10.0 + 5.0 + 2.5 + 1.25;

    #[test]
    fn heights_stay_within_octave_budget() {
        let source = LayeredNoiseDensity::new(&TerrainConfig::default());
        for x in (0..200).step_by(7) {
            for z in (0..200).step_by(11) {
                let height = source.height_at(x, z);
                assert!((52.0..=DEFAULT_MAX).contains(&height), "height {height} at ({x}, {z})");
            }
        }
    }

    #[test]
    fn density_sign_flips_at_surface() {
        let source = LayeredNoiseDensity::new(&TerrainConfig::default());
        let height = source.height_at(17, 23);
        let below = height.floor() as usize;
        assert!(source.density(17, below, 23) <= 0);
        assert!(source.density(17, below + 1, 23) >= 0);
        assert!(source.density(17, below + 2, 23) > 0);
        assert!(source.density(17, 0, 23) < 0);
    }

    #[test]
    fn column_fill_matches_per_sample_density() {
        let source = LayeredNoiseDensity::new(&TerrainConfig {
            seed: 3,
            ..TerrainConfig::default()
        });
        let filled = source.fill([6, 70, 5]);
        let reference = DensityField::from_fn([6, 70, 5], |x, y, z| source.density(x, y, z));
        assert_eq!(filled, reference);
    }

    #[test]
    fn plane_is_solid_below_height() {
        let plane = PlaneDensity {
            height: 2.5,
            scale: 10.0,
        };
        assert_eq!(plane.density(0, 2, 0), -5);
        assert_eq!(plane.density(9, 3, 9), 5);
    }
}
