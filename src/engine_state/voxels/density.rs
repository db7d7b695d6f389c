//! # Density Field
//!
//! A rectangular grid of signed samples. Negative values are solid, everything
//! else is empty, and the raw values double as pseudo-distances when the mesher
//! interpolates where the surface crosses a cube edge.
//!
//! Samples are stored flat in `[x][y][z]` order, so `z` is the fastest-moving
//! index. Chunks are carved out of the world field with [`DensityField::window`];
//! adjacent windows overlap by one sample on their shared face, which is what
//! keeps chunk seams closed.

use crate::engine_state::error::DensityError;

/// A 3D grid of signed density samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DensityField {
    size: [usize; 3],
    samples: Vec<i32>,
}

impl DensityField {
    /// Creates a field of the given size with every sample set to `value`.
    pub fn filled(size: [usize; 3], value: i32) -> Self {
        Self {
            size,
            samples: vec![value; size.iter().product()],
        }
    }

    /// Creates a field by evaluating `sample(x, y, z)` at every grid point.
    pub fn from_fn(size: [usize; 3], mut sample: impl FnMut(usize, usize, usize) -> i32) -> Self {
        let mut samples = Vec::with_capacity(size.iter().product());
        for x in 0..size[0] {
            for y in 0..size[1] {
                for z in 0..size[2] {
                    samples.push(sample(x, y, z));
                }
            }
        }
        Self { size, samples }
    }

    /// Wraps a flat `[x][y][z]`-ordered sample buffer.
    ///
    /// # Errors
    /// [`DensityError::NotRectangular`] if the buffer length does not match `size`.
    pub fn from_samples(size: [usize; 3], samples: Vec<i32>) -> Result<Self, DensityError> {
        let expected = size.iter().product();
        if samples.len() != expected {
            return Err(DensityError::NotRectangular {
                expected,
                found: samples.len(),
            });
        }
        Ok(Self { size, samples })
    }

    /// Builds a field from nested `x`, `y`, `z` vectors.
    ///
    /// # Errors
    /// [`DensityError::NotRectangular`] if any row is ragged.
    pub fn from_nested(nested: Vec<Vec<Vec<i32>>>) -> Result<Self, DensityError> {
        let size_x = nested.len();
        let size_y = nested.first().map_or(0, Vec::len);
        let size_z = nested
            .first()
            .and_then(|plane| plane.first())
            .map_or(0, Vec::len);
        let expected = size_x * size_y * size_z;
        let found: usize = nested.iter().flatten().map(Vec::len).sum();

        let ragged = nested.iter().any(|plane| {
            plane.len() != size_y || plane.iter().any(|row| row.len() != size_z)
        });
        if ragged || found != expected {
            return Err(DensityError::NotRectangular { expected, found });
        }

        let samples = nested.into_iter().flatten().flatten().collect();
        Ok(Self {
            size: [size_x, size_y, size_z],
            samples,
        })
    }

    /// Extents along x, y and z.
    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    /// The raw samples in `[x][y][z]` order.
    pub fn samples(&self) -> &[i32] {
        &self.samples
    }

    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (x * self.size[1] + y) * self.size[2] + z
    }

    fn contains(&self, x: usize, y: usize, z: usize) -> bool {
        x < self.size[0] && y < self.size[1] && z < self.size[2]
    }

    /// Reads a sample.
    ///
    /// # Panics
    /// Panics if the point is outside the field. Use [`DensityField::sample`] for
    /// a checked read.
    pub fn get(&self, x: usize, y: usize, z: usize) -> i32 {
        assert!(
            self.contains(x, y, z),
            "sample ({x}, {y}, {z}) outside field {:?}",
            self.size
        );
        self.samples[self.index(x, y, z)]
    }

    /// Reads a sample, returning `None` outside the field.
    pub fn sample(&self, x: usize, y: usize, z: usize) -> Option<i32> {
        self.contains(x, y, z)
            .then(|| self.samples[self.index(x, y, z)])
    }

    /// Writes a sample.
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: i32) -> Result<(), DensityError> {
        if !self.contains(x, y, z) {
            return Err(DensityError::OutOfBounds {
                point: [x, y, z],
                field: self.size,
            });
        }
        let index = self.index(x, y, z);
        self.samples[index] = value;
        Ok(())
    }

    /// Copies a `size`-shaped box starting at `origin` into a new field.
    pub fn window(&self, origin: [usize; 3], size: [usize; 3]) -> Result<DensityField, DensityError> {
        let fits = (0..3).all(|axis| origin[axis] + size[axis] <= self.size[axis]);
        if !fits {
            return Err(DensityError::WindowOutOfBounds {
                origin,
                size,
                field: self.size,
            });
        }

        let mut samples = Vec::with_capacity(size.iter().product());
        for x in origin[0]..origin[0] + size[0] {
            for y in origin[1]..origin[1] + size[1] {
                let row = self.index(x, y, origin[2]);
                samples.extend_from_slice(&self.samples[row..row + size[2]]);
            }
        }
        Ok(Self { size, samples })
    }

    /// Checks the field holds at least one full cube.
    pub fn ensure_meshable(&self) -> Result<(), DensityError> {
        match self.size.iter().position(|&len| len < 2) {
            Some(axis) => Err(DensityError::TooSmall {
                axis,
                len: self.size[axis],
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_fn_indexes_x_y_z() {
        let field = DensityField::from_fn([2, 3, 4], |x, y, z| (x * 100 + y * 10 + z) as i32);
        assert_eq!(field.get(1, 2, 3), 123);
        assert_eq!(field.get(0, 1, 0), 10);
        assert_eq!(field.sample(2, 0, 0), None);
        assert_eq!(field.samples().len(), 24);
        assert_eq!(field.samples()[..5], [0, 1, 2, 3, 10]);
    }

    #[test]
    fn nested_input_must_be_rectangular() {
        let ragged = vec![vec![vec![1, 2], vec![3]], vec![vec![4, 5], vec![6, 7]]];
        assert!(matches!(
            DensityField::from_nested(ragged),
            Err(DensityError::NotRectangular { .. })
        ));

        let square = vec![vec![vec![1, 2], vec![3, 4]], vec![vec![5, 6], vec![7, 8]]];
        let field = DensityField::from_nested(square).unwrap();
        assert_eq!(field.size(), [2, 2, 2]);
        assert_eq!(field.get(1, 0, 1), 6);
    }

    #[test]
    fn flat_samples_must_match_size() {
        let err = DensityField::from_samples([2, 2, 2], vec![0; 7]).unwrap_err();
        assert_eq!(
            err,
            DensityError::NotRectangular {
                expected: 8,
                found: 7
            }
        );
    }

    #[test]
    fn window_copies_overlapping_region() {
        let field = DensityField::from_fn([5, 5, 5], |x, y, z| (x * 100 + y * 10 + z) as i32);
        let window = field.window([2, 1, 3], [3, 2, 2]).unwrap();
        assert_eq!(window.size(), [3, 2, 2]);
        assert_eq!(window.get(0, 0, 0), 213);
        assert_eq!(window.get(2, 1, 1), 424);
    }

    #[test]
    fn window_past_edge_is_rejected() {
        let field = DensityField::filled([4, 4, 4], 1);
        assert!(matches!(
            field.window([2, 0, 0], [3, 4, 4]),
            Err(DensityError::WindowOutOfBounds { .. })
        ));
    }

    #[test]
    fn set_checks_bounds() {
        let mut field = DensityField::filled([2, 2, 2], 1);
        field.set(1, 1, 1, -4).unwrap();
        assert_eq!(field.get(1, 1, 1), -4);
        assert!(matches!(
            field.set(2, 0, 0, 0),
            Err(DensityError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn thin_fields_are_not_meshable() {
        let field = DensityField::filled([4, 1, 4], -1);
        assert_eq!(
            field.ensure_meshable(),
            Err(DensityError::TooSmall { axis: 1, len: 1 })
        );
        assert!(DensityField::filled([2, 2, 2], 0).ensure_meshable().is_ok());
    }
}
