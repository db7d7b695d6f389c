//! # Marching Cubes
//!
//! Turns a density field into a triangle soup. Every unit cube of eight samples
//! is classified by which corners are solid, the classification picks the
//! crossed edges and the triangle layout from [`tables`](super::tables), and
//! each crossed edge gets a vertex at the linear zero crossing between its two
//! corner samples.
//!
//! [`triangulate`] touches nothing but its input and the static tables, so any
//! number of chunks can be meshed in parallel.

use cgmath::Point3;

use super::{
    mesh_data::MeshData,
    tables::{
        CORNER_OFFSETS, EDGE_AXIS, EDGE_CORNERS, EDGE_MIDPOINTS, EDGE_TABLE, TRI_TABLE,
        TRI_TABLE_END,
    },
};
use crate::engine_state::{error::DensityError, voxels::density::DensityField};

/// The eight density samples at the corners of one unit cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CubeSample {
    /// Corner densities in [`CORNER_OFFSETS`] order.
    pub values: [i32; 8],
}

impl CubeSample {
    /// Reads the cube whose lowest corner is the sample at `(x, y, z)`.
    ///
    /// The caller guarantees `x + 1`, `y + 1` and `z + 1` are inside the field.
    pub fn read(density: &DensityField, x: usize, y: usize, z: usize) -> Self {
        Self {
            values: CORNER_OFFSETS
                .map(|[dx, dy, dz]| density.get(x + dx, y + dy, z + dz)),
        }
    }

    /// Configuration index: bit `i` is set when corner `i` is solid.
    pub fn configuration(&self) -> usize {
        self.values
            .iter()
            .enumerate()
            .filter(|&(_, &value)| value < 0)
            .fold(0, |index, (corner, _)| index | (1 << corner))
    }

    /// Cube-local surface crossing for every edge flagged in `edge_mask`.
    ///
    /// Edges not in the mask keep their midpoint.
    pub fn edge_positions(&self, edge_mask: u16) -> [Point3<f32>; 12] {
        let mut positions = EDGE_MIDPOINTS.map(|[x, y, z]| Point3::new(x, y, z));
        for (edge, position) in positions.iter_mut().enumerate() {
            if edge_mask & (1 << edge) == 0 {
                continue;
            }
            let [low, high] = EDGE_CORNERS[edge];
            position[EDGE_AXIS[edge]] =
                interpolation_fraction(self.values[low], self.values[high]);
        }
        positions
    }
}

/// Fraction along an edge where density crosses zero, measured from the `v0` corner.
///
/// Lies in `[0, 1]` whenever `v0` and `v1` straddle zero. Equal values have no
/// crossing and yield the midpoint.
pub fn interpolation_fraction(v0: i32, v1: i32) -> f32 {
    let delta = f64::from(v1) - f64::from(v0);
    if delta == 0.0 {
        return 0.5;
    }
    (-f64::from(v0) / delta) as f32
}

/// Triangulates a density field.
///
/// Vertices are chunk-local. No vertex is shared between triangles, so the
/// index buffer is simply `0..vertex_count`.
///
/// # Errors
/// [`DensityError::TooSmall`] if any axis has fewer than two samples.
pub fn triangulate(density: &DensityField) -> Result<MeshData, DensityError> {
    density.ensure_meshable()?;
    let [size_x, size_y, size_z] = density.size();
    let mut vertices = Vec::new();

    for x in 0..size_x - 1 {
        for y in 0..size_y - 1 {
            for z in 0..size_z - 1 {
                let cube = CubeSample::read(density, x, y, z);
                let configuration = cube.configuration();
                if configuration == 0 || configuration == 255 {
                    continue;
                }

                let edges = cube.edge_positions(EDGE_TABLE[configuration]);
                let offset = [x as f32, y as f32, z as f32];
                vertices.extend(
                    TRI_TABLE[configuration]
                        .iter()
                        .take_while(|&&edge| edge != TRI_TABLE_END)
                        .map(|&edge| {
                            let local = edges[edge as usize];
                            Point3::new(
                                local.x + offset[0],
                                local.y + offset[1],
                                local.z + offset[2],
                            )
                        }),
                );
            }
        }
    }

    Ok(MeshData::from_vertices(vertices))
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};

    use super::*;

    fn cube(values: [i32; 8]) -> DensityField {
        DensityField::from_fn([2, 2, 2], |x, y, z| {
            let corner = CORNER_OFFSETS
                .iter()
                .position(|&offset| offset == [x, y, z])
                .unwrap();
            values[corner]
        })
    }

    fn random_field(rng: &mut fastrand::Rng, size: [usize; 3]) -> DensityField {
        DensityField::from_fn(size, |_, _, _| rng.i32(-100..100))
    }

    #[test]
    fn uniform_fields_produce_no_geometry() {
        let empty = triangulate(&DensityField::filled([6, 6, 6], 3)).unwrap();
        assert!(empty.is_empty());
        let zero = triangulate(&DensityField::filled([6, 6, 6], 0)).unwrap();
        assert!(zero.is_empty());
        let solid = triangulate(&DensityField::filled([6, 6, 6], -3)).unwrap();
        assert!(solid.is_empty());
    }

    #[test]
    fn vertices_come_in_unshared_triples() {
        let mut rng = fastrand::Rng::with_seed(0x5eed);
        for _ in 0..20 {
            let mesh = triangulate(&random_field(&mut rng, [5, 4, 6])).unwrap();
            assert_eq!(mesh.vertices.len() % 3, 0);
            assert_eq!(mesh.indices.len(), mesh.vertices.len());
            assert!(mesh
                .indices
                .iter()
                .enumerate()
                .all(|(i, &index)| index as usize == i));
        }
    }

    #[test]
    fn single_solid_corner_emits_one_triangle_around_it() {
        for corner in 0..8 {
            let mut values = [5; 8];
            values[corner] = -5;
            let mesh = triangulate(&cube(values)).unwrap();
            assert_eq!(mesh.triangle_count(), 1, "corner {corner}");

            let incident: Vec<usize> = (0..12)
                .filter(|&edge| EDGE_CORNERS[edge].contains(&corner))
                .collect();
            for vertex in &mesh.vertices {
                let on_incident_edge = incident.iter().any(|&edge| {
                    let [low, high] = EDGE_CORNERS[edge];
                    let (a, b) = (CORNER_OFFSETS[low], CORNER_OFFSETS[high]);
                    (0..3).all(|axis| {
                        let (lo, hi) = (a[axis].min(b[axis]) as f32, a[axis].max(b[axis]) as f32);
                        vertex[axis] >= lo && vertex[axis] <= hi
                    }) && (0..3)
                        .filter(|&axis| axis != EDGE_AXIS[edge])
                        .all(|axis| vertex[axis] == a[axis] as f32)
                });
                assert!(on_incident_edge, "corner {corner}: {vertex:?} not on an incident edge");
            }
        }
    }

    #[test]
    fn bottom_solid_cube_is_flat_quad_at_midplane() {
        let mesh = triangulate(&cube([-1, -1, -1, -1, 1, 1, 1, 1])).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert!(mesh.vertices.iter().all(|vertex| vertex.y == 0.5));

        let mut corners: Vec<(u32, u32)> = mesh
            .vertices
            .iter()
            .map(|vertex| (vertex.x as u32, vertex.z as u32))
            .collect();
        corners.sort();
        corners.dedup();
        assert_eq!(corners, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn crossing_follows_density_ratio() {
        let mesh = triangulate(&cube([-3, -3, -3, -3, 1, 1, 1, 1])).unwrap();
        assert!(mesh.vertices.iter().all(|vertex| vertex.y == 0.75));
    }

    fn vertex_set(mesh: &MeshData) -> BTreeSet<[u32; 3]> {
        mesh.vertices
            .iter()
            .map(|vertex| [vertex.x.to_bits(), vertex.y.to_bits(), vertex.z.to_bits()])
            .collect()
    }

    fn points(expected: &[[f32; 3]]) -> BTreeSet<[u32; 3]> {
        expected.iter().map(|point| point.map(f32::to_bits)).collect()
    }

    #[test]
    fn crossing_is_measured_from_the_low_end_on_every_axis() {
        // Corner 0 solid: edges 0, 3 and 8 leave it along x, z and y.
        let mesh = triangulate(&cube([-3, 1, 1, 1, 1, 1, 1, 1])).unwrap();
        assert_eq!(
            vertex_set(&mesh),
            points(&[[0.75, 0.0, 0.0], [0.0, 0.0, 0.75], [0.0, 0.75, 0.0]])
        );

        // Corner 3 solid: edge 2 runs 3 -> 2 along x, edge 3 runs 0 -> 3 along z.
        let mesh = triangulate(&cube([1, 1, 1, -3, 1, 1, 1, 1])).unwrap();
        assert_eq!(
            vertex_set(&mesh),
            points(&[[0.75, 0.0, 1.0], [0.0, 0.0, 0.25], [0.0, 0.75, 1.0]])
        );

        // Corner 7 solid: edge 6 runs 7 -> 6 along x, edges 7 and 11 end at 7.
        let mesh = triangulate(&cube([1, 1, 1, 1, 1, 1, 1, -3])).unwrap();
        assert_eq!(
            vertex_set(&mesh),
            points(&[[0.75, 1.0, 1.0], [0.0, 1.0, 0.25], [0.0, 0.25, 1.0]])
        );
    }

    #[test]
    fn closed_surfaces_are_watertight_and_consistently_wound() {
        let mut rng = fastrand::Rng::with_seed(0xc105ed);
        let size = [6, 5, 7];
        for round in 0..200 {
            // Odd values never sit on the surface, and an outside border closes it.
            let field = DensityField::from_fn(size, |x, y, z| {
                let border = [x, y, z]
                    .iter()
                    .zip(size)
                    .any(|(&coordinate, len)| coordinate == 0 || coordinate == len - 1);
                if border {
                    7
                } else {
                    rng.i32(-50..50) * 2 + 1
                }
            });
            let mesh = triangulate(&field).unwrap();

            let key = |point: Point3<f32>| [point.x.to_bits(), point.y.to_bits(), point.z.to_bits()];
            let mut directed: HashMap<([u32; 3], [u32; 3]), i32> = HashMap::new();
            for [a, b, c] in mesh.triangles() {
                for (from, to) in [(a, b), (b, c), (c, a)] {
                    *directed.entry((key(from), key(to))).or_default() += 1;
                }
            }
            for (&(from, to), &count) in &directed {
                assert_eq!(
                    directed.get(&(to, from)).copied().unwrap_or(0),
                    count,
                    "round {round}: edge {from:?} -> {to:?} has no matching reverse"
                );
            }
        }
    }

    #[test]
    fn fraction_stays_on_edge_when_signs_differ() {
        let mut rng = fastrand::Rng::with_seed(42);
        for _ in 0..1000 {
            let negative = rng.i32(i32::MIN..0);
            let non_negative = rng.i32(0..=i32::MAX);
            for t in [
                interpolation_fraction(negative, non_negative),
                interpolation_fraction(non_negative, negative),
            ] {
                assert!((0.0..=1.0).contains(&t), "t = {t}");
            }
        }
        assert_eq!(interpolation_fraction(0, -4), 0.0);
        assert_eq!(interpolation_fraction(-4, 0), 1.0);
    }

    #[test]
    fn vertices_are_offset_by_cube_position() {
        let density = DensityField::from_fn([4, 4, 4], |x, _, _| if x == 3 { -1 } else { 1 });
        let mesh = triangulate(&density).unwrap();
        assert!(!mesh.is_empty());
        assert!(mesh.vertices.iter().all(|vertex| vertex.x == 2.5));
    }

    #[test]
    fn triangle_edges_are_all_flagged_in_edge_table() {
        for configuration in 0..256 {
            for &edge in TRI_TABLE[configuration]
                .iter()
                .take_while(|&&edge| edge != TRI_TABLE_END)
            {
                assert_ne!(EDGE_TABLE[configuration] & (1 << edge), 0);
            }
        }
    }

    #[test]
    fn shared_face_yields_matching_seam_vertices() {
        let world = DensityField::from_fn([9, 6, 5], |x, y, z| {
            (y as i32 * 20) - 50 - (x as i32 * 7) + (z as i32 * 3)
        });
        let left = world.window([0, 0, 0], [5, 6, 5]).unwrap();
        let right = world.window([4, 0, 0], [5, 6, 5]).unwrap();

        let seam = |mesh: &MeshData, local_x: f32, offset: f32| {
            let mut points: Vec<[u32; 3]> = mesh
                .vertices
                .iter()
                .filter(|vertex| vertex.x == local_x)
                .map(|vertex| [(vertex.x + offset).to_bits(), vertex.y.to_bits(), vertex.z.to_bits()])
                .collect();
            points.sort();
            points.dedup();
            points
        };

        let left_seam = seam(&triangulate(&left).unwrap(), 4.0, 0.0);
        let right_seam = seam(&triangulate(&right).unwrap(), 0.0, 4.0);
        assert!(!left_seam.is_empty());
        assert_eq!(left_seam, right_seam);
    }

    #[test]
    fn too_small_density_is_rejected() {
        let err = triangulate(&DensityField::filled([1, 5, 5], -1)).unwrap_err();
        assert_eq!(err, DensityError::TooSmall { axis: 0, len: 1 });
    }
}
