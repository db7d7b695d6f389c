//! End-to-end: generate a world, tick until every chunk is meshed, edit it.

use std::{collections::BTreeSet, time::Duration};

use cgmath::Point3;
use marching_terrain::{
    triangulate, DensitySource, EngineState, HeadlessSurfaceFactory, NoiseOctave, RenderMesh,
    TerrainConfig, TerrainManager,
};

const TIMEOUT: Duration = Duration::from_secs(30);

/// Sloped, rippled ground. Every sample is odd, so no sample sits exactly on the surface.
struct RippledSlope;

impl DensitySource for RippledSlope {
    fn density(&self, x: usize, y: usize, z: usize) -> i32 {
        let ground = 40 + (x as i32 * 7 + z as i32 * 3) % 23;
        2 * (y as i32 * 8 - ground) + 1
    }
}

fn config() -> TerrainConfig {
    TerrainConfig {
        world_chunk_count: [3, 2, 2],
        chunk_size: [6, 6, 6],
        worker_count: 3,
        max_tasks_in_flight: 2,
        ..TerrainConfig::default()
    }
}

fn rippled_engine() -> EngineState {
    let terrain = TerrainManager::with_source(
        config(),
        Box::new(RippledSlope),
        Box::new(HeadlessSurfaceFactory::default()),
    )
    .unwrap();
    EngineState::with_terrain(terrain).unwrap()
}

/// World-space positions of a chunk's vertices lying on the plane `x == plane`.
fn vertices_on_x_plane(engine: &EngineState, coordinate: Point3<i32>, plane: f32) -> BTreeSet<[u32; 3]> {
    let chunk = engine.terrain.chunk_at(coordinate).unwrap().get();
    let offset = chunk.world_offset;
    chunk
        .surface()
        .render_mesh()
        .unwrap()
        .vertices
        .iter()
        .map(|vertex| {
            [
                vertex.position[0] + offset.x as f32,
                vertex.position[1] + offset.y as f32,
                vertex.position[2] + offset.z as f32,
            ]
        })
        .filter(|position| position[0] == plane)
        .map(|position| position.map(f32::to_bits))
        .collect()
}

#[test]
fn every_chunk_is_meshed_like_a_single_threaded_run() {
    // Low rolling hills that fit inside the 11-sample-tall world.
    let hills = TerrainConfig {
        octaves: vec![NoiseOctave::new(0.15, 8.0)],
        plateau_threshold: 0.0,
        density_scale: 10.0,
        ..config()
    };
    let mut engine = EngineState::new(hills).unwrap();
    engine.regenerate().unwrap();
    assert!(engine.run_until_idle(TIMEOUT));

    assert_eq!(engine.terrain.chunk_count(), 12);
    assert_eq!(engine.mesh_generator.stats().delivered, 12);
    assert_eq!(engine.mesh_generator.stats().failed, 0);

    for (coordinate, chunk) in engine.terrain.chunks() {
        let chunk = chunk.get();
        assert!(!chunk.is_mesh_pending(), "chunk {coordinate:?}");
        let expected = RenderMesh::from_mesh_data(&triangulate(chunk.density()).unwrap());
        assert_eq!(chunk.surface().render_mesh(), Some(&expected));
        assert_eq!(chunk.surface().collision_mesh(), Some(&expected));
    }

    let triangles: usize = engine
        .terrain
        .chunks()
        .map(|(_, chunk)| chunk.get().surface().render_mesh().unwrap().triangle_count())
        .sum();
    assert!(triangles > 0);
}

#[test]
fn neighbouring_chunks_meet_on_shared_face() {
    let mut engine = rippled_engine();
    engine.regenerate().unwrap();
    assert!(engine.run_until_idle(TIMEOUT));

    for y in 0..2 {
        for z in 0..2 {
            let left = vertices_on_x_plane(&engine, Point3::new(0, y, z), 5.0);
            let right = vertices_on_x_plane(&engine, Point3::new(1, y, z), 5.0);
            assert_eq!(left, right, "seam between x=0 and x=1 at y={y}, z={z}");
        }
    }

    let total: usize = (0..2)
        .flat_map(|y| (0..2).map(move |z| (y, z)))
        .map(|(y, z)| vertices_on_x_plane(&engine, Point3::new(0, y, z), 5.0).len())
        .sum();
    assert!(total > 0, "the surface should cross the seam");
}

#[test]
fn edits_remesh_after_the_next_ticks() {
    let mut engine = rippled_engine();
    engine.regenerate().unwrap();
    assert!(engine.run_until_idle(TIMEOUT));

    // Corner shared by four chunks along x and z.
    let updated = engine.set_density([5, 2, 5], -99).unwrap();
    assert_eq!(updated, 4);
    assert!(engine.run_until_idle(TIMEOUT));

    for coordinate in [
        Point3::new(0, 0, 0),
        Point3::new(1, 0, 0),
        Point3::new(0, 0, 1),
        Point3::new(1, 0, 1),
    ] {
        let chunk = engine.terrain.chunk_at(coordinate).unwrap().get();
        assert_eq!(chunk.installed_meshes(), 2, "chunk {coordinate:?}");
    }
    let far = engine.terrain.chunk_at(Point3::new(2, 1, 1)).unwrap().get();
    assert_eq!(far.installed_meshes(), 1);
}

#[test]
fn regenerating_mid_flight_discards_old_results() {
    let mut engine = rippled_engine();
    engine.regenerate().unwrap();
    engine.regenerate().unwrap();
    assert!(engine.run_until_idle(TIMEOUT));

    let stats = engine.mesh_generator.stats();
    assert_eq!(stats.discarded, 12);
    assert_eq!(stats.delivered, 12);
    for (_, chunk) in engine.terrain.chunks() {
        assert_eq!(chunk.get().installed_meshes(), 1);
    }
}
