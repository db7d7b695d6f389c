//! # Marching Terrain Entry Point
//!
//! Generates and meshes the configured world, then exits.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info TERRAIN_CONFIG=terrain.json cargo run --release
//! ```

fn main() {
    if let Err(err) = marching_terrain::run() {
        log::error!("Terrain generation failed: {err}");
        std::process::exit(1);
    }
}
