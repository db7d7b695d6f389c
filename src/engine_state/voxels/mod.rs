//! # Voxel Terrain
//!
//! The data side of the terrain: density samples, where they come from, and how
//! they are cut into chunks.
//!
//! ## Architecture
//!
//! * **Density**: [`density::DensityField`], a dense `[x, y, z]` grid of signed samples
//! * **Generation**: [`generation::DensitySource`] implementations that fill a field
//! * **Chunk**: one window of the world field bound to a surface in the scene
//! * **World**: [`world::TerrainManager`], which owns the world field and the chunk grid
//!
//! ## Data Flow
//!
//! 1. The terrain manager fills the world field from its density source
//! 2. Each chunk copies its window out of the world field
//! 3. The chunk requests a mesh for its window
//! 4. The mesh generator calls the chunk back on the tick thread and the chunk
//!    installs the mesh on its surface

pub mod chunk;
pub mod density;
pub mod generation;
pub mod world;
