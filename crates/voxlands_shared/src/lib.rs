pub mod block;
pub mod chunk;
pub mod config;
pub mod coords;
pub mod mesh;
pub mod physics;
pub mod render;
pub mod world;
pub mod worldgen;

pub use block::{BlockSide, BlockTextures, BlockType, DefaultBlockTextures};
pub use chunk::{Chunk, ChunkBorders, ChunkError};
pub use config::{ConfigError, VoxelConfig};
pub use coords::{ChunkDims, ChunkPos, LocalPos};
pub use mesh::{ChunkMesh, ChunkMeshes, ChunkVertex, NeighborLookup};
pub use physics::{Ray, RayHit, AABB};
pub use render::{ChunkRenderer, DrawStats, MeshStream};
pub use world::{RegionUpdate, World};
pub use worldgen::TerrainGenerator;
