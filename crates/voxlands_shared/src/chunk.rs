use std::fmt;

use bitflags::bitflags;
use glam::IVec3;
use serde::{Deserialize, Serialize};

use crate::block::{BlockTextures, BlockType};
use crate::coords::{ChunkDims, ChunkPos, LocalPos};
use crate::mesh::{build_chunk_meshes, ChunkMesh, ChunkMeshes, NeighborLookup};
use crate::worldgen::TerrainGenerator;

bitflags! {
    /// Chunk faces an edited voxel lies on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ChunkBorders: u8 {
        const NEG_X = 0b0000_0001;
        const POS_X = 0b0000_0010;
        const NEG_Y = 0b0000_0100;
        const POS_Y = 0b0000_1000;
        const NEG_Z = 0b0001_0000;
        const POS_Z = 0b0010_0000;
    }
}

impl ChunkBorders {
    /// Each axis is checked independently, so a corner voxel touches two or
    /// three borders.
    pub fn touched_by(local: LocalPos, dims: ChunkDims) -> Self {
        let last = dims.extent() - IVec3::ONE;
        let local = local.as_ivec3();

        let mut borders = Self::empty();
        borders.set(Self::NEG_X, local.x == 0);
        borders.set(Self::POS_X, local.x == last.x);
        borders.set(Self::NEG_Y, local.y == 0);
        borders.set(Self::POS_Y, local.y == last.y);
        borders.set(Self::NEG_Z, local.z == 0);
        borders.set(Self::POS_Z, local.z == last.z);
        borders
    }

    /// Positions of the chunks sharing the flagged faces with `chunk_pos`.
    pub fn neighbors(self, chunk_pos: ChunkPos) -> impl Iterator<Item = ChunkPos> {
        const OFFSETS: [(ChunkBorders, IVec3); 6] = [
            (ChunkBorders::NEG_X, IVec3::NEG_X),
            (ChunkBorders::POS_X, IVec3::X),
            (ChunkBorders::NEG_Y, IVec3::NEG_Y),
            (ChunkBorders::POS_Y, IVec3::Y),
            (ChunkBorders::NEG_Z, IVec3::NEG_Z),
            (ChunkBorders::POS_Z, IVec3::Z),
        ];

        OFFSETS
            .into_iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(move |(_, offset)| chunk_pos + ChunkPos::from(offset))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    LocalOutOfBounds { local: IVec3, dims: ChunkDims },
}

impl fmt::Display for ChunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalOutOfBounds { local, dims } => write!(
                f,
                "local position {local} is outside a {}x{}x{} chunk",
                dims.width, dims.height, dims.width
            ),
        }
    }
}

impl std::error::Error for ChunkError {}

/// One column section of the world: block storage plus its derived meshes.
///
/// Block storage stays unallocated until the first write, and reads of an
/// unallocated chunk see air.
#[derive(Debug, Clone)]
pub struct Chunk {
    position: ChunkPos,
    dims: ChunkDims,
    blocks: Vec<BlockType>,
    generated: bool,
    mesh_built: bool,
    mesh_revision: u64,
    meshes: ChunkMeshes,
}

impl Chunk {
    pub fn new(position: ChunkPos, dims: ChunkDims) -> Self {
        Self {
            position,
            dims,
            blocks: Vec::new(),
            generated: false,
            mesh_built: false,
            mesh_revision: 0,
            meshes: ChunkMeshes::default(),
        }
    }

    pub fn position(&self) -> ChunkPos {
        self.position
    }

    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    /// World position of local `(0, 0, 0)`.
    pub fn origin(&self) -> IVec3 {
        self.dims.chunk_origin(self.position)
    }

    pub fn is_allocated(&self) -> bool {
        !self.blocks.is_empty()
    }

    pub fn is_generated(&self) -> bool {
        self.generated
    }

    pub fn is_mesh_built(&self) -> bool {
        self.mesh_built
    }

    /// Bumped every time new meshes are installed.
    pub fn mesh_revision(&self) -> u64 {
        self.mesh_revision
    }

    pub fn meshes(&self) -> &ChunkMeshes {
        &self.meshes
    }

    pub fn solid_mesh(&self) -> &ChunkMesh {
        &self.meshes.solid
    }

    pub fn water_mesh(&self) -> &ChunkMesh {
        &self.meshes.water
    }

    /// Dense block storage in `x + z * width + y * width²` order. Empty until
    /// the chunk is first written.
    pub fn blocks(&self) -> &[BlockType] {
        &self.blocks
    }

    pub fn block(&self, local: LocalPos) -> Option<BlockType> {
        self.block_local(local.as_ivec3())
    }

    pub fn block_local(&self, local: IVec3) -> Option<BlockType> {
        let local = LocalPos::from_ivec3(self.dims, local)?;
        if self.blocks.is_empty() {
            return Some(BlockType::Air);
        }
        Some(self.blocks[self.dims.local_to_index(local)])
    }

    /// Block at a world position, when that position belongs to this chunk.
    pub fn block_at(&self, world_pos: IVec3) -> Option<BlockType> {
        self.block_local(world_pos - self.origin())
    }

    /// Chunk-local occupancy as seen from a `viewer` voxel. Positions outside
    /// the chunk are never occupied.
    pub fn is_block(&self, local: IVec3, viewer: BlockType) -> bool {
        self.block_local(local)
            .is_some_and(|block| block.occludes(viewer))
    }

    /// Writes a block and returns the one it replaced. Does not touch the
    /// meshes.
    pub fn set(&mut self, local: LocalPos, block: BlockType) -> Result<BlockType, ChunkError> {
        if !self.dims.contains(local.as_ivec3()) {
            return Err(ChunkError::LocalOutOfBounds {
                local: local.as_ivec3(),
                dims: self.dims,
            });
        }

        let index = self.dims.local_to_index(local);
        let slot = &mut self.storage_mut()[index];
        Ok(std::mem::replace(slot, block))
    }

    /// Runs terrain generation once. Returns `false` when the chunk was
    /// already generated.
    pub fn generate(&mut self, generator: &TerrainGenerator) -> bool {
        if self.generated {
            return false;
        }

        let (position, dims) = (self.position, self.dims);
        generator.populate(position, dims, self.storage_mut());
        self.generated = true;
        true
    }

    /// Builds the meshes once. Returns `false` when they already exist.
    pub fn build_mesh<L, T>(&mut self, lookup: &L, textures: &T) -> bool
    where
        L: NeighborLookup + ?Sized,
        T: BlockTextures + ?Sized,
    {
        if self.mesh_built {
            return false;
        }
        self.rebuild_mesh(lookup, textures);
        true
    }

    /// Rebuilds the meshes from current block data, leaving blocks untouched.
    pub fn rebuild_mesh<L, T>(&mut self, lookup: &L, textures: &T)
    where
        L: NeighborLookup + ?Sized,
        T: BlockTextures + ?Sized,
    {
        let meshes = self.extract_meshes(lookup, textures);
        self.install_meshes(meshes);
    }

    /// Meshes the current block data without storing the result.
    pub fn extract_meshes<L, T>(&self, lookup: &L, textures: &T) -> ChunkMeshes
    where
        L: NeighborLookup + ?Sized,
        T: BlockTextures + ?Sized,
    {
        build_chunk_meshes(self, lookup, textures)
    }

    pub fn install_meshes(&mut self, meshes: ChunkMeshes) {
        self.meshes = meshes;
        self.mesh_built = true;
        self.mesh_revision += 1;
    }

    /// Clears a solid block. Air and water are rejected with `Ok(None)`; on
    /// success the touched borders tell the caller which neighbours to remesh.
    pub fn remove_block(&mut self, local: LocalPos) -> Result<Option<ChunkBorders>, ChunkError> {
        let current = self.checked_block(local)?;
        if !current.is_solid() {
            return Ok(None);
        }

        self.set(local, BlockType::Air)?;
        Ok(Some(ChunkBorders::touched_by(local, self.dims)))
    }

    /// Places `block` into air or water. Occupied targets and air placements
    /// are rejected with `Ok(None)`.
    pub fn place_block(
        &mut self,
        local: LocalPos,
        block: BlockType,
    ) -> Result<Option<ChunkBorders>, ChunkError> {
        let current = self.checked_block(local)?;
        if block.is_air() || current.is_solid() || current == block {
            return Ok(None);
        }

        self.set(local, block)?;
        Ok(Some(ChunkBorders::touched_by(local, self.dims)))
    }

    fn checked_block(&self, local: LocalPos) -> Result<BlockType, ChunkError> {
        self.block(local).ok_or(ChunkError::LocalOutOfBounds {
            local: local.as_ivec3(),
            dims: self.dims,
        })
    }

    fn storage_mut(&mut self) -> &mut [BlockType] {
        if self.blocks.is_empty() {
            self.blocks = vec![BlockType::Air; self.dims.volume()];
        }
        &mut self.blocks
    }
}

#[cfg(test)]
mod tests {
    use glam::IVec3;

    use super::{Chunk, ChunkBorders, ChunkError};
    use crate::block::{BlockType, DefaultBlockTextures};
    use crate::config::TerrainConfig;
    use crate::coords::{ChunkDims, ChunkPos, LocalPos};
    use crate::worldgen::TerrainGenerator;

    fn dims() -> ChunkDims {
        ChunkDims::new(16, 32)
    }

    #[test]
    fn chunk_starts_unallocated_and_reads_air() {
        let chunk = Chunk::new(ChunkPos::new(2, -1), dims());
        assert!(!chunk.is_allocated());
        assert!(!chunk.is_generated());
        assert!(!chunk.is_mesh_built());
        assert_eq!(chunk.origin(), IVec3::new(32, 0, -16));
        assert_eq!(chunk.block(LocalPos::new(3, 7, 11)), Some(BlockType::Air));
        assert_eq!(chunk.block(LocalPos::new(16, 0, 0)), None);
    }

    #[test]
    fn set_and_get_use_local_coordinates() {
        let mut chunk = Chunk::new(ChunkPos::new(-1, 0), dims());
        let local = LocalPos::new(3, 7, 11);

        assert_eq!(chunk.set(local, BlockType::Oak), Ok(BlockType::Air));
        assert!(chunk.is_allocated());
        assert_eq!(chunk.block(local), Some(BlockType::Oak));
        assert_eq!(chunk.block_at(IVec3::new(-13, 7, 11)), Some(BlockType::Oak));
        assert_eq!(chunk.block_at(IVec3::new(3, 7, 11)), None);
        assert_eq!(chunk.set(local, BlockType::Dirt), Ok(BlockType::Oak));
    }

    #[test]
    fn out_of_bounds_writes_are_errors() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0), dims());
        let err = chunk
            .set(LocalPos::new(0, 32, 0), BlockType::Dirt)
            .expect_err("y is past the chunk height");
        assert_eq!(
            err,
            ChunkError::LocalOutOfBounds {
                local: IVec3::new(0, 32, 0),
                dims: dims(),
            }
        );
        assert!(err.to_string().contains("16x32x16"));
        assert!(chunk.remove_block(LocalPos::new(16, 0, 0)).is_err());
        assert!(!chunk.is_allocated());
    }

    #[test]
    fn occupancy_depends_on_viewer() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0), dims());
        chunk.set(LocalPos::new(1, 1, 1), BlockType::Water).unwrap();
        chunk.set(LocalPos::new(2, 1, 1), BlockType::Dirt).unwrap();

        let water = IVec3::new(1, 1, 1);
        let dirt = IVec3::new(2, 1, 1);
        assert!(chunk.is_block(water, BlockType::Water));
        assert!(!chunk.is_block(water, BlockType::Grass));
        assert!(chunk.is_block(dirt, BlockType::Water));
        assert!(chunk.is_block(dirt, BlockType::Grass));
        assert!(!chunk.is_block(IVec3::new(0, 0, 0), BlockType::Water));
        assert!(!chunk.is_block(IVec3::new(-1, 1, 1), BlockType::Grass));
    }

    #[test]
    fn generation_runs_once() {
        let generator = TerrainGenerator::new(TerrainConfig::default());
        let mut chunk = Chunk::new(ChunkPos::new(1, 1), dims());

        assert!(chunk.generate(&generator));
        let snapshot = chunk.blocks().to_vec();
        assert_eq!(snapshot.len(), dims().volume());

        let sample = LocalPos::new(4, 31, 4);
        chunk.set(sample, BlockType::Oak).unwrap();
        assert!(!chunk.generate(&generator));
        assert_eq!(chunk.block(sample), Some(BlockType::Oak));

        chunk.set(sample, snapshot[dims().local_to_index(sample)]).unwrap();
        assert_eq!(chunk.blocks(), snapshot.as_slice());
    }

    #[test]
    fn mesh_builds_once_and_rebuilds_on_demand() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0), dims());
        chunk.set(LocalPos::new(0, 0, 0), BlockType::Dirt).unwrap();

        assert!(chunk.build_mesh(&(), &DefaultBlockTextures));
        assert_eq!(chunk.mesh_revision(), 1);
        assert_eq!(chunk.solid_mesh().quad_count(), 6);

        chunk.set(LocalPos::new(1, 0, 0), BlockType::Dirt).unwrap();
        assert!(!chunk.build_mesh(&(), &DefaultBlockTextures));
        assert_eq!(chunk.solid_mesh().quad_count(), 6);

        chunk.rebuild_mesh(&(), &DefaultBlockTextures);
        assert_eq!(chunk.mesh_revision(), 2);
        assert_eq!(chunk.solid_mesh().quad_count(), 10);
        assert_eq!(chunk.block(LocalPos::new(1, 0, 0)), Some(BlockType::Dirt));
    }

    #[test]
    fn removal_rejects_air_and_water() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0), dims());
        chunk.set(LocalPos::new(5, 5, 5), BlockType::Water).unwrap();
        chunk.set(LocalPos::new(6, 5, 5), BlockType::Grass).unwrap();

        assert_eq!(chunk.remove_block(LocalPos::new(4, 5, 5)), Ok(None));
        assert_eq!(chunk.remove_block(LocalPos::new(5, 5, 5)), Ok(None));
        assert_eq!(chunk.block(LocalPos::new(5, 5, 5)), Some(BlockType::Water));

        assert_eq!(
            chunk.remove_block(LocalPos::new(6, 5, 5)),
            Ok(Some(ChunkBorders::empty()))
        );
        assert_eq!(chunk.block(LocalPos::new(6, 5, 5)), Some(BlockType::Air));
    }

    #[test]
    fn placement_fills_air_or_water_only() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0), dims());
        chunk.set(LocalPos::new(0, 3, 3), BlockType::Water).unwrap();
        chunk.set(LocalPos::new(1, 3, 3), BlockType::Dirt).unwrap();

        assert_eq!(
            chunk.place_block(LocalPos::new(0, 3, 3), BlockType::Grass),
            Ok(Some(ChunkBorders::NEG_X))
        );
        assert_eq!(chunk.block(LocalPos::new(0, 3, 3)), Some(BlockType::Grass));
        assert_eq!(
            chunk.place_block(LocalPos::new(1, 3, 3), BlockType::Grass),
            Ok(None)
        );
        assert_eq!(
            chunk.place_block(LocalPos::new(2, 3, 3), BlockType::Air),
            Ok(None)
        );
    }

    #[test]
    fn borders_are_detected_per_axis() {
        let dims = dims();
        assert_eq!(
            ChunkBorders::touched_by(LocalPos::new(5, 5, 5), dims),
            ChunkBorders::empty()
        );
        assert_eq!(
            ChunkBorders::touched_by(LocalPos::new(0, 5, 5), dims),
            ChunkBorders::NEG_X
        );
        assert_eq!(
            ChunkBorders::touched_by(LocalPos::new(15, 31, 0), dims),
            ChunkBorders::POS_X | ChunkBorders::POS_Y | ChunkBorders::NEG_Z
        );

        let corner = ChunkBorders::touched_by(LocalPos::new(0, 5, 15), dims);
        let neighbors: Vec<_> = corner.neighbors(ChunkPos::new(3, -2)).collect();
        assert_eq!(neighbors, vec![ChunkPos::new(2, -2), ChunkPos::new(3, -1)]);

        let vertical: Vec<_> = ChunkBorders::NEG_Y.neighbors(ChunkPos::new(0, 0)).collect();
        assert_eq!(vertical, vec![ChunkPos { x: 0, y: -1, z: 0 }]);
    }
}
