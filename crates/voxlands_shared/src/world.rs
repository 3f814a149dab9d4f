use glam::{IVec3, Vec3};
use tracing::{debug, trace, warn};

use crate::block::{BlockTextures, BlockType, DefaultBlockTextures};
use crate::chunk::{Chunk, ChunkBorders};
use crate::config::{EnvironmentConfig, VoxelConfig, WorldConfig};
use crate::coords::{block_position, storage_index, ChunkDims, ChunkPos};
use crate::mesh::NeighborLookup;
use crate::physics::{Ray, AABB};
use crate::render::{ChunkRenderer, MeshStream};
use crate::worldgen::TerrainGenerator;

/// What one call to [`World::set_player_position`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionUpdate {
    pub generated: usize,
    pub remeshed: usize,
}

/// A fixed square grid of chunks centred on chunk `(0, 0)`.
///
/// Chunks are generated and meshed lazily as the player approaches them and
/// are never unloaded. Positions outside the grid have no chunk: reads there
/// see nothing and edits are rejected.
pub struct World {
    dims: ChunkDims,
    settings: WorldConfig,
    environment: EnvironmentConfig,
    generator: TerrainGenerator,
    textures: Box<dyn BlockTextures>,
    chunks: Vec<Chunk>,
    player_position: Vec3,
}

impl World {
    pub fn new(config: &VoxelConfig) -> Self {
        Self::with_textures(config, DefaultBlockTextures)
    }

    pub fn with_textures(config: &VoxelConfig, textures: impl BlockTextures + 'static) -> Self {
        let config = config.clone().sanitize();
        let dims = config.chunk.dims();
        let grid_size = config.world.grid_size;
        let half = (grid_size / 2) as i32;

        let mut chunks = Vec::with_capacity(grid_size * grid_size);
        for row in 0..grid_size as i32 {
            for col in 0..grid_size as i32 {
                chunks.push(Chunk::new(ChunkPos::new(row - half, col - half), dims));
            }
        }

        Self {
            dims,
            settings: config.world,
            environment: config.environment,
            generator: TerrainGenerator::new(config.terrain),
            textures: Box::new(textures),
            chunks,
            player_position: Vec3::ZERO,
        }
    }

    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    pub fn grid_size(&self) -> usize {
        self.settings.grid_size
    }

    pub fn settings(&self) -> &WorldConfig {
        &self.settings
    }

    pub fn environment(&self) -> &EnvironmentConfig {
        &self.environment
    }

    pub fn water_level(&self) -> f32 {
        self.generator.water_level()
    }

    pub fn generator(&self) -> &TerrainGenerator {
        &self.generator
    }

    pub fn player_position(&self) -> Vec3 {
        self.player_position
    }

    pub fn is_chunk(&self, chunk_pos: ChunkPos) -> bool {
        self.slot(chunk_pos).is_some()
    }

    pub fn chunk(&self, chunk_pos: ChunkPos) -> Option<&Chunk> {
        self.slot(chunk_pos).map(|index| &self.chunks[index])
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    pub fn meshed_chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter().filter(|chunk| chunk.is_mesh_built())
    }

    /// Block at a world position, or `None` when no generated chunk owns it.
    pub fn block_at(&self, world_pos: IVec3) -> Option<BlockType> {
        let (chunk_pos, local) = self.dims.world_to_chunk(world_pos);
        let chunk = self.chunk(chunk_pos)?;
        if !chunk.is_generated() {
            return None;
        }
        chunk.block(local)
    }

    /// Whether anything other than air occupies `world_pos`.
    pub fn is_block(&self, world_pos: IVec3) -> bool {
        self.block_at(world_pos).is_some_and(|block| !block.is_air())
    }

    /// Occupancy as seen from a `viewer` voxel: water is only hidden by
    /// non-air, solids only by solids.
    pub fn is_block_for(&self, world_pos: IVec3, viewer: BlockType) -> bool {
        self.block_at(world_pos)
            .is_some_and(|block| block.occludes(viewer))
    }

    /// Moves the player and streams in every chunk within
    /// `chunks_around_player` of the player's chunk. Newly generated chunks
    /// are meshed, and their already meshed neighbours are remeshed so the
    /// shared faces get culled.
    pub fn set_player_position(&mut self, position: Vec3) -> RegionUpdate {
        self.player_position = position;

        let (center, _) = self.dims.world_to_chunk(block_position(position));
        let radius = self
            .settings
            .chunks_around_player
            .min(self.settings.grid_size as i32);

        let mut fresh = Vec::new();
        for x in center.x.saturating_sub(radius)..=center.x.saturating_add(radius) {
            for z in center.z.saturating_sub(radius)..=center.z.saturating_add(radius) {
                let Some(index) = self.slot(ChunkPos::new(x, z)) else {
                    continue;
                };
                if self.chunks[index].generate(&self.generator) {
                    fresh.push(index);
                }
            }
        }

        let mut update = RegionUpdate {
            generated: fresh.len(),
            remeshed: 0,
        };
        for index in fresh {
            if !self.chunks[index].is_mesh_built() {
                self.rebuild_mesh(index);
            }

            let pos = self.chunks[index].position();
            for neighbor in [
                pos.offset(1, 0),
                pos.offset(-1, 0),
                pos.offset(0, 1),
                pos.offset(0, -1),
            ] {
                let Some(neighbor) = self.slot(neighbor) else {
                    continue;
                };
                let chunk = &self.chunks[neighbor];
                if chunk.is_generated() && chunk.is_mesh_built() {
                    self.rebuild_mesh(neighbor);
                    update.remeshed += 1;
                }
            }
        }

        if update.generated > 0 {
            debug!(
                "generated {} chunks around {:?}, remeshed {} neighbours",
                update.generated, center, update.remeshed
            );
        }
        update
    }

    /// Rebuilds the meshes of a generated chunk from its current blocks.
    /// Returns `false` for positions outside the grid and ungenerated chunks.
    pub fn regenerate_chunk(&mut self, chunk_pos: ChunkPos) -> bool {
        let Some(index) = self.generated_slot(chunk_pos) else {
            return false;
        };
        self.rebuild_mesh(index);
        true
    }

    /// Clears the solid block containing `position`. Air, water, and
    /// positions without a generated chunk are rejected.
    pub fn remove_block(&mut self, position: Vec3) -> bool {
        let world_pos = block_position(position);
        let (chunk_pos, local) = self.dims.world_to_chunk(world_pos);
        let Some(index) = self.generated_slot(chunk_pos) else {
            trace!("no chunk to remove from at {world_pos}");
            return false;
        };

        match self.chunks[index].remove_block(local) {
            Ok(Some(borders)) => {
                self.remesh_after_edit(chunk_pos, borders);
                debug!("removed block at {world_pos}");
                true
            }
            Ok(None) => false,
            Err(err) => {
                warn!("failed to remove block at {world_pos}: {err}");
                false
            }
        }
    }

    /// Walks outward from the ray's current end to the first occupied block
    /// within reach and places the configured block against the face the ray
    /// entered it through. From a submerged eye the surrounding water is
    /// looked through. Rejects when nothing is hit, when the adjacent voxel
    /// has no generated chunk, or when that voxel is already solid.
    pub fn place_block(&mut self, ray: &Ray) -> bool {
        let submerged = self
            .block_at(block_position(ray.origin))
            .is_some_and(BlockType::is_water);
        let Some(sample) = self.march(*ray).into_iter().find(|sample| {
            self.block_at(block_position(sample.end()))
                .is_some_and(|block| !block.is_air() && !(submerged && block.is_water()))
        }) else {
            return false;
        };

        let target = block_position(sample.end());
        let Some(hit) = AABB::block(target).intersect_ray(&sample) else {
            return false;
        };
        let Some(face) = hit.face else {
            return false;
        };

        let world_pos = target + face.normal_ivec3();
        let (chunk_pos, local) = self.dims.world_to_chunk(world_pos);
        let Some(index) = self.generated_slot(chunk_pos) else {
            trace!("no chunk to place into at {world_pos}");
            return false;
        };

        let block = self.settings.place_block;
        match self.chunks[index].place_block(local, block) {
            Ok(Some(borders)) => {
                self.remesh_after_edit(chunk_pos, borders);
                debug!("placed {} at {world_pos}", block.name());
                true
            }
            Ok(None) => false,
            Err(err) => {
                warn!("failed to place block at {world_pos}: {err}");
                false
            }
        }
    }

    /// Marches from `origin` along `direction` and removes the first solid
    /// block within reach.
    pub fn remove_block_along(&mut self, origin: Vec3, direction: Vec3) -> bool {
        let Some(ray) = picking_ray(origin, direction) else {
            return false;
        };
        for sample in self.march(ray) {
            if self.remove_block(sample.end()) {
                return true;
            }
        }
        false
    }

    pub fn place_block_along(&mut self, origin: Vec3, direction: Vec3) -> bool {
        match picking_ray(origin, direction) {
            Some(ray) => self.place_block(&ray),
            None => false,
        }
    }

    /// Overwrites one block of a generated chunk and returns the previous
    /// one. Meshed chunks are remeshed along with any touched neighbours.
    pub fn set_block(&mut self, world_pos: IVec3, block: BlockType) -> Option<BlockType> {
        let (chunk_pos, local) = self.dims.world_to_chunk(world_pos);
        let index = self.generated_slot(chunk_pos)?;

        let previous = match self.chunks[index].set(local, block) {
            Ok(previous) => previous,
            Err(err) => {
                warn!("failed to set block at {world_pos}: {err}");
                return None;
            }
        };
        if previous != block && self.chunks[index].is_mesh_built() {
            self.remesh_after_edit(chunk_pos, ChunkBorders::touched_by(local, self.dims));
        }
        Some(previous)
    }

    /// Hands every meshed chunk to `renderer`: all solid meshes first, then
    /// all water meshes.
    pub fn draw<R>(&self, renderer: &mut R)
    where
        R: ChunkRenderer + ?Sized,
    {
        for chunk in self.meshed_chunks() {
            let mesh = chunk.solid_mesh();
            if !mesh.is_empty() {
                renderer.draw_chunk(chunk.position(), chunk.origin(), MeshStream::Solid, mesh);
            }
        }
        for chunk in self.meshed_chunks() {
            let mesh = chunk.water_mesh();
            if !mesh.is_empty() {
                renderer.draw_chunk(chunk.position(), chunk.origin(), MeshStream::Water, mesh);
            }
        }
    }

    fn slot(&self, chunk_pos: ChunkPos) -> Option<usize> {
        let grid_size = self.settings.grid_size;
        storage_index(chunk_pos, grid_size).map(|(row, col)| row * grid_size + col)
    }

    fn generated_slot(&self, chunk_pos: ChunkPos) -> Option<usize> {
        self.slot(chunk_pos)
            .filter(|&index| self.chunks[index].is_generated())
    }

    /// Copies of `ray` advanced by `ray_step` from its current end until
    /// `reach` is covered. The step count is bounded, so rays with tiny or
    /// zero directions still terminate.
    fn march(&self, mut ray: Ray) -> Vec<Ray> {
        let step = self.settings.ray_step;
        let reach = self.settings.reach;
        let max_steps = (reach / step).ceil() as usize;

        let mut samples = Vec::with_capacity(max_steps + 1);
        samples.push(ray);
        for _ in 0..max_steps {
            ray.step(step);
            if ray.length() >= reach {
                break;
            }
            samples.push(ray);
        }
        samples
    }

    fn rebuild_mesh(&mut self, index: usize) {
        let meshes = self.chunks[index].extract_meshes(self, self.textures.as_ref());
        self.chunks[index].install_meshes(meshes);
    }

    fn remesh_after_edit(&mut self, chunk_pos: ChunkPos, borders: ChunkBorders) {
        self.regenerate_chunk(chunk_pos);
        for neighbor in borders.neighbors(chunk_pos) {
            self.regenerate_chunk(neighbor);
        }
    }
}

fn picking_ray(origin: Vec3, direction: Vec3) -> Option<Ray> {
    let direction = direction.normalize_or_zero();
    (direction != Vec3::ZERO).then(|| Ray::new(origin, direction))
}

impl NeighborLookup for World {
    fn block_at(&self, world_pos: IVec3) -> Option<BlockType> {
        World::block_at(self, world_pos)
    }
}
