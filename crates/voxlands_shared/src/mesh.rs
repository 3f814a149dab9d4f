use bytemuck::{Pod, Zeroable};
use glam::IVec3;

use crate::block::{BlockSide, BlockTextures, BlockType};
use crate::chunk::Chunk;

/// Water surfaces sit slightly below the top of the voxel.
pub const WATER_SURFACE_HEIGHT: f32 = 0.9;

const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

/// Read access to blocks outside the chunk being meshed.
///
/// `None` means nothing is known about the position and it is treated as
/// air, so faces on an open world boundary stay visible.
pub trait NeighborLookup {
    fn block_at(&self, world_pos: IVec3) -> Option<BlockType>;
}

/// A chunk meshed in isolation.
impl NeighborLookup for () {
    fn block_at(&self, _world_pos: IVec3) -> Option<BlockType> {
        None
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ChunkVertex {
    /// Chunk-local position; the renderer adds the chunk origin.
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coord: [f32; 2],
    pub texture_layer: u32,
}
const _: [(); 36] = [(); std::mem::size_of::<ChunkVertex>()];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkMesh {
    pub vertices: Vec<ChunkVertex>,
    pub indices: Vec<u32>,
}

impl ChunkMesh {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn positions(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.vertices.iter().map(|vertex| vertex.position)
    }

    pub fn normals(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.vertices.iter().map(|vertex| vertex.normal)
    }

    pub fn tex_coords(&self) -> impl Iterator<Item = [f32; 2]> + '_ {
        self.vertices.iter().map(|vertex| vertex.tex_coord)
    }

    pub fn texture_layers(&self) -> impl Iterator<Item = u32> + '_ {
        self.vertices.iter().map(|vertex| vertex.texture_layer)
    }

    /// Raw vertex bytes, ready for a GPU upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    fn push_quad(
        &mut self,
        offset: [f32; 3],
        face: &FaceSpec,
        block_height: f32,
        texture_layer: u32,
    ) {
        let base = self.vertices.len() as u32;
        let normal = face.side.normal_ivec3().as_vec3().to_array();

        for (corner, tex_coord) in face.corners.iter().zip(face.tex_coords) {
            self.vertices.push(ChunkVertex {
                position: [
                    offset[0] + corner[0],
                    offset[1] + corner[1] * block_height,
                    offset[2] + corner[2],
                ],
                normal,
                tex_coord,
                texture_layer,
            });
        }
        self.indices.extend(QUAD_INDICES.iter().map(|index| base + index));
    }
}

/// Solid blocks and water are kept apart so the renderer can draw the
/// translucent pass last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkMeshes {
    pub solid: ChunkMesh,
    pub water: ChunkMesh,
}

impl ChunkMeshes {
    pub fn is_empty(&self) -> bool {
        self.solid.is_empty() && self.water.is_empty()
    }
}

struct FaceSpec {
    side: BlockSide,
    corners: [[f32; 3]; 4],
    tex_coords: [[f32; 2]; 4],
}

// Corners with y = 1 are scaled by the block height.
const FACE_SPECS: [FaceSpec; 6] = [
    FaceSpec {
        side: BlockSide::Front,
        corners: [
            [0.0, 1.0, 1.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
        ],
        tex_coords: [[0.0, 1.0], [0.0, 0.0], [1.0, 0.0], [1.0, 1.0]],
    },
    FaceSpec {
        side: BlockSide::Back,
        corners: [
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
        ],
        tex_coords: [[1.0, 1.0], [0.0, 1.0], [0.0, 0.0], [1.0, 0.0]],
    },
    FaceSpec {
        side: BlockSide::Top,
        corners: [
            [0.0, 1.0, 1.0],
            [1.0, 1.0, 1.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ],
        tex_coords: [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
    },
    FaceSpec {
        side: BlockSide::Bottom,
        corners: [
            [0.0, 0.0, 1.0],
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 0.0, 1.0],
        ],
        tex_coords: [[0.0, 1.0], [0.0, 0.0], [1.0, 0.0], [1.0, 1.0]],
    },
    FaceSpec {
        side: BlockSide::Left,
        corners: [
            [0.0, 0.0, 1.0],
            [0.0, 1.0, 1.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0],
        ],
        tex_coords: [[1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]],
    },
    FaceSpec {
        side: BlockSide::Right,
        corners: [
            [1.0, 0.0, 1.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [1.0, 1.0, 1.0],
        ],
        tex_coords: [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
    },
];

/// Emits one quad per visible face. A face is visible unless the adjacent
/// voxel occludes it from this block's point of view; voxels outside the
/// chunk are resolved through `lookup` in world coordinates.
pub fn build_chunk_meshes<L, T>(chunk: &Chunk, lookup: &L, textures: &T) -> ChunkMeshes
where
    L: NeighborLookup + ?Sized,
    T: BlockTextures + ?Sized,
{
    let mut meshes = ChunkMeshes::default();
    if !chunk.is_allocated() {
        return meshes;
    }

    let dims = chunk.dims();
    let extent = dims.extent();
    let origin = chunk.origin();

    for x in 0..extent.x {
        for z in 0..extent.z {
            for y in 0..extent.y {
                let local = IVec3::new(x, y, z);
                let block = sample_block(chunk, lookup, origin, local);
                if block.is_air() {
                    continue;
                }

                let (mesh, block_height) = if block.is_water() {
                    (&mut meshes.water, WATER_SURFACE_HEIGHT)
                } else {
                    (&mut meshes.solid, 1.0)
                };
                let offset = local.as_vec3().to_array();

                for face in &FACE_SPECS {
                    let neighbor =
                        sample_block(chunk, lookup, origin, local + face.side.normal_ivec3());
                    if neighbor.occludes(block) {
                        continue;
                    }
                    mesh.push_quad(
                        offset,
                        face,
                        block_height,
                        textures.texture_layer(block, face.side),
                    );
                }
            }
        }
    }

    meshes
}

fn sample_block<L>(chunk: &Chunk, lookup: &L, origin: IVec3, local: IVec3) -> BlockType
where
    L: NeighborLookup + ?Sized,
{
    match chunk.block_local(local) {
        Some(block) => block,
        None => lookup.block_at(origin + local).unwrap_or(BlockType::Air),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use glam::IVec3;

    use super::{build_chunk_meshes, NeighborLookup, WATER_SURFACE_HEIGHT};
    use crate::block::{
        BlockSide, BlockType, DefaultBlockTextures, LAYER_DIRT, LAYER_GRASS_SIDE, LAYER_GRASS_TOP,
    };
    use crate::chunk::Chunk;
    use crate::coords::{ChunkDims, ChunkPos, LocalPos};

    fn chunk_with(blocks: &[((u16, u16, u16), BlockType)]) -> Chunk {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0), ChunkDims::new(16, 32));
        for &((x, y, z), block) in blocks {
            chunk.set(LocalPos::new(x, y, z), block).unwrap();
        }
        chunk
    }

    struct SolidEverywhere;

    impl NeighborLookup for SolidEverywhere {
        fn block_at(&self, _world_pos: IVec3) -> Option<BlockType> {
            Some(BlockType::Dirt)
        }
    }

    #[derive(Default)]
    struct RecordingLookup {
        queries: RefCell<Vec<IVec3>>,
    }

    impl NeighborLookup for RecordingLookup {
        fn block_at(&self, world_pos: IVec3) -> Option<BlockType> {
            self.queries.borrow_mut().push(world_pos);
            None
        }
    }

    #[test]
    fn empty_chunk_has_no_geometry() {
        let chunk = Chunk::new(ChunkPos::new(0, 0), ChunkDims::new(16, 32));
        let meshes = build_chunk_meshes(&chunk, &(), &DefaultBlockTextures);
        assert!(meshes.is_empty());
    }

    #[test]
    fn lone_block_emits_six_quads() {
        let chunk = chunk_with(&[((4, 4, 4), BlockType::Dirt)]);
        let meshes = build_chunk_meshes(&chunk, &(), &DefaultBlockTextures);

        assert_eq!(meshes.solid.quad_count(), 6);
        assert_eq!(meshes.solid.vertices.len(), 24);
        assert_eq!(meshes.solid.triangle_count(), 12);
        assert!(meshes.water.is_empty());
        assert_eq!(&meshes.solid.indices[..12], &[0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]);
        assert_eq!(meshes.solid.vertex_bytes().len(), 24 * 36);
        assert_eq!(meshes.solid.index_bytes().len(), 36 * 4);

        for position in meshes.solid.positions() {
            for axis in 0..3 {
                assert!(position[axis] == 4.0 || position[axis] == 5.0);
            }
        }
    }

    #[test]
    fn shared_faces_between_solids_are_culled() {
        let chunk = chunk_with(&[((1, 1, 1), BlockType::Dirt), ((2, 1, 1), BlockType::Oak)]);
        let meshes = build_chunk_meshes(&chunk, &(), &DefaultBlockTextures);
        assert_eq!(meshes.solid.quad_count(), 10);
    }

    #[test]
    fn solid_face_against_water_is_kept_but_water_face_is_hidden() {
        let chunk = chunk_with(&[((1, 1, 1), BlockType::Dirt), ((2, 1, 1), BlockType::Water)]);
        let meshes = build_chunk_meshes(&chunk, &(), &DefaultBlockTextures);

        assert_eq!(meshes.solid.quad_count(), 6);
        assert_eq!(meshes.water.quad_count(), 5);
        assert!(meshes.water.normals().all(|normal| normal != [-1.0, 0.0, 0.0]));
    }

    #[test]
    fn neighbouring_water_blocks_merge() {
        let chunk = chunk_with(&[((1, 1, 1), BlockType::Water), ((1, 1, 2), BlockType::Water)]);
        let meshes = build_chunk_meshes(&chunk, &(), &DefaultBlockTextures);
        assert_eq!(meshes.water.quad_count(), 10);
        assert!(meshes.solid.is_empty());
    }

    #[test]
    fn water_surface_is_lowered() {
        let chunk = chunk_with(&[((0, 0, 0), BlockType::Water)]);
        let meshes = build_chunk_meshes(&chunk, &(), &DefaultBlockTextures);

        let top_y = meshes
            .water
            .positions()
            .map(|position| position[1])
            .fold(f32::MIN, f32::max);
        assert_eq!(top_y, WATER_SURFACE_HEIGHT);
    }

    #[test]
    fn faces_carry_normals_and_texture_layers() {
        let chunk = chunk_with(&[((3, 3, 3), BlockType::Grass)]);
        let meshes = build_chunk_meshes(&chunk, &(), &DefaultBlockTextures);
        let mesh = &meshes.solid;

        for quad in 0..mesh.quad_count() {
            let first = mesh.vertices[quad * 4];
            let side = BlockSide::ALL[quad];
            assert_eq!(first.normal, side.normal_ivec3().as_vec3().to_array());
            let expected = match side {
                BlockSide::Top => LAYER_GRASS_TOP,
                BlockSide::Bottom => LAYER_DIRT,
                _ => LAYER_GRASS_SIDE,
            };
            assert!(mesh.vertices[quad * 4..quad * 4 + 4]
                .iter()
                .all(|vertex| vertex.texture_layer == expected));
        }
        assert!(mesh.tex_coords().all(|uv| uv.iter().all(|c| *c == 0.0 || *c == 1.0)));
        assert_eq!(mesh.texture_layers().count(), 24);
    }

    #[test]
    fn boundary_faces_consult_lookup_in_world_space() {
        let mut chunk = Chunk::new(ChunkPos::new(1, -1), ChunkDims::new(16, 32));
        chunk.set(LocalPos::new(15, 0, 0), BlockType::Dirt).unwrap();

        let open = build_chunk_meshes(&chunk, &(), &DefaultBlockTextures);
        assert_eq!(open.solid.quad_count(), 6);

        let closed = build_chunk_meshes(&chunk, &SolidEverywhere, &DefaultBlockTextures);
        // +x, -y and -z leave the chunk.
        assert_eq!(closed.solid.quad_count(), 3);

        let recorder = RecordingLookup::default();
        build_chunk_meshes(&chunk, &recorder, &DefaultBlockTextures);
        let queries = recorder.queries.into_inner();
        assert!(queries.contains(&IVec3::new(32, 0, -16)));
        assert!(queries.contains(&IVec3::new(31, -1, -16)));
        assert!(queries.contains(&IVec3::new(31, 0, -17)));
    }
}
