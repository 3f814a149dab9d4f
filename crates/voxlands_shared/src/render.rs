use glam::IVec3;

use crate::coords::ChunkPos;
use crate::mesh::ChunkMesh;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MeshStream {
    Solid,
    Water,
}

/// Receives chunk meshes from [`World::draw`](crate::world::World::draw).
///
/// Every solid mesh is handed over before the first water mesh. Vertex
/// positions are chunk-local; `origin` is the world offset to apply.
pub trait ChunkRenderer {
    fn draw_chunk(
        &mut self,
        chunk_pos: ChunkPos,
        origin: IVec3,
        stream: MeshStream,
        mesh: &ChunkMesh,
    );
}

/// Tallies what a draw would submit, without a GPU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub solid_chunks: usize,
    pub water_chunks: usize,
    pub solid_triangles: usize,
    pub water_triangles: usize,
}

impl DrawStats {
    pub fn total_triangles(&self) -> usize {
        self.solid_triangles + self.water_triangles
    }
}

impl ChunkRenderer for DrawStats {
    fn draw_chunk(
        &mut self,
        _chunk_pos: ChunkPos,
        _origin: IVec3,
        stream: MeshStream,
        mesh: &ChunkMesh,
    ) {
        match stream {
            MeshStream::Solid => {
                self.solid_chunks += 1;
                self.solid_triangles += mesh.triangle_count();
            }
            MeshStream::Water => {
                self.water_chunks += 1;
                self.water_triangles += mesh.triangle_count();
            }
        }
    }
}
