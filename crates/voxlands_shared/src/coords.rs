use std::ops::Add;

use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHUNK_WIDTH: usize = 16;
pub const DEFAULT_CHUNK_HEIGHT: usize = 256;

/// Position of a chunk in the chunk grid. The world is one chunk tall, so `y`
/// is zero for every chunk that can exist.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Block offset inside one chunk.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalPos {
    pub x: u16,
    pub y: u16,
    pub z: u16,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, y: 0, z }
    }

    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y,
            z: self.z + dz,
        }
    }

    pub fn as_ivec3(self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z)
    }
}

impl From<IVec3> for ChunkPos {
    fn from(value: IVec3) -> Self {
        Self {
            x: value.x,
            y: value.y,
            z: value.z,
        }
    }
}

impl Add for ChunkPos {
    type Output = ChunkPos;

    fn add(self, rhs: Self) -> Self::Output {
        ChunkPos {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}




impl LocalPos {
    pub const fn new(x: u16, y: u16, z: u16) -> Self {
        Self { x, y, z }
    }

    /// Checked conversion from a signed offset; `None` when outside `dims`.
    pub fn from_ivec3(dims: ChunkDims, value: IVec3) -> Option<Self> {
        if !dims.contains(value) {
            return None;
        }
        Some(Self {
            x: value.x as u16,
            y: value.y as u16,
            z: value.z as u16,
        })
    }

    pub fn as_ivec3(self) -> IVec3 {
        IVec3::new(i32::from(self.x), i32::from(self.y), i32::from(self.z))
    }
}

/// Size of every chunk in the world, fixed once the world is built.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkDims {
    pub width: usize,
    pub height: usize,
}

impl Default for ChunkDims {
    fn default() -> Self {
        Self {
            width: DEFAULT_CHUNK_WIDTH,
            height: DEFAULT_CHUNK_HEIGHT,
        }
    }
}

fn div_rem_floor(value: i32, divisor: i32) -> (i32, i32) {
    let mut q = value / divisor;
    let mut r = value % divisor;
    if r < 0 {
        q -= 1;
        r += divisor;
    }
    (q, r)
}

impl ChunkDims {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn volume(&self) -> usize {
        self.width * self.width * self.height
    }

    /// `(width, height, width)` as a signed vector.
    pub fn extent(&self) -> IVec3 {
        IVec3::new(self.width as i32, self.height as i32, self.width as i32)
    }

    pub fn contains(&self, local: IVec3) -> bool {
        let extent = self.extent();
        (0..extent.x).contains(&local.x)
            && (0..extent.y).contains(&local.y)
            && (0..extent.z).contains(&local.z)
    }

    pub fn world_to_chunk(&self, world_pos: IVec3) -> (ChunkPos, LocalPos) {
        let extent = self.extent();

        let (chunk_x, local_x) = div_rem_floor(world_pos.x, extent.x);
        let (chunk_y, local_y) = div_rem_floor(world_pos.y, extent.y);
        let (chunk_z, local_z) = div_rem_floor(world_pos.z, extent.z);

        (
            ChunkPos {
                x: chunk_x,
                y: chunk_y,
                z: chunk_z,
            },
            LocalPos {
                x: local_x as u16,
                y: local_y as u16,
                z: local_z as u16,
            },
        )
    }

    pub fn chunk_origin(&self, chunk_pos: ChunkPos) -> IVec3 {
        chunk_pos.as_ivec3() * self.extent()
    }

    pub fn chunk_local_to_world(&self, chunk_pos: ChunkPos, local: LocalPos) -> IVec3 {
        self.chunk_origin(chunk_pos) + local.as_ivec3()
    }

    pub fn local_to_index(&self, local: LocalPos) -> usize {
        usize::from(local.x)
            + usize::from(local.z) * self.width
            + usize::from(local.y) * self.width * self.width
    }

}

/// Block containing a floating point position, rounding toward negative
/// infinity on every axis.
pub fn block_position(position: Vec3) -> IVec3 {
    position.floor().as_ivec3()
}

/// Dense `(row, col)` slot of a chunk in a `grid_size × grid_size` arena whose
/// centre is chunk `(0, 0)`.
pub fn storage_index(chunk_pos: ChunkPos, grid_size: usize) -> Option<(usize, usize)> {
    if chunk_pos.y != 0 {
        return None;
    }

    let half = (grid_size / 2) as i64;
    let row = i64::from(chunk_pos.x) + half;
    let col = i64::from(chunk_pos.z) + half;
    let size = grid_size as i64;
    if (0..size).contains(&row) && (0..size).contains(&col) {
        Some((row as usize, col as usize))
    } else {
        None
    }
}
