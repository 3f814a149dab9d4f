use glam::IVec3;
use serde::{Deserialize, Serialize};

/// Layer indices into the block texture array, in upload order.
pub const LAYER_GRASS_TOP: u32 = 0;
pub const LAYER_GRASS_SIDE: u32 = 1;
pub const LAYER_DIRT: u32 = 2;
pub const LAYER_WATER: u32 = 3;
pub const LAYER_OAK_SIDE: u32 = 4;
pub const LAYER_OAK_TOP: u32 = 5;
pub const LAYER_OAK_LEAVES: u32 = 6;
pub const TEXTURE_LAYER_COUNT: u32 = 7;

#[repr(u8)]
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Grass,
    Dirt,
    Water,
    Oak,
    OakLeaves,
    #[default]
    Air,
}

impl BlockType {
    pub const ALL: [BlockType; 6] = [
        BlockType::Grass,
        BlockType::Dirt,
        BlockType::Water,
        BlockType::Oak,
        BlockType::OakLeaves,
        BlockType::Air,
    ];

    pub fn is_air(self) -> bool {
        self == BlockType::Air
    }

    pub fn is_water(self) -> bool {
        self == BlockType::Water
    }

    /// Anything that is neither air nor water.
    pub fn is_solid(self) -> bool {
        !matches!(self, BlockType::Air | BlockType::Water)
    }

    /// Whether a voxel of this type hides the adjacent face of a `viewer` voxel.
    ///
    /// Water faces are hidden by any non-air neighbour, so touching water
    /// bodies merge into one surface. Solid faces are only hidden by other
    /// solids, which keeps the sides of submerged blocks visible.
    pub fn occludes(self, viewer: BlockType) -> bool {
        if viewer.is_water() {
            !self.is_air()
        } else {
            self.is_solid()
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BlockType::Grass => "grass",
            BlockType::Dirt => "dirt",
            BlockType::Water => "water",
            BlockType::Oak => "oak",
            BlockType::OakLeaves => "oak_leaves",
            BlockType::Air => "air",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BlockSide {
    Top,
    Bottom,
    Left,
    Right,
    Front,
    Back,
}

impl BlockSide {
    /// Mesh emission order.
    pub const ALL: [BlockSide; 6] = [
        BlockSide::Front,
        BlockSide::Back,
        BlockSide::Top,
        BlockSide::Bottom,
        BlockSide::Left,
        BlockSide::Right,
    ];

    pub fn normal_ivec3(self) -> IVec3 {
        match self {
            BlockSide::Top => IVec3::Y,
            BlockSide::Bottom => IVec3::NEG_Y,
            BlockSide::Left => IVec3::NEG_X,
            BlockSide::Right => IVec3::X,
            BlockSide::Front => IVec3::Z,
            BlockSide::Back => IVec3::NEG_Z,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            BlockSide::Top => BlockSide::Bottom,
            BlockSide::Bottom => BlockSide::Top,
            BlockSide::Left => BlockSide::Right,
            BlockSide::Right => BlockSide::Left,
            BlockSide::Front => BlockSide::Back,
            BlockSide::Back => BlockSide::Front,
        }
    }
}

/// Maps a block face to a layer of the block texture array.
///
/// The layer order is an asset concern owned by whoever uploads the textures;
/// the mesher only tags each quad with the returned index.
pub trait BlockTextures {
    fn texture_layer(&self, block: BlockType, side: BlockSide) -> u32;
}

impl<F> BlockTextures for F
where
    F: Fn(BlockType, BlockSide) -> u32,
{
    fn texture_layer(&self, block: BlockType, side: BlockSide) -> u32 {
        self(block, side)
    }
}

/// Layout of the stock texture array: grass top, grass side, dirt, water,
/// oak bark, oak rings, oak leaves.
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultBlockTextures;

impl BlockTextures for DefaultBlockTextures {
    fn texture_layer(&self, block: BlockType, side: BlockSide) -> u32 {
        match (block, side) {
            (BlockType::Grass, BlockSide::Top) => LAYER_GRASS_TOP,
            (BlockType::Grass, BlockSide::Bottom) => LAYER_DIRT,
            (BlockType::Grass, _) => LAYER_GRASS_SIDE,
            (BlockType::Dirt, _) => LAYER_DIRT,
            (BlockType::Water, _) => LAYER_WATER,
            (BlockType::Oak, BlockSide::Top | BlockSide::Bottom) => LAYER_OAK_TOP,
            (BlockType::Oak, _) => LAYER_OAK_SIDE,
            (BlockType::OakLeaves, _) => LAYER_OAK_LEAVES,
            // Air is never meshed.
            (BlockType::Air, _) => 0,
        }
    }
}
