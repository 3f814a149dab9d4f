use glam::IVec3;
use noise::{NoiseFn, Simplex};
use tracing::trace;

use crate::block::BlockType;
use crate::config::TerrainConfig;
use crate::coords::{ChunkDims, ChunkPos, LocalPos};

const BLUE_NOISE_SEED_OFFSET: u32 = 0x9E37_79B9;

/// Deterministic heightmap terrain with water and blue-noise tree placement.
///
/// Every sample is a pure function of world coordinates and the configured
/// seeds, so a column generates identically regardless of which chunk asks.
#[derive(Debug, Clone)]
pub struct TerrainGenerator {
    config: TerrainConfig,
    height_noise: Simplex,
    blue_noise: Simplex,
}

impl TerrainGenerator {
    pub fn new(config: TerrainConfig) -> Self {
        let height_noise = Simplex::new(config.noise_seed);
        let blue_noise = Simplex::new(config.noise_seed.wrapping_add(BLUE_NOISE_SEED_OFFSET));
        Self {
            config,
            height_noise,
            blue_noise,
        }
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn water_level(&self) -> f32 {
        self.config.water_level
    }

    /// Surface height of a column, sampled at the column centre and clamped
    /// to `[0, chunk_height - 1]`.
    pub fn column_height(&self, world_x: i32, world_z: i32, chunk_height: usize) -> i32 {
        let cfg = &self.config;
        let x = f64::from(world_x) + 0.5;
        let z = f64::from(world_z) + 0.5;

        let noise = cfg.c1
            * self
                .height_noise
                .get([x * cfg.frequency1 - 1.3, z * cfg.frequency1])
            + cfg.c2
                * self
                    .height_noise
                    .get([x * cfg.frequency2 + 1.1, z * cfg.frequency2 + 2.0])
            + cfg.c3
                * self
                    .height_noise
                    .get([x * cfg.frequency3 + 5.3, z * cfg.frequency3 + 0.2]);

        let amplitude = cfg.c1 + cfg.c2 + cfg.c3;
        let mut normalized = (noise + amplitude) / (2.0 * amplitude * cfg.div);
        // NaN collapses to zero through max.
        normalized = (normalized * cfg.fudge_factor).max(0.0).powf(cfg.e);
        normalized = (normalized * cfg.terraces).round() / cfg.terraces;

        let max_y = chunk_height.saturating_sub(1) as i32;
        ((normalized * chunk_height as f64) as i32).clamp(0, max_y)
    }

    pub fn blue_noise(&self, world_x: i32, world_z: i32) -> f64 {
        let frequency = self.config.blue_noise_frequency;
        self.blue_noise.get([
            (f64::from(world_x) + 0.5) * frequency,
            (f64::from(world_z) + 0.5) * frequency,
        ])
    }

    /// A column hosts a tree when its blue-noise value is strictly greater
    /// than every other value within `tree_density` columns (Chebyshev).
    pub fn is_tree_column(&self, world_x: i32, world_z: i32) -> bool {
        let center = self.blue_noise(world_x, world_z);
        is_strict_local_maximum(center, self.config.tree_density, |dx, dz| {
            self.blue_noise(world_x + dx, world_z + dz)
        })
    }

    /// Fills freshly allocated chunk storage: terrain and water first, then
    /// trees on grass columns.
    pub fn populate(&self, chunk_pos: ChunkPos, dims: ChunkDims, blocks: &mut [BlockType]) {
        debug_assert_eq!(blocks.len(), dims.volume());

        let width = dims.width;
        let origin = dims.chunk_origin(chunk_pos);
        let max_y = dims.height as i32 - 1;
        let water_level = self.config.water_level;
        let water_top = (water_level.floor() as i32).min(max_y);

        let mut heights = vec![0_i32; width * width];
        for lz in 0..width {
            for lx in 0..width {
                let height =
                    self.column_height(origin.x + lx as i32, origin.z + lz as i32, dims.height);
                heights[lz * width + lx] = height;

                for y in 0..=height.max(water_top) {
                    let block = if y < height {
                        BlockType::Dirt
                    } else if y == height {
                        if y as f32 >= water_level {
                            BlockType::Grass
                        } else {
                            BlockType::Dirt
                        }
                    } else {
                        BlockType::Water
                    };
                    let local = LocalPos::new(lx as u16, y as u16, lz as u16);
                    blocks[dims.local_to_index(local)] = block;
                }
            }
        }

        if !self.config.trees {
            return;
        }

        let density = self.config.tree_density.max(0);
        let span = width + 2 * density as usize;
        let mut window = Vec::with_capacity(span * span);
        for dz in 0..span {
            for dx in 0..span {
                window.push(self.blue_noise(
                    origin.x - density + dx as i32,
                    origin.z - density + dz as i32,
                ));
            }
        }
        let sample = |lx: i32, lz: i32| {
            let wx = (lx + density) as usize;
            let wz = (lz + density) as usize;
            window[wz * span + wx]
        };

        let mut rng = fastrand::Rng::with_seed(self.tree_seed(chunk_pos));
        let mut trees = 0_usize;
        for lz in 0..width as i32 {
            for lx in 0..width as i32 {
                let height = heights[lz as usize * width + lx as usize];
                if (height as f32) < water_level {
                    continue;
                }
                let center = sample(lx, lz);
                if !is_strict_local_maximum(center, density, |dx, dz| sample(lx + dx, lz + dz)) {
                    continue;
                }

                self.grow_tree(&mut rng, dims, blocks, lx, height, lz);
                trees += 1;
            }
        }

        trace!("populated chunk {:?} with {} trees", chunk_pos, trees);
    }

    fn grow_tree(
        &self,
        rng: &mut fastrand::Rng,
        dims: ChunkDims,
        blocks: &mut [BlockType],
        lx: i32,
        ground: i32,
        lz: i32,
    ) {
        let cfg = &self.config;
        let tree_height = rng.i32(cfg.min_tree_height..=cfg.max_tree_height);
        let radius = rng.i32(cfg.min_leaves_radius..=cfg.max_leaves_radius);

        for y in ground + 1..ground + tree_height {
            let Some(local) = LocalPos::from_ivec3(dims, IVec3::new(lx, y, lz)) else {
                continue;
            };
            let index = dims.local_to_index(local);
            if matches!(blocks[index], BlockType::Air | BlockType::OakLeaves) {
                blocks[index] = BlockType::Oak;
            }
        }

        let crown = ground + tree_height;
        let limit = radius * radius + 1;
        for dy in -radius..=radius {
            for dz in -radius..=radius {
                for dx in -radius..=radius {
                    if dx * dx + dy * dy + dz * dz > limit {
                        continue;
                    }
                    if rng.u32(0..=cfg.leaves_density) != cfg.leaves_density {
                        continue;
                    }
                    let position = IVec3::new(lx + dx, crown + dy, lz + dz);
                    let Some(local) = LocalPos::from_ivec3(dims, position) else {
                        continue;
                    };
                    let index = dims.local_to_index(local);
                    if blocks[index].is_air() {
                        blocks[index] = BlockType::OakLeaves;
                    }
                }
            }
        }
    }

    fn tree_seed(&self, chunk_pos: ChunkPos) -> u64 {
        self.config
            .tree_seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add((chunk_pos.x as i64 as u64).wrapping_mul(2654435761))
            .wrapping_add((chunk_pos.z as i64 as u64).wrapping_mul(40503))
    }
}

fn is_strict_local_maximum(center: f64, radius: i32, sample: impl Fn(i32, i32) -> f64) -> bool {
    for dz in -radius..=radius {
        for dx in -radius..=radius {
            if (dx, dz) != (0, 0) && sample(dx, dz) >= center {
                return false;
            }
        }
    }
    true
}
