use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::block::BlockType;
use crate::coords::{ChunkDims, DEFAULT_CHUNK_HEIGHT, DEFAULT_CHUNK_WIDTH};

const MAX_CHUNK_WIDTH: usize = 1024;
const MAX_CHUNK_HEIGHT: usize = u16::MAX as usize;
const MIN_GRID_SIZE: usize = 2;
const MIN_RAY_STEP: f32 = 0.01;
const MAX_REACH: f32 = 1024.0;

/// Everything the voxel core reads once at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoxelConfig {
    #[serde(default)]
    pub chunk: ChunkConfig,
    #[serde(default)]
    pub terrain: TerrainConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub environment: EnvironmentConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChunkConfig {
    #[serde(default = "default_chunk_width")]
    pub width: usize,
    #[serde(default = "default_chunk_height")]
    pub height: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            width: default_chunk_width(),
            height: default_chunk_height(),
        }
    }
}

impl ChunkConfig {
    pub fn dims(&self) -> ChunkDims {
        ChunkDims::new(self.width, self.height)
    }
}

/// Noise and vegetation parameters of the terrain generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub c1: f64,
    pub c2: f64,
    pub c3: f64,
    pub div: f64,
    pub frequency1: f64,
    pub frequency2: f64,
    pub frequency3: f64,
    pub e: f64,
    pub fudge_factor: f64,
    pub terraces: f64,
    pub water_level: f32,
    pub trees: bool,
    pub tree_density: i32,
    pub min_tree_height: i32,
    pub max_tree_height: i32,
    pub min_leaves_radius: i32,
    pub max_leaves_radius: i32,
    pub leaves_density: u32,
    pub blue_noise_frequency: f64,
    pub noise_seed: u32,
    pub tree_seed: u64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            c1: 1.0,
            c2: 0.7,
            c3: 0.008,
            div: 1.0,
            frequency1: 0.0003,
            frequency2: 0.008,
            frequency3: 0.1,
            e: 11.3,
            fudge_factor: 1.1,
            terraces: 180.0,
            water_level: 5.0,
            trees: true,
            tree_density: 6,
            min_tree_height: 5,
            max_tree_height: 11,
            min_leaves_radius: 3,
            max_leaves_radius: 5,
            leaves_density: 2,
            blue_noise_frequency: 50.0,
            noise_seed: 0,
            tree_seed: 94,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    #[serde(default = "default_grid_size")]
    pub grid_size: usize,
    #[serde(default = "default_chunks_around_player")]
    pub chunks_around_player: i32,
    #[serde(default = "default_reach")]
    pub reach: f32,
    #[serde(default = "default_ray_step")]
    pub ray_step: f32,
    #[serde(default = "default_place_block")]
    pub place_block: BlockType,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            grid_size: default_grid_size(),
            chunks_around_player: default_chunks_around_player(),
            reach: default_reach(),
            ray_step: default_ray_step(),
            place_block: default_place_block(),
        }
    }
}

/// Render-facing scene parameters. The core only stores and exposes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub fog_start: f32,
    pub fog_end: f32,
    pub sky_color: [f32; 3],
    pub sun_direction: [f32; 3],
    pub sun_ambient_color: [f32; 3],
    pub sun_diffuse_color: [f32; 3],
    pub sun_specular_color: [f32; 3],
    pub water_speed: f32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            fog_start: 200.0,
            fog_end: 400.0,
            sky_color: [0.0; 3],
            sun_direction: [-7.0, -8.8, 0.0],
            sun_ambient_color: [0.6; 3],
            sun_diffuse_color: [1.0; 3],
            sun_specular_color: [0.8; 3],
            water_speed: 0.03,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    Serialize {
        source: toml::ser::Error,
    },
    Write {
        path: PathBuf,
        source: io::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config {}: {source}", path.display())
            }
            Self::Serialize { source } => write!(f, "failed to serialize config: {source}"),
            Self::Write { path, source } => {
                write!(f, "failed to write config {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } | Self::Write { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Serialize { source } => Some(source),
        }
    }
}

impl VoxelConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses and sanitizes a TOML document. Missing sections and keys keep
    /// their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        let parsed = toml::from_str::<Self>(contents)?;
        Ok(parsed.sanitize())
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(&self.clone().sanitize())
            .map_err(|source| ConfigError::Serialize { source })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let serialized = self.to_toml_string()?;
        fs::write(path, serialized).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn sanitize(mut self) -> Self {
        self.chunk.width = self.chunk.width.clamp(1, MAX_CHUNK_WIDTH);
        self.chunk.height = self.chunk.height.clamp(1, MAX_CHUNK_HEIGHT);

        let grid_size = self.world.grid_size.max(MIN_GRID_SIZE);
        let grid_size = grid_size + grid_size % 2;
        if grid_size != self.world.grid_size {
            warn!(
                "grid_size {} adjusted to {} (must be even and at least {})",
                self.world.grid_size, grid_size, MIN_GRID_SIZE
            );
            self.world.grid_size = grid_size;
        }
        self.world.chunks_around_player = self.world.chunks_around_player.max(0);
        self.world.reach = self.world.reach.clamp(0.0, MAX_REACH);
        if !(self.world.ray_step >= MIN_RAY_STEP) {
            warn!(
                "ray_step {} is too small, using {}",
                self.world.ray_step, MIN_RAY_STEP
            );
            self.world.ray_step = MIN_RAY_STEP;
        }

        let terrain = &mut self.terrain;
        if terrain.div == 0.0 {
            terrain.div = 1.0;
        }
        terrain.terraces = terrain.terraces.max(1.0);
        terrain.tree_density = terrain.tree_density.max(0);
        terrain.min_tree_height = terrain.min_tree_height.max(0);
        terrain.max_tree_height = terrain.max_tree_height.max(terrain.min_tree_height);
        terrain.min_leaves_radius = terrain.min_leaves_radius.max(0);
        terrain.max_leaves_radius = terrain.max_leaves_radius.max(terrain.min_leaves_radius);

        self
    }
}

fn default_chunk_width() -> usize {
    DEFAULT_CHUNK_WIDTH
}

fn default_chunk_height() -> usize {
    DEFAULT_CHUNK_HEIGHT
}

fn default_grid_size() -> usize {
    64
}

fn default_chunks_around_player() -> i32 {
    16
}

fn default_reach() -> f32 {
    10.0
}

fn default_ray_step() -> f32 {
    0.5
}

fn default_place_block() -> BlockType {
    BlockType::Grass
}
