//! World sizing, chunk coordinates, and seeded sampling.
#![forbid(unsafe_code)]

mod coord;
mod noise;
mod rng;

pub use coord::ChunkCoord;
pub use noise::{NoiseSource, HEIGHT_AMP, HEIGHT_BASE, HEIGHT_SCALE};
pub use rng::{mix_chunk_seed, rand01, DecorRng};

/// Horizontal chunk edge in voxels.
pub const CHUNK_SIZE: usize = 32;

/// Fixed world height in voxels.
pub const WORLD_HEIGHT: usize = 128;
