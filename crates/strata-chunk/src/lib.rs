//! Chunk voxel volumes and world generation.
#![forbid(unsafe_code)]

mod decorate;
mod terrain;

pub use decorate::decorate;
pub use terrain::fill_terrain;

use strata_blocks::{BlockId, AIR};
use strata_world::{ChunkCoord, NoiseSource, CHUNK_SIZE, WORLD_HEIGHT};

/// Bytes in one chunk volume.
pub const VOLUME_LEN: usize = CHUNK_SIZE * CHUNK_SIZE * WORLD_HEIGHT;

/// Dense voxel volume for one chunk column. Index layout is
/// `x + y*S + z*S*H` with `0 <= x,z < S` and `0 <= y < H`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkVolume {
    pub coord: ChunkCoord,
    pub blocks: Vec<BlockId>,
}

impl ChunkVolume {
    pub fn new_empty(coord: ChunkCoord) -> Self {
        Self {
            coord,
            blocks: vec![AIR; VOLUME_LEN],
        }
    }

    /// Wraps raw bytes, padding or truncating to the exact volume length.
    pub fn from_bytes(coord: ChunkCoord, bytes: Vec<u8>) -> Self {
        let mut blocks = bytes;
        if blocks.len() != VOLUME_LEN {
            blocks.resize(VOLUME_LEN, AIR);
        }
        Self { coord, blocks }
    }

    #[inline]
    pub fn idx(x: usize, y: usize, z: usize) -> usize {
        x + y * CHUNK_SIZE + z * CHUNK_SIZE * WORLD_HEIGHT
    }

    #[inline]
    pub fn get_local(&self, x: usize, y: usize, z: usize) -> BlockId {
        self.blocks[Self::idx(x, y, z)]
    }

    #[inline]
    pub fn set_local(&mut self, x: usize, y: usize, z: usize, b: BlockId) {
        self.blocks[Self::idx(x, y, z)] = b;
    }

    #[inline]
    pub fn contains_world(&self, wx: i32, wy: i32, wz: i32) -> bool {
        if wy < 0 || wy >= WORLD_HEIGHT as i32 {
            return false;
        }
        let (base_x, base_z) = self.coord.base();
        let s = CHUNK_SIZE as i32;
        wx >= base_x && wx < base_x + s && wz >= base_z && wz < base_z + s
    }

    #[inline]
    pub fn get_world(&self, wx: i32, wy: i32, wz: i32) -> Option<BlockId> {
        if !self.contains_world(wx, wy, wz) {
            return None;
        }
        let (base_x, base_z) = self.coord.base();
        Some(self.get_local(
            (wx - base_x) as usize,
            wy as usize,
            (wz - base_z) as usize,
        ))
    }

    #[inline]
    pub fn has_non_air(&self) -> bool {
        self.blocks.iter().any(|&b| b != AIR)
    }

    #[inline]
    pub fn occupancy(&self) -> ChunkOccupancy {
        if self.has_non_air() {
            ChunkOccupancy::Populated
        } else {
            ChunkOccupancy::Empty
        }
    }

    /// Highest non-air `y` in the column, or `None` for an all-air column.
    pub fn top_y_local(&self, x: usize, z: usize) -> Option<usize> {
        (0..WORLD_HEIGHT)
            .rev()
            .find(|&y| self.get_local(x, y, z) != AIR)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChunkOccupancy {
    Empty,
    Populated,
}

impl ChunkOccupancy {
    #[inline]
    pub fn is_empty(self) -> bool {
        matches!(self, ChunkOccupancy::Empty)
    }

    #[inline]
    pub fn has_blocks(self) -> bool {
        matches!(self, ChunkOccupancy::Populated)
    }
}

/// Runs terrain fill and decoration into a fresh volume. Deterministic:
/// the same `(seed, coord)` yields the same bytes on any thread.
pub fn generate_chunk_volume(coord: ChunkCoord, noise: &NoiseSource) -> ChunkVolume {
    let mut vol = ChunkVolume::new_empty(coord);
    fill_terrain(&mut vol, noise);
    decorate(&mut vol, noise);
    vol
}
