//! Sliding-window voxel chunk engine.
//!
//! A persistent, procedurally generated grid of fixed-size chunk columns
//! surrounds a moving observer. Terrain synthesis runs on a worker pool,
//! volumes live in an in-memory residency cache with distance-based
//! eviction, and an occlusion-culled extractor turns chunks into flat
//! triangle attribute arrays. A file-backed store keeps edits durable
//! across sessions.
//!
//! [`Engine`] is the facade: open a world, call [`Engine::update`] once per
//! frame with the observer position and a [`MeshSink`], and use
//! `get_block`/`set_block`/`top_y` for voxel access.
#![forbid(unsafe_code)]

mod coordinator;
mod residency;
mod sink;

pub use coordinator::{
    Engine, EngineConfig, EngineStats, ACTIVE_SET_INTERVAL, AUTOSAVE_INTERVAL, DEFAULT_RADIUS,
    EVICTION_BATCH, REBUILD_INTERVAL, RESIDENCY_SOFT_CAP,
};
pub use residency::{ChunkEntry, ResidencyStats, VoxelResidency};
pub use sink::{MeshSink, NullSink};

pub use strata_blocks as blocks;
pub use strata_blocks::{BlockId, BlockRegistry, Tool};
pub use strata_chunk::{generate_chunk_volume, ChunkOccupancy, ChunkVolume, VOLUME_LEN};
pub use strata_mesh::{build_chunk_mesh, Face, MeshBuild};
pub use strata_runtime::GenError;
pub use strata_store::{ChunkStore, MetaRecord, OpenError, Pending, PersistError};
pub use strata_world::{ChunkCoord, NoiseSource, CHUNK_SIZE, WORLD_HEIGHT};

/// Observer position in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}
