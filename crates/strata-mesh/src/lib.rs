//! CPU chunk mesh extraction.
#![forbid(unsafe_code)]

mod build;
mod face;
mod mesh_build;

pub use build::{build_chunk_mesh, NeighborLookup};
pub use face::{Face, ALL_FACES};
pub use mesh_build::MeshBuild;
