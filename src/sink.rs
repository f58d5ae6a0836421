use strata_mesh::MeshBuild;
use strata_world::ChunkCoord;

/// Receiver for mesh lifecycle events. The renderer implements this; the
/// engine never holds GPU state, only flat attribute arrays. Chunk world
/// offset is `(cx*S, 0, cz*S)`.
pub trait MeshSink {
    /// A chunk mesh was (re)built. An empty mesh is a valid result for an
    /// all-air chunk.
    fn on_chunk_mesh(&mut self, coord: ChunkCoord, mesh: &MeshBuild);

    /// The chunk left the active window; drop its mesh.
    fn on_chunk_unload(&mut self, coord: ChunkCoord);

    /// Resident chunks ordered near-to-far from the observer; a draw-order
    /// hint the renderer may ignore.
    fn on_render_order(&mut self, _order: &[ChunkCoord]) {}
}

/// Sink for headless callers that only need voxel queries.
pub struct NullSink;

impl MeshSink for NullSink {
    fn on_chunk_mesh(&mut self, _coord: ChunkCoord, _mesh: &MeshBuild) {}
    fn on_chunk_unload(&mut self, _coord: ChunkCoord) {}
}
