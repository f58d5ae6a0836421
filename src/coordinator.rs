use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use hashbrown::HashSet;
use log::{info, warn};

use strata_blocks::{BlockId, BlockRegistry, Tool, AIR};
use strata_chunk::ChunkVolume;
use strata_mesh::build_chunk_mesh;
use strata_runtime::{ChunkSource, GenError, GenerationQueue, WorkerPool};
use strata_store::{ChunkStore, MetaRecord, OpenError, Pending, PersistError};
use strata_world::{mix_chunk_seed, ChunkCoord, NoiseSource, CHUNK_SIZE, WORLD_HEIGHT};

use crate::residency::VoxelResidency;
use crate::sink::MeshSink;
use crate::Vec3;

/// Active-set radius in chunks around the observer.
pub const DEFAULT_RADIUS: i32 = 3;
/// Resident chunk count above which the farthest chunks are evicted.
pub const RESIDENCY_SOFT_CAP: usize = 500;
/// Upper bound on chunks evicted in one pass.
pub const EVICTION_BATCH: usize = 50;
/// Ticks between active-set maintenance passes.
pub const ACTIVE_SET_INTERVAL: u64 = 3;
/// Ticks between batched mesh rebuild passes.
pub const REBUILD_INTERVAL: u64 = 2;
/// Wall-clock interval between automatic dirty-chunk saves.
pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);

const NEIGHBOR_OFFSETS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

pub struct EngineConfig {
    pub root: PathBuf,
    pub seed: Option<u32>,
    pub radius: i32,
}

impl EngineConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            seed: None,
            radius: DEFAULT_RADIUS,
        }
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_radius(mut self, radius: i32) -> Self {
        self.radius = radius.max(1);
        self
    }
}

#[derive(Default, Clone, Copy, Debug)]
pub struct EngineStats {
    pub resident: usize,
    pub dirty: usize,
    pub pending: usize,
    pub in_flight: usize,
}

enum SaveKind {
    Manual {
        notify: Option<mpsc::Sender<Result<(), PersistError>>>,
    },
    Evict,
}

/// One outstanding durable write. A manual save may carry a meta-record
/// ticket alongside the chunk batch; the caller's future resolves only
/// after both have committed (or either has failed).
struct PendingSave {
    batch: Pending<Result<(), PersistError>>,
    batch_result: Option<Result<(), PersistError>>,
    meta: Option<Pending<Result<(), PersistError>>>,
    meta_result: Option<Result<(), PersistError>>,
    keys: Vec<(ChunkCoord, u64)>,
    kind: SaveKind,
}

/// The chunk subsystem facade. Owns the residency cache, the generation
/// queue and pool, and the durable store; external collaborators drive it
/// once per frame through [`Engine::update`] and receive meshes through a
/// [`MeshSink`].
pub struct Engine {
    store: ChunkStore,
    pool: Option<WorkerPool>,
    queue: GenerationQueue,
    residency: VoxelResidency,
    noise: NoiseSource,
    registry: BlockRegistry,
    known_keys: HashSet<ChunkCoord>,
    rebuild_pending: HashSet<ChunkCoord>,
    evicting: HashSet<ChunkCoord>,
    waiters: Vec<(ChunkCoord, mpsc::Sender<Result<(), GenError>>)>,
    pending_saves: Vec<PendingSave>,
    pending_unloads: Vec<ChunkCoord>,
    meta_blob: Option<Vec<u8>>,
    radius: i32,
    tick: u64,
    center: ChunkCoord,
    last_center: Option<ChunkCoord>,
    last_autosave: Instant,
}

impl Engine {
    /// Opens the durable store, warms the known-keys cache, restores the
    /// persisted seed when the caller does not override it, and starts the
    /// worker pool. A pool that fails to start degrades to inline
    /// generation rather than failing the open.
    pub fn open(config: EngineConfig) -> Result<Self, OpenError> {
        let store = ChunkStore::open(&config.root)?;
        let known_keys: HashSet<ChunkCoord> = store
            .list_keys()
            .wait()
            .unwrap_or_default()
            .into_iter()
            .collect();
        let meta = store.load_meta().wait().flatten();
        let seed = config
            .seed
            .or_else(|| meta.as_ref().map(|m| m.seed))
            .unwrap_or_else(random_seed);
        let meta_blob = meta.map(|m| m.blob);
        let pool = match WorkerPool::new(seed) {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!("worker pool unavailable ({}), generating inline", e);
                None
            }
        };
        info!(
            "world opened: seed={} known_chunks={}",
            seed,
            known_keys.len()
        );
        Ok(Self {
            store,
            pool,
            queue: GenerationQueue::new(),
            residency: VoxelResidency::new(),
            noise: NoiseSource::new(seed),
            registry: BlockRegistry::builtin(),
            known_keys,
            rebuild_pending: HashSet::new(),
            evicting: HashSet::new(),
            waiters: Vec::new(),
            pending_saves: Vec::new(),
            pending_unloads: Vec::new(),
            meta_blob,
            radius: config.radius,
            tick: 0,
            center: ChunkCoord::new(0, 0),
            last_center: None,
            last_autosave: Instant::now(),
        })
    }

    #[inline]
    pub fn seed(&self) -> u32 {
        self.noise.seed()
    }

    /// The caller blob of the meta record: what the last `save_dirty` wrote,
    /// or what the store held at open. Opaque to the engine; upstream
    /// typically keeps the observer pose and inventory here.
    pub fn meta_blob(&self) -> Option<&[u8]> {
        self.meta_blob.as_deref()
    }

    #[inline]
    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    pub fn set_registry(&mut self, registry: BlockRegistry) {
        self.registry = registry;
    }

    /// Seconds to break `block` with `tool`; bedrock answers infinity.
    #[inline]
    pub fn break_time(&self, block: BlockId, tool: Tool) -> f32 {
        self.registry.break_time(block, tool)
    }

    pub fn stats(&self) -> EngineStats {
        let res = self.residency.stats();
        let (pending, in_flight) = self.queue.counts();
        EngineStats {
            resident: res.resident,
            dirty: res.dirty,
            pending,
            in_flight,
        }
    }

    /// Per-tick drive. Slides the active window around the observer, admits
    /// generation work, applies finished chunks, runs the batched rebuild
    /// pass, and polls outstanding persistence.
    pub fn update(&mut self, observer: Vec3, sink: &mut dyn MeshSink) {
        self.tick += 1;
        let center =
            ChunkCoord::containing(observer.x.floor() as i32, observer.z.floor() as i32);
        self.center = center;
        let crossed = self.last_center != Some(center);
        self.last_center = Some(center);

        for coord in std::mem::take(&mut self.pending_unloads) {
            sink.on_chunk_unload(coord);
        }

        if crossed || self.tick % ACTIVE_SET_INTERVAL == 0 {
            self.refresh_active_set(center, sink);
        }

        self.pump_generation();
        self.poll_saves();

        if self.tick % REBUILD_INTERVAL == 0 && !self.rebuild_pending.is_empty() {
            self.process_rebuilds(sink);
        }

        if self.last_autosave.elapsed() >= AUTOSAVE_INTERVAL {
            self.last_autosave = Instant::now();
            if self.residency.stats().dirty > 0 {
                self.save_chunks(None, None);
            }
        }
    }

    #[inline]
    pub fn get_block(&self, wx: i32, wy: i32, wz: i32) -> BlockId {
        self.residency.get_block(wx, wy, wz)
    }

    #[inline]
    pub fn has_block(&self, wx: i32, wy: i32, wz: i32) -> bool {
        self.residency.has_block(wx, wy, wz)
    }

    #[inline]
    pub fn top_y(&self, wx: i32, wz: i32) -> i32 {
        self.residency.top_y(wx, wz, &self.noise)
    }

    /// Whether a chunk's in-memory volume differs from the persisted one.
    #[inline]
    pub fn is_chunk_dirty(&self, cx: i32, cz: i32) -> bool {
        self.residency.is_dirty(ChunkCoord::new(cx, cz))
    }

    /// Single-voxel write. The owning chunk joins the dirty set and the
    /// batched rebuild set; an edit on a chunk border also schedules the
    /// facing neighbour so its seam faces stay correct. Writes into
    /// non-resident chunks and out-of-range heights are dropped.
    pub fn set_block(&mut self, wx: i32, wy: i32, wz: i32, block: BlockId) {
        if !self.residency.set_block(wx, wy, wz, block) {
            return;
        }
        let coord = ChunkCoord::containing(wx, wz);
        self.rebuild_pending.insert(coord);
        let (base_x, base_z) = coord.base();
        let s = CHUNK_SIZE as i32;
        if wx - base_x == 0 {
            self.rebuild_pending.insert(coord.offset(-1, 0));
        }
        if wx - base_x == s - 1 {
            self.rebuild_pending.insert(coord.offset(1, 0));
        }
        if wz - base_z == 0 {
            self.rebuild_pending.insert(coord.offset(0, -1));
        }
        if wz - base_z == s - 1 {
            self.rebuild_pending.insert(coord.offset(0, 1));
        }
    }

    /// Resolves `Ok` once the chunk is resident; used at observer spawn.
    /// The returned handle completes during a later [`Engine::update`]
    /// call, or with [`GenError::Cancelled`] when the queue is cleared
    /// before the chunk arrives.
    pub fn ensure_loaded(&mut self, cx: i32, cz: i32) -> Pending<Result<(), GenError>> {
        let coord = ChunkCoord::new(cx, cz);
        if self.residency.contains(coord) {
            return Pending::ready(Ok(()));
        }
        self.queue.enqueue(coord, 0);
        let (tx, rx) = mpsc::channel();
        self.waiters.push((coord, tx));
        Pending::new(rx)
    }

    /// Snapshots every dirty chunk and issues one durable batch write plus
    /// a meta record carrying the seed and the caller's blob. Dirty flags
    /// clear when the batch commits; failed keys stay dirty for the next
    /// save. The handle resolves during a later [`Engine::update`], and
    /// only reports `Ok` once both the chunk batch and the meta record are
    /// durable; a meta failure surfaces as a `PersistFailed` with no keys.
    pub fn save_dirty(&mut self, meta_blob: Vec<u8>) -> Pending<Result<(), PersistError>> {
        let record = MetaRecord {
            seed: self.noise.seed(),
            blob: meta_blob,
        };
        self.meta_blob = Some(record.blob.clone());
        let meta = self.store.save_meta(record);
        let (tx, rx) = mpsc::channel();
        self.save_chunks(Some(tx), Some(meta));
        Pending::new(rx)
    }

    /// Drops all in-memory state, clears the durable store, and reseeds.
    /// Unload notices for previously attached meshes fire on the next
    /// update.
    pub fn clear(&mut self) -> Pending<bool> {
        let attached: Vec<ChunkCoord> = self.residency.coords().collect();
        self.pending_unloads.extend(attached);
        self.residency.clear();
        self.queue.clear();
        self.rebuild_pending.clear();
        self.evicting.clear();
        for (_, tx) in self.waiters.drain(..) {
            let _ = tx.send(Err(GenError::Cancelled));
        }
        self.pending_saves.clear();
        self.known_keys.clear();
        self.meta_blob = None;
        self.set_seed(random_seed());
        self.store.clear()
    }

    /// Changes the generation seed for chunks generated from now on;
    /// resident and persisted chunks are untouched.
    pub fn set_seed(&mut self, seed: u32) {
        self.noise = NoiseSource::new(seed);
        if let Some(pool) = &mut self.pool {
            pool.set_seed(seed);
        }
        info!("seed set to {}", seed);
    }

    /// Test/diagnostic hook: makes the pool fail the next `n` tasks so the
    /// inline fallback path can be exercised.
    pub fn inject_worker_failures(&self, n: usize) {
        if let Some(pool) = &self.pool {
            pool.inject_failures(n);
        }
    }

    fn refresh_active_set(&mut self, center: ChunkCoord, sink: &mut dyn MeshSink) {
        let r = self.radius;
        for dz in -r..=r {
            for dx in -r..=r {
                let coord = center.offset(dx, dz);
                if !self.residency.contains(coord) && !self.queue.is_tracked(coord) {
                    self.queue.enqueue(coord, center.manhattan(coord));
                }
            }
        }

        let mut to_unload: Vec<ChunkCoord> = self
            .residency
            .coords()
            .filter(|c| (c.cx - center.cx).abs() > r || (c.cz - center.cz).abs() > r)
            .collect();
        for coord in self.residency.eviction_candidates(center, RESIDENCY_SOFT_CAP, EVICTION_BATCH)
        {
            if !to_unload.contains(&coord) {
                to_unload.push(coord);
            }
        }
        if !to_unload.is_empty() {
            self.unload_chunks(to_unload, sink);
        }

        let mut order: Vec<ChunkCoord> = self.residency.coords().collect();
        order.sort_by_key(|c| c.distance_sq(center));
        sink.on_render_order(&order);
    }

    /// Detaches meshes immediately; clean chunks drop from memory now,
    /// dirty chunks stay resident until their eviction save commits.
    fn unload_chunks(&mut self, coords: Vec<ChunkCoord>, sink: &mut dyn MeshSink) {
        let mut dirty_snap: Vec<(ChunkCoord, Vec<u8>, u64)> = Vec::new();
        for coord in coords {
            self.rebuild_pending.remove(&coord);
            let Some(entry) = self.residency.entry_mut(coord) else {
                continue;
            };
            let was_attached = entry.mesh_attached;
            entry.mesh_attached = false;
            let snap = entry
                .dirty
                .then(|| (entry.volume.blocks.clone(), entry.rev));
            if was_attached {
                sink.on_chunk_unload(coord);
            }
            match snap {
                Some((bytes, rev)) => {
                    // A dirty chunk stays resident until its save commits;
                    // schedule it at most once.
                    if self.evicting.insert(coord) {
                        dirty_snap.push((coord, bytes, rev));
                    }
                }
                None => {
                    self.residency.remove(coord);
                }
            }
        }
        if dirty_snap.is_empty() {
            return;
        }
        info!("evicting {} dirty chunk(s) through the store", dirty_snap.len());
        let keys: Vec<(ChunkCoord, u64)> = dirty_snap.iter().map(|(c, _, r)| (*c, *r)).collect();
        let batch: Vec<(ChunkCoord, Vec<u8>)> =
            dirty_snap.into_iter().map(|(c, b, _)| (c, b)).collect();
        self.pending_saves.push(PendingSave {
            batch: self.store.save_batch(batch),
            batch_result: None,
            meta: None,
            meta_result: None,
            keys,
            kind: SaveKind::Evict,
        });
    }

    fn pump_generation(&mut self) {
        let Self {
            queue,
            pool,
            store,
            known_keys,
            residency,
            rebuild_pending,
            waiters,
            noise,
            ..
        } = self;
        let mut on_chunk = |coord: ChunkCoord, vol: ChunkVolume, src: ChunkSource| {
            // A freshly generated chunk is dirty until its first save; a
            // loaded chunk matches the store by definition.
            residency.put(coord, vol, src == ChunkSource::Generated);
            rebuild_pending.insert(coord);
            for (dx, dz) in NEIGHBOR_OFFSETS {
                let nb = coord.offset(dx, dz);
                if residency.contains(nb) {
                    rebuild_pending.insert(nb);
                }
            }
            waiters.retain(|(c, tx)| {
                if *c == coord {
                    let _ = tx.send(Ok(()));
                    false
                } else {
                    true
                }
            });
        };
        queue.process(pool.as_mut(), store, known_keys, noise, &mut on_chunk);
    }

    fn process_rebuilds(&mut self, sink: &mut dyn MeshSink) {
        let mut coords: Vec<ChunkCoord> = self.rebuild_pending.drain().collect();
        coords.sort_by_key(|c| c.distance_sq(self.center));
        for coord in coords {
            let Some(vol) = self.residency.get(coord) else {
                continue;
            };
            let residency = &self.residency;
            let lookup = |wx: i32, wy: i32, wz: i32| -> Option<BlockId> {
                if wy < 0 || wy >= WORLD_HEIGHT as i32 {
                    return Some(AIR);
                }
                residency
                    .get(ChunkCoord::containing(wx, wz))
                    .map(|v| v.get_world(wx, wy, wz).unwrap_or(AIR))
            };
            let mesh = build_chunk_mesh(vol, &lookup);
            sink.on_chunk_mesh(coord, &mesh);
            if let Some(entry) = self.residency.entry_mut(coord) {
                entry.mesh_attached = true;
            }
        }
    }

    fn save_chunks(
        &mut self,
        notify: Option<mpsc::Sender<Result<(), PersistError>>>,
        meta: Option<Pending<Result<(), PersistError>>>,
    ) {
        let snap = self.residency.snapshot_dirty();
        if snap.is_empty() && meta.is_none() {
            if let Some(tx) = notify {
                let _ = tx.send(Ok(()));
            }
            return;
        }
        let (batch, keys) = if snap.is_empty() {
            (Pending::ready(Ok(())), Vec::new())
        } else {
            info!("saving {} dirty chunk(s)", snap.len());
            let keys: Vec<(ChunkCoord, u64)> = snap.iter().map(|(c, _, r)| (*c, *r)).collect();
            let batch: Vec<(ChunkCoord, Vec<u8>)> =
                snap.into_iter().map(|(c, b, _)| (c, b)).collect();
            (self.store.save_batch(batch), keys)
        };
        self.pending_saves.push(PendingSave {
            batch,
            batch_result: None,
            meta,
            meta_result: None,
            keys,
            kind: SaveKind::Manual { notify },
        });
    }

    fn poll_saves(&mut self) {
        let mut remaining = Vec::new();
        for mut save in std::mem::take(&mut self.pending_saves) {
            if save.batch_result.is_none() {
                if let Some(result) = save.batch.poll() {
                    self.apply_batch_result(&save.keys, &save.kind, &result);
                    save.batch_result = Some(result);
                } else if save.batch.is_dead() {
                    // Store thread gone: nothing committed, keys stay dirty.
                    let keys: Vec<ChunkCoord> = save.keys.iter().map(|(c, _)| *c).collect();
                    let result = Err(PersistError::PersistFailed { keys });
                    self.apply_batch_result(&save.keys, &save.kind, &result);
                    save.batch_result = Some(result);
                }
            }
            if let Some(meta) = save.meta.as_mut() {
                if save.meta_result.is_none() {
                    if let Some(result) = meta.poll() {
                        if let Err(e) = &result {
                            warn!("meta save failed: {}", e);
                        }
                        save.meta_result = Some(result);
                    } else if meta.is_dead() {
                        warn!("store went away before the meta record committed");
                        save.meta_result =
                            Some(Err(PersistError::PersistFailed { keys: Vec::new() }));
                    }
                }
            }

            let batch_done = save.batch_result.is_some();
            let meta_done = save.meta.is_none() || save.meta_result.is_some();
            if batch_done && meta_done {
                let batch_result = save.batch_result.take().unwrap_or(Ok(()));
                let meta_result = save.meta_result.take().unwrap_or(Ok(()));
                if let SaveKind::Manual { notify: Some(tx) } = save.kind {
                    let _ = tx.send(batch_result.and(meta_result));
                }
            } else {
                remaining.push(save);
            }
        }
        self.pending_saves.extend(remaining);
    }

    /// Chunk-batch bookkeeping at the moment the batch write resolves:
    /// committed keys become known and either clean or evicted; failed keys
    /// keep their dirty flag for the next save.
    fn apply_batch_result(
        &mut self,
        keys: &[(ChunkCoord, u64)],
        kind: &SaveKind,
        result: &Result<(), PersistError>,
    ) {
        let failed: HashSet<ChunkCoord> = match result {
            Ok(()) => HashSet::new(),
            Err(e) => {
                warn!("{}", e);
                e.keys().iter().copied().collect()
            }
        };
        for (coord, rev) in keys {
            if matches!(kind, SaveKind::Evict) {
                self.evicting.remove(coord);
            }
            if failed.contains(coord) {
                continue;
            }
            self.known_keys.insert(*coord);
            match kind {
                SaveKind::Manual { .. } => self.residency.mark_clean_at(*coord, *rev),
                SaveKind::Evict => self.finish_eviction(*coord, *rev),
            }
        }
    }

    /// A persisted eviction candidate leaves memory unless it was edited
    /// after the snapshot or wandered back into the active window.
    fn finish_eviction(&mut self, coord: ChunkCoord, rev: u64) {
        let in_active = (coord.cx - self.center.cx).abs() <= self.radius
            && (coord.cz - self.center.cz).abs() <= self.radius;
        let Some(entry) = self.residency.entry_mut(coord) else {
            return;
        };
        if entry.rev > rev {
            return;
        }
        if in_active {
            self.residency.mark_clean_at(coord, rev);
        } else {
            self.residency.remove(coord);
        }
    }
}

/// Random positive 31-bit seed for brand-new worlds.
fn random_seed() -> u32 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let mixed = mix_chunk_seed(
        now.subsec_nanos() ^ (now.as_secs() as u32),
        0x5EED,
        0x7A1E,
    );
    (mixed & 0x7FFF_FFFF).max(1)
}
