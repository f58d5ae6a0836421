use std::cmp::Reverse;
use std::collections::BinaryHeap;

use hashbrown::{HashMap, HashSet};

use strata_chunk::{generate_chunk_volume, ChunkVolume};
use strata_store::{ChunkStore, Pending};
use strata_world::{ChunkCoord, NoiseSource};

use crate::error::GenError;
use crate::pool::{GenResponse, WorkerPool};

/// Admission cap: at most this many keys leave the pending list per tick,
/// bounding generation work per frame. Distinct from the pool's thread count.
pub const GEN_ADMIT_CAP: usize = 2;

/// Where a finished volume came from. Loaded chunks arrive clean; generated
/// chunks are dirty until their first save.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChunkSource {
    Generated,
    Loaded,
}

enum InFlight {
    Gen { job_id: u64 },
    Load { ticket: Pending<Option<Vec<u8>>> },
}

/// Priority-ordered pending set, deduplicated against itself and against
/// the in-flight set. Lower priority values are more urgent; Manhattan
/// distance from the observer chunk is the canonical priority.
pub struct GenerationQueue {
    pending: BinaryHeap<Reverse<(u32, u64, i32, i32)>>,
    pending_keys: HashSet<ChunkCoord>,
    in_flight: HashMap<ChunkCoord, InFlight>,
    jobs: HashMap<u64, ChunkCoord>,
    seq: u64,
}

impl Default for GenerationQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationQueue {
    pub fn new() -> Self {
        Self {
            pending: BinaryHeap::new(),
            pending_keys: HashSet::new(),
            in_flight: HashMap::new(),
            jobs: HashMap::new(),
            seq: 0,
        }
    }

    /// Adds a key unless it is already pending or in flight. Returns whether
    /// the key was accepted.
    pub fn enqueue(&mut self, coord: ChunkCoord, priority: u32) -> bool {
        if self.pending_keys.contains(&coord) || self.in_flight.contains_key(&coord) {
            return false;
        }
        self.seq += 1;
        self.pending
            .push(Reverse((priority, self.seq, coord.cx, coord.cz)));
        self.pending_keys.insert(coord);
        true
    }

    #[inline]
    pub fn is_tracked(&self, coord: ChunkCoord) -> bool {
        self.pending_keys.contains(&coord) || self.in_flight.contains_key(&coord)
    }

    /// `(pending, in_flight)` sizes for debug overlays.
    pub fn counts(&self) -> (usize, usize) {
        (self.pending_keys.len(), self.in_flight.len())
    }

    /// Drops every pending key. In-flight tasks run to completion and their
    /// results are discarded when they arrive with an unknown job id.
    pub fn clear(&mut self) {
        let cancelled = self.pending_keys.len() + self.in_flight.len();
        if cancelled > 0 {
            log::debug!("generation queue cleared, {} task(s) cancelled", cancelled);
        }
        self.pending.clear();
        self.pending_keys.clear();
        self.in_flight.clear();
        self.jobs.clear();
    }

    /// One scheduling pass: completes finished loads and worker tasks, then
    /// admits new keys while slots are free. Worker failures and load misses
    /// fall back to synchronous generation on the caller's thread, so
    /// `on_chunk` always fires exactly once per admitted key.
    pub fn process(
        &mut self,
        mut pool: Option<&mut WorkerPool>,
        store: &ChunkStore,
        known_keys: &HashSet<ChunkCoord>,
        noise: &NoiseSource,
        on_chunk: &mut dyn FnMut(ChunkCoord, ChunkVolume, ChunkSource),
    ) {
        // Finished store loads.
        let mut loaded: Vec<(ChunkCoord, Option<Vec<u8>>)> = Vec::new();
        for (&coord, fl) in self.in_flight.iter_mut() {
            if let InFlight::Load { ticket } = fl {
                if let Some(outcome) = ticket.poll() {
                    loaded.push((coord, outcome));
                } else if ticket.is_dead() {
                    loaded.push((coord, None));
                }
            }
        }
        for (coord, outcome) in loaded {
            match outcome {
                Some(bytes) => {
                    self.in_flight.remove(&coord);
                    on_chunk(coord, ChunkVolume::from_bytes(coord, bytes), ChunkSource::Loaded);
                }
                None => {
                    // Key was in the known set but the store came up empty;
                    // regenerate instead.
                    log::warn!("load miss for chunk {}, regenerating", coord.key());
                    match pool.as_deref_mut() {
                        Some(p) => {
                            let job_id = p.submit(coord);
                            self.jobs.insert(job_id, coord);
                            self.in_flight.insert(coord, InFlight::Gen { job_id });
                        }
                        None => {
                            self.in_flight.remove(&coord);
                            on_chunk(
                                coord,
                                generate_chunk_volume(coord, noise),
                                ChunkSource::Generated,
                            );
                        }
                    }
                }
            }
        }

        // Finished worker tasks.
        if let Some(p) = pool.as_deref_mut() {
            for res in p.drain_results() {
                match res {
                    GenResponse::Ready => {}
                    GenResponse::Result { id, cx, cz, data } => {
                        let Some(coord) = self.jobs.remove(&id) else {
                            log::debug!("discarding stale generation result for {},{}", cx, cz);
                            continue;
                        };
                        self.in_flight.remove(&coord);
                        on_chunk(
                            coord,
                            ChunkVolume::from_bytes(coord, data),
                            ChunkSource::Generated,
                        );
                    }
                    GenResponse::Error { id, reason } => {
                        let Some(coord) = self.jobs.remove(&id) else {
                            continue;
                        };
                        let err = GenError::WorkerFailed { coord, reason };
                        log::warn!("{}; generating inline", err);
                        self.in_flight.remove(&coord);
                        on_chunk(
                            coord,
                            generate_chunk_volume(coord, noise),
                            ChunkSource::Generated,
                        );
                    }
                }
            }
        }

        // Admit new work while slots are free.
        let mut admitted = 0usize;
        while self.in_flight.len() < GEN_ADMIT_CAP && admitted < GEN_ADMIT_CAP {
            let Some(Reverse((_prio, _seq, cx, cz))) = self.pending.pop() else {
                break;
            };
            let coord = ChunkCoord::new(cx, cz);
            if !self.pending_keys.remove(&coord) {
                continue;
            }
            admitted += 1;
            if known_keys.contains(&coord) {
                self.in_flight.insert(
                    coord,
                    InFlight::Load {
                        ticket: store.load(coord),
                    },
                );
            } else {
                match pool.as_deref_mut() {
                    Some(p) => {
                        let job_id = p.submit(coord);
                        self.jobs.insert(job_id, coord);
                        self.in_flight.insert(coord, InFlight::Gen { job_id });
                    }
                    None => {
                        // Degraded mode: no pool, generate on this thread.
                        on_chunk(
                            coord,
                            generate_chunk_volume(coord, noise),
                            ChunkSource::Generated,
                        );
                    }
                }
            }
        }
    }
}
