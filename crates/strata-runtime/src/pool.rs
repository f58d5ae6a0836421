use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use serde::{Deserialize, Serialize};

use strata_chunk::generate_chunk_volume;
use strata_world::{ChunkCoord, NoiseSource, CHUNK_SIZE, WORLD_HEIGHT};

/// Generation task as it travels to a worker. Carries the seed so a worker
/// can rebuild its sampler when the seed changes mid-flight.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenRequest {
    pub id: u64,
    pub cx: i32,
    pub cz: i32,
    pub seed: u32,
    pub chunk_size: u32,
    pub chunk_height: u32,
}

/// Worker-to-pool message. `Result` transfers ownership of the volume bytes.
#[derive(Debug, Serialize, Deserialize)]
pub enum GenResponse {
    Ready,
    Result {
        id: u64,
        cx: i32,
        cz: i32,
        data: Vec<u8>,
    },
    Error {
        id: u64,
        reason: String,
    },
}

/// Pool of long-lived generation workers draining a shared job queue.
/// Each worker owns its `NoiseSource`; tasks make no shared mutation and
/// return their volume by ownership transfer. Dropping the pool closes the
/// job channel and terminates the workers; tasks still queued at that point
/// are discarded.
pub struct WorkerPool {
    job_tx: crossbeam_channel::Sender<GenRequest>,
    res_rx: mpsc::Receiver<GenResponse>,
    workers: usize,
    seed: u32,
    next_id: u64,
    fail_inject: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Spawns `min(available_parallelism, 4)` workers.
    pub fn new(seed: u32) -> Result<Self, std::io::Error> {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
            .min(4);
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<GenRequest>();
        let (res_tx, res_rx) = mpsc::channel::<GenResponse>();
        let fail_inject = Arc::new(AtomicUsize::new(0));
        for i in 0..workers {
            let rx = job_rx.clone();
            let tx = res_tx.clone();
            let fail = Arc::clone(&fail_inject);
            thread::Builder::new()
                .name(format!("strata-gen-{i}"))
                .spawn(move || worker_loop(rx, tx, fail))?;
        }
        Ok(Self {
            job_tx,
            res_rx,
            workers,
            seed,
            next_id: 0,
            fail_inject,
        })
    }

    #[inline]
    pub fn worker_count(&self) -> usize {
        self.workers
    }

    #[inline]
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Later tasks carry the new seed; in-flight tasks keep the one they
    /// were dispatched with.
    pub fn set_seed(&mut self, seed: u32) {
        self.seed = seed;
    }

    /// Enqueues a generation task and returns its job id.
    pub fn submit(&mut self, coord: ChunkCoord) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        let req = GenRequest {
            id,
            cx: coord.cx,
            cz: coord.cz,
            seed: self.seed,
            chunk_size: CHUNK_SIZE as u32,
            chunk_height: WORLD_HEIGHT as u32,
        };
        let _ = self.job_tx.send(req);
        id
    }

    /// Non-blocking drain of finished tasks.
    pub fn drain_results(&self) -> Vec<GenResponse> {
        self.res_rx.try_iter().collect()
    }

    /// Makes the next `n` tasks fail with a synthetic error; exercised by
    /// the fallback path and its tests.
    pub fn inject_failures(&self, n: usize) {
        self.fail_inject.fetch_add(n, Ordering::Relaxed);
    }
}

fn worker_loop(
    rx: crossbeam_channel::Receiver<GenRequest>,
    tx: mpsc::Sender<GenResponse>,
    fail_inject: Arc<AtomicUsize>,
) {
    let _ = tx.send(GenResponse::Ready);
    let mut cached: Option<NoiseSource> = None;
    while let Ok(req) = rx.recv() {
        if fail_inject
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
        {
            let _ = tx.send(GenResponse::Error {
                id: req.id,
                reason: "injected failure".into(),
            });
            continue;
        }
        if req.chunk_size != CHUNK_SIZE as u32 || req.chunk_height != WORLD_HEIGHT as u32 {
            let _ = tx.send(GenResponse::Error {
                id: req.id,
                reason: format!(
                    "unsupported chunk dims {}x{}",
                    req.chunk_size, req.chunk_height
                ),
            });
            continue;
        }
        if cached.as_ref().map_or(true, |n| n.seed() != req.seed) {
            cached = Some(NoiseSource::new(req.seed));
        }
        let Some(noise) = cached.as_ref() else {
            continue;
        };
        let vol = generate_chunk_volume(ChunkCoord::new(req.cx, req.cz), noise);
        let _ = tx.send(GenResponse::Result {
            id: req.id,
            cx: req.cx,
            cz: req.cz,
            data: vol.blocks,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn drain_until(pool: &WorkerPool, want: usize) -> Vec<GenResponse> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut out = Vec::new();
        while out.len() < want && Instant::now() < deadline {
            out.extend(pool.drain_results());
            thread::sleep(Duration::from_millis(2));
        }
        out
    }

    #[test]
    fn workers_announce_ready_and_produce_volumes() {
        let mut pool = WorkerPool::new(77).unwrap();
        let id = pool.submit(ChunkCoord::new(1, -1));
        let msgs = drain_until(&pool, pool.worker_count() + 1);
        assert!(msgs.iter().any(|m| matches!(m, GenResponse::Ready)));
        let found = msgs.iter().any(|m| {
            matches!(m, GenResponse::Result { id: rid, cx: 1, cz: -1, data } if *rid == id && data.len() == strata_chunk::VOLUME_LEN)
        });
        assert!(found);
    }

    #[test]
    fn pool_output_matches_local_generation() {
        let mut pool = WorkerPool::new(42).unwrap();
        let coord = ChunkCoord::new(3, 5);
        pool.submit(coord);
        let msgs = drain_until(&pool, pool.worker_count() + 1);
        let data = msgs
            .into_iter()
            .find_map(|m| match m {
                GenResponse::Result { data, .. } => Some(data),
                _ => None,
            })
            .unwrap();
        let local = generate_chunk_volume(coord, &NoiseSource::new(42));
        assert_eq!(data, local.blocks);
    }

    #[test]
    fn injected_failures_surface_as_errors() {
        let mut pool = WorkerPool::new(1).unwrap();
        pool.inject_failures(1);
        pool.submit(ChunkCoord::new(0, 0));
        let msgs = drain_until(&pool, pool.worker_count() + 1);
        assert!(msgs
            .iter()
            .any(|m| matches!(m, GenResponse::Error { .. })));
    }
}
