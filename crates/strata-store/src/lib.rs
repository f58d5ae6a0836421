//! File-backed asynchronous chunk store.
//!
//! One background thread owns the save directory and serializes writes;
//! every operation returns a [`Pending`] handle the caller polls from its
//! own loop. Chunk volumes persist as raw bytes under
//! `<root>/chunks/<cx>,<cz>.bin`; the meta record is a small bincode blob.
#![forbid(unsafe_code)]

mod error;
mod pending;

pub use error::{OpenError, PersistError};
pub use pending::Pending;

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use serde::{Deserialize, Serialize};
use strata_world::ChunkCoord;

const CHUNKS_DIR: &str = "chunks";
const META_FILE: &str = "meta.bin";

/// Persisted world metadata. The blob is the caller's; the store only ever
/// interprets `seed`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaRecord {
    pub seed: u32,
    pub blob: Vec<u8>,
}

enum Command {
    Load {
        coord: ChunkCoord,
        reply: mpsc::Sender<Option<Vec<u8>>>,
    },
    SaveBatch {
        chunks: Vec<(ChunkCoord, Vec<u8>)>,
        reply: mpsc::Sender<Result<(), PersistError>>,
    },
    Delete {
        coord: ChunkCoord,
        reply: mpsc::Sender<bool>,
    },
    ListKeys {
        reply: mpsc::Sender<HashSet<ChunkCoord>>,
    },
    LoadMeta {
        reply: mpsc::Sender<Option<MetaRecord>>,
    },
    SaveMeta {
        record: MetaRecord,
        reply: mpsc::Sender<Result<(), PersistError>>,
    },
    Clear {
        reply: mpsc::Sender<bool>,
    },
}

/// Handle to the store's I/O thread. Dropping the handle shuts the thread
/// down once queued commands drain.
pub struct ChunkStore {
    tx: mpsc::Sender<Command>,
    root: PathBuf,
}

impl ChunkStore {
    /// Opens or initializes the durable store under `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, OpenError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(CHUNKS_DIR))
            .map_err(|e| OpenError::StoreUnavailable(root.clone(), e))?;
        let (tx, rx) = mpsc::channel::<Command>();
        let worker_root = root.clone();
        thread::Builder::new()
            .name("strata-store-io".into())
            .spawn(move || io_loop(worker_root, rx))
            .map_err(|e| OpenError::StoreUnavailable(root.clone(), e))?;
        Ok(Self { tx, root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Async fetch of one chunk's raw bytes; resolves `None` on a miss.
    pub fn load(&self, coord: ChunkCoord) -> Pending<Option<Vec<u8>>> {
        let (reply, rx) = mpsc::channel();
        let _ = self.tx.send(Command::Load { coord, reply });
        Pending::new(rx)
    }

    /// Durably writes the given snapshot, one file per key. Resolves `Ok`
    /// only after every write has been synced and renamed into place;
    /// otherwise reports the keys that did not commit.
    pub fn save_batch(
        &self,
        chunks: Vec<(ChunkCoord, Vec<u8>)>,
    ) -> Pending<Result<(), PersistError>> {
        let (reply, rx) = mpsc::channel();
        let _ = self.tx.send(Command::SaveBatch { chunks, reply });
        Pending::new(rx)
    }

    pub fn delete(&self, coord: ChunkCoord) -> Pending<bool> {
        let (reply, rx) = mpsc::channel();
        let _ = self.tx.send(Command::Delete { coord, reply });
        Pending::new(rx)
    }

    /// Every key currently present in the store; used once at open to warm
    /// the known-keys cache.
    pub fn list_keys(&self) -> Pending<HashSet<ChunkCoord>> {
        let (reply, rx) = mpsc::channel();
        let _ = self.tx.send(Command::ListKeys { reply });
        Pending::new(rx)
    }

    pub fn load_meta(&self) -> Pending<Option<MetaRecord>> {
        let (reply, rx) = mpsc::channel();
        let _ = self.tx.send(Command::LoadMeta { reply });
        Pending::new(rx)
    }

    pub fn save_meta(&self, record: MetaRecord) -> Pending<Result<(), PersistError>> {
        let (reply, rx) = mpsc::channel();
        let _ = self.tx.send(Command::SaveMeta { record, reply });
        Pending::new(rx)
    }

    /// Drops both the chunk table and the meta record; used on "new world".
    pub fn clear(&self) -> Pending<bool> {
        let (reply, rx) = mpsc::channel();
        let _ = self.tx.send(Command::Clear { reply });
        Pending::new(rx)
    }
}

fn io_loop(root: PathBuf, rx: mpsc::Receiver<Command>) {
    let chunks_dir = root.join(CHUNKS_DIR);
    while let Ok(cmd) = rx.recv() {
        match cmd {
            Command::Load { coord, reply } => {
                let _ = reply.send(read_chunk(&chunks_dir, coord));
            }
            Command::SaveBatch { chunks, reply } => {
                let mut failed: Vec<ChunkCoord> = Vec::new();
                for (coord, bytes) in &chunks {
                    let path = chunk_path(&chunks_dir, *coord);
                    if let Err(e) = atomic_write(&path, bytes) {
                        log::warn!("chunk write failed for {}: {}", coord.key(), e);
                        failed.push(*coord);
                    }
                }
                let result = if failed.is_empty() {
                    Ok(())
                } else {
                    Err(PersistError::PersistFailed { keys: failed })
                };
                let _ = reply.send(result);
            }
            Command::Delete { coord, reply } => {
                let ok = fs::remove_file(chunk_path(&chunks_dir, coord)).is_ok();
                let _ = reply.send(ok);
            }
            Command::ListKeys { reply } => {
                let _ = reply.send(scan_keys(&chunks_dir));
            }
            Command::LoadMeta { reply } => {
                let record = fs::read(root.join(META_FILE))
                    .ok()
                    .and_then(|bytes| bincode::deserialize(&bytes).ok());
                let _ = reply.send(record);
            }
            Command::SaveMeta { record, reply } => {
                let result = bincode::serialize(&record)
                    .map_err(|e| e.to_string())
                    .and_then(|bytes| {
                        atomic_write(&root.join(META_FILE), &bytes).map_err(|e| e.to_string())
                    })
                    .map_err(|reason| {
                        log::warn!("meta write failed: {}", reason);
                        PersistError::PersistFailed { keys: Vec::new() }
                    });
                let _ = reply.send(result);
            }
            Command::Clear { reply } => {
                let _ = fs::remove_file(root.join(META_FILE));
                let ok = fs::remove_dir_all(&chunks_dir).is_ok()
                    && fs::create_dir_all(&chunks_dir).is_ok();
                let _ = reply.send(ok);
            }
        }
    }
}

fn chunk_path(chunks_dir: &Path, coord: ChunkCoord) -> PathBuf {
    chunks_dir.join(format!("{}.bin", coord.key()))
}

fn read_chunk(chunks_dir: &Path, coord: ChunkCoord) -> Option<Vec<u8>> {
    match fs::read(chunk_path(chunks_dir, coord)) {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            log::warn!("chunk read failed for {}: {}", coord.key(), e);
            None
        }
    }
}

fn scan_keys(chunks_dir: &Path) -> HashSet<ChunkCoord> {
    let mut keys = HashSet::new();
    let Ok(entries) = fs::read_dir(chunks_dir) else {
        return keys;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".bin")) else {
            continue;
        };
        if let Some(coord) = ChunkCoord::parse_key(stem) {
            keys.insert(coord);
        }
    }
    keys
}

/// Write-then-rename so a crash mid-write never leaves a torn chunk file;
/// readers observe either the prior bytes or the new bytes.
fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, ChunkStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::open(dir.path().join("world")).unwrap();
        (dir, store)
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_dir, store) = open_temp();
        let coord = ChunkCoord::new(-2, 7);
        let bytes = vec![3u8; 64];
        store
            .save_batch(vec![(coord, bytes.clone())])
            .wait()
            .unwrap()
            .unwrap();
        assert_eq!(store.load(coord).wait().unwrap(), Some(bytes));
        assert_eq!(store.load(ChunkCoord::new(0, 0)).wait().unwrap(), None);
    }

    #[test]
    fn list_keys_reflects_saved_chunks() {
        let (_dir, store) = open_temp();
        let a = ChunkCoord::new(0, 0);
        let b = ChunkCoord::new(-1, 3);
        store
            .save_batch(vec![(a, vec![1]), (b, vec![2])])
            .wait()
            .unwrap()
            .unwrap();
        let keys = store.list_keys().wait().unwrap();
        assert_eq!(keys, HashSet::from([a, b]));
    }

    #[test]
    fn delete_removes_the_key() {
        let (_dir, store) = open_temp();
        let coord = ChunkCoord::new(4, 4);
        store
            .save_batch(vec![(coord, vec![9])])
            .wait()
            .unwrap()
            .unwrap();
        assert!(store.delete(coord).wait().unwrap());
        assert_eq!(store.load(coord).wait().unwrap(), None);
        assert!(store.list_keys().wait().unwrap().is_empty());
    }

    #[test]
    fn meta_round_trips_and_clear_drops_everything() {
        let (_dir, store) = open_temp();
        let record = MetaRecord {
            seed: 1234567,
            blob: b"player-pose".to_vec(),
        };
        store.save_meta(record.clone()).wait().unwrap().unwrap();
        store
            .save_batch(vec![(ChunkCoord::new(1, 1), vec![5])])
            .wait()
            .unwrap()
            .unwrap();
        assert_eq!(store.load_meta().wait().unwrap(), Some(record));

        assert!(store.clear().wait().unwrap());
        assert_eq!(store.load_meta().wait().unwrap(), None);
        assert!(store.list_keys().wait().unwrap().is_empty());
    }

    #[test]
    fn save_batch_reports_uncommitted_keys() {
        let (_dir, store) = open_temp();
        fs::remove_dir_all(store.root().join(CHUNKS_DIR)).unwrap();
        let coord = ChunkCoord::new(2, -9);
        let result = store
            .save_batch(vec![(coord, vec![1, 2, 3])])
            .wait()
            .unwrap();
        assert_eq!(
            result,
            Err(PersistError::PersistFailed { keys: vec![coord] })
        );
    }

    #[test]
    fn open_fails_when_root_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-a-dir");
        fs::write(&path, b"x").unwrap();
        assert!(ChunkStore::open(path.join("world")).is_err());
    }
}
