use std::error::Error;
use std::fmt;
use std::path::PathBuf;

use strata_world::ChunkCoord;

/// The durable store could not be opened.
#[derive(Debug)]
pub enum OpenError {
    StoreUnavailable(PathBuf, std::io::Error),
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenError::StoreUnavailable(path, e) => {
                write!(f, "store unavailable at {}: {}", path.display(), e)
            }
        }
    }
}

impl Error for OpenError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            OpenError::StoreUnavailable(_, e) => Some(e),
        }
    }
}

/// A batched write did not fully commit. The listed keys stay dirty and are
/// retried on the next save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    PersistFailed { keys: Vec<ChunkCoord> },
}

impl PersistError {
    pub fn keys(&self) -> &[ChunkCoord] {
        match self {
            PersistError::PersistFailed { keys } => keys,
        }
    }
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::PersistFailed { keys } => {
                write!(f, "persist failed for {} key(s):", keys.len())?;
                for k in keys {
                    write!(f, " {}", k.key())?;
                }
                Ok(())
            }
        }
    }
}

impl Error for PersistError {}
