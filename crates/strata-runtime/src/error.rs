use std::error::Error;
use std::fmt;

use strata_world::ChunkCoord;

/// A generation task that did not produce a volume. Worker failures are
/// recovered by generating inline on the caller's thread; cancellations
/// resolve any future still waiting on the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenError {
    WorkerFailed { coord: ChunkCoord, reason: String },
    Cancelled,
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenError::WorkerFailed { coord, reason } => {
                write!(f, "worker failed for chunk {}: {}", coord.key(), reason)
            }
            GenError::Cancelled => write!(f, "generation cancelled"),
        }
    }
}

impl Error for GenError {}
