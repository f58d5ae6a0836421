//! Runtime job queues and worker orchestration.
#![forbid(unsafe_code)]

mod error;
mod pool;
mod queue;

pub use error::GenError;
pub use pool::{GenRequest, GenResponse, WorkerPool};
pub use queue::{ChunkSource, GenerationQueue, GEN_ADMIT_CAP};
