//! Bounded checksum worker pool.
//!
//! The manager owns all pool state on a single tokio task (queue, worker
//! records, current-task bindings); workers are isolated execution units
//! that report back over an event channel. A worker failing is destroyed
//! and replaced without touching the rest of the pool.

mod client;
mod manager;
mod record;
mod snapshot;
mod worker;

pub use client::{Checksum, ChecksumPool};
pub use record::{WorkerId, WorkerStatus};
pub use snapshot::{PoolSnapshot, WorkerSnapshot};
pub use worker::{HashJob, SpawnWorker, ThreadSpawner, WorkerEvent, WorkerHandle};
