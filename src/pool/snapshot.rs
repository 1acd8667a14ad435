//! Pool introspection for tests and monitoring dashboards.
//!
//! Snapshots are advisory: taken on the manager's loop, so they are
//! internally consistent, but stale by the time the caller sees them.

use std::time::Duration;

use super::record::{WorkerId, WorkerStatus};

/// Point-in-time view of one live worker.
#[derive(Debug, Clone)]
pub struct WorkerSnapshot {
    pub id: WorkerId,
    pub status: WorkerStatus,
    /// Tasks completed by this worker so far.
    pub task_count: u32,
    /// Time since the worker was created.
    pub age: Duration,
    /// Time since the worker last started or finished a task.
    pub since_last_activity: Duration,
}

/// Point-in-time view of the whole pool.
#[derive(Debug, Clone)]
pub struct PoolSnapshot {
    pub workers: Vec<WorkerSnapshot>,
    /// Tasks queued but not yet bound to a worker.
    pub queued: usize,
    /// Tasks currently bound to a worker.
    pub active: usize,
}

impl PoolSnapshot {
    /// Ids of all live workers, sorted.
    pub fn worker_ids(&self) -> Vec<WorkerId> {
        let mut ids: Vec<WorkerId> = self.workers.iter().map(|w| w.id).collect();
        ids.sort();
        ids
    }
}
