//! Per-worker bookkeeping kept by the manager.

use std::fmt;
use std::time::Instant;

use super::worker::WorkerHandle;

/// Unique worker identifier, assigned monotonically by the manager.
/// Replacement workers always get a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Worker state as tracked by the manager. `Busy` iff a task is bound to
/// the worker in the current-task map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Idle,
    Busy,
}

/// Manager-side record for one live worker.
///
/// Timer state lives in the two deadline fields; the manager's loop sleeps
/// until the earliest deadline across all records and fires whichever
/// expired. Exactly one of the deadlines is armed at a time: `task_deadline`
/// while busy, `idle_deadline` while idle with an empty queue.
pub(crate) struct WorkerRecord {
    pub id: WorkerId,
    pub handle: Box<dyn WorkerHandle>,
    pub created_at: Instant,
    pub last_activity: Instant,
    pub task_count: u32,
    pub status: WorkerStatus,
    /// Evict the worker when reached (idle, queue empty).
    pub idle_deadline: Option<Instant>,
    /// Treat the worker as faulted when reached (busy).
    pub task_deadline: Option<Instant>,
}

impl WorkerRecord {
    pub fn new(id: WorkerId, handle: Box<dyn WorkerHandle>) -> Self {
        let now = Instant::now();
        Self {
            id,
            handle,
            created_at: now,
            last_activity: now,
            task_count: 0,
            status: WorkerStatus::Idle,
            idle_deadline: None,
            task_deadline: None,
        }
    }

    /// Earliest armed deadline for this record, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.idle_deadline, self.task_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_id_display() {
        assert_eq!(WorkerId(7).to_string(), "w7");
    }
}
