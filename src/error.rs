//! Task-level error taxonomy.
//!
//! Every failure a caller can observe through a task's completion channel is
//! one of these variants. Worker replacement is automatic on faults; task
//! retry never is; the caller decides whether to resubmit.

use thiserror::Error;

/// Error delivered to the submitter of a checksum task.
#[derive(Debug, Error)]
pub enum ChecksumError {
    /// The byte source could not be read. Surfaced as-is; not retried.
    #[error("source read failed: {0}")]
    Read(#[from] std::io::Error),

    /// The worker faulted: it reported an error, crashed, or exceeded the
    /// task timeout. The worker is destroyed and replaced; the task is not
    /// resubmitted on the caller's behalf.
    #[error("worker fault: {0}")]
    WorkerFault(String),

    /// The pool shut down while the task was queued or in flight.
    #[error("pool shut down before task completed")]
    PoolShutdown,
}

impl ChecksumError {
    /// True for faults that cause the owning worker to be replaced.
    pub fn is_worker_fault(&self) -> bool {
        matches!(self, ChecksumError::WorkerFault(_))
    }
}
