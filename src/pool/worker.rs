//! Worker abstraction: an isolated execution unit that runs one hashing
//! job at a time and reports back over the pool's event channel.
//!
//! The default implementation is a dedicated OS thread doing blocking
//! reads and hashing ([`ThreadSpawner`]); tests substitute in-process
//! stubs through [`SpawnWorker`] to inject faults and stalls.

use std::io;
use std::sync::mpsc as std_mpsc;
use std::thread;

use tokio::sync::mpsc::UnboundedSender;

use super::record::WorkerId;
use crate::config::MultipartPolicy;
use crate::error::ChecksumError;
use crate::hasher;
use crate::source::ByteSource;

/// One unit of work: hash this source under this policy.
pub struct HashJob {
    pub source: Box<dyn ByteSource>,
    pub policy: MultipartPolicy,
}

impl HashJob {
    /// Compute the checksum: multipart when the size is strictly above the
    /// policy threshold, single-shot otherwise.
    pub fn run(&mut self) -> Result<String, ChecksumError> {
        let size = self.source.size();
        if self.policy.is_multipart(size) {
            hasher::multipart::multipart_hash_hex(self.source.as_mut(), self.policy.part_size)
        } else {
            hasher::hash_hex(self.source.as_mut(), hasher::DEFAULT_CHUNK_SIZE)
        }
    }
}

/// Event sent from a worker back to the manager.
#[derive(Debug)]
pub enum WorkerEvent {
    Completed { worker: WorkerId, hash: String },
    Failed { worker: WorkerId, error: ChecksumError },
}

/// An isolated execution unit, exclusively owned by the manager.
///
/// `dispatch` hands the worker its next job; exactly one job is in flight
/// per worker at a time (the manager guarantees this). Results arrive on
/// the event channel supplied at spawn time. `terminate` releases the
/// unit's resources and is called exactly once, after which the handle is
/// dropped.
pub trait WorkerHandle: Send {
    fn dispatch(&mut self, job: HashJob);
    fn terminate(&mut self);
}

/// Creates workers for the manager.
pub trait SpawnWorker: Send + Sync {
    fn spawn(
        &self,
        id: WorkerId,
        events: UnboundedSender<WorkerEvent>,
    ) -> io::Result<Box<dyn WorkerHandle>>;
}

/// Default spawner: one OS thread per worker.
pub struct ThreadSpawner;

impl SpawnWorker for ThreadSpawner {
    fn spawn(
        &self,
        id: WorkerId,
        events: UnboundedSender<WorkerEvent>,
    ) -> io::Result<Box<dyn WorkerHandle>> {
        let (tx, rx) = std_mpsc::channel::<HashJob>();
        thread::Builder::new()
            .name(format!("hashpool-{}", id))
            .spawn(move || run_worker(id, rx, events))?;
        Ok(Box::new(ThreadWorker { jobs: Some(tx) }))
    }
}

/// Thread-backed worker handle. Dropping the job sender ends the thread's
/// receive loop; the thread is detached rather than joined so a stuck job
/// can never block the manager.
struct ThreadWorker {
    jobs: Option<std_mpsc::Sender<HashJob>>,
}

impl WorkerHandle for ThreadWorker {
    fn dispatch(&mut self, job: HashJob) {
        // If the thread is already gone the send fails silently; the
        // manager notices via the task timeout and replaces this worker.
        if let Some(tx) = &self.jobs {
            let _ = tx.send(job);
        }
    }

    fn terminate(&mut self) {
        self.jobs.take();
    }
}

fn run_worker(
    id: WorkerId,
    jobs: std_mpsc::Receiver<HashJob>,
    events: UnboundedSender<WorkerEvent>,
) {
    while let Ok(mut job) = jobs.recv() {
        let event = match job.run() {
            Ok(hash) => WorkerEvent::Completed { worker: id, hash },
            Err(error) => WorkerEvent::Failed { worker: id, error },
        };
        if events.send(event).is_err() {
            // Manager is gone; nothing left to report to.
            break;
        }
    }
    tracing::trace!(worker = %id, "worker thread exiting");
}
