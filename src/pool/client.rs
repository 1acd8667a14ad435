//! Pool handle: submit checksum work and await results.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};

use super::manager::{Command, Manager, Task};
use super::snapshot::PoolSnapshot;
use super::worker::{SpawnWorker, ThreadSpawner};
use crate::config::{MultipartPolicy, PoolConfig};
use crate::error::ChecksumError;
use crate::source::ByteSource;

/// Successful checksum result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    /// Display name of the source.
    pub name: String,
    /// Lowercase hex digest; multipart results carry a `-<parts>` suffix.
    pub hash: String,
}

/// Cloneable handle to a running pool.
///
/// The manager task exits after [`shutdown`](ChecksumPool::shutdown) or
/// when the last handle is dropped; either way outstanding tasks are
/// rejected with [`ChecksumError::PoolShutdown`].
#[derive(Clone)]
pub struct ChecksumPool {
    commands: mpsc::UnboundedSender<Command>,
}

impl ChecksumPool {
    /// Start a pool with thread-backed workers. Must be called from within
    /// a tokio runtime.
    pub fn new(cfg: PoolConfig) -> Self {
        Self::with_spawner(cfg, Arc::new(ThreadSpawner))
    }

    /// Start a pool with a custom worker spawner (the test seam: stub
    /// workers go in here).
    pub fn with_spawner(cfg: PoolConfig, spawner: Arc<dyn SpawnWorker>) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(Manager::new(cfg, spawner, rx).run());
        Self { commands }
    }

    /// Queue `source` for hashing and await the result.
    ///
    /// Sources strictly larger than `policy.multipart_threshold` are hashed
    /// with the multipart composition at `policy.part_size`; everything
    /// else single-shot. Submission itself never fails; the returned future
    /// resolves when the task completes, is rejected, or the pool shuts
    /// down.
    pub async fn generate_checksum(
        &self,
        source: impl ByteSource + 'static,
        policy: MultipartPolicy,
    ) -> Result<Checksum, ChecksumError> {
        let (done, rx) = oneshot::channel();
        let task = Task {
            name: source.name().to_string(),
            source: Box::new(source),
            policy,
            created_at: Instant::now(),
            done,
        };
        if self.commands.send(Command::Submit(task)).is_err() {
            return Err(ChecksumError::PoolShutdown);
        }
        rx.await.unwrap_or(Err(ChecksumError::PoolShutdown))
    }

    /// Point-in-time view of workers, queue depth, and active tasks.
    pub async fn snapshot(&self) -> Result<PoolSnapshot, ChecksumError> {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Snapshot(tx)).is_err() {
            return Err(ChecksumError::PoolShutdown);
        }
        rx.await.map_err(|_| ChecksumError::PoolShutdown)
    }

    /// Shut the pool down: every worker is terminated and all queued or
    /// in-flight tasks are rejected with [`ChecksumError::PoolShutdown`]
    /// rather than left pending forever.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}
