//! Test collaborators: scripted byte sources and stub worker spawners.

use std::io;
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use hashpool::pool::{HashJob, SpawnWorker, WorkerEvent, WorkerHandle, WorkerId};
use hashpool::source::{ByteSource, BytesSource};

/// Source whose every read sleeps, to hold workers busy for a while.
pub struct SlowSource {
    inner: BytesSource,
    delay: Duration,
}

impl SlowSource {
    pub fn new(name: &str, data: Vec<u8>, delay: Duration) -> Self {
        Self {
            inner: BytesSource::new(name, data),
            delay,
        }
    }
}

impl ByteSource for SlowSource {
    fn size(&self) -> u64 {
        self.inner.size()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        thread::sleep(self.delay);
        self.inner.read_at(offset, buf)
    }
}

/// Source that always fails to read, for fault injection.
pub struct FailingSource {
    name: String,
    size: u64,
}

impl FailingSource {
    pub fn new(name: &str, size: u64) -> Self {
        Self {
            name: name.to_string(),
            size,
        }
    }
}

impl ByteSource for FailingSource {
    fn size(&self) -> u64 {
        self.size
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn read_at(&mut self, _offset: u64, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::other("injected read failure"))
    }
}

/// In-process stub worker that swallows every job and never replies,
/// for timeout and shutdown tests.
pub struct SilentSpawner;

struct SilentWorker;

impl WorkerHandle for SilentWorker {
    fn dispatch(&mut self, _job: HashJob) {}
    fn terminate(&mut self) {}
}

impl SpawnWorker for SilentSpawner {
    fn spawn(
        &self,
        _id: WorkerId,
        _events: UnboundedSender<WorkerEvent>,
    ) -> io::Result<Box<dyn WorkerHandle>> {
        Ok(Box::new(SilentWorker))
    }
}

/// In-process stub worker that runs each job synchronously on dispatch.
pub struct InlineSpawner;

struct InlineWorker {
    id: WorkerId,
    events: UnboundedSender<WorkerEvent>,
}

impl WorkerHandle for InlineWorker {
    fn dispatch(&mut self, mut job: HashJob) {
        let event = match job.run() {
            Ok(hash) => WorkerEvent::Completed {
                worker: self.id,
                hash,
            },
            Err(error) => WorkerEvent::Failed {
                worker: self.id,
                error,
            },
        };
        let _ = self.events.send(event);
    }

    fn terminate(&mut self) {}
}

impl SpawnWorker for InlineSpawner {
    fn spawn(
        &self,
        id: WorkerId,
        events: UnboundedSender<WorkerEvent>,
    ) -> io::Result<Box<dyn WorkerHandle>> {
        Ok(Box::new(InlineWorker { id, events }))
    }
}

/// True for a 32-char lowercase hex digest with no part suffix.
pub fn is_plain_hex_digest(s: &str) -> bool {
    s.len() == 32 && s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

/// True for `"<32 hex>-<parts>"`.
pub fn is_multipart_digest(s: &str, parts: u64) -> bool {
    match s.split_once('-') {
        Some((hex, count)) => is_plain_hex_digest(hex) && count == parts.to_string(),
        None => false,
    }
}
