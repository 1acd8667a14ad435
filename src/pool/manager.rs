//! Worker pool manager: the control loop owning all pool state.
//!
//! All queue and record mutation happens on this single tokio task, so the
//! manager's own state needs no locking; only the workers run concurrently
//! with it. The loop multiplexes commands, worker events, the periodic
//! health check, and the earliest task/idle deadline.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

use super::client::Checksum;
use super::record::{WorkerId, WorkerRecord, WorkerStatus};
use super::snapshot::{PoolSnapshot, WorkerSnapshot};
use super::worker::{HashJob, SpawnWorker, WorkerEvent};
use crate::config::{MultipartPolicy, PoolConfig};
use crate::error::ChecksumError;
use crate::source::ByteSource;

pub(crate) type TaskResult = Result<Checksum, ChecksumError>;

/// A queued checksum task. Created at submit time; terminated by
/// resolution, rejection, or timeout.
pub(crate) struct Task {
    pub source: Box<dyn ByteSource>,
    pub policy: MultipartPolicy,
    pub name: String,
    pub created_at: Instant,
    pub done: oneshot::Sender<TaskResult>,
}

/// What remains manager-side once a task's source has moved into a worker.
struct InFlight {
    name: String,
    done: oneshot::Sender<TaskResult>,
}

pub(crate) enum Command {
    Submit(Task),
    Snapshot(oneshot::Sender<PoolSnapshot>),
    Shutdown,
}

pub(crate) struct Manager {
    cfg: PoolConfig,
    spawner: Arc<dyn SpawnWorker>,
    commands: UnboundedReceiver<Command>,
    events_tx: UnboundedSender<WorkerEvent>,
    events_rx: UnboundedReceiver<WorkerEvent>,
    workers: HashMap<WorkerId, WorkerRecord>,
    queue: VecDeque<Task>,
    running: HashMap<WorkerId, InFlight>,
    next_id: u64,
}

impl Manager {
    pub(crate) fn new(
        cfg: PoolConfig,
        spawner: Arc<dyn SpawnWorker>,
        commands: UnboundedReceiver<Command>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            cfg,
            spawner,
            commands,
            events_tx,
            events_rx,
            workers: HashMap::new(),
            queue: VecDeque::new(),
            running: HashMap::new(),
            next_id: 0,
        }
    }

    /// Control loop. Exits on `Shutdown` or when every pool handle is gone,
    /// then rejects outstanding tasks and terminates all workers.
    pub(crate) async fn run(mut self) {
        let mut health = tokio::time::interval(self.cfg.health_check_interval());
        health.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            let wake = self.next_deadline();
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Submit(task)) => {
                        self.queue.push_back(task);
                        self.settle();
                    }
                    Some(Command::Snapshot(tx)) => {
                        let _ = tx.send(self.snapshot());
                    }
                    Some(Command::Shutdown) | None => break,
                },
                Some(ev) = self.events_rx.recv() => self.on_event(ev),
                _ = health.tick() => self.health_check(),
                _ = sleep_until(wake), if wake.is_some() => self.fire_deadlines(),
            }
        }
        self.shutdown();
    }

    // ---- dispatch ----

    /// Drain the queue onto idle workers, creating workers on demand while
    /// under `max_workers`. At capacity with no idle worker, tasks stay
    /// queued (backpressure; worker creation is never unbounded).
    fn assign(&mut self) {
        while !self.queue.is_empty() {
            let wid = match self.pick_idle() {
                Some(w) => w,
                None => {
                    if self.workers.len() >= self.cfg.max_workers {
                        break;
                    }
                    match self.spawn_worker() {
                        Some(w) => w,
                        None => break,
                    }
                }
            };
            let Some(task) = self.queue.pop_front() else {
                break;
            };
            self.dispatch_to(wid, task);
        }
    }

    fn pick_idle(&self) -> Option<WorkerId> {
        self.workers
            .values()
            .find(|r| r.status == WorkerStatus::Idle)
            .map(|r| r.id)
    }

    fn dispatch_to(&mut self, wid: WorkerId, task: Task) {
        let task_timeout = self.cfg.task_timeout();
        let Some(rec) = self.workers.get_mut(&wid) else {
            // Candidate vanished between pick and dispatch; requeue in order.
            self.queue.push_front(task);
            return;
        };
        let Task {
            source,
            policy,
            name,
            created_at,
            done,
        } = task;
        let now = Instant::now();
        rec.status = WorkerStatus::Busy;
        rec.last_activity = now;
        rec.idle_deadline = None;
        rec.task_deadline = Some(now + task_timeout);
        tracing::debug!(
            worker = %wid,
            task = %name,
            queued_ms = created_at.elapsed().as_millis() as u64,
            "dispatching task"
        );
        rec.handle.dispatch(HashJob { source, policy });
        self.running.insert(wid, InFlight { name, done });
    }

    /// Assign anything assignable, then arm idle timers on workers left
    /// idle with an empty queue.
    fn settle(&mut self) {
        self.assign();
        if self.queue.is_empty() {
            let idle_at = Instant::now() + self.cfg.idle_timeout();
            for rec in self.workers.values_mut() {
                if rec.status == WorkerStatus::Idle && rec.idle_deadline.is_none() {
                    rec.idle_deadline = Some(idle_at);
                }
            }
        }
    }

    // ---- worker lifecycle ----

    fn spawn_worker(&mut self) -> Option<WorkerId> {
        let id = WorkerId(self.next_id);
        self.next_id += 1;
        match self.spawner.spawn(id, self.events_tx.clone()) {
            Ok(handle) => {
                self.workers.insert(id, WorkerRecord::new(id, handle));
                tracing::debug!(worker = %id, live = self.workers.len(), "spawned worker");
                Some(id)
            }
            Err(e) => {
                tracing::warn!(worker = %id, error = %e, "worker spawn failed; tasks stay queued");
                None
            }
        }
    }

    fn destroy_worker(&mut self, wid: WorkerId) {
        if let Some(mut rec) = self.workers.remove(&wid) {
            rec.handle.terminate();
        }
    }

    fn on_event(&mut self, ev: WorkerEvent) {
        match ev {
            WorkerEvent::Completed { worker, hash } => self.on_success(worker, hash),
            WorkerEvent::Failed { worker, error } => self.on_failure(worker, error),
        }
    }

    fn on_success(&mut self, wid: WorkerId, hash: String) {
        let Some(rec) = self.workers.get_mut(&wid) else {
            tracing::debug!(worker = %wid, "completion from retired worker ignored");
            return;
        };
        let Some(inflight) = self.running.remove(&wid) else {
            tracing::debug!(worker = %wid, "completion with no bound task ignored");
            return;
        };
        rec.task_deadline = None;
        rec.status = WorkerStatus::Idle;
        rec.task_count += 1;
        rec.last_activity = Instant::now();
        let count = rec.task_count;
        tracing::debug!(worker = %wid, task = %inflight.name, task_count = count, "task completed");
        let _ = inflight.done.send(Ok(Checksum {
            name: inflight.name,
            hash,
        }));
        if count >= self.cfg.max_tasks_per_worker {
            self.recycle(wid);
        }
        self.settle();
    }

    /// A worker reported failure (or timed out, or was declared stuck).
    /// The bound task is rejected with the carried error; the worker is
    /// destroyed and a replacement is created unconditionally. The rejected
    /// task is never resubmitted on the caller's behalf.
    fn on_failure(&mut self, wid: WorkerId, error: ChecksumError) {
        if !self.workers.contains_key(&wid) {
            tracing::debug!(worker = %wid, "failure from retired worker ignored");
            return;
        }
        tracing::warn!(worker = %wid, error = %error, "worker failed; replacing");
        if let Some(inflight) = self.running.remove(&wid) {
            let _ = inflight.done.send(Err(error));
        }
        self.destroy_worker(wid);
        self.spawn_worker();
        self.settle();
    }

    /// Destroy a worker that hit its task limit. No eager replacement:
    /// `settle` creates a fresh worker on demand iff tasks are queued.
    fn recycle(&mut self, wid: WorkerId) {
        if let Some(mut rec) = self.workers.remove(&wid) {
            tracing::info!(worker = %wid, task_count = rec.task_count, "recycling worker at task limit");
            rec.handle.terminate();
        }
    }

    // ---- timers ----

    fn next_deadline(&self) -> Option<Instant> {
        self.workers.values().filter_map(|r| r.next_deadline()).min()
    }

    fn fire_deadlines(&mut self) {
        let now = Instant::now();

        let timed_out: Vec<WorkerId> = self
            .workers
            .values()
            .filter(|r| r.task_deadline.is_some_and(|d| d <= now))
            .map(|r| r.id)
            .collect();
        for wid in timed_out {
            let msg = format!("task timed out after {}ms", self.cfg.task_timeout_ms);
            self.on_failure(wid, ChecksumError::WorkerFault(msg));
        }

        let idle_expired: Vec<WorkerId> = self
            .workers
            .values()
            .filter(|r| r.idle_deadline.is_some_and(|d| d <= now))
            .map(|r| r.id)
            .collect();
        for wid in idle_expired {
            if self.queue.is_empty() {
                if let Some(mut rec) = self.workers.remove(&wid) {
                    tracing::debug!(worker = %wid, "evicting idle worker");
                    rec.handle.terminate();
                }
            } else if let Some(rec) = self.workers.get_mut(&wid) {
                // Queue refilled before the timer fired; keep the worker.
                rec.idle_deadline = None;
            }
        }

        self.settle();
    }

    /// Deadlock-recovery net: any worker with no activity for over
    /// `2 * task_timeout` is force-replaced, whatever its nominal status.
    fn health_check(&mut self) {
        let now = Instant::now();
        let stuck_after = self.cfg.stuck_after();
        let stuck: Vec<WorkerId> = self
            .workers
            .values()
            .filter(|r| now.duration_since(r.last_activity) > stuck_after)
            .map(|r| r.id)
            .collect();
        for wid in stuck {
            tracing::warn!(worker = %wid, "health check: worker stuck, force-replacing");
            let msg = format!("worker stuck: no activity for over {:?}", stuck_after);
            self.on_failure(wid, ChecksumError::WorkerFault(msg));
        }
    }

    // ---- teardown & introspection ----

    /// Reject every queued and in-flight task, then terminate all workers.
    /// Tasks are rejected rather than left pending so no caller hangs on a
    /// promise the pool will never fulfil.
    fn shutdown(&mut self) {
        tracing::info!(
            workers = self.workers.len(),
            queued = self.queue.len(),
            active = self.running.len(),
            "pool shutting down"
        );
        for (_, inflight) in self.running.drain() {
            let _ = inflight.done.send(Err(ChecksumError::PoolShutdown));
        }
        for task in self.queue.drain(..) {
            let _ = task.done.send(Err(ChecksumError::PoolShutdown));
        }
        for (_, mut rec) in self.workers.drain() {
            rec.handle.terminate();
        }
    }

    fn snapshot(&self) -> PoolSnapshot {
        let now = Instant::now();
        let workers = self
            .workers
            .values()
            .map(|r| WorkerSnapshot {
                id: r.id,
                status: r.status,
                task_count: r.task_count,
                age: now.duration_since(r.created_at),
                since_last_activity: now.duration_since(r.last_activity),
            })
            .collect();
        PoolSnapshot {
            workers,
            queued: self.queue.len(),
            active: self.running.len(),
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    if let Some(d) = deadline {
        tokio::time::sleep_until(tokio::time::Instant::from_std(d)).await;
    }
}
