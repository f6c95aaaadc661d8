//! Background task poller

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::backend::Backend;
use crate::error::Result;
use crate::models::Task;

/// Shortest period the loop will tick at
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Counters from the poll loop
#[derive(Debug, Default, Clone)]
pub struct PollStats {
    /// Ticks that fetched the task list
    pub successful_ticks: u64,
    /// Ticks whose fetch failed (the previous list was kept)
    pub failed_ticks: u64,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

struct Shared {
    backend: Arc<dyn Backend>,
    tasks: watch::Sender<Vec<Task>>,
    stats: Mutex<PollStats>,
    /// Incremented by every fetch; a response overtaken by a newer fetch is dropped
    generation: AtomicU64,
}

impl Shared {
    fn stats(&self) -> MutexGuard<'_, PollStats> {
        self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Fetch once and publish if the list changed; returns whether it did
    async fn tick(&self) -> Result<bool> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.backend.list_tasks().await;
        if !self.is_current(generation) {
            debug!("Discarding stale task response (generation {})", generation);
            return Ok(false);
        }

        match result {
            Ok(tasks) => {
                {
                    let mut stats = self.stats();
                    stats.successful_ticks += 1;
                    stats.last_success_at = Some(Utc::now());
                }
                // Re-checked under the channel lock; a newer tick may have published meanwhile
                let changed = self.tasks.send_if_modified(|current| {
                    if !self.is_current(generation) || *current == tasks {
                        false
                    } else {
                        *current = tasks;
                        true
                    }
                });
                if changed {
                    debug!("Task list changed ({} tasks)", self.tasks.borrow().len());
                }
                Ok(changed)
            }
            Err(e) => {
                warn!("Task poll failed: {}", e);
                let mut stats = self.stats();
                stats.failed_ticks += 1;
                stats.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

struct PollJob {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl PollJob {
    fn stop(self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

/// Keeps the server's task list fresh on a fixed period
///
/// Stopped until [`TaskPoller::start`]; dropping the poller stops the loop.
pub struct TaskPoller {
    shared: Arc<Shared>,
    wake: Arc<Notify>,
    job: Mutex<Option<PollJob>>,
}

impl TaskPoller {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let (tasks, _) = watch::channel(Vec::new());
        Self {
            shared: Arc::new(Shared {
                backend,
                tasks,
                stats: Mutex::new(PollStats::default()),
                generation: AtomicU64::new(0),
            }),
            wake: Arc::new(Notify::new()),
            job: Mutex::new(None),
        }
    }

    fn job(&self) -> MutexGuard<'_, Option<PollJob>> {
        self.job.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start polling, first tick immediately
    ///
    /// Calling this while already polling replaces the running loop, so
    /// there is never more than one. Must be called inside a tokio runtime.
    pub fn start(&self, interval: Duration) {
        let interval = interval.max(MIN_INTERVAL);
        let mut job = self.job();
        if let Some(previous) = job.take() {
            debug!("Replacing running task poll loop");
            previous.stop();
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            self.shared.clone(),
            self.wake.clone(),
            cancel.clone(),
            interval,
        ));
        *job = Some(PollJob { cancel, handle });
        info!("Polling tasks every {:?}", interval);
    }

    /// Stop polling; does nothing when already stopped
    pub fn stop(&self) {
        if let Some(job) = self.job().take() {
            job.stop();
            info!("Stopped task polling");
        }
    }

    pub fn is_running(&self) -> bool {
        self.job()
            .as_ref()
            .is_some_and(|job| !job.handle.is_finished())
    }

    /// Poll as soon as possible
    ///
    /// While running this wakes the loop for an extra tick and returns
    /// immediately. While stopped it fetches once inline.
    pub async fn poll_now(&self) -> Result<()> {
        if self.is_running() {
            self.wake.notify_one();
            return Ok(());
        }
        self.shared.tick().await.map(|_| ())
    }

    /// Latest task list
    pub fn tasks(&self) -> Vec<Task> {
        self.shared.tasks.borrow().clone()
    }

    /// Receiver that is notified only when the task list changes
    pub fn subscribe(&self) -> watch::Receiver<Vec<Task>> {
        self.shared.tasks.subscribe()
    }

    /// Fetch a single task without touching the list
    pub async fn task_status(&self, id: &str) -> Result<Task> {
        self.shared.backend.get_task(id).await
    }

    pub fn stats(&self) -> PollStats {
        self.shared.stats().clone()
    }
}

impl Drop for TaskPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_loop(shared: Arc<Shared>, wake: Arc<Notify>, cancel: CancellationToken, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
            _ = wake.notified() => debug!("Out-of-band task poll"),
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            // Failures are logged and counted inside tick; the loop keeps going
            _ = shared.tick() => {}
        }
    }
    debug!("Task poll loop exited");
}
