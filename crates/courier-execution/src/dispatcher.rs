//! Bounded worker-pool dispatcher.
//!
//! Submitted task ids flow through one bounded `mpsc` queue into a fixed
//! number of worker loops. Each worker claims a task under a lease, performs
//! the executor call through the bridge, and writes exactly one terminal
//! record — `completed` with a result or `failed` with the error message.
//! Bridge failures stop here; the submitter only ever observes them through
//! the task's eventual status.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use courier_bridge::Bridge;
use courier_core::config::DispatcherSettings;
use courier_core::task::{TaskRepository, TaskStatus};
use courier_core::{CourierError, Result};

use crate::route;

/// Worker pool sizing and lease duration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Number of concurrent worker loops. Zero is a valid enqueue-only mode
    /// used by short-lived submitters that leave execution to a daemon.
    pub workers: usize,
    /// Bound of the dispatch queue.
    pub queue_capacity: usize,
    /// Processing lease a worker takes on a task; after expiry the sweeper
    /// may hand the task to another worker.
    pub lease_secs: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 100,
            lease_secs: 600,
        }
    }
}

impl DispatcherConfig {
    pub fn from_settings(settings: &DispatcherSettings) -> Self {
        Self {
            workers: settings.workers,
            queue_capacity: settings.queue_capacity,
            lease_secs: settings.lease_secs,
        }
    }
}

struct Inner {
    tx: mpsc::Sender<String>,
    cancel: CancellationToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

/// Handle to the running worker pool. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// Spawns the worker pool and returns its handle.
    pub fn start(
        config: DispatcherConfig,
        repo: Arc<dyn TaskRepository>,
        bridge: Arc<dyn Bridge>,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<String>(config.queue_capacity.max(1));
        let rx = Arc::new(AsyncMutex::new(rx));
        let cancel = CancellationToken::new();
        let lease = chrono::Duration::seconds(config.lease_secs as i64);

        let mut handles = Vec::with_capacity(config.workers);
        for worker_id in 0..config.workers {
            let rx = rx.clone();
            let repo = repo.clone();
            let bridge = bridge.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                worker_loop(worker_id, rx, repo, bridge, cancel, lease).await;
            }));
        }

        info!(workers = config.workers, queue_capacity = config.queue_capacity, "dispatcher started");
        Self {
            inner: Arc::new(Inner {
                tx,
                cancel,
                handles: Mutex::new(handles),
            }),
        }
    }

    /// Enqueues a task for execution without blocking.
    ///
    /// Returns [`CourierError::Saturated`] when the queue is full; the task
    /// stays pending and the recovery sweeper requeues it on a later tick.
    pub fn dispatch(&self, task_id: &str) -> Result<()> {
        match self.inner.tx.try_send(task_id.to_string()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(CourierError::Saturated),
            Err(TrySendError::Closed(_)) => Err(CourierError::internal("dispatcher is shut down")),
        }
    }

    /// Stops the workers after the tasks already picked up finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let handles: Vec<JoinHandle<()>> = {
            let mut guard = self.inner.handles.lock().unwrap();
            guard.drain(..).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }
        debug!("dispatcher stopped");
    }
}

async fn worker_loop(
    worker_id: usize,
    rx: Arc<AsyncMutex<mpsc::Receiver<String>>>,
    repo: Arc<dyn TaskRepository>,
    bridge: Arc<dyn Bridge>,
    cancel: CancellationToken,
    lease: chrono::Duration,
) {
    loop {
        let task_id = {
            let mut rx = rx.lock().await;
            tokio::select! {
                _ = cancel.cancelled() => None,
                msg = rx.recv() => msg,
            }
        };
        let Some(task_id) = task_id else { break };

        if let Err(err) = run_task(repo.as_ref(), bridge.as_ref(), lease, &task_id).await {
            // The outcome could not be persisted; the lease will lapse and
            // the sweeper hands the task to another worker.
            error!(worker_id, task_id = %task_id, error = %err, "task run aborted");
        }
    }
    debug!(worker_id, "worker stopped");
}

async fn run_task(
    repo: &dyn TaskRepository,
    bridge: &dyn Bridge,
    lease: chrono::Duration,
    task_id: &str,
) -> Result<()> {
    let Some(mut task) = repo.find_by_id(task_id).await? else {
        warn!(task_id, "dispatched task no longer exists");
        return Ok(());
    };
    // Requeues are idempotent: anything already finished, or claimed under a
    // live lease, is left alone.
    if task.is_terminal() {
        debug!(task_id, status = %task.status, "skipping finished task");
        return Ok(());
    }
    if task.status == TaskStatus::Processing && !task.lease_expired(Utc::now()) {
        debug!(task_id, "task already claimed under a live lease");
        return Ok(());
    }

    task.begin_processing(lease)?;
    repo.save(&task).await?;

    let (method, args) = route::bridge_call_for(&task.input);
    info!(
        task_id,
        kind = %task.kind,
        method = %method,
        attempt = task.attempts,
        "task execution started"
    );

    let started = Instant::now();
    let outcome = bridge
        .invoke(method, &args)
        .await
        .and_then(|payload| route::result_from_payload(task.kind, payload));
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(result) => {
            task.complete(result)?;
            info!(task_id, elapsed_ms, "task completed");
        }
        Err(err) => {
            // A reported error carries the executor's own message; for
            // everything else the error display is the diagnostic.
            let message = match &err {
                CourierError::BridgeReportedError(msg) => msg.clone(),
                other => other.to_string(),
            };
            task.fail(message)?;
            warn!(task_id, elapsed_ms, error = %err, "task failed");
        }
    }
    repo.save(&task).await
}
