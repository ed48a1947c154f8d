//! Recovery sweeper.
//!
//! A task can stall in two ways: a pending record whose dispatch never made
//! it into the queue (overflow, or the submitting process exited first), and
//! a processing record whose lease expired without a terminal write (the
//! worker crashed or the host died mid-call). The sweeper scans for both and
//! pushes them back through the dispatcher. Workers make requeues safe: a
//! task under a live lease or already terminal is skipped on arrival.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use courier_core::config::DispatcherSettings;
use courier_core::task::{TaskRepository, TaskStatus};
use courier_core::{CourierError, Result};

use crate::dispatcher::Dispatcher;

/// Sweep cadence and staleness thresholds.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Time between sweeps.
    pub interval_secs: u64,
    /// Age after which an untouched pending task counts as stalled.
    pub stale_pending_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            stale_pending_secs: 600,
        }
    }
}

impl SweeperConfig {
    pub fn from_settings(settings: &DispatcherSettings) -> Self {
        Self {
            interval_secs: settings.sweep_interval_secs,
            stale_pending_secs: settings.stale_pending_secs,
        }
    }
}

/// Background loop that requeues stalled tasks.
pub struct RecoverySweeper {
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RecoverySweeper {
    /// Spawns the sweep loop. The first sweep runs immediately, which doubles
    /// as boot-time recovery of leases that expired while the process was
    /// down.
    pub fn start(
        config: SweeperConfig,
        repo: Arc<dyn TaskRepository>,
        dispatcher: Dispatcher,
    ) -> Self {
        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(Duration::from_secs(config.interval_secs.max(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let stale = chrono::Duration::seconds(config.stale_pending_secs as i64);

            loop {
                tokio::select! {
                    _ = loop_cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                match sweep_once(repo.as_ref(), &dispatcher, stale).await {
                    Ok(0) => {}
                    Ok(requeued) => info!(requeued, "recovery sweep requeued stalled tasks"),
                    Err(err) => warn!(error = %err, "recovery sweep failed"),
                }
            }
            debug!("sweeper stopped");
        });

        Self {
            cancel,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Stops the sweep loop.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.handle.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

/// One sweep pass: requeues expired-lease processing tasks and pending tasks
/// older than `stale_pending`. Returns the number of tasks requeued.
///
/// A saturated queue ends the pass early; the remainder is picked up on the
/// next tick.
pub async fn sweep_once(
    repo: &dyn TaskRepository,
    dispatcher: &Dispatcher,
    stale_pending: chrono::Duration,
) -> Result<usize> {
    let now = Utc::now();
    let mut requeued = 0;

    for task in repo.list_unfinished().await? {
        let stalled = match task.status {
            TaskStatus::Pending => now - task.updated_at >= stale_pending,
            TaskStatus::Processing => task.lease_expired(now),
            TaskStatus::Completed | TaskStatus::Failed => false,
        };
        if !stalled {
            continue;
        }
        match dispatcher.dispatch(&task.id) {
            Ok(()) => {
                requeued += 1;
                info!(
                    task_id = %task.id,
                    status = %task.status,
                    attempts = task.attempts,
                    "requeued stalled task"
                );
            }
            Err(CourierError::Saturated) => {
                warn!("dispatch queue saturated during sweep, deferring remainder");
                break;
            }
            Err(err) => return Err(err),
        }
    }
    Ok(requeued)
}
