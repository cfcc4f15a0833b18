//! Periodic sweep that enforces the two timeouts.
//!
//! The reconciler is the system's failure-recovery mechanism: each tick it
//! evicts workers that stopped heartbeating and requeues assignments that
//! outlived the task timeout. Both passes run under the same lock as every
//! scheduler operation, so a tick never interleaves with a request.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::config::MasterConfig;
use crate::scheduler::Scheduler;

/// What a single sweep did, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SweepReport {
    pub evicted_workers: Vec<String>,
    pub requeued_tasks: Vec<String>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.evicted_workers.is_empty() && self.requeued_tasks.is_empty()
    }
}

/// Runs the timeout sweep on a fixed interval until cancelled.
pub struct Reconciler {
    config: MasterConfig,
    scheduler: Arc<RwLock<Scheduler>>,
}

impl Reconciler {
    pub fn new(config: MasterConfig, scheduler: Arc<RwLock<Scheduler>>) -> Self {
        Self { config, scheduler }
    }

    /// One sweep at the given instant. Never fails: both passes are pure
    /// in-memory mutations.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let heartbeat_cutoff = now - ChronoDuration::from_std(self.config.heartbeat_timeout)
            .unwrap_or_else(|_| ChronoDuration::seconds(10));
        let task_cutoff = now - ChronoDuration::from_std(self.config.task_timeout)
            .unwrap_or_else(|_| ChronoDuration::seconds(15));

        let mut scheduler = self.scheduler.write().await;
        let evicted_workers = scheduler.evict_dead_workers(heartbeat_cutoff);
        let requeued_tasks = scheduler.requeue_stale(task_cutoff, now);

        SweepReport {
            evicted_workers,
            requeued_tasks,
        }
    }

    /// Tick loop. Runs for the lifetime of the process unless the token
    /// is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.reconcile_interval);
        // The first tick of tokio's interval fires immediately; skip it so
        // a freshly started master does not sweep an empty state.
        interval.tick().await;

        tracing::info!(
            interval = ?self.config.reconcile_interval,
            heartbeat_timeout = ?self.config.heartbeat_timeout,
            task_timeout = ?self.config.task_timeout,
            "Reconciler started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let report = self.sweep_at(Utc::now()).await;
                    if !report.is_empty() {
                        tracing::info!(
                            evicted = report.evicted_workers.len(),
                            requeued = report.requeued_tasks.len(),
                            "Reconciler sweep"
                        );
                    }
                }
                _ = shutdown.cancelled() => {
                    tracing::info!("Reconciler stopping");
                    break;
                }
            }
        }
    }
}
