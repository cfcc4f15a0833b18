//! Worker process: polls the master for tasks, executes payloads and
//! reports results, with a separate heartbeat loop for liveness.
//!
//! The worker is intentionally stateless: if it crashes mid-task the
//! master requeues the assignment after the task timeout, and the task
//! runs again elsewhere (at-least-once semantics).

pub mod executor;

use std::time::{SystemTime, UNIX_EPOCH};

use tokio_util::sync::CancellationToken;

use crate::client::MasterClient;
use crate::config::WorkerConfig;
use crate::error::Result;

pub struct TaskWorker {
    config: WorkerConfig,
    client: MasterClient,
}

impl TaskWorker {
    pub fn new(config: WorkerConfig) -> Self {
        let client = MasterClient::new(config.master_url.clone());
        Self { config, client }
    }

    /// Run the poll loop and the heartbeat loop until cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(worker_id = %self.config.worker_id, master = %self.config.master_url, "Worker starting");

        let heartbeat_client = self.client.clone();
        let heartbeat_id = self.config.worker_id.clone();
        let heartbeat_interval = self.config.heartbeat_interval;
        let heartbeat_shutdown = shutdown.clone();
        let heartbeat = tokio::spawn(async move {
            let mut interval = tokio::time::interval(heartbeat_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        // Transient failures are fine; the next beat retries
                        if let Err(e) = heartbeat_client.heartbeat(&heartbeat_id, epoch_seconds()).await {
                            tracing::debug!(error = %e, "Heartbeat failed");
                        }
                    }
                    _ = heartbeat_shutdown.cancelled() => break,
                }
            }
        });

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(worker_id = %self.config.worker_id, "Worker stopping");
                    break;
                }
                result = self.poll_once() => {
                    match result {
                        Ok(true) => {} // got a task, poll again immediately
                        Ok(false) => tokio::time::sleep(self.config.poll_interval).await,
                        Err(e) => {
                            tracing::warn!(error = %e, "Poll failed, backing off");
                            tokio::time::sleep(self.config.poll_interval).await;
                        }
                    }
                }
            }
        }

        heartbeat.abort();
    }

    /// One fetch/execute/report cycle. Returns whether a task was handed out.
    async fn poll_once(&self) -> Result<bool> {
        let Some(task) = self.client.get_task(&self.config.worker_id).await? else {
            return Ok(false);
        };

        tracing::info!(
            task_id = %task.task_id,
            task_type = %task.task_type,
            "Executing task"
        );
        let (outcome, result) = executor::execute(&task.task_type, &task.payload);

        self.client
            .submit_result(&task.task_id, outcome, result, &self.config.worker_id)
            .await?;
        tracing::info!(task_id = %task.task_id, outcome = ?outcome, "Task finished");
        Ok(true)
    }
}

fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
