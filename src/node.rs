use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::api::{self, ApiState};
use crate::config::MasterConfig;
use crate::reconciler::Reconciler;
use crate::scheduler::Scheduler;

/// Master node: owns the scheduler state and wires up the subsystems.
pub struct MasterNode {
    pub config: MasterConfig,
    pub scheduler: Arc<RwLock<Scheduler>>,
}

impl MasterNode {
    pub fn new(config: MasterConfig) -> Self {
        Self {
            config,
            scheduler: Arc::new(RwLock::new(Scheduler::new())),
        }
    }

    /// Run the master until the token is cancelled.
    ///
    /// Starts the subsystems in order:
    /// 1. Spawns the reconciler sweep loop
    /// 2. Serves the HTTP API (blocking until shutdown)
    ///
    /// # Errors
    ///
    /// Returns an error if the listen address cannot be bound or the HTTP
    /// server fails. The reconciler runs as a spawned task and logs its
    /// own lifecycle.
    pub async fn run(self, shutdown: CancellationToken) -> std::io::Result<()> {
        let reconciler = Reconciler::new(self.config.clone(), self.scheduler.clone());
        let reconciler_shutdown = shutdown.clone();
        tokio::spawn(async move {
            reconciler.run(reconciler_shutdown).await;
        });

        let app = api::router(ApiState {
            scheduler: self.scheduler,
        });

        tracing::info!(addr = %self.config.listen_addr, "Master listening");
        let listener = tokio::net::TcpListener::bind(self.config.listen_addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
    }
}
