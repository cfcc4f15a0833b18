use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for the master node.
///
/// All timeouts are fixed process-wide constants; there is no per-task
/// tuning. Defaults match the reference deployment: a worker is presumed
/// dead after 10s of silence, a task is requeued after 15s without a
/// result, and the reconciler sweeps every 5s.
#[derive(Debug, Clone)]
pub struct MasterConfig {
    /// Address the HTTP API listens on
    pub listen_addr: SocketAddr,
    /// Worker is evicted when its last heartbeat is older than this
    pub heartbeat_timeout: Duration,
    /// Assignment is requeued when older than this
    pub task_timeout: Duration,
    /// Period of the reconciler sweep
    pub reconcile_interval: Duration,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            // SAFETY: This is a hardcoded valid address that will always parse
            listen_addr: "127.0.0.1:8000"
                .parse()
                .expect("default listen address is valid"),
            heartbeat_timeout: Duration::from_secs(10),
            task_timeout: Duration::from_secs(15),
            reconcile_interval: Duration::from_secs(5),
        }
    }
}

impl MasterConfig {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            ..Default::default()
        }
    }

    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn with_reconcile_interval(mut self, interval: Duration) -> Self {
        self.reconcile_interval = interval;
        self
    }
}

/// Configuration for a worker process.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Base URL of the master HTTP API, e.g. "http://127.0.0.1:8000"
    pub master_url: String,
    /// Unique worker identifier
    pub worker_id: String,
    /// How long to wait between polls when no task is available
    pub poll_interval: Duration,
    /// Period of the heartbeat loop
    pub heartbeat_interval: Duration,
}

impl WorkerConfig {
    pub fn new(master_url: impl Into<String>, worker_id: impl Into<String>) -> Self {
        Self {
            master_url: master_url.into(),
            worker_id: worker_id.into(),
            poll_interval: Duration::from_secs(1),
            heartbeat_interval: Duration::from_secs(5),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_config_default() {
        let cfg = MasterConfig::default();
        assert_eq!(cfg.listen_addr.to_string(), "127.0.0.1:8000");
        assert_eq!(cfg.heartbeat_timeout, Duration::from_secs(10));
        assert_eq!(cfg.task_timeout, Duration::from_secs(15));
        assert_eq!(cfg.reconcile_interval, Duration::from_secs(5));
    }

    #[test]
    fn master_config_new() {
        let addr: SocketAddr = "10.0.0.1:9000".parse().unwrap();
        let cfg = MasterConfig::new(addr);
        assert_eq!(cfg.listen_addr, addr);
        assert_eq!(cfg.heartbeat_timeout, Duration::from_secs(10));
    }

    #[test]
    fn master_config_builders() {
        let cfg = MasterConfig::default()
            .with_heartbeat_timeout(Duration::from_millis(100))
            .with_task_timeout(Duration::from_millis(150))
            .with_reconcile_interval(Duration::from_millis(50));
        assert_eq!(cfg.heartbeat_timeout, Duration::from_millis(100));
        assert_eq!(cfg.task_timeout, Duration::from_millis(150));
        assert_eq!(cfg.reconcile_interval, Duration::from_millis(50));
    }

    #[test]
    fn worker_config_new() {
        let cfg = WorkerConfig::new("http://127.0.0.1:8000", "worker-1");
        assert_eq!(cfg.master_url, "http://127.0.0.1:8000");
        assert_eq!(cfg.worker_id, "worker-1");
        assert_eq!(cfg.poll_interval, Duration::from_secs(1));
        assert_eq!(cfg.heartbeat_interval, Duration::from_secs(5));
    }
}
