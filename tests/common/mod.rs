//! Shared utilities for integration testing.

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use hyperatomic::config::{ConfigHandle, ServiceConfig};
use hyperatomic::lifecycle::Shutdown;
use hyperatomic::net::connection::ConnectionTracker;
use hyperatomic::net::ConnectionServer;
use hyperatomic::LogPipeline;
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// A server on an ephemeral loopback port, logging into a temp file.
#[allow(dead_code)]
pub struct TestDaemon {
    pub addr: SocketAddr,
    pub config: ConfigHandle,
    pub tracker: ConnectionTracker,
    pub log_path: PathBuf,
    pipeline: LogPipeline,
    shutdown: Shutdown,
    task: JoinHandle<()>,
    _dir: TempDir,
}

#[allow(dead_code)]
impl TestDaemon {
    pub async fn start(log_level: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("hyperatomic.log");

        let mut config = ServiceConfig::default();
        config.logging.log_level = log_level.to_string();
        config.logging.log_file = log_path.clone();
        let config = ConfigHandle::new(config);

        let pipeline = LogPipeline::open(&log_path, config.clone()).await;
        let server = ConnectionServer::bind("127.0.0.1:0".parse().unwrap(), pipeline.logger())
            .await
            .unwrap();
        let addr = server.local_addr();
        let tracker = server.tracker();

        let shutdown = Shutdown::new();
        let task = tokio::spawn(server.run(shutdown.subscribe()));

        Self {
            addr,
            config,
            tracker,
            log_path,
            pipeline,
            shutdown,
            task,
            _dir: dir,
        }
    }

    /// Flush the pipeline and read the sink file.
    pub async fn log_contents(&self) -> String {
        self.pipeline.flush().await.unwrap();
        fs::read_to_string(&self.log_path).unwrap()
    }

    /// Switch the live log level.
    pub fn set_log_level(&self, level: &str) {
        let mut next = (*self.config.current()).clone();
        next.logging.log_level = level.to_string();
        self.config.publish(next);
    }

    /// Stop accepting, close the pipeline and return the final log.
    pub async fn stop(self) -> String {
        self.shutdown.trigger();
        self.task.await.unwrap();
        self.pipeline.close().await;
        fs::read_to_string(&self.log_path).unwrap()
    }
}

/// Poll `check` until it returns true or `timeout` elapses.
#[allow(dead_code)]
pub async fn wait_for<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
