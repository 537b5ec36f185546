//! Live reload: file changes reach the published snapshot.

use std::fs;
use std::time::Duration;

use hyperatomic::config::loader::load_config;
use hyperatomic::config::{ConfigHandle, ConfigWatcher};
use hyperatomic::lifecycle::Shutdown;
use hyperatomic::LogPipeline;

mod common;

use common::wait_for;

const WAIT: Duration = Duration::from_secs(5);

fn config_text(level: &str) -> String {
    format!("[hyperatomic.logging]\nlog_level = \"{level}\"\nlive_reload = true\n")
}

#[tokio::test]
async fn test_watcher_publishes_file_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, config_text("info")).unwrap();

    let handle = ConfigHandle::new(load_config(&path).unwrap());
    let shutdown = Shutdown::new();
    let task = ConfigWatcher::new(&path, handle.clone())
        .spawn(shutdown.subscribe())
        .unwrap();

    fs::write(&path, config_text("error")).unwrap();
    assert!(wait_for(WAIT, || handle.current().logging.log_level == "error").await);

    // A broken edit keeps the last good snapshot.
    fs::write(&path, "[hyperatomic.logging\n").unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(handle.current().logging.log_level, "error");

    shutdown.trigger();
    tokio::time::timeout(WAIT, task).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_reload_changes_pipeline_filtering() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let log_path = dir.path().join("app.log");
    fs::write(&path, config_text("error")).unwrap();

    let handle = ConfigHandle::new(load_config(&path).unwrap());
    let shutdown = Shutdown::new();
    let task = ConfigWatcher::new(&path, handle.clone())
        .spawn(shutdown.subscribe())
        .unwrap();
    let pipeline = LogPipeline::open(&log_path, handle.clone()).await;

    pipeline.info("suppressed", &[]);

    fs::write(&path, config_text("debug")).unwrap();
    assert!(wait_for(WAIT, || handle.current().logging.log_level == "debug").await);

    pipeline.debug("visible", &[]);
    pipeline.close().await;

    let log = fs::read_to_string(&log_path).unwrap();
    assert!(!log.contains("suppressed"));
    assert!(log.contains("[DEBUG] visible"));

    shutdown.trigger();
    tokio::time::timeout(WAIT, task).await.unwrap().unwrap();
}
