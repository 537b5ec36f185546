//! Asynchronous, backpressure-aware log pipeline.
//!
//! `LogPipeline` owns a single [`Sink`] and a dedicated writer task. Producers
//! hold cheap [`Logger`] clones; a log call checks the level against the
//! *current* configuration snapshot, renders the record on the spot and
//! `try_send`s it onto a bounded queue. The caller never waits on I/O.
//!
//! When the queue is full the record is dropped and a warning goes to the
//! process console (`tracing` on stderr). Bounded memory wins over
//! completeness under overload.
//!
//! ```text
//! Logger::info ──┐
//! Logger::warn ──┼─ try_send ─▶ [bounded queue] ─▶ writer task ─▶ Sink
//! Logger::error ─┘      │
//!                       └─ full ─▶ console warning, drop counter
//! ```
//!
//! Call [`LogPipeline::close`] on shutdown to drain the queue. Logging through
//! a `Logger` after that is a silent no-op.

pub mod level;
pub mod record;
pub mod sink;
mod worker;

#[cfg(test)]
pub(crate) mod test_support;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::ConfigHandle;

pub use level::{should_emit, Level, ParseLevelError};
pub use record::{Field, FieldValue, LogRecord, MAX_FIELDS, TIMESTAMP_FORMAT};
pub use sink::{Sink, SinkKind};
pub use worker::PipelineStats;

use worker::{spawn_worker, Command};

/// Queue capacity used by [`LogPipeline::open`].
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Errors from the log pipeline.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("log sink {path:?} unavailable: {source}")]
    SinkUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("log pipeline is closed")]
    Closed,
}

/// Cloneable producer side of the pipeline.
#[derive(Debug, Clone)]
pub struct Logger {
    tx: mpsc::Sender<Command>,
    config: ConfigHandle,
    stats: Arc<PipelineStats>,
}

impl Logger {
    /// Log `message` at `level` with structured fields.
    pub fn log(&self, level: Level, message: &str, fields: &[Field<'_>]) {
        self.submit(Some(level), level.as_str(), message, fields);
    }

    /// Log with a level given by name.
    ///
    /// A tag that names no known level is always emitted and written as given.
    pub fn log_tagged(&self, tag: &str, message: &str, fields: &[Field<'_>]) {
        match tag.parse::<Level>() {
            Ok(level) => self.log(level, message, fields),
            Err(_) => self.submit(None, tag, message, fields),
        }
    }

    pub fn debug(&self, message: &str, fields: &[Field<'_>]) {
        self.log(Level::Debug, message, fields);
    }

    pub fn info(&self, message: &str, fields: &[Field<'_>]) {
        self.log(Level::Info, message, fields);
    }

    pub fn warn(&self, message: &str, fields: &[Field<'_>]) {
        self.log(Level::Warn, message, fields);
    }

    pub fn error(&self, message: &str, fields: &[Field<'_>]) {
        self.log(Level::Error, message, fields);
    }

    /// Whether a record at `level` would pass the current threshold.
    pub fn enabled(&self, level: Level) -> bool {
        should_emit(self.config.current().log_threshold(), Some(level))
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    fn submit(&self, level: Option<Level>, tag: &str, message: &str, fields: &[Field<'_>]) {
        if !should_emit(self.config.current().log_threshold(), level) {
            return;
        }

        let record = LogRecord::new(tag, message, fields);
        match self.tx.try_send(Command::Record(record)) {
            Ok(()) => self.stats.record_enqueued(),
            Err(TrySendError::Full(cmd)) => {
                self.stats.record_dropped();
                if let Command::Record(record) = cmd {
                    tracing::warn!(record = record.as_str(), "Log queue full, dropping record");
                }
            }
            // Pipeline closed: nothing left to write to.
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Owner of the sink and the writer task.
#[derive(Debug)]
pub struct LogPipeline {
    logger: Logger,
    sink_kind: SinkKind,
    worker: Option<JoinHandle<()>>,
}

impl LogPipeline {
    /// Open `path` for append, falling back to stdout if it cannot be opened.
    ///
    /// Never fails: an unusable sink path degrades to stdout with a console
    /// warning.
    pub async fn open(path: &Path, config: ConfigHandle) -> Self {
        Self::open_with_capacity(path, config, DEFAULT_QUEUE_CAPACITY).await
    }

    /// [`open`](Self::open) with an explicit queue capacity.
    pub async fn open_with_capacity(path: &Path, config: ConfigHandle, capacity: usize) -> Self {
        let sink = match Sink::open(path).await {
            Ok(sink) => sink,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to open log file, using stdout instead");
                Sink::stdout()
            }
        };
        Self::with_sink(sink, config, capacity)
    }

    /// Start a writer task over an already opened sink.
    ///
    /// Must be called within a Tokio runtime. A capacity of zero is raised
    /// to one.
    pub fn with_sink(sink: Sink, config: ConfigHandle, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let stats = Arc::new(PipelineStats::default());
        let sink_kind = sink.kind().clone();
        let worker = spawn_worker(sink, rx, stats.clone());

        tracing::debug!(sink = ?sink_kind, capacity, "Log pipeline started");

        Self {
            logger: Logger { tx, config, stats },
            sink_kind,
            worker: Some(worker),
        }
    }

    /// A producer handle for other components.
    pub fn logger(&self) -> Logger {
        self.logger.clone()
    }

    pub fn sink_kind(&self) -> &SinkKind {
        &self.sink_kind
    }

    pub fn stats(&self) -> &PipelineStats {
        self.logger.stats()
    }

    pub fn log(&self, level: Level, message: &str, fields: &[Field<'_>]) {
        self.logger.log(level, message, fields);
    }

    pub fn debug(&self, message: &str, fields: &[Field<'_>]) {
        self.logger.debug(message, fields);
    }

    pub fn info(&self, message: &str, fields: &[Field<'_>]) {
        self.logger.info(message, fields);
    }

    pub fn warn(&self, message: &str, fields: &[Field<'_>]) {
        self.logger.warn(message, fields);
    }

    pub fn error(&self, message: &str, fields: &[Field<'_>]) {
        self.logger.error(message, fields);
    }

    /// Wait until every record enqueued before this call is written and the
    /// sink flushed. Unlike logging, this waits for queue space.
    pub async fn flush(&self) -> Result<(), LogError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.logger
            .tx
            .send(Command::Flush(ack_tx))
            .await
            .map_err(|_| LogError::Closed)?;
        ack_rx.await.map_err(|_| LogError::Closed)
    }

    /// Drain the queue, stop the writer and release the sink.
    pub async fn close(mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        if self.logger.tx.send(Command::Close).await.is_err() {
            tracing::warn!("Log writer exited before close");
        }
        if let Err(e) = worker.await {
            tracing::error!(error = %e, "Log writer task failed");
        }
    }
}

impl Drop for LogPipeline {
    fn drop(&mut self) {
        if self.worker.is_some() {
            tracing::warn!("LogPipeline dropped without close; queued records may be lost");
        }
    }
}
