//! Background writer task for [`LogPipeline`](super::LogPipeline).
//!
//! The worker is the only code that touches the sink. It receives
//! [`Command`] values over the bounded queue, writes records in the order they
//! were enqueued, and flushes whenever the queue runs dry. A failed write is
//! reported on the console and the loop carries on.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::record::LogRecord;
use super::sink::Sink;
use crate::observability::metrics;

/// Commands sent to the writer task.
#[derive(Debug)]
pub(crate) enum Command {
    Record(LogRecord),
    /// Flush everything queued before this command, then acknowledge.
    Flush(oneshot::Sender<()>),
    /// Stop accepting commands, drain what is queued, then exit.
    Close,
}

/// Counters shared between producers and the writer.
#[derive(Debug, Default)]
pub struct PipelineStats {
    enqueued: AtomicU64,
    dropped: AtomicU64,
    written: AtomicU64,
    write_errors: AtomicU64,
}

impl PipelineStats {
    /// Records accepted onto the queue.
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Records discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Records handed to the sink without error.
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Failed writes and flushes.
    pub fn write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }

    pub(crate) fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        metrics::record_log_dropped();
    }

    fn record_written(&self) {
        self.written.fetch_add(1, Ordering::Relaxed);
    }

    fn record_write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
        metrics::record_log_write_error();
    }
}

pub(crate) fn spawn_worker(
    sink: Sink,
    rx: mpsc::Receiver<Command>,
    stats: Arc<PipelineStats>,
) -> JoinHandle<()> {
    tokio::spawn(run(sink, rx, stats))
}

async fn run(sink: Sink, mut rx: mpsc::Receiver<Command>, stats: Arc<PipelineStats>) {
    let mut writer = sink.writer;

    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Record(record) => match write_record(&mut writer, &record).await {
                Ok(()) => stats.record_written(),
                Err(e) => {
                    stats.record_write_error();
                    tracing::warn!(error = %e, record = record.as_str(), "Log sink write error");
                }
            },
            Command::Flush(ack) => {
                flush(&mut writer, &stats).await;
                let _ = ack.send(());
                continue;
            }
            Command::Close => rx.close(),
        }

        if rx.is_empty() {
            flush(&mut writer, &stats).await;
        }
    }

    flush(&mut writer, &stats).await;
    tracing::debug!(written = stats.written(), "Log writer stopped");
}

async fn write_record<W>(writer: &mut W, record: &LogRecord) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    // One write per record so a failure never leaves a line unterminated.
    writer.write_all(record.as_bytes()).await
}

async fn flush<W>(writer: &mut W, stats: &PipelineStats)
where
    W: AsyncWrite + Unpin + ?Sized,
{
    if let Err(e) = writer.flush().await {
        stats.record_write_error();
        tracing::warn!(error = %e, "Log sink flush error");
    }
}
