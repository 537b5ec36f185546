//! In-memory I/O for exercising the pipeline and handlers without touching
//! the filesystem or the network.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Captures output in memory. After `ok_writes` successful writes, the next
/// `fail_writes` writes fail.
#[derive(Clone, Default)]
pub(crate) struct CaptureWriter {
    out: Arc<Mutex<Vec<u8>>>,
    ok_writes: Arc<AtomicU64>,
    fail_writes: Arc<AtomicU64>,
}

impl CaptureWriter {
    pub(crate) fn failing(writes: u64) -> Self {
        Self::failing_after(0, writes)
    }

    pub(crate) fn failing_after(ok_writes: u64, fail_writes: u64) -> Self {
        let writer = Self::default();
        writer.ok_writes.store(ok_writes, Ordering::SeqCst);
        writer.fail_writes.store(fail_writes, Ordering::SeqCst);
        writer
    }

    pub(crate) fn contents(&self) -> String {
        String::from_utf8(self.out.lock().unwrap().clone()).unwrap()
    }
}

impl AsyncWrite for CaptureWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let ok_left = self.ok_writes.load(Ordering::SeqCst);
        let remaining = self.fail_writes.load(Ordering::SeqCst);
        if ok_left > 0 {
            self.ok_writes.store(ok_left - 1, Ordering::SeqCst);
        } else if remaining > 0 {
            self.fail_writes.store(remaining - 1, Ordering::SeqCst);
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "disk full")));
        }
        self.out.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// A sink that never finishes a write, so the worker stalls on its first
/// record and the queue fills up.
pub(crate) struct StalledWriter;

impl AsyncWrite for StalledWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Pending
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Pending
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Pending
    }
}

/// A socket stand-in that serves `input`, then either reports EOF or a
/// reset. Writes either succeed into `written` or fail with a broken pipe.
pub(crate) struct ScriptedStream {
    input: Vec<u8>,
    pos: usize,
    reset_after_input: bool,
    fail_writes: bool,
    written: Arc<Mutex<Vec<u8>>>,
}

impl ScriptedStream {
    /// Serves `input` then EOF; writes succeed.
    pub(crate) fn new(input: &[u8]) -> Self {
        Self {
            input: input.to_vec(),
            pos: 0,
            reset_after_input: false,
            fail_writes: false,
            written: Arc::default(),
        }
    }

    /// Every read fails.
    pub(crate) fn read_reset() -> Self {
        Self {
            reset_after_input: true,
            ..Self::new(b"")
        }
    }

    /// Serves `input`, but no reply can be written.
    pub(crate) fn write_broken(input: &[u8]) -> Self {
        Self {
            fail_writes: true,
            ..Self::new(input)
        }
    }

    /// Handle to everything written so far.
    pub(crate) fn written(&self) -> Arc<Mutex<Vec<u8>>> {
        self.written.clone()
    }
}

impl AsyncRead for ScriptedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let rest = &self.input[self.pos..];
        if rest.is_empty() {
            if self.reset_after_input {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")));
            }
            return Poll::Ready(Ok(()));
        }
        let n = rest.len().min(buf.remaining());
        buf.put_slice(&rest[..n]);
        self.pos += n;
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for ScriptedStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.fail_writes {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe")));
        }
        self.written.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
