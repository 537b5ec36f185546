//! Accept loop and handler supervision.
//!
//! # Responsibilities
//! - Own the listening socket
//! - Spawn one handler task per accepted connection
//! - Keep accepting after accept failures, pausing briefly after each
//! - Contain handler panics and report them
//!
//! # Design Decisions
//! - Handlers live in a `JoinSet` reaped by the accept loop, so a panic
//!   surfaces as a `JoinError` instead of disappearing
//! - On shutdown the listener closes and running handlers are detached, not
//!   aborted; they end on their own when the peer goes away

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::task::{JoinError, JoinSet};

use crate::lifecycle::ShutdownSignal;
use crate::net::connection::ConnectionTracker;
use crate::net::handler::{handle, CloseReason};
use crate::net::listener::{Acceptor, Listener, ListenerError};
use crate::observability::logging::Logger;
use crate::observability::metrics;

/// Pause after a failed accept before trying again.
const ACCEPT_ERROR_PAUSE: Duration = Duration::from_millis(100);

/// Line/acknowledge TCP server.
pub struct ConnectionServer {
    listener: Listener,
    log: Logger,
    tracker: ConnectionTracker,
}

impl ConnectionServer {
    /// Bind `0.0.0.0:<port>`.
    pub async fn start(port: u16, log: Logger) -> Result<Self, ListenerError> {
        Self::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)), log).await
    }

    /// Bind an explicit address. No connection is accepted until [`run`](Self::run).
    pub async fn bind(addr: SocketAddr, log: Logger) -> Result<Self, ListenerError> {
        let listener = Listener::bind(addr).await?;
        Ok(Self {
            listener,
            log,
            tracker: ConnectionTracker::new(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Handle for observing the number of live handlers.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Accept connections until `shutdown` fires.
    pub async fn run(self, shutdown: ShutdownSignal) {
        accept_loop(self.listener, self.log, self.tracker, shutdown).await;
    }
}

async fn accept_loop<A: Acceptor>(
    listener: A,
    log: Logger,
    tracker: ConnectionTracker,
    mut shutdown: ShutdownSignal,
) {
    let mut handlers: JoinSet<CloseReason> = JoinSet::new();

    log.info(
        "Accepting connections",
        &[("address", listener.local_addr().into())],
    );

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => spawn_handler(&mut handlers, stream, peer, &log, &tracker),
                Err(e) => {
                    metrics::record_connection_error("accept");
                    log.error(
                        "Failed to accept connection",
                        &[("error", e.to_string().into())],
                    );
                    // Errors such as EMFILE persist; back off instead of spinning.
                    tokio::select! {
                        _ = shutdown.recv() => break,
                        _ = tokio::time::sleep(ACCEPT_ERROR_PAUSE) => {}
                    }
                }
            },
            Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                reap(&log, joined);
            }
        }
    }

    let address = listener.local_addr();
    drop(listener);

    // Reap handlers that already finished so their panics are reported.
    while let Some(joined) = handlers.try_join_next() {
        reap(&log, joined);
    }
    log.info(
        "Listener closed",
        &[
            ("address", address.into()),
            ("active_connections", tracker.active_count().into()),
        ],
    );
    handlers.detach_all();
}

fn spawn_handler(
    handlers: &mut JoinSet<CloseReason>,
    stream: TcpStream,
    peer: SocketAddr,
    log: &Logger,
    tracker: &ConnectionTracker,
) {
    let guard = tracker.track();
    let id = guard.id();
    log.debug("Connection accepted", &[("conn", id.into()), ("peer", peer.into())]);

    let log = log.clone();
    handlers.spawn(async move {
        // Held until the handler finishes or unwinds.
        let _guard = guard;
        handle(stream, id, peer, log).await
    });
}

fn reap(log: &Logger, joined: Result<CloseReason, JoinError>) {
    match joined {
        Ok(_) => {}
        Err(e) if e.is_panic() => {
            metrics::record_handler_panic();
            log.error("Connection handler panicked", &[("error", e.to_string().into())]);
        }
        Err(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use crate::config::{ConfigHandle, ServiceConfig};
    use crate::lifecycle::Shutdown;
    use crate::net::handler::ACK;
    use crate::observability::logging::test_support::CaptureWriter;
    use crate::observability::logging::{LogPipeline, Sink};

    /// Fails the first `failures` accepts, then accepts for real.
    struct FlakyListener {
        inner: Listener,
        failures: AtomicUsize,
    }

    impl Acceptor for FlakyListener {
        fn accept(
            &self,
        ) -> impl Future<Output = Result<(TcpStream, SocketAddr), ListenerError>> + Send {
            let fail = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            async move {
                if fail {
                    return Err(ListenerError::Accept(io::Error::new(
                        io::ErrorKind::Other,
                        "too many open files",
                    )));
                }
                self.inner.accept().await
            }
        }

        fn local_addr(&self) -> SocketAddr {
            self.inner.local_addr()
        }
    }

    async fn flaky(failures: usize) -> FlakyListener {
        FlakyListener {
            inner: Listener::bind("127.0.0.1:0".parse().unwrap()).await.unwrap(),
            failures: AtomicUsize::new(failures),
        }
    }

    fn pipeline() -> (LogPipeline, CaptureWriter) {
        let writer = CaptureWriter::default();
        let pipeline = LogPipeline::with_sink(
            Sink::from_writer(writer.clone()),
            ConfigHandle::new(ServiceConfig::default()),
            1024,
        );
        (pipeline, writer)
    }

    #[tokio::test]
    async fn accept_errors_back_off_and_loop_keeps_serving() {
        let (pipeline, writer) = pipeline();
        let listener = flaky(3).await;
        let addr = Acceptor::local_addr(&listener);
        let shutdown = Shutdown::new();

        let started = Instant::now();
        let task = tokio::spawn(accept_loop(
            listener,
            pipeline.logger(),
            ConnectionTracker::new(),
            shutdown.subscribe(),
        ));

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"after errors\n").await.unwrap();
        let mut reply = [0u8; 4];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(&reply, ACK);
        assert!(started.elapsed() >= ACCEPT_ERROR_PAUSE * 3);

        shutdown.trigger();
        task.await.unwrap();

        pipeline.flush().await.unwrap();
        let out = writer.contents();
        assert_eq!(out.matches("[ERROR] Failed to accept connection").count(), 3);
        assert!(out.contains("message=\"after errors\""));
        pipeline.close().await;
    }

    #[tokio::test]
    async fn shutdown_interrupts_accept_back_off() {
        let (pipeline, writer) = pipeline();
        let listener = flaky(usize::MAX).await;
        let shutdown = Shutdown::new();
        let task = tokio::spawn(accept_loop(
            listener,
            pipeline.logger(),
            ConnectionTracker::new(),
            shutdown.subscribe(),
        ));

        tokio::time::sleep(ACCEPT_ERROR_PAUSE * 2 + ACCEPT_ERROR_PAUSE / 2).await;
        let triggered = Instant::now();
        shutdown.trigger();
        task.await.unwrap();
        assert!(triggered.elapsed() < ACCEPT_ERROR_PAUSE);

        pipeline.flush().await.unwrap();
        let out = writer.contents();
        // Persistent failures are paced, not spun.
        assert!(out.matches("Failed to accept connection").count() <= 4);
        assert!(out.contains("[INFO] Listener closed"));
        pipeline.close().await;
    }
}
