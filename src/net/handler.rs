//! Per-connection line/acknowledge loop.
//!
//! Each accepted socket is owned by exactly one [`Connection`]. It reads
//! `\n`-terminated lines, logs each one at INFO and answers with [`ACK`].
//! Any read or write failure, including the peer closing the socket or a line
//! longer than [`MAX_LINE_BYTES`], moves the connection to `Closing`; the
//! socket is released when `run` returns.

use std::net::SocketAddr;

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf,
    WriteHalf,
};

use crate::net::connection::{ConnectionId, ConnectionState};
use crate::observability::logging::{Level, Logger};
use crate::observability::metrics;

/// Reply sent for every received line.
pub const ACK: &[u8] = b"ACK\n";

/// Longest accepted line, terminator included. A peer that sends more
/// without a `\n` is disconnected.
pub const MAX_LINE_BYTES: u64 = 1024 * 1024;

/// Why a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// EOF at a line boundary.
    PeerClosed,
    /// EOF after a partial line, which is discarded.
    PeerClosedMidLine,
    /// [`MAX_LINE_BYTES`] read without a line terminator.
    LineTooLong,
    ReadError,
    WriteError,
}

/// One accepted socket and its read/write state.
pub struct Connection<S> {
    id: ConnectionId,
    peer: SocketAddr,
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    state: ConnectionState,
    log: Logger,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, id: ConnectionId, peer: SocketAddr, log: Logger) -> Self {
        let (read_half, writer) = tokio::io::split(stream);
        Self {
            id,
            peer,
            reader: BufReader::new(read_half),
            writer,
            state: ConnectionState::Open,
            log,
        }
    }

    /// Serve the connection until it closes.
    pub async fn run(mut self) -> CloseReason {
        let reason = self.serve().await;
        self.advance(ConnectionState::Closing);

        // Best effort FIN; the socket is dropped with `self` either way.
        let _ = self.writer.shutdown().await;
        if self.log.enabled(Level::Debug) {
            self.log.debug(
                "Connection closed",
                &[("conn", self.id.into()), ("reason", format!("{reason:?}").into())],
            );
        }
        reason
    }

    async fn serve(&mut self) -> CloseReason {
        let mut line = Vec::new();
        loop {
            self.advance(ConnectionState::Reading);
            line.clear();

            let mut limited = (&mut self.reader).take(MAX_LINE_BYTES);
            match limited.read_until(b'\n', &mut line).await {
                Ok(0) => return CloseReason::PeerClosed,
                Ok(n) if line.last() != Some(&b'\n') && n as u64 == MAX_LINE_BYTES => {
                    metrics::record_connection_error("read");
                    self.log.warn(
                        "Line exceeds limit, closing connection",
                        &[
                            ("conn", self.id.into()),
                            ("peer", self.peer.into()),
                            ("limit", MAX_LINE_BYTES.into()),
                        ],
                    );
                    return CloseReason::LineTooLong;
                }
                Ok(n) if line.last() != Some(&b'\n') => {
                    self.log.debug(
                        "Peer closed mid-line, discarding partial message",
                        &[("conn", self.id.into()), ("bytes", n.into())],
                    );
                    return CloseReason::PeerClosedMidLine;
                }
                Ok(_) => {}
                Err(e) => {
                    metrics::record_connection_error("read");
                    self.log.error(
                        "Failed to read data",
                        &[
                            ("conn", self.id.into()),
                            ("peer", self.peer.into()),
                            ("error", e.to_string().into()),
                        ],
                    );
                    return CloseReason::ReadError;
                }
            }

            let message = String::from_utf8_lossy(&line);
            self.log.info(
                "Received",
                &[
                    ("conn", self.id.into()),
                    ("peer", self.peer.into()),
                    ("message", message.trim().into()),
                ],
            );
            metrics::record_message();

            self.advance(ConnectionState::Acknowledging);
            if let Err(e) = self.writer.write_all(ACK).await {
                metrics::record_connection_error("write");
                self.log.error(
                    "Failed to send acknowledgment",
                    &[
                        ("conn", self.id.into()),
                        ("peer", self.peer.into()),
                        ("error", e.to_string().into()),
                    ],
                );
                return CloseReason::WriteError;
            }
        }
    }

    fn advance(&mut self, next: ConnectionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }
}

/// Serve one accepted stream to completion.
pub async fn handle<S>(stream: S, id: ConnectionId, peer: SocketAddr, log: Logger) -> CloseReason
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    Connection::new(stream, id, peer, log).run().await
}
