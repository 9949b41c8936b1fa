//! Connection Handler Module
//!
//! This module handles individual client connections to FlashCache.
//! Each client gets its own task that runs a strictly sequential loop:
//! one command is framed, executed and answered before the next line is read.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  Frame command (+ data)      │
//!    │          │                   │
//!    │          ▼                   │
//!    │  Execute against the store   │
//!    │          │                   │
//!    │          ▼                   │
//!    │  Send reply (if any)         │
//!    │          │                   │
//!    │     [Loop back]              │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. EOF / read error / idle timeout
//!        │
//!        ▼
//! 5. Handler task ends
//! ```
//!
//! A failed reply write is logged and the reply abandoned; only read-side
//! failures end the loop.
//!
//! The handler is generic over its reader and writer. Servers build it from a
//! `TcpStream` with [`ConnectionHandler::new`]; [`ConnectionHandler::from_parts`]
//! accepts any buffered reader and writer.

use crate::commands::CommandHandler;
use crate::protocol::{CommandFramer, Frame, FrameError, Reply, DEFAULT_MAX_LINE};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

/// Initial read buffer capacity
const READ_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read from clients
    pub bytes_read: AtomicU64,
    /// Total reply bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: u64) {
        self.bytes_read.fetch_add(count, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Per-connection settings taken from the server configuration.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionConfig {
    /// Largest accepted data block
    pub max_item_size: usize,
    /// Close the connection if no command arrives within this time
    pub idle_timeout: Option<Duration>,
    /// Longest accepted line, terminator included
    pub max_line_length: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_item_size: crate::protocol::DEFAULT_MAX_PAYLOAD,
            idle_timeout: None,
            max_line_length: DEFAULT_MAX_LINE,
        }
    }
}

/// Handles a single client connection.
pub struct ConnectionHandler<R = BufReader<OwnedReadHalf>, W = OwnedWriteHalf> {
    framer: CommandFramer<R>,
    writer: W,
    addr: SocketAddr,
    command_handler: CommandHandler,
    idle_timeout: Option<Duration>,
    stats: Arc<ConnectionStats>,
    /// Reused reply buffer, written out whole for every reply
    reply_buf: Vec<u8>,
}

impl ConnectionHandler {
    /// Creates a handler for an accepted TCP connection.
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        command_handler: CommandHandler,
        config: ConnectionConfig,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        let (read_half, write_half) = stream.into_split();
        let reader = BufReader::with_capacity(READ_BUFFER_SIZE, read_half);

        Self::from_parts(reader, write_half, addr, command_handler, config, stats)
    }
}

impl<R, W> ConnectionHandler<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a handler over an already split reader and writer.
    pub fn from_parts(
        reader: R,
        writer: W,
        addr: SocketAddr,
        command_handler: CommandHandler,
        config: ConnectionConfig,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        let framer = CommandFramer::with_max_payload(reader, config.max_item_size)
            .with_max_line(config.max_line_length);

        Self {
            framer,
            writer,
            addr,
            command_handler,
            idle_timeout: config.idle_timeout,
            stats,
            reply_buf: Vec::with_capacity(256),
        }
    }

    /// Runs the connection until the client goes away or reading fails.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected"),
            Err(ConnectionError::Frame(FrameError::Io(io_err)))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection closed on error"),
        }

        self.stats.connection_closed();
        result
    }

    /// The frame-execute-reply loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            let before = self.framer.bytes_read();
            let next = self.next_frame().await;
            self.stats.bytes_read(self.framer.bytes_read() - before);

            let frame = match next? {
                Some(frame) => frame,
                None => return Ok(()),
            };

            let reply = self.command_handler.handle_frame(frame);
            self.stats.command_processed();

            if let Some(reply) = reply {
                self.send_reply(&reply).await;
            }
        }
    }

    async fn next_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        match self.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, self.framer.read_frame())
                .await
                .map_err(|_| ConnectionError::IdleTimeout(limit))?
                .map_err(ConnectionError::from),
            None => Ok(self.framer.read_frame().await?),
        }
    }

    /// Writes a reply. Failures are logged, not propagated.
    ///
    /// There is no buffered writer between `reply_buf` and the stream, so a
    /// failed reply never leaves bytes queued ahead of the next one.
    async fn send_reply(&mut self, reply: &Reply) {
        self.reply_buf.clear();
        reply.serialize_into(&mut self.reply_buf);

        let result = match self.writer.write_all(&self.reply_buf).await {
            Ok(()) => self.writer.flush().await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                self.stats.bytes_written(self.reply_buf.len());
                trace!(client = %self.addr, reply = %reply, bytes = self.reply_buf.len(), "Sent reply");
            }
            Err(e) => {
                warn!(client = %self.addr, error = %e, "Failed to write reply");
            }
        }
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Reading or framing the next command failed
    #[error("framing error: {0}")]
    Frame(#[from] FrameError),

    /// No command arrived within the idle timeout
    #[error("idle for more than {0:?}")]
    IdleTimeout(Duration),
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    command_handler: CommandHandler,
    config: ConnectionConfig,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr, command_handler, config, stats);
    // Already logged by run()
    let _ = handler.run().await;
}
