// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Connection engine: one TCP session to the receiver.
//!
//! The engine owns the socket. Writes go through a buffered writer on the
//! caller's task; a background reader task splits the inbound byte stream
//! into lines and hands them, one at a time, through a depth-1 channel to
//! whichever caller is awaiting a reply. Replies carry no request identity,
//! so callers must run one command/reply exchange at a time; `GqrxClient`
//! enforces that with a mutex around [`Connection::exchange`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

use gqrx_core::{ConnectionState, GqrxError, GqrxResult};
use gqrx_protocol::{GqrxCommand, LINE_TERMINATOR};

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const IO_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REPLY_LINE_BYTES: usize = 4 * 1024;
const REPLY_CHANNEL_DEPTH: usize = 1;

/// Deadlines applied to blocking operations. `None` waits forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub connect_timeout: Option<Duration>,
    pub io_timeout: Option<Duration>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Some(CONNECT_TIMEOUT),
            io_timeout: Some(IO_TIMEOUT),
        }
    }
}

struct Session {
    writer: BufWriter<OwnedWriteHalf>,
    replies: mpsc::Receiver<String>,
    shutdown_tx: watch::Sender<bool>,
    reader: JoinHandle<()>,
}

impl Session {
    fn stop(self) {
        let _ = self.shutdown_tx.send(true);
    }
}

pub struct Connection {
    addr: String,
    options: ConnectionOptions,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    session: Option<Session>,
    /// Reply lines the receiver still has to send for commands already
    /// written. Lines owed to abandoned requests precede any newer reply on
    /// the wire and are dropped before reading it.
    owed_lines: usize,
    /// Set while a command write is underway. Still set on entry means the
    /// write future was dropped part way and the stream position is lost.
    write_pending: bool,
}

impl Connection {
    pub fn new(addr: impl Into<String>, options: ConnectionOptions) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            addr: addr.into(),
            options,
            state_tx: Arc::new(state_tx),
            session: None,
            owed_lines: 0,
            write_pending: false,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn options(&self) -> ConnectionOptions {
        self.options
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Dial the receiver and start the background reader.
    pub async fn connect(&mut self) -> GqrxResult<()> {
        match self.state() {
            ConnectionState::Disconnected => {}
            ConnectionState::Connected => return Err(GqrxError::connection("already connected")),
            ConnectionState::Closed => return Err(GqrxError::connection("connection closed")),
        }

        info!("Connecting to gqrx at {}", self.addr);
        let stream = with_deadline(self.options.connect_timeout, TcpStream::connect(&self.addr))
            .await?
            .map_err(|e| GqrxError::connection(format!("connect to {} failed: {e}", self.addr)))?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("set_nodelay failed: {}", e);
        }
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| self.addr.clone());

        let (reader, writer) = stream.into_split();
        let (reply_tx, reply_rx) = mpsc::channel(REPLY_CHANNEL_DEPTH);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // Publish Connected before the reader can publish Closed.
        self.state_tx.send_replace(ConnectionState::Connected);
        let reader = tokio::spawn(read_loop(
            reader,
            reply_tx,
            shutdown_rx,
            Arc::clone(&self.state_tx),
            peer.clone(),
        ));

        self.session = Some(Session {
            writer: BufWriter::new(writer),
            replies: reply_rx,
            shutdown_tx,
            reader,
        });
        self.owed_lines = 0;
        self.write_pending = false;
        info!("Connected to gqrx at {}", peer);
        Ok(())
    }

    /// Send the close command, shut the socket down and stop the reader.
    ///
    /// The connection is `Closed` afterwards even when an error is returned.
    pub async fn disconnect(&mut self) -> GqrxResult<()> {
        if !self.state().is_connected() {
            self.close_session();
            return Err(GqrxError::not_connected());
        }
        if self.write_pending {
            self.abandon_interrupted_write();
            return Err(interrupted_write());
        }
        let Some(mut session) = self.session.take() else {
            self.close_session();
            return Err(GqrxError::not_connected());
        };

        let close_line = GqrxCommand::Close.to_line();
        debug!("-> {}", close_line);
        let write_result =
            write_line(&mut session.writer, &close_line, self.options.io_timeout).await;
        let shutdown_result = shutdown_writer(&mut session.writer, self.options.io_timeout).await;

        let _ = session.shutdown_tx.send(true);
        if let Err(e) = (&mut session.reader).await {
            debug!("reader task ended abnormally: {}", e);
        }
        self.state_tx.send_replace(ConnectionState::Closed);
        info!("Disconnected from gqrx at {}", self.addr);

        write_result?;
        shutdown_result
    }

    /// Write one command line followed by CR LF and flush.
    ///
    /// A write that times out, or whose future is dropped before it
    /// finishes, leaves the stream in an unknown position. The connection is
    /// closed in that case; the dropped case is noticed on the next call.
    pub async fn send_command(&mut self, line: &str) -> GqrxResult<()> {
        self.ensure_connected()?;
        let io_timeout = self.options.io_timeout;
        let session = self.session.as_mut().ok_or_else(GqrxError::not_connected)?;

        debug!("-> {}", line);
        self.write_pending = true;
        let result = write_line(&mut session.writer, line, io_timeout).await;
        self.write_pending = false;
        if matches!(result, Err(GqrxError::Timeout(_))) {
            warn!("write to {} timed out, closing connection", self.addr);
            self.close_session();
        }
        result
    }

    /// Await the next reply line from the reader task.
    ///
    /// Lines already delivered before the peer went away are still returned;
    /// once the reader has exited and the slot is empty this fails with a
    /// connection error.
    pub async fn read_reply(&mut self) -> GqrxResult<String> {
        let io_timeout = self.options.io_timeout;
        let session = self.session.as_mut().ok_or_else(GqrxError::not_connected)?;

        match with_deadline(io_timeout, session.replies.recv()).await? {
            Some(line) => {
                debug!("<- {}", line);
                Ok(line)
            }
            None => {
                self.close_session();
                Err(GqrxError::connection("connection closed by remote"))
            }
        }
    }

    /// Run one full command/reply exchange and return the reply lines.
    ///
    /// The reply lines are counted as owed as soon as the command is on the
    /// wire and paid off one by one as they arrive. A timed out or dropped
    /// exchange therefore leaves its remaining lines to be discarded by the
    /// next one.
    pub async fn exchange(&mut self, cmd: &GqrxCommand) -> GqrxResult<Vec<String>> {
        let expected = cmd.reply_lines();
        self.send_command(&cmd.to_line()).await?;
        self.owed_lines += expected;

        while self.owed_lines > expected {
            let stale = self.read_reply().await?;
            self.owed_lines -= 1;
            debug!("discarding stale reply: {}", stale);
        }

        let mut lines = Vec::with_capacity(expected);
        while lines.len() < expected {
            let line = self.read_reply().await?;
            self.owed_lines -= 1;
            lines.push(line);
        }
        Ok(lines)
    }

    fn ensure_connected(&mut self) -> GqrxResult<()> {
        if self.write_pending {
            self.abandon_interrupted_write();
            return Err(interrupted_write());
        }
        if self.state().is_connected() && self.session.is_some() {
            return Ok(());
        }
        self.close_session();
        Err(GqrxError::not_connected())
    }

    fn abandon_interrupted_write(&mut self) {
        warn!(
            "write to {} was interrupted, closing connection",
            self.addr
        );
        self.write_pending = false;
        self.close_session();
    }

    /// Drop the session (if any) and move to `Closed` unless never connected.
    fn close_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.stop();
            self.state_tx.send_replace(ConnectionState::Closed);
        } else if self.state().is_connected() {
            self.state_tx.send_replace(ConnectionState::Closed);
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.stop();
        }
    }
}

async fn with_deadline<F: Future>(limit: Option<Duration>, fut: F) -> GqrxResult<F::Output> {
    match limit {
        Some(limit) => time::timeout(limit, fut)
            .await
            .map_err(|_| GqrxError::Timeout(limit)),
        None => Ok(fut.await),
    }
}

fn interrupted_write() -> GqrxError {
    GqrxError::connection("connection closed after an interrupted write")
}

async fn write_line<W: AsyncWrite + Unpin>(
    writer: &mut W,
    line: &str,
    io_timeout: Option<Duration>,
) -> GqrxResult<()> {
    let payload = format!("{line}{LINE_TERMINATOR}");
    with_deadline(io_timeout, async {
        writer.write_all(payload.as_bytes()).await?;
        writer.flush().await
    })
    .await?
    .map_err(|e| GqrxError::protocol(format!("write failed: {e}")))
}

async fn shutdown_writer<W: AsyncWrite + Unpin>(
    writer: &mut W,
    io_timeout: Option<Duration>,
) -> GqrxResult<()> {
    with_deadline(io_timeout, writer.shutdown())
        .await?
        .map_err(|e| GqrxError::connection(format!("socket close failed: {e}")))
}

async fn read_loop(
    reader: OwnedReadHalf,
    replies: mpsc::Sender<String>,
    mut shutdown_rx: watch::Receiver<bool>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    peer: String,
) {
    let mut reader = BufReader::new(reader);

    loop {
        let read = tokio::select! {
            _ = shutdown_rx.changed() => {
                debug!("reader for {} stopping", peer);
                break;
            }
            read = read_limited_line(&mut reader, MAX_REPLY_LINE_BYTES) => read,
        };

        let line = match read {
            Ok(Some(line)) => strip_terminator(&line).to_string(),
            Ok(None) => {
                debug!("gqrx at {} closed the connection", peer);
                break;
            }
            Err(e) => {
                warn!("read from gqrx at {} failed: {}", peer, e);
                break;
            }
        };

        tokio::select! {
            _ = shutdown_rx.changed() => break,
            sent = replies.send(line) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }

    state_tx.send_if_modified(|state| {
        if *state == ConnectionState::Connected {
            *state = ConnectionState::Closed;
            true
        } else {
            false
        }
    });
}

fn strip_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

async fn read_limited_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    max_bytes: usize,
) -> std::io::Result<Option<String>> {
    let mut line = Vec::with_capacity(64);
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            if line.is_empty() {
                return Ok(None);
            }
            return into_text(line).map(Some);
        }

        if let Some(pos) = available.iter().position(|b| *b == b'\n') {
            let chunk = &available[..=pos];
            if line.len() + chunk.len() > max_bytes {
                return Err(line_too_long(max_bytes));
            }
            line.extend_from_slice(chunk);
            reader.consume(pos + 1);
            return into_text(line).map(Some);
        }

        if line.len() + available.len() > max_bytes {
            return Err(line_too_long(max_bytes));
        }

        line.extend_from_slice(available);
        let consumed = available.len();
        reader.consume(consumed);
    }
}

fn into_text(line: Vec<u8>) -> std::io::Result<String> {
    String::from_utf8(line).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("line is not valid UTF-8: {e}"),
        )
    })
}

fn line_too_long(max_bytes: usize) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("line exceeds maximum size of {max_bytes} bytes"),
    )
}
