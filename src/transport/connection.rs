// MIT License - Copyright (c) 2026 Peter Wright
// Envisalink TPI client

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, BufReader};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::TpiConfig;
use crate::constants::MAX_FRAME_LEN;
use crate::error::{LoginFailure, Result, TpiError};
use crate::event::{EventSender, PanelEvent};
use crate::protocol::Command;
use crate::transport::command::CommandEngine;
use crate::transport::router::{Credentials, Router};
use crate::transport::EventSink;

/// Lifecycle of a TPI session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// Socket open, waiting for the gateway's password request
    Connecting,
    /// Password requested (`5053`)
    AwaitingPassword,
    /// Login sent, waiting for `5051`
    LoggingIn,
    /// Password accepted
    Established,
}

/// A TCP session with an Envisalink module.
///
/// Owns the read loop task. Dropping the connection aborts the task; call
/// [`Connection::disconnect`] first for an orderly close.
pub struct Connection {
    engine: Arc<CommandEngine>,
    reader_handle: Option<JoinHandle<()>>,
}

impl Connection {
    /// Dial the gateway and start the read loop.
    ///
    /// Returns as soon as the socket is open. Login proceeds in the
    /// background, driven by the gateway's `505` messages.
    pub async fn connect(
        config: &TpiConfig,
        sink: Arc<dyn EventSink>,
        event_tx: EventSender,
    ) -> Result<Self> {
        let address = config.address();
        info!("Connecting to Envisalink at {}", address);

        let stream = timeout(config.dial_timeout(), TcpStream::connect(&address))
            .await
            .map_err(|_| {
                error!("TCP connect to {} timed out", address);
                TpiError::ConnectionTimeout
            })?
            .map_err(|e| {
                error!("TCP connect failed: {}", e);
                TpiError::Io(e)
            })?;
        stream.set_nodelay(true)?;
        debug!("TCP socket connected");

        let (reader, writer) = stream.into_split();
        let credentials = Credentials {
            password: config.password.clone(),
            user_code: config.user_code.clone(),
        };
        Ok(Self::from_io(
            reader,
            writer,
            credentials,
            config,
            sink,
            event_tx,
        ))
    }

    /// Build a connection over an already-open byte stream.
    pub fn from_io<R, W>(
        reader: R,
        writer: W,
        credentials: Credentials,
        config: &TpiConfig,
        sink: Arc<dyn EventSink>,
        event_tx: EventSender,
    ) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let engine = Arc::new(CommandEngine::new(
            Box::new(writer),
            config.response_timeout(),
            event_tx.clone(),
        ));
        let router = Router::new(engine.clone(), sink, credentials);
        let reader_handle = spawn_reader_task(reader, router, engine.shutdown_signal());

        let _ = event_tx.send(PanelEvent::Connected);

        Self {
            engine,
            reader_handle: Some(reader_handle),
        }
    }

    /// Write a frame without waiting for a response.
    pub async fn write(&self, command: &Command) -> Result<()> {
        self.engine.write(command).await
    }

    /// Send a command and wait for its correlated response.
    pub async fn send(&self, command: &Command) -> Result<()> {
        self.engine.send(command).await
    }

    pub fn state(&self) -> ConnectionState {
        self.engine.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.engine.subscribe_state()
    }

    pub fn login_failure(&self) -> Option<LoginFailure> {
        self.engine.login_failure()
    }

    /// Close the socket. Safe to call repeatedly.
    pub async fn disconnect(&self) {
        if self.engine.close().await {
            info!("Disconnected from Envisalink");
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(handle) = self.reader_handle.take() {
            handle.abort();
        }
    }
}

/// Spawn the task that reads and routes inbound lines until the socket
/// closes or the engine shuts down.
fn spawn_reader_task<R>(
    reader: R,
    router: Router,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut line = Vec::with_capacity(128);

        loop {
            tokio::select! {
                read = read_frame(&mut reader, &mut line) => match read {
                    Ok(ReadOutcome::Eof) => {
                        debug!("Reader: connection closed");
                        break;
                    }
                    Ok(ReadOutcome::Line) => router.handle_line(&line).await,
                    Ok(ReadOutcome::Oversized) => {
                        warn!("Dropping line longer than {} bytes", MAX_FRAME_LEN);
                    }
                    Err(e) => {
                        warn!("Reader: read error: {}", e);
                        break;
                    }
                },
                _ = shutdown.changed() => {
                    debug!("Reader: shutdown requested");
                    break;
                }
            }
        }

        router.engine().close().await;
    })
}

#[derive(Debug, PartialEq, Eq)]
enum ReadOutcome {
    /// `line` holds one line, normally CRLF-terminated
    Line,
    /// A line over `MAX_FRAME_LEN` bytes was skipped up to its newline
    Oversized,
    Eof,
}

/// Read one line of at most `MAX_FRAME_LEN` bytes into `line`.
async fn read_frame<R>(reader: &mut R, line: &mut Vec<u8>) -> std::io::Result<ReadOutcome>
where
    R: AsyncBufRead + Unpin,
{
    line.clear();
    let n = (&mut *reader)
        .take(MAX_FRAME_LEN as u64)
        .read_until(b'\n', line)
        .await?;
    if n == 0 {
        return Ok(ReadOutcome::Eof);
    }
    if line.last() == Some(&b'\n') || n < MAX_FRAME_LEN {
        return Ok(ReadOutcome::Line);
    }

    line.clear();
    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            return Ok(ReadOutcome::Eof);
        }
        match buf.iter().position(|b| *b == b'\n') {
            Some(i) => {
                reader.consume(i + 1);
                return Ok(ReadOutcome::Oversized);
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
}
