// MIT License - Copyright (c) 2026 Peter Wright
// Envisalink TPI client

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex as StdMutex, MutexGuard, PoisonError};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{oneshot, watch, Mutex};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

use crate::constants::code;
use crate::error::{LoginFailure, RejectReason, Result, TpiError};
use crate::event::{EventSender, PanelEvent};
use crate::protocol::Command;
use crate::transport::connection::ConnectionState;

/// Write half of the transport, boxed so tests can substitute in-memory pipes.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// The waiter for the one outstanding command.
struct Pending {
    token: u64,
    /// Code of the command awaiting a response; an Ack names it in its data
    code: String,
    tx: oneshot::Sender<Command>,
}

/// Serialises writes and correlates each command with its response.
///
/// The wire protocol carries no request identifier: whichever Ack or error
/// arrives next answers the command that was written last. The engine makes
/// that safe by allowing a single command in flight; later callers queue on
/// `in_flight` in FIFO order until the previous response or timeout.
pub struct CommandEngine {
    /// Write half; `None` once closed
    writer: Mutex<Option<BoxedWriter>>,
    /// Held for the whole write + wait of a `send`
    in_flight: Mutex<()>,
    /// Response slot for the current `send`
    pending: StdMutex<Option<Pending>>,
    next_token: AtomicU64,
    response_timeout: Duration,
    state: watch::Sender<ConnectionState>,
    shutdown: watch::Sender<bool>,
    login_failure: StdMutex<Option<LoginFailure>>,
    event_tx: EventSender,
}

impl CommandEngine {
    pub fn new(writer: BoxedWriter, response_timeout: Duration, event_tx: EventSender) -> Self {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        let (shutdown, _) = watch::channel(false);
        Self {
            writer: Mutex::new(Some(writer)),
            in_flight: Mutex::new(()),
            pending: StdMutex::new(None),
            next_token: AtomicU64::new(1),
            response_timeout,
            state,
            shutdown,
            login_failure: StdMutex::new(None),
            event_tx,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!("Connection state {:?} -> {:?}", previous, state);
        }
    }

    /// Receiver that changes to `true` when the engine closes.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn event_sender(&self) -> &EventSender {
        &self.event_tx
    }

    /// Reason the last login attempt failed, if it did.
    pub fn login_failure(&self) -> Option<LoginFailure> {
        *lock(&self.login_failure)
    }

    pub fn record_login_failure(&self, failure: LoginFailure) {
        *lock(&self.login_failure) = Some(failure);
    }

    /// Write one frame without waiting for a response.
    pub async fn write(&self, command: &Command) -> Result<()> {
        let frame = command.to_frame();
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TpiError::Disconnected)?;
        debug!("-> {}", command);
        writer.write_all(&frame).await.map_err(|e| {
            error!("Failed to write command: {}", e);
            TpiError::Io(e)
        })?;
        writer.flush().await?;
        Ok(())
    }

    /// Send a command and wait for its Ack, CommandError or SystemError.
    pub async fn send(&self, command: &Command) -> Result<()> {
        let _turn = self.in_flight.lock().await;

        if self.state() == ConnectionState::Disconnected {
            return Err(TpiError::Disconnected);
        }

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        *lock(&self.pending) = Some(Pending {
            token,
            code: command.code.clone(),
            tx,
        });

        if let Err(e) = self.write(command).await {
            self.clear_pending(token);
            return Err(e);
        }

        match timeout(self.response_timeout, rx).await {
            Ok(Ok(response)) => {
                debug!("Response for {} (token {}): {}", command.name(), token, response);
                interpret_response(&response)
            }
            // Slot dropped by `close`
            Ok(Err(_)) => Err(TpiError::Disconnected),
            Err(_) => {
                self.clear_pending(token);
                debug!("Command timeout: {}", command);
                Err(TpiError::Timeout {
                    command: command.to_string(),
                })
            }
        }
    }

    /// Hand a response to the outstanding `send`, if any.
    ///
    /// An Ack for a different code (e.g. for a `200` code reply written while
    /// a command is pending) is dropped and leaves the waiter in place.
    pub fn resolve(&self, response: Command) {
        let mut pending = lock(&self.pending);
        if response.code == code::ACK
            && pending.as_ref().is_some_and(|p| p.code != response.data)
        {
            debug!("Dropping Ack for {} while another command is pending", response.data);
            return;
        }
        match pending.take() {
            Some(pending) => {
                if pending.tx.send(response).is_err() {
                    debug!("Waiter for token {} already gone", pending.token);
                }
            }
            None => debug!("Dropping response with no waiter: {}", response),
        }
    }

    fn clear_pending(&self, token: u64) {
        let mut pending = lock(&self.pending);
        if pending.as_ref().is_some_and(|p| p.token == token) {
            *pending = None;
        }
    }

    /// Close the socket and stop the read loop.
    ///
    /// Returns `false` if the engine was already closed; only the first call
    /// emits `PanelEvent::Disconnected`.
    pub async fn close(&self) -> bool {
        let previous = self.state.send_replace(ConnectionState::Disconnected);
        if previous == ConnectionState::Disconnected {
            return false;
        }
        info!("Closing connection");
        self.shutdown.send_replace(true);
        lock(&self.pending).take();

        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.shutdown().await {
                debug!("Socket shutdown: {}", e);
            }
        }

        let _ = self.event_tx.send(PanelEvent::Disconnected);
        true
    }
}

/// Map a response message to the outcome of the command it answers.
pub fn interpret_response(response: &Command) -> Result<()> {
    match response.code.as_str() {
        code::ACK => Ok(()),
        code::COMMAND_ERROR => Err(TpiError::CommandError),
        code::SYSTEM_ERROR => match RejectReason::from_sub_code(&response.data) {
            None => Ok(()),
            Some(reason) => {
                warn!("Command rejected: {}", reason);
                Err(TpiError::CommandRejected(reason))
            }
        },
        other => Err(TpiError::UnexpectedResponse {
            code: other.to_string(),
        }),
    }
}

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::event_channel;
    use std::sync::Arc;
    use tokio::io::{duplex, AsyncBufReadExt, BufReader};

    fn engine_with_peer(
        response_timeout: Duration,
    ) -> (Arc<CommandEngine>, BufReader<tokio::io::DuplexStream>) {
        let (client, server) = duplex(1024);
        let (event_tx, _) = event_channel(16);
        let engine = Arc::new(CommandEngine::new(
            Box::new(client),
            response_timeout,
            event_tx,
        ));
        (engine, BufReader::new(server))
    }

    async fn read_line(peer: &mut BufReader<tokio::io::DuplexStream>) -> String {
        let mut line = String::new();
        peer.read_line(&mut line).await.unwrap();
        line
    }

    #[test]
    fn test_interpret_response() {
        assert!(interpret_response(&Command::new("500", "030")).is_ok());
        assert!(interpret_response(&Command::new("502", "000")).is_ok());
        assert!(matches!(
            interpret_response(&Command::new("501", "")),
            Err(TpiError::CommandError)
        ));
        assert!(matches!(
            interpret_response(&Command::new("502", "023")),
            Err(TpiError::CommandRejected(RejectReason::SystemNotArmed))
        ));
        match interpret_response(&Command::new("502", "099")) {
            Err(TpiError::CommandRejected(RejectReason::Unknown(code))) => assert_eq!(code, "099"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_resolves_on_ack() {
        let (engine, mut peer) = engine_with_peer(Duration::from_secs(1));
        let sender = engine.clone();
        let task = tokio::spawn(async move { sender.send(&Command::poll()).await });

        assert_eq!(read_line(&mut peer).await, "00090\r\n");
        engine.resolve(Command::new("500", "000"));
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_send_surfaces_system_error() {
        let (engine, mut peer) = engine_with_peer(Duration::from_secs(1));
        let sender = engine.clone();
        let task = tokio::spawn(async move { sender.send(&Command::arm(1, crate::ArmMode::Away)).await });

        assert_eq!(read_line(&mut peer).await, "0301C4\r\n");
        engine.resolve(Command::new("502", "024"));
        assert!(matches!(
            task.await.unwrap(),
            Err(TpiError::CommandRejected(RejectReason::SystemNotReady))
        ));
    }

    #[tokio::test]
    async fn test_send_times_out() {
        let (engine, mut peer) = engine_with_peer(Duration::from_millis(100));
        let result = engine.send(&Command::status_report()).await;
        assert!(matches!(result, Err(TpiError::Timeout { .. })));
        assert_eq!(read_line(&mut peer).await, "00191\r\n");

        // A late response finds no waiter and is dropped.
        engine.resolve(Command::new("500", "001"));
        assert!(lock(&engine.pending).is_none());
    }

    #[tokio::test]
    async fn test_overlapping_sends_queue() {
        let (engine, mut peer) = engine_with_peer(Duration::from_secs(1));
        let first = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.send(&Command::poll()).await })
        };
        assert_eq!(read_line(&mut peer).await, "00090\r\n");

        let second = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.send(&Command::status_report()).await })
        };
        // The second frame is held back until the first is answered.
        tokio::task::yield_now().await;
        engine.resolve(Command::new("500", "000"));
        assert!(first.await.unwrap().is_ok());

        assert_eq!(read_line(&mut peer).await, "00191\r\n");
        engine.resolve(Command::new("501", ""));
        assert!(matches!(second.await.unwrap(), Err(TpiError::CommandError)));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (engine, _peer) = engine_with_peer(Duration::from_secs(1));
        let mut events = engine.event_sender().subscribe();

        assert!(engine.close().await);
        assert!(!engine.close().await);
        assert_eq!(engine.state(), ConnectionState::Disconnected);
        assert!(*engine.shutdown_signal().borrow());

        assert!(matches!(events.try_recv(), Ok(PanelEvent::Disconnected)));
        assert!(events.try_recv().is_err());

        assert!(matches!(
            engine.send(&Command::poll()).await,
            Err(TpiError::Disconnected)
        ));
        assert!(matches!(
            engine.write(&Command::poll()).await,
            Err(TpiError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn test_mismatched_ack_keeps_waiter() {
        let (engine, mut peer) = engine_with_peer(Duration::from_secs(1));
        let sender = engine.clone();
        let task = tokio::spawn(async move { sender.send(&Command::arm(1, crate::ArmMode::Away)).await });

        assert_eq!(read_line(&mut peer).await, "0301C4\r\n");
        engine.resolve(Command::new("500", "200"));
        assert!(lock(&engine.pending).is_some());
        engine.resolve(Command::new("500", "030"));
        assert!(task.await.unwrap().is_ok());
    }
}
