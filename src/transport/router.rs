// MIT License - Copyright (c) 2026 Peter Wright
// Envisalink TPI client

//! Dispatch of inbound messages, including the login handshake.
//!
//! ```text
//! gateway                      client
//!   5053  (password request) ->
//!                            <- 005<password>
//!   500005 / 5051 (accepted) ->
//!                            <- 001 (status report)
//!   609.. 650.. 652.. 510    ->  status burst, keypad last
//! ```

use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};

use crate::codec;
use crate::constants::code;
use crate::devices::partition::parse_partition_id;
use crate::devices::{parse_partition_event, parse_zone_event, KeypadStatus};
use crate::error::LoginFailure;
use crate::event::PanelEvent;
use crate::protocol::Command;
use crate::transport::command::CommandEngine;
use crate::transport::connection::ConnectionState;
use crate::transport::EventSink;

/// Secrets the router needs to answer the gateway on its own.
#[derive(Clone)]
pub struct Credentials {
    pub password: String,
    pub user_code: String,
}

/// Routes decoded messages from the read loop.
pub struct Router {
    engine: Arc<CommandEngine>,
    sink: Arc<dyn EventSink>,
    credentials: Credentials,
}

impl Router {
    pub fn new(engine: Arc<CommandEngine>, sink: Arc<dyn EventSink>, credentials: Credentials) -> Self {
        Self {
            engine,
            sink,
            credentials,
        }
    }

    pub fn engine(&self) -> &Arc<CommandEngine> {
        &self.engine
    }

    /// Decode and route one raw line. Malformed lines are logged and dropped.
    pub async fn handle_line(&self, line: &[u8]) {
        match codec::decode(line) {
            Ok(cmd) => self.route(cmd).await,
            Err(e) => warn!(
                "Dropping malformed frame {:?}: {}",
                String::from_utf8_lossy(line).trim_end(),
                e
            ),
        }
    }

    /// Dispatch a decoded message by code.
    pub async fn route(&self, cmd: Command) {
        debug!("<- {}", cmd);
        if cmd.is_response() {
            self.engine.resolve(cmd);
            return;
        }
        match cmd.code.as_str() {
            code::LOGIN_STATUS => self.handle_login_status(&cmd).await,
            code::ZONE_ALARM
            | code::ZONE_TAMPER
            | code::ZONE_FAULT
            | code::ZONE_OPEN
            | code::ZONE_RESTORED => match parse_zone_event(&cmd) {
                Some((zone_id, status)) => self.sink.apply_zone_event(zone_id, status),
                None => warn!("Ignoring zone event with bad zone field: {}", cmd),
            },
            code::PARTITION_READY
            | code::PARTITION_NOT_READY
            | code::PARTITION_ARMED
            | code::PARTITION_ALARM
            | code::PARTITION_DISARMED
            | code::PARTITION_EXIT_DELAY
            | code::PARTITION_ENTRY_DELAY
            | code::PARTITION_FAILED_TO_ARM
            | code::PARTITION_BUSY => match parse_partition_event(&cmd) {
                Some((partition_id, status)) => {
                    self.sink.apply_partition_event(partition_id, status)
                }
                None => warn!("Ignoring partition event with bad data: {}", cmd),
            },
            code::KEYPAD_LED => match KeypadStatus::from_hex(&cmd.data) {
                Some(status) => self.sink.apply_keypad_event(status),
                None => warn!("Ignoring keypad LED update with bad data: {}", cmd),
            },
            code::TROUBLE_ON | code::TROUBLE_OFF => match parse_partition_id(&cmd.data) {
                Some(partition_id) => self
                    .sink
                    .apply_trouble_event(partition_id, cmd.code == code::TROUBLE_ON),
                None => warn!("Ignoring trouble update with bad data: {}", cmd),
            },
            // The panel asks for the code while the command that needs it is
            // still pending, so the reply bypasses the in-flight slot.
            code::CODE_REQUIRED => {
                info!("Code requested, sending response");
                let reply = Command::code(&self.credentials.user_code);
                if let Err(e) = self.engine.write(&reply).await {
                    warn!("{} failed: {}", reply.name(), e);
                }
            }
            code::PARTITION_SPECIAL_CLOSING => trace!("Ignoring {}", cmd),
            _ => warn!("Unsupported command: {}", cmd),
        }
    }

    async fn handle_login_status(&self, cmd: &Command) {
        match cmd.data.chars().next() {
            Some('3') => {
                info!("Password requested, logging in");
                self.engine.set_state(ConnectionState::AwaitingPassword);
                self.spawn_send(
                    Command::login(&self.credentials.password),
                    Some(ConnectionState::LoggingIn),
                );
            }
            Some('1') => {
                info!("Password accepted, session established");
                self.engine.set_state(ConnectionState::Established);
                self.sink.apply_login_accepted();
                let _ = self.engine.event_sender().send(PanelEvent::LoginAccepted);
                self.spawn_send(Command::status_report(), None);
            }
            Some('0') => self.fail_login(LoginFailure::BadPassword).await,
            Some('2') => self.fail_login(LoginFailure::TimedOut).await,
            _ => warn!("Unknown login status: {}", cmd),
        }
    }

    async fn fail_login(&self, failure: LoginFailure) {
        error!("Login failed: {}", failure);
        self.engine.record_login_failure(failure);
        let _ = self
            .engine
            .event_sender()
            .send(PanelEvent::LoginRejected(failure));
        self.engine.close().await;
    }

    /// Send a reply from its own task so the read loop keeps draining the
    /// socket while the reply waits for its Ack.
    fn spawn_send(&self, cmd: Command, state_before: Option<ConnectionState>) {
        let engine = self.engine.clone();
        tokio::spawn(async move {
            if let Some(state) = state_before {
                engine.set_state(state);
            }
            if let Err(e) = engine.send(&cmd).await {
                warn!("{} failed: {}", cmd.name(), e);
            }
        });
    }
}
