// MIT License - Copyright (c) 2026 Peter Wright
// Envisalink TPI client

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{Local, NaiveDateTime};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{ArmMode, TpiConfig};
use crate::constants::PARTITION_COUNT;
use crate::devices::{KeypadStatus, PartitionStatus, ZoneStatus};
use crate::error::{Result, TpiError};
use crate::event::{event_channel, EventReceiver, EventSender, PanelEvent};
use crate::protocol::Command;
use crate::state::{PanelState, PanelStatus};
use crate::transport::{Connection, ConnectionState};

/// The main public API for talking to a DSC panel through an Envisalink.
///
/// # Example
///
/// ```no_run
/// use envisalink_tpi::{ArmMode, Panel, TpiConfig};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = TpiConfig::builder()
///         .host("192.168.0.100")
///         .password("user")
///         .user_code("1234")
///         .build();
///
///     let panel = Panel::new(config);
///     panel.on_zone_event(|zone, status| println!("Zone {}: {}", zone, status));
///     panel.connect().await?;
///
///     panel.arm(1, ArmMode::Stay).await?;
///
///     tokio::signal::ctrl_c().await?;
///     panel.disconnect().await;
///     Ok(())
/// }
/// ```
pub struct Panel {
    config: TpiConfig,
    state: Arc<PanelState>,
    event_tx: EventSender,
    connection: RwLock<Option<Arc<Connection>>>,
}

impl Panel {
    pub fn new(config: TpiConfig) -> Self {
        let (event_tx, _) = event_channel(config.event_capacity);
        Self {
            state: Arc::new(PanelState::new(event_tx.clone())),
            event_tx,
            connection: RwLock::new(None),
            config,
        }
    }

    pub fn config(&self) -> &TpiConfig {
        &self.config
    }

    /// Subscribe to panel events.
    pub fn subscribe(&self) -> EventReceiver {
        self.event_tx.subscribe()
    }

    /// Register the zone callback, replacing any previous one.
    pub fn on_zone_event<F>(&self, handler: F)
    where
        F: Fn(u32, ZoneStatus) + Send + Sync + 'static,
    {
        self.state.set_zone_handler(Arc::new(handler));
    }

    /// Register the partition callback, replacing any previous one.
    pub fn on_partition_event<F>(&self, handler: F)
    where
        F: Fn(u32, PartitionStatus) + Send + Sync + 'static,
    {
        self.state.set_partition_handler(Arc::new(handler));
    }

    /// Register the keypad LED callback, replacing any previous one.
    pub fn on_keypad_event<F>(&self, handler: F)
    where
        F: Fn(KeypadStatus) + Send + Sync + 'static,
    {
        self.state.set_keypad_handler(Arc::new(handler));
    }

    /// Connect, log in and wait for the initial status burst.
    ///
    /// Returns once the first keypad LED update after login has been applied.
    /// Any previous session is closed first.
    pub async fn connect(&self) -> Result<()> {
        self.disconnect().await;

        let sync_rx = self.state.begin_sync();
        let connection = Arc::new(
            Connection::connect(&self.config, self.state.clone(), self.event_tx.clone()).await?,
        );
        *self
            .connection
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(connection.clone());

        let mut state_rx = connection.subscribe_state();
        let closed = async move {
            let _ = state_rx
                .wait_for(|s| *s == ConnectionState::Disconnected)
                .await;
        };

        tokio::select! {
            synced = sync_rx => {
                if synced.is_err() {
                    self.take_connection();
                    return Err(TpiError::Disconnected);
                }
            }
            _ = closed => {
                self.take_connection();
                return Err(match connection.login_failure() {
                    Some(failure) => TpiError::LoginRejected(failure),
                    None => TpiError::Disconnected,
                });
            }
            _ = sleep(self.config.sync_timeout()) => {
                warn!("No status sync within {:?}, closing", self.config.sync_timeout());
                self.disconnect().await;
                return Err(TpiError::SyncTimeout);
            }
        }

        self.state.set_ready(true);
        let _ = self.event_tx.send(PanelEvent::Ready);
        info!("Panel ready");

        if self.config.set_clock_on_connect {
            if let Err(e) = self.set_time(Local::now().naive_local()).await {
                warn!("Failed to set panel clock: {}", e);
            }
        }
        Ok(())
    }

    /// Close the session. Safe to call when already disconnected.
    pub async fn disconnect(&self) {
        self.state.set_ready(false);
        if let Some(connection) = self.take_connection() {
            connection.disconnect().await;
        }
    }

    /// Wait until the current session ends, from either side.
    ///
    /// Returns immediately when there is no session.
    pub async fn closed(&self) {
        let Ok(connection) = self.connection() else {
            return;
        };
        let mut state_rx = connection.subscribe_state();
        let _ = state_rx
            .wait_for(|s| *s == ConnectionState::Disconnected)
            .await;
    }

    /// Whether the initial sync has completed on a live session.
    pub fn is_ready(&self) -> bool {
        self.state.is_ready() && self.connection_state() == ConnectionState::Established
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection()
            .map(|c| c.state())
            .unwrap_or(ConnectionState::Disconnected)
    }

    /// Point-in-time copy of zone, partition and keypad status.
    pub fn status(&self) -> PanelStatus {
        self.state.status()
    }

    /// Arm a partition (1-8). Returns on Ack; the armed state arrives later
    /// as a partition event.
    pub async fn arm(&self, partition: u32, mode: ArmMode) -> Result<()> {
        check_partition(partition)?;
        info!("Arming partition {} ({:?})", partition, mode);
        self.connection()?
            .send(&Command::arm(partition, mode))
            .await
    }

    /// Disarm a partition (1-8) with the configured user code.
    pub async fn disarm(&self, partition: u32) -> Result<()> {
        check_partition(partition)?;
        info!("Disarming partition {}", partition);
        self.connection()?
            .send(&Command::disarm(partition, &self.config.user_code))
            .await
    }

    /// Request a full status report. Changes arrive as events.
    pub async fn poll(&self) -> Result<()> {
        self.connection()?.send(&Command::status_report()).await
    }

    /// Keep-alive poll.
    pub async fn ping(&self) -> Result<()> {
        self.connection()?.send(&Command::poll()).await
    }

    /// Set the panel clock.
    pub async fn set_time(&self, time: NaiveDateTime) -> Result<()> {
        debug!("Setting panel time to {}", time);
        self.connection()?
            .send(&Command::set_time_and_date(&time))
            .await
    }

    fn connection(&self) -> Result<Arc<Connection>> {
        self.connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(TpiError::NotConnected)
    }

    fn take_connection(&self) -> Option<Arc<Connection>> {
        self.connection
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

fn check_partition(partition: u32) -> Result<()> {
    if partition == 0 || partition as usize > PARTITION_COUNT {
        return Err(TpiError::InvalidPartition { id: partition });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_partition_range() {
        assert!(check_partition(1).is_ok());
        assert!(check_partition(8).is_ok());
        assert!(matches!(
            check_partition(0),
            Err(TpiError::InvalidPartition { id: 0 })
        ));
        assert!(matches!(
            check_partition(9),
            Err(TpiError::InvalidPartition { id: 9 })
        ));
    }

    #[tokio::test]
    async fn test_commands_without_session() {
        let panel = Panel::new(TpiConfig::default());
        assert_eq!(panel.connection_state(), ConnectionState::Disconnected);
        assert!(!panel.is_ready());
        assert!(matches!(panel.poll().await, Err(TpiError::NotConnected)));
        assert!(matches!(
            panel.arm(0, ArmMode::Away).await,
            Err(TpiError::InvalidPartition { id: 0 })
        ));
        assert!(matches!(
            panel.disarm(9).await,
            Err(TpiError::InvalidPartition { id: 9 })
        ));
        assert!(matches!(
            panel.arm(1, ArmMode::Away).await,
            Err(TpiError::NotConnected)
        ));
        panel.disconnect().await;
        panel.disconnect().await;
        panel.closed().await;
    }
}
