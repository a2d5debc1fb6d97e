// MIT License - Copyright (c) 2026 Peter Wright
// Envisalink TPI client

use crate::devices::{KeypadStatus, PartitionStatus, ZoneStatus};
use crate::error::LoginFailure;

/// All events that can be emitted by the panel.
///
/// Users subscribe via `panel.subscribe()` to receive a
/// `tokio::sync::broadcast::Receiver<PanelEvent>`. Status events are only
/// emitted once the initial status sync has completed.
#[derive(Debug, Clone)]
pub enum PanelEvent {
    /// TCP connection to the Envisalink established
    Connected,
    /// Password accepted by the gateway
    LoginAccepted,
    /// Password rejected or not sent in time; the session is closed
    LoginRejected(LoginFailure),
    /// Initial status burst applied, change notifications now flow
    Ready,
    /// TCP connection closed, by either side
    Disconnected,
    ZoneChanged {
        zone_id: u32,
        status: ZoneStatus,
    },
    PartitionChanged {
        partition_id: u32,
        status: PartitionStatus,
    },
    KeypadChanged(KeypadStatus),
    /// Trouble LED on (`840`) or off (`841`) for a partition
    Trouble {
        partition_id: u32,
        active: bool,
    },
}

/// Type alias for the broadcast sender.
pub type EventSender = tokio::sync::broadcast::Sender<PanelEvent>;

/// Type alias for the broadcast receiver.
pub type EventReceiver = tokio::sync::broadcast::Receiver<PanelEvent>;

/// Create a new event channel with the given capacity.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    tokio::sync::broadcast::channel(capacity)
}
