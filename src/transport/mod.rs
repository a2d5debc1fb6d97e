// MIT License - Copyright (c) 2026 Peter Wright
// Envisalink TPI client

pub mod command;
pub mod connection;
pub mod router;

pub use command::{interpret_response, CommandEngine};
pub use connection::{Connection, ConnectionState};

use crate::devices::{KeypadStatus, PartitionStatus, ZoneStatus};

/// Receiver for decoded status events.
///
/// The read loop calls these in arrival order from a single task.
/// Implementations must not block: they run between socket reads.
pub trait EventSink: Send + Sync {
    fn apply_zone_event(&self, zone_id: u32, status: ZoneStatus);

    fn apply_partition_event(&self, partition_id: u32, status: PartitionStatus);

    fn apply_keypad_event(&self, status: KeypadStatus);

    /// Trouble LED change for a partition. Ignored unless overridden.
    fn apply_trouble_event(&self, _partition_id: u32, _active: bool) {}

    /// The gateway accepted the password. Ignored unless overridden.
    fn apply_login_accepted(&self) {}
}
