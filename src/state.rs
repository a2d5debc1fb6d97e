// MIT License - Copyright (c) 2026 Peter Wright
// Envisalink TPI client

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::constants::{PARTITION_COUNT, ZONE_COUNT};
use crate::devices::{KeypadStatus, PartitionStatus, ZoneStatus};
use crate::event::{EventSender, PanelEvent};
use crate::transport::EventSink;

/// Callback for zone changes: `(zone_id, status)`.
pub type ZoneHandler = Arc<dyn Fn(u32, ZoneStatus) + Send + Sync>;
/// Callback for partition changes: `(partition_id, status)`.
pub type PartitionHandler = Arc<dyn Fn(u32, PartitionStatus) + Send + Sync>;
/// Callback for keypad LED changes.
pub type KeypadHandler = Arc<dyn Fn(KeypadStatus) + Send + Sync>;

/// Last known status of every zone, partition and the keypad LEDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelStatus {
    pub zones: [ZoneStatus; ZONE_COUNT],
    pub partitions: [PartitionStatus; PARTITION_COUNT],
    pub keypad: KeypadStatus,
}

impl PanelStatus {
    pub fn new() -> Self {
        Self {
            zones: [ZoneStatus::Unknown; ZONE_COUNT],
            partitions: [PartitionStatus::Unknown; PARTITION_COUNT],
            keypad: KeypadStatus::empty(),
        }
    }

    /// Status of zone `zone_id` (1-based).
    pub fn zone(&self, zone_id: u32) -> Option<ZoneStatus> {
        self.zones.get((zone_id as usize).wrapping_sub(1)).copied()
    }

    /// Status of partition `partition_id` (1-based).
    pub fn partition(&self, partition_id: u32) -> Option<PartitionStatus> {
        self.partitions
            .get((partition_id as usize).wrapping_sub(1))
            .copied()
    }

    /// Zones whose last reported status is not `Unknown`.
    pub fn known_zones(&self) -> impl Iterator<Item = (u32, ZoneStatus)> + '_ {
        self.zones
            .iter()
            .enumerate()
            .filter(|(_, s)| **s != ZoneStatus::Unknown)
            .map(|(i, s)| (i as u32 + 1, *s))
    }
}

impl Default for PanelStatus {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default, Clone)]
struct Handlers {
    zone: Option<ZoneHandler>,
    partition: Option<PartitionHandler>,
    keypad: Option<KeypadHandler>,
}

/// Status aggregate shared between the read loop and the `Panel` facade.
///
/// The read loop is the only writer. Notifications (callbacks and broadcast
/// events) are suppressed until the session is marked ready, so the initial
/// status burst only fills the aggregate.
pub struct PanelState {
    status: RwLock<PanelStatus>,
    ready: AtomicBool,
    /// Set once the gateway accepts the login; the sync only completes after it
    logged_in: AtomicBool,
    handlers: RwLock<Handlers>,
    sync_tx: Mutex<Option<oneshot::Sender<()>>>,
    event_tx: EventSender,
}

impl PanelState {
    pub fn new(event_tx: EventSender) -> Self {
        Self {
            status: RwLock::new(PanelStatus::new()),
            ready: AtomicBool::new(false),
            logged_in: AtomicBool::new(false),
            handlers: RwLock::new(Handlers::default()),
            sync_tx: Mutex::new(None),
            event_tx,
        }
    }

    /// Point-in-time copy of the aggregate.
    pub fn status(&self) -> PanelStatus {
        self.status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    /// Reset readiness and return a receiver that fires on the first keypad
    /// update after the login is accepted, which marks the end of the status
    /// burst.
    pub fn begin_sync(&self) -> oneshot::Receiver<()> {
        self.set_ready(false);
        self.logged_in.store(false, Ordering::Release);
        let (tx, rx) = oneshot::channel();
        *self.sync_tx.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
        rx
    }

    pub fn set_zone_handler(&self, handler: ZoneHandler) {
        self.handlers_mut().zone = Some(handler);
    }

    pub fn set_partition_handler(&self, handler: PartitionHandler) {
        self.handlers_mut().partition = Some(handler);
    }

    pub fn set_keypad_handler(&self, handler: KeypadHandler) {
        self.handlers_mut().keypad = Some(handler);
    }

    fn handlers_mut(&self) -> std::sync::RwLockWriteGuard<'_, Handlers> {
        self.handlers.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the handlers, so callbacks run without any lock held.
    fn handlers(&self) -> Handlers {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update<F: FnOnce(&mut PanelStatus) -> bool>(&self, f: F) -> bool {
        let mut status = self.status.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut status)
    }
}

impl EventSink for PanelState {
    fn apply_zone_event(&self, zone_id: u32, status: ZoneStatus) {
        let stored = self.update(|s| match s.zones.get_mut((zone_id as usize).wrapping_sub(1)) {
            Some(slot) => {
                *slot = status;
                true
            }
            None => false,
        });
        if !stored {
            warn!("Ignoring zone {} out of range", zone_id);
            return;
        }
        if !self.is_ready() {
            return;
        }
        debug!("Zone {} {}", zone_id, status);
        let _ = self.event_tx.send(PanelEvent::ZoneChanged { zone_id, status });
        if let Some(handler) = self.handlers().zone {
            handler(zone_id, status);
        }
    }

    fn apply_partition_event(&self, partition_id: u32, status: PartitionStatus) {
        let stored = self.update(|s| {
            match s.partitions.get_mut((partition_id as usize).wrapping_sub(1)) {
                Some(slot) => {
                    *slot = status;
                    true
                }
                None => false,
            }
        });
        if !stored {
            warn!("Ignoring partition {} out of range", partition_id);
            return;
        }
        if !self.is_ready() {
            return;
        }
        debug!("Partition {} {}", partition_id, status);
        let _ = self.event_tx.send(PanelEvent::PartitionChanged {
            partition_id,
            status,
        });
        if let Some(handler) = self.handlers().partition {
            handler(partition_id, status);
        }
    }

    fn apply_keypad_event(&self, status: KeypadStatus) {
        self.update(|s| {
            s.keypad = status;
            true
        });
        if !self.is_ready() {
            if !self.logged_in.load(Ordering::Acquire) {
                debug!("Keypad update before login, not treated as sync end");
                return;
            }
            if let Some(tx) = self
                .sync_tx
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
            {
                debug!("Status sync complete");
                let _ = tx.send(());
            }
            return;
        }
        let _ = self.event_tx.send(PanelEvent::KeypadChanged(status));
        if let Some(handler) = self.handlers().keypad {
            handler(status);
        }
    }

    fn apply_login_accepted(&self) {
        self.logged_in.store(true, Ordering::Release);
    }

    fn apply_trouble_event(&self, partition_id: u32, active: bool) {
        if self.is_ready() {
            let _ = self.event_tx.send(PanelEvent::Trouble {
                partition_id,
                active,
            });
        }
    }
}
