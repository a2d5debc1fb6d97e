// MIT License - Copyright (c) 2026 Peter Wright
// Envisalink TPI client

pub mod keypad;
pub mod partition;
pub mod zone;

pub use keypad::KeypadStatus;
pub use partition::{parse_partition_event, PartitionStatus};
pub use zone::{parse_zone_event, ZoneStatus};
