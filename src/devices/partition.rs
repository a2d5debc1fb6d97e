// MIT License - Copyright (c) 2026 Peter Wright
// Envisalink TPI client

use std::fmt;

use crate::constants::{code, PARTITION_COUNT};
use crate::protocol::Command;

/// Last reported state of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PartitionStatus {
    Ready,
    NotReady,
    ArmedAway,
    ArmedStay,
    ArmedZeroEntryAway,
    ArmedZeroEntryStay,
    Alarm,
    Disarmed,
    ExitDelay,
    EntryDelay,
    FailedToArm,
    Busy,
    #[default]
    Unknown,
}

impl PartitionStatus {
    /// Decode the mode digit of a `652` Partition Armed message.
    pub fn from_armed_mode(mode: char) -> Option<Self> {
        match mode {
            '0' => Some(Self::ArmedAway),
            '1' => Some(Self::ArmedStay),
            '2' => Some(Self::ArmedZeroEntryAway),
            '3' => Some(Self::ArmedZeroEntryStay),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "DISARMED_READY",
            Self::NotReady => "DISARMED_NOT_READY",
            Self::ArmedAway => "ARMED_AWAY",
            Self::ArmedStay => "ARMED_STAY",
            Self::ArmedZeroEntryAway => "ARMED_ZERO_ENTRY_AWAY",
            Self::ArmedZeroEntryStay => "ARMED_ZERO_ENTRY_STAY",
            Self::Alarm => "ALARM",
            Self::Disarmed => "DISARMED",
            Self::ExitDelay => "EXIT_DELAY",
            Self::EntryDelay => "ENTRY_DELAY",
            Self::FailedToArm => "FAILED_TO_ARM",
            Self::Busy => "BUSY",
            Self::Unknown => "UNKNOWN",
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(
            self,
            Self::ArmedAway | Self::ArmedStay | Self::ArmedZeroEntryAway | Self::ArmedZeroEntryStay
        )
    }
}

impl fmt::Display for PartitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extract `(partition id, status)` from a partition event.
///
/// The partition number is always the first data digit. `652` adds a mode
/// digit; an unknown mode yields `None`.
pub fn parse_partition_event(cmd: &Command) -> Option<(u32, PartitionStatus)> {
    let status = match cmd.code.as_str() {
        code::PARTITION_READY => PartitionStatus::Ready,
        code::PARTITION_NOT_READY => PartitionStatus::NotReady,
        code::PARTITION_ARMED => {
            let mode = cmd.data.chars().nth(1)?;
            PartitionStatus::from_armed_mode(mode)?
        }
        code::PARTITION_ALARM => PartitionStatus::Alarm,
        code::PARTITION_DISARMED => PartitionStatus::Disarmed,
        code::PARTITION_EXIT_DELAY => PartitionStatus::ExitDelay,
        code::PARTITION_ENTRY_DELAY => PartitionStatus::EntryDelay,
        code::PARTITION_FAILED_TO_ARM => PartitionStatus::FailedToArm,
        code::PARTITION_BUSY => PartitionStatus::Busy,
        _ => return None,
    };
    let id = parse_partition_id(&cmd.data)?;
    Some((id, status))
}

/// Parse the leading partition digit of an event payload (trouble LEDs use
/// the same layout).
pub fn parse_partition_id(data: &str) -> Option<u32> {
    let id = data.get(0..1)?.parse::<u32>().ok()?;
    if id == 0 || id as usize > PARTITION_COUNT {
        return None;
    }
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_armed_modes() {
        assert_eq!(
            parse_partition_event(&Command::new("652", "10")),
            Some((1, PartitionStatus::ArmedAway))
        );
        assert_eq!(
            parse_partition_event(&Command::new("652", "21")),
            Some((2, PartitionStatus::ArmedStay))
        );
        assert_eq!(
            parse_partition_event(&Command::new("652", "32")),
            Some((3, PartitionStatus::ArmedZeroEntryAway))
        );
        assert_eq!(
            parse_partition_event(&Command::new("652", "83")),
            Some((8, PartitionStatus::ArmedZeroEntryStay))
        );
        assert_eq!(parse_partition_event(&Command::new("652", "19")), None);
        assert_eq!(parse_partition_event(&Command::new("652", "1")), None);
    }

    #[test]
    fn test_partition_simple_events() {
        assert_eq!(
            parse_partition_event(&Command::new("650", "1")),
            Some((1, PartitionStatus::Ready))
        );
        assert_eq!(
            parse_partition_event(&Command::new("651", "2")),
            Some((2, PartitionStatus::NotReady))
        );
        assert_eq!(
            parse_partition_event(&Command::new("655", "1")),
            Some((1, PartitionStatus::Disarmed))
        );
        assert_eq!(
            parse_partition_event(&Command::new("672", "1")),
            Some((1, PartitionStatus::FailedToArm))
        );
        assert_eq!(
            parse_partition_event(&Command::new("673", "4")),
            Some((4, PartitionStatus::Busy))
        );
    }

    #[test]
    fn test_partition_out_of_range() {
        assert_eq!(parse_partition_event(&Command::new("650", "0")), None);
        assert_eq!(parse_partition_event(&Command::new("650", "9")), None);
        assert_eq!(parse_partition_event(&Command::new("650", "")), None);
        assert_eq!(parse_partition_event(&Command::new("609", "001")), None);
    }

    #[test]
    fn test_partition_status_helpers() {
        assert!(PartitionStatus::ArmedStay.is_armed());
        assert!(!PartitionStatus::ExitDelay.is_armed());
        assert_eq!(PartitionStatus::Ready.to_string(), "DISARMED_READY");
        assert_eq!(PartitionStatus::default(), PartitionStatus::Unknown);
    }
}
