// MIT License - Copyright (c) 2026 Peter Wright
// Envisalink TPI client

use std::fmt;

use crate::constants::{code, ZONE_COUNT};
use crate::protocol::Command;

/// Last reported state of a single zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ZoneStatus {
    /// `601` - zone in alarm
    Alarm,
    /// `603` - zone tamper
    Tamper,
    /// `605` - zone fault
    Fault,
    /// `609` - zone open
    Open,
    /// `610` - zone restored (closed)
    Restored,
    /// No event seen since the session started
    #[default]
    Unknown,
}

impl ZoneStatus {
    /// Map a zone event command code to its status.
    pub fn from_code(c: &str) -> Option<Self> {
        match c {
            code::ZONE_ALARM => Some(Self::Alarm),
            code::ZONE_TAMPER => Some(Self::Tamper),
            code::ZONE_FAULT => Some(Self::Fault),
            code::ZONE_OPEN => Some(Self::Open),
            code::ZONE_RESTORED => Some(Self::Restored),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alarm => "ALARM",
            Self::Tamper => "TAMPER",
            Self::Fault => "FAULT",
            Self::Open => "OPEN",
            Self::Restored => "RESTORED",
            Self::Unknown => "UNKNOWN",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open | Self::Alarm)
    }
}

impl fmt::Display for ZoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extract `(zone id, status)` from a zone event.
///
/// Alarm and tamper carry a partition digit before the 3-digit zone number;
/// fault, open and restored carry the zone number alone. Returns `None` for
/// non-zone commands, malformed fields or zone numbers outside 1-64.
pub fn parse_zone_event(cmd: &Command) -> Option<(u32, ZoneStatus)> {
    let status = ZoneStatus::from_code(&cmd.code)?;
    let field = match status {
        ZoneStatus::Alarm | ZoneStatus::Tamper => cmd.data.get(1..4)?,
        _ => cmd.data.get(0..3)?,
    };
    let id: u32 = field.parse().ok()?;
    if id == 0 || id as usize > ZONE_COUNT {
        return None;
    }
    Some((id, status))
}
