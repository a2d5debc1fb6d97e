// MIT License - Copyright (c) 2026 Peter Wright
// Envisalink TPI client

/// Line terminator for every frame.
pub const CRLF: &[u8] = b"\r\n";

/// Shortest valid frame: 3-digit code, 2-digit checksum, CRLF.
pub const MIN_FRAME_LEN: usize = 7;

/// Longest line the reader accepts; longer lines are discarded.
pub const MAX_FRAME_LEN: usize = 256;

/// Length of the command code field.
pub const CODE_LEN: usize = 3;

/// Number of zones tracked by the panel status.
pub const ZONE_COUNT: usize = 64;

/// Number of partitions tracked by the panel status.
pub const PARTITION_COUNT: usize = 8;

/// Default TPI listening port on the Envisalink module.
pub const DEFAULT_PORT: u16 = 4025;

/// Command codes, grouped by direction.
///
/// Codes below 500 are sent by the client; 500 and above are sent by the
/// gateway. The gateway only ever answers one command at a time.
pub mod code {
    // Client -> gateway
    pub const POLL: &str = "000";
    pub const STATUS_REPORT: &str = "001";
    pub const LOGIN: &str = "005";
    pub const SET_TIME_AND_DATE: &str = "010";
    pub const PARTITION_ARM_AWAY: &str = "030";
    pub const PARTITION_ARM_STAY: &str = "031";
    pub const PARTITION_ARM_ZERO_ENTRY: &str = "032";
    pub const PARTITION_DISARM: &str = "040";
    pub const CODE: &str = "200";

    // Gateway -> client: command responses
    pub const ACK: &str = "500";
    pub const COMMAND_ERROR: &str = "501";
    pub const SYSTEM_ERROR: &str = "502";

    // Gateway -> client: session and status
    pub const LOGIN_STATUS: &str = "505";
    pub const KEYPAD_LED: &str = "510";
    pub const ZONE_ALARM: &str = "601";
    pub const ZONE_TAMPER: &str = "603";
    pub const ZONE_FAULT: &str = "605";
    pub const ZONE_OPEN: &str = "609";
    pub const ZONE_RESTORED: &str = "610";
    pub const PARTITION_READY: &str = "650";
    pub const PARTITION_NOT_READY: &str = "651";
    pub const PARTITION_ARMED: &str = "652";
    pub const PARTITION_ALARM: &str = "654";
    pub const PARTITION_DISARMED: &str = "655";
    pub const PARTITION_EXIT_DELAY: &str = "656";
    pub const PARTITION_ENTRY_DELAY: &str = "657";
    pub const PARTITION_FAILED_TO_ARM: &str = "672";
    pub const PARTITION_BUSY: &str = "673";
    pub const PARTITION_SPECIAL_CLOSING: &str = "701";
    pub const TROUBLE_ON: &str = "840";
    pub const TROUBLE_OFF: &str = "841";
    pub const CODE_REQUIRED: &str = "900";
}

/// Display name for a command code, used in log lines.
pub fn code_name(c: &str) -> &'static str {
    match c {
        code::POLL => "Poll",
        code::STATUS_REPORT => "StatusReport",
        code::LOGIN => "Login",
        code::SET_TIME_AND_DATE => "SetTimeAndDate",
        code::PARTITION_ARM_AWAY => "PartitionArmControlAway",
        code::PARTITION_ARM_STAY => "PartitionArmControlStay",
        code::PARTITION_ARM_ZERO_ENTRY => "PartitionArmControlZeroEntry",
        code::PARTITION_DISARM => "PartitionDisarmControl",
        code::CODE => "Code",
        code::ACK => "Ack",
        code::COMMAND_ERROR => "CommandError",
        code::SYSTEM_ERROR => "SystemError",
        code::LOGIN_STATUS => "LoginStatus",
        code::KEYPAD_LED => "KeypadLed",
        code::ZONE_ALARM => "ZoneAlarm",
        code::ZONE_TAMPER => "ZoneTamper",
        code::ZONE_FAULT => "ZoneFault",
        code::ZONE_OPEN => "ZoneOpen",
        code::ZONE_RESTORED => "ZoneRestored",
        code::PARTITION_READY => "PartitionReady",
        code::PARTITION_NOT_READY => "PartitionNotReady",
        code::PARTITION_ARMED => "PartitionArmed",
        code::PARTITION_ALARM => "PartitionAlarm",
        code::PARTITION_DISARMED => "PartitionDisarmed",
        code::PARTITION_EXIT_DELAY => "PartitionExitDelay",
        code::PARTITION_ENTRY_DELAY => "PartitionEntryDelay",
        code::PARTITION_FAILED_TO_ARM => "PartitionFailedToArm",
        code::PARTITION_BUSY => "PartitionBusy",
        code::PARTITION_SPECIAL_CLOSING => "PartitionSpecialClosing",
        code::TROUBLE_ON => "TroubleOn",
        code::TROUBLE_OFF => "TroubleOff",
        code::CODE_REQUIRED => "CodeRequired",
        _ => "Unknown",
    }
}
