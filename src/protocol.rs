// MIT License - Copyright (c) 2026 Peter Wright
// Envisalink TPI client

use std::fmt;

use chrono::NaiveDateTime;

use crate::codec;
use crate::config::ArmMode;
use crate::constants::{code, code_name};

/// One TPI message: a 3-digit command code followed by free-form ASCII data.
///
/// # Session Handshake
///
/// After the TCP socket opens the gateway sends `505` with data `3`
/// (password request). The client answers with `005<password>`; the gateway
/// replies `505` with `1` (accepted), `0` (rejected) or `2` (timed out,
/// sent when no password arrives within 10 seconds). After acceptance the
/// client requests `001` and receives a burst of zone, partition and keypad
/// status messages, always concluded by a `510` keypad update.
///
/// # Responses
///
/// Every client command is answered by exactly one of `500` (Ack, data is
/// the acknowledged code), `501` (checksum error) or `502` (system error,
/// data is a 3-digit sub-code).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub code: String,
    pub data: String,
}

impl Command {
    pub fn new(code: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            data: data.into(),
        }
    }

    /// `000` - keep-alive, answered with a plain Ack.
    pub fn poll() -> Self {
        Self::new(code::POLL, "")
    }

    /// `001` - request a full status burst.
    pub fn status_report() -> Self {
        Self::new(code::STATUS_REPORT, "")
    }

    /// `005<password>` - session login.
    pub fn login(password: &str) -> Self {
        Self::new(code::LOGIN, password)
    }

    /// `010hhmmMMDDYY` - set the panel clock.
    pub fn set_time_and_date(t: &NaiveDateTime) -> Self {
        Self::new(code::SET_TIME_AND_DATE, t.format("%H%M%m%d%y").to_string())
    }

    /// `030`/`031`/`032<partition>` - arm a partition.
    pub fn arm(partition: u32, mode: ArmMode) -> Self {
        let c = match mode {
            ArmMode::Away => code::PARTITION_ARM_AWAY,
            ArmMode::Stay => code::PARTITION_ARM_STAY,
            ArmMode::NoEntryDelay => code::PARTITION_ARM_ZERO_ENTRY,
        };
        Self::new(c, partition.to_string())
    }

    /// `040<partition><user code>` - disarm a partition.
    pub fn disarm(partition: u32, user_code: &str) -> Self {
        Self::new(code::PARTITION_DISARM, format!("{}{}", partition, user_code))
    }

    /// `200<user code>` - answer a `900` code request.
    pub fn code(user_code: &str) -> Self {
        Self::new(code::CODE, user_code)
    }

    /// Display name of the command code.
    pub fn name(&self) -> &'static str {
        code_name(&self.code)
    }

    /// Whether this message answers an outstanding client command.
    pub fn is_response(&self) -> bool {
        matches!(
            self.code.as_str(),
            code::ACK | code::COMMAND_ERROR | code::SYSTEM_ERROR
        )
    }

    /// Encode into a wire frame.
    pub fn to_frame(&self) -> Vec<u8> {
        codec::encode(self)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never echo secrets into the logs.
        let data = match self.code.as_str() {
            code::LOGIN | code::CODE | code::PARTITION_DISARM if !self.data.is_empty() => "****",
            _ => self.data.as_str(),
        };
        write!(f, "{{{} : {} : {}}}", self.code, self.name(), data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_command_wire_strings() {
        assert_eq!(Command::poll().to_frame(), b"00090\r\n");
        assert_eq!(Command::status_report().to_frame(), b"00191\r\n");
        assert_eq!(Command::login("user").to_frame(), b"005user54\r\n");
        assert_eq!(Command::arm(1, ArmMode::Away), Command::new("030", "1"));
        assert_eq!(Command::arm(2, ArmMode::Stay), Command::new("031", "2"));
        assert_eq!(
            Command::arm(3, ArmMode::NoEntryDelay),
            Command::new("032", "3")
        );
        assert_eq!(Command::disarm(8, "12345"), Command::new("040", "812345"));
        assert_eq!(Command::code("12345"), Command::new("200", "12345"));
    }

    #[test]
    fn test_set_time_layout() {
        let t = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 7, 59)
            .unwrap();
        assert_eq!(
            Command::set_time_and_date(&t),
            Command::new("010", "1407030524")
        );
    }

    #[test]
    fn test_is_response() {
        assert!(Command::new("500", "030").is_response());
        assert!(Command::new("501", "").is_response());
        assert!(Command::new("502", "020").is_response());
        assert!(!Command::new("505", "3").is_response());
        assert!(!Command::new("900", "").is_response());
    }

    #[test]
    fn test_display_masks_secrets() {
        assert_eq!(Command::login("user").to_string(), "{005 : Login : ****}");
        assert_eq!(
            Command::new("652", "10").to_string(),
            "{652 : PartitionArmed : 10}"
        );
        assert_eq!(Command::new("999", "x").to_string(), "{999 : Unknown : x}");
    }
}
