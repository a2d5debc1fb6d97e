// MIT License - Copyright (c) 2026 Peter Wright
// Envisalink TPI client

use std::fmt;

/// Reasons the panel gives for rejecting a command, carried as the 3-digit
/// sub-code of a `502` System Error message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// 020 - API Command Syntax Error
    SyntaxError,
    /// 021 - API Command Partition Error (partition out of bounds)
    PartitionOutOfBounds,
    /// 022 - API Command Not Supported
    CommandNotSupported,
    /// 023 - API System Not Armed
    SystemNotArmed,
    /// 024 - API System Not Ready to Arm
    SystemNotReady,
    /// 025 - API Command Invalid Length
    InvalidLength,
    /// 026 - API User Code not Required
    UserCodeNotRequired,
    /// 027 - API Invalid Characters in Command
    InvalidCharacters,
    /// Any sub-code not listed above, kept verbatim.
    Unknown(String),
}

impl RejectReason {
    /// Parse a System Error sub-code.
    ///
    /// Returns `None` for `000` (No Error), which the panel uses to report
    /// success through the error channel.
    pub fn from_sub_code(s: &str) -> Option<Self> {
        match s {
            "000" => None,
            "020" => Some(Self::SyntaxError),
            "021" => Some(Self::PartitionOutOfBounds),
            "022" => Some(Self::CommandNotSupported),
            "023" => Some(Self::SystemNotArmed),
            "024" => Some(Self::SystemNotReady),
            "025" => Some(Self::InvalidLength),
            "026" => Some(Self::UserCodeNotRequired),
            "027" => Some(Self::InvalidCharacters),
            other => Some(Self::Unknown(other.to_string())),
        }
    }

    /// The wire sub-code for this reason.
    pub fn sub_code(&self) -> &str {
        match self {
            Self::SyntaxError => "020",
            Self::PartitionOutOfBounds => "021",
            Self::CommandNotSupported => "022",
            Self::SystemNotArmed => "023",
            Self::SystemNotReady => "024",
            Self::InvalidLength => "025",
            Self::UserCodeNotRequired => "026",
            Self::InvalidCharacters => "027",
            Self::Unknown(code) => code,
        }
    }

    /// Human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::SyntaxError => "syntax error",
            Self::PartitionOutOfBounds => "requested partition is out of bounds",
            Self::CommandNotSupported => "command not supported",
            Self::SystemNotArmed => "system not armed",
            Self::SystemNotReady => {
                "system not ready, either not secure, in exit-delay, or already armed"
            }
            Self::InvalidLength => "invalid length",
            Self::UserCodeNotRequired => "user code not required",
            Self::InvalidCharacters => "invalid characters",
            Self::Unknown(_) => "unknown system error",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.sub_code(), self.description())
    }
}

/// Why the gateway refused or dropped a login attempt (`505` payload).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFailure {
    /// `0` - password incorrect
    BadPassword,
    /// `2` - no password received within the gateway's 10 second window
    TimedOut,
}

impl fmt::Display for LoginFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadPassword => f.write_str("password incorrect"),
            Self::TimedOut => f.write_str("password not sent in time"),
        }
    }
}

/// All errors that can occur in the envisalink-tpi library.
#[derive(Debug, thiserror::Error)]
pub enum TpiError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("Timeout awaiting response: {command}")]
    Timeout { command: String },

    #[error("Command error, bad checksum")]
    CommandError,

    #[error("Command rejected: {0}")]
    CommandRejected(RejectReason),

    #[error("Unexpected response code: {code}")]
    UnexpectedResponse { code: String },

    #[error("Login rejected: {0}")]
    LoginRejected(LoginFailure),

    #[error("Initial status sync not completed in time")]
    SyncTimeout,

    #[error("Invalid partition: {id} (valid: 1-8)")]
    InvalidPartition { id: u32 },

    #[error("Not connected")]
    NotConnected,

    #[error("Socket disconnected")]
    Disconnected,
}

impl TpiError {
    /// Whether this error is transient and the caller may reconnect and retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TpiError::Io(_)
                | TpiError::ConnectionTimeout
                | TpiError::Timeout { .. }
                | TpiError::SyncTimeout
                | TpiError::Disconnected
                | TpiError::LoginRejected(LoginFailure::TimedOut)
        )
    }
}

pub type Result<T> = std::result::Result<T, TpiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_error_sub_code_is_success() {
        assert_eq!(RejectReason::from_sub_code("000"), None);
    }

    #[test]
    fn test_known_sub_codes() {
        assert_eq!(RejectReason::from_sub_code("020"), Some(RejectReason::SyntaxError));
        assert_eq!(
            RejectReason::from_sub_code("021"),
            Some(RejectReason::PartitionOutOfBounds)
        );
        assert_eq!(RejectReason::from_sub_code("023"), Some(RejectReason::SystemNotArmed));
        assert_eq!(RejectReason::from_sub_code("024"), Some(RejectReason::SystemNotReady));
        assert_eq!(
            RejectReason::from_sub_code("027"),
            Some(RejectReason::InvalidCharacters)
        );
    }

    #[test]
    fn test_unknown_sub_code_kept_verbatim() {
        let reason = RejectReason::from_sub_code("042").unwrap();
        assert_eq!(reason, RejectReason::Unknown("042".to_string()));
        assert_eq!(reason.sub_code(), "042");
        assert_eq!(reason.to_string(), "042: unknown system error");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(TpiError::Disconnected.is_retryable());
        assert!(TpiError::Timeout { command: "001".into() }.is_retryable());
        assert!(!TpiError::InvalidPartition { id: 9 }.is_retryable());
        assert!(!TpiError::LoginRejected(LoginFailure::BadPassword).is_retryable());
        assert!(!TpiError::CommandRejected(RejectReason::SystemNotReady).is_retryable());
    }
}
