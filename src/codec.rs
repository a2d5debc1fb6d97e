// MIT License - Copyright (c) 2026 Peter Wright
// Envisalink TPI client

//! Line framing for the TPI wire format.
//!
//! Every frame is `<code><data><checksum>\r\n` where the checksum is the low
//! byte of the sum of all code and data bytes, written as two uppercase hex
//! digits. There is no escaping: data must never contain CR or LF.

use crate::constants::{CODE_LEN, CRLF, MIN_FRAME_LEN};
use crate::protocol::Command;

/// Reasons an inbound line is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("frame too short: {len} bytes")]
    FrameTooShort { len: usize },

    #[error("frame not terminated by CRLF")]
    MissingTerminator,

    #[error("bad checksum: expected {expected}, got {received}")]
    BadChecksum { expected: String, received: String },

    #[error("frame contains non-ASCII bytes")]
    NotAscii,
}

/// Low 8 bits of the byte sum.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

/// Encode a command into a checksummed, CRLF-terminated frame.
pub fn encode(command: &Command) -> Vec<u8> {
    let mut frame = Vec::with_capacity(command.code.len() + command.data.len() + 4);
    frame.extend_from_slice(command.code.as_bytes());
    frame.extend_from_slice(command.data.as_bytes());
    let sum = checksum(&frame);
    frame.extend_from_slice(format!("{:02X}", sum).as_bytes());
    frame.extend_from_slice(CRLF);
    frame
}

/// Decode one CRLF-terminated line into a command.
pub fn decode(line: &[u8]) -> Result<Command, DecodeError> {
    if line.len() < MIN_FRAME_LEN {
        return Err(DecodeError::FrameTooShort { len: line.len() });
    }
    let body = line
        .strip_suffix(CRLF)
        .ok_or(DecodeError::MissingTerminator)?;
    let (payload, received) = body.split_at(body.len() - 2);

    let expected = format!("{:02X}", checksum(payload));
    if expected.as_bytes() != received {
        return Err(DecodeError::BadChecksum {
            expected,
            received: String::from_utf8_lossy(received).into_owned(),
        });
    }

    if !payload.is_ascii() {
        return Err(DecodeError::NotAscii);
    }
    // ASCII is valid UTF-8, so the lossy conversion never substitutes here.
    let text = String::from_utf8_lossy(payload);
    let (code, data) = text.split_at(CODE_LEN);
    Ok(Command::new(code, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_login() {
        let cmd = Command::new("005", "user");
        assert_eq!(encode(&cmd), b"005user54\r\n");
    }

    #[test]
    fn test_encode_empty_data() {
        // 0x30 + 0x30 + 0x31 = 0x91
        assert_eq!(encode(&Command::new("001", "")), b"00191\r\n");
    }

    #[test]
    fn test_decode_login_request() {
        let cmd = decode(b"5053CD\r\n").unwrap();
        assert_eq!(cmd.code, "505");
        assert_eq!(cmd.data, "3");
    }

    #[test]
    fn test_decode_bad_checksum() {
        let err = decode(b"5053CC\r\n").unwrap_err();
        assert!(matches!(err, DecodeError::BadChecksum { .. }));
    }

    #[test]
    fn test_lowercase_checksum_rejected() {
        assert_eq!(encode(&Command::new("510", "8A")), b"5108A0F\r\n");
        assert!(matches!(
            decode(b"5108A0f\r\n"),
            Err(DecodeError::BadChecksum { .. })
        ));
    }

    #[test]
    fn test_round_trip() {
        // Every code, with printable ASCII data of varying length
        for n in 0..=999u32 {
            let len = (n % 23) as usize;
            let data: String = (0..len)
                .map(|i| char::from(b' ' + ((n as usize * 31 + i * 7) % 95) as u8))
                .collect();
            let cmd = Command::new(format!("{:03}", n), data);
            let frame = encode(&cmd);
            assert!(frame.ends_with(b"\r\n"));
            assert_eq!(decode(&frame).unwrap(), cmd, "frame {:?}", frame);
        }
    }

    #[test]
    fn test_any_checksum_byte_flip_rejected() {
        let frame = encode(&Command::new("609", "012"));
        let n = frame.len();
        for pos in [n - 4, n - 3] {
            for replacement in b"0123456789ABCDEF" {
                if *replacement == frame[pos] {
                    continue;
                }
                let mut corrupt = frame.clone();
                corrupt[pos] = *replacement;
                assert!(
                    matches!(decode(&corrupt), Err(DecodeError::BadChecksum { .. })),
                    "flip at {} to {} accepted",
                    pos,
                    *replacement as char
                );
            }
        }
    }

    #[test]
    fn test_short_frames_rejected() {
        for len in 0..MIN_FRAME_LEN {
            let bytes = vec![b'0'; len];
            assert_eq!(decode(&bytes), Err(DecodeError::FrameTooShort { len }));
        }
    }

    #[test]
    fn test_missing_terminator() {
        assert_eq!(decode(b"5053CDxx"), Err(DecodeError::MissingTerminator));
    }

    #[test]
    fn test_non_ascii_rejected() {
        let payload = [b'6', b'0', b'9', 0xC3];
        let mut frame = payload.to_vec();
        frame.extend_from_slice(format!("{:02X}", checksum(&payload)).as_bytes());
        frame.extend_from_slice(CRLF);
        assert_eq!(decode(&frame), Err(DecodeError::NotAscii));
    }
}
