// MIT License - Copyright (c) 2026 Peter Wright
// Envisalink TPI client

use bitflags::bitflags;

bitflags! {
    /// Keypad LED state carried by `510` as one hex byte.
    ///
    /// Bit positions: `7 Backlight, 6 Fire, 5 Program, 4 Trouble,
    /// 3 Bypass, 2 Memory, 1 Armed, 0 Ready`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeypadStatus: u8 {
        const READY     = 0x01;
        const ARMED     = 0x02;
        const MEMORY    = 0x04;
        const BYPASS    = 0x08;
        const TROUBLE   = 0x10;
        const PROGRAM   = 0x20;
        const FIRE      = 0x40;
        const BACKLIGHT = 0x80;
    }
}

const KEYPAD_LED_NAMES: [(KeypadStatus, &str); 8] = [
    (KeypadStatus::BACKLIGHT, "Backlight"),
    (KeypadStatus::FIRE, "Fire"),
    (KeypadStatus::PROGRAM, "Program"),
    (KeypadStatus::TROUBLE, "Trouble"),
    (KeypadStatus::BYPASS, "Bypass"),
    (KeypadStatus::MEMORY, "Memory"),
    (KeypadStatus::ARMED, "Armed"),
    (KeypadStatus::READY, "Ready"),
];

impl KeypadStatus {
    /// Parse the two hex digits of a `510` payload.
    pub fn from_hex(s: &str) -> Option<Self> {
        let byte = u8::from_str_radix(s.get(0..2)?, 16).ok()?;
        Some(Self::from_bits_retain(byte))
    }

    /// Names of the LEDs that are lit, most significant bit first.
    pub fn lit_names(&self) -> Vec<&'static str> {
        KEYPAD_LED_NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }

    pub fn is_backlight(&self) -> bool { self.contains(Self::BACKLIGHT) }
    pub fn is_fire(&self) -> bool { self.contains(Self::FIRE) }
    pub fn is_program(&self) -> bool { self.contains(Self::PROGRAM) }
    pub fn is_trouble(&self) -> bool { self.contains(Self::TROUBLE) }
    pub fn is_bypass(&self) -> bool { self.contains(Self::BYPASS) }
    pub fn is_memory(&self) -> bool { self.contains(Self::MEMORY) }
    pub fn is_armed(&self) -> bool { self.contains(Self::ARMED) }
    pub fn is_ready(&self) -> bool { self.contains(Self::READY) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypad_ready_only() {
        let status = KeypadStatus::from_hex("01").unwrap();
        assert!(status.is_ready());
        assert_eq!(status, KeypadStatus::READY);
        assert!(!status.is_armed());
        assert!(!status.is_backlight());
    }

    #[test]
    fn test_keypad_backlight_only() {
        let status = KeypadStatus::from_hex("80").unwrap();
        assert_eq!(status, KeypadStatus::BACKLIGHT);
        assert!(!status.is_ready());
        assert!(!status.is_fire());
    }

    #[test]
    fn test_keypad_all_lit() {
        let status = KeypadStatus::from_hex("FF").unwrap();
        assert_eq!(status, KeypadStatus::all());
        assert!(status.is_backlight()
            && status.is_fire()
            && status.is_program()
            && status.is_trouble()
            && status.is_bypass()
            && status.is_memory()
            && status.is_armed()
            && status.is_ready());
        assert_eq!(status.lit_names().len(), 8);
    }

    #[test]
    fn test_keypad_lowercase_and_names() {
        let status = KeypadStatus::from_hex("8a").unwrap();
        assert_eq!(status.lit_names(), vec!["Backlight", "Bypass", "Armed"]);
    }

    #[test]
    fn test_keypad_malformed() {
        assert_eq!(KeypadStatus::from_hex(""), None);
        assert_eq!(KeypadStatus::from_hex("8"), None);
        assert_eq!(KeypadStatus::from_hex("ZZ"), None);
    }
}
