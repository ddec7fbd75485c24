//! MIDI Control Change encoding
//!
//! Only Control Change messages travel through the bridge. Bytes are passed
//! through unmasked: a channel above 15 or a data byte above 127 is written
//! as-is, the caller is responsible for keeping values MIDI-legal.

use std::fmt;

/// Status nibble of a Control Change message
pub const CONTROL_CHANGE: u8 = 0xB0;

/// A single Control Change message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlChange {
    /// Channel (0-15 for legal MIDI)
    pub channel: u8,
    /// Controller number (0-127 for legal MIDI)
    pub controller: u8,
    /// Controller value (0-127 for legal MIDI)
    pub value: u8,
}

impl ControlChange {
    pub fn new(channel: u8, controller: u8, value: u8) -> Self {
        Self {
            channel,
            controller,
            value,
        }
    }

    /// Encode to the 3-byte wire form
    pub fn encode(&self) -> [u8; 3] {
        [CONTROL_CHANGE | self.channel, self.controller, self.value]
    }
}

impl fmt::Display for ControlChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CC ch:{} cc:{} v:{}",
            self.channel, self.controller, self.value
        )
    }
}

/// Space-separated upper-case hex view of raw MIDI bytes, for trace logs
///
/// Formats lazily, so a disabled `trace!` costs nothing.
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_control_change() {
        let msg = ControlChange::new(2, 7, 100);
        assert_eq!(msg.encode(), [0xB2, 7, 100]);
    }

    #[test]
    fn test_encode_is_unmasked() {
        // Out-of-range values go out untouched
        let msg = ControlChange::new(0x1F, 200, 255);
        assert_eq!(msg.encode(), [0xBF, 200, 255]);
    }

    #[test]
    fn test_hex_bytes() {
        let msg = ControlChange::new(0, 7, 127);
        assert_eq!(HexBytes(&msg.encode()).to_string(), "B0 07 7F");
        assert_eq!(HexBytes(&[]).to_string(), "");
    }
}
