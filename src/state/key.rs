//! Cache key codec
//!
//! A CC address is written as `"<channel>:<controller>"` with plain decimal
//! numbers, e.g. `"0:74"`. This is the key format of the initial state file
//! and of the `/state` dump.

use std::fmt;
use std::str::FromStr;

use crate::error::KeyError;

/// Identity of a Control Change parameter
///
/// Channel and controller span the full `u8` range; nothing here restricts
/// them to 0-15 / 0-127.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CcAddress {
    pub channel: u8,
    pub controller: u8,
}

impl CcAddress {
    pub const fn new(channel: u8, controller: u8) -> Self {
        Self {
            channel,
            controller,
        }
    }

    /// Canonical `"<channel>:<controller>"` form
    pub fn to_key(&self) -> String {
        self.to_string()
    }

    /// Parse a canonical key
    pub fn parse(key: &str) -> Result<Self, KeyError> {
        let mut parts = key.split(':');
        let (Some(channel), Some(controller), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(KeyError::Separator {
                found: key.matches(':').count(),
            });
        };

        Ok(Self {
            channel: parse_decimal_u8(channel, "channel")?,
            controller: parse_decimal_u8(controller, "controller")?,
        })
    }
}

impl fmt::Display for CcAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel, self.controller)
    }
}

impl FromStr for CcAddress {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parse an unsigned decimal byte: ASCII digits only, no sign or whitespace
pub fn parse_decimal_u8(text: &str, part: &'static str) -> Result<u8, KeyError> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(KeyError::Number {
            part,
            text: text.to_string(),
        });
    }

    text.parse::<u8>().map_err(|_| KeyError::Number {
        part,
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_format() {
        assert_eq!(CcAddress::new(0, 74).to_key(), "0:74");
        assert_eq!(CcAddress::new(15, 127).to_string(), "15:127");
    }

    #[test]
    fn test_parse_valid() {
        assert_eq!(CcAddress::parse("1:7"), Ok(CcAddress::new(1, 7)));
        assert_eq!("255:255".parse::<CcAddress>(), Ok(CcAddress::new(255, 255)));
        // Leading zeros are tolerated
        assert_eq!(CcAddress::parse("01:007"), Ok(CcAddress::new(1, 7)));
    }

    #[test]
    fn test_parse_accepts_out_of_midi_range() {
        assert_eq!(CcAddress::parse("200:130"), Ok(CcAddress::new(200, 130)));
    }

    #[test]
    fn test_parse_separator_count() {
        assert_eq!(
            CcAddress::parse("bad-key"),
            Err(KeyError::Separator { found: 0 })
        );
        assert_eq!(
            CcAddress::parse("1:2:3"),
            Err(KeyError::Separator { found: 2 })
        );
    }

    #[test]
    fn test_parse_bad_numbers() {
        for key in ["", ":", "a:1", "1:b", "-1:2", "+1:2", " 1:2", "1:2 ", "256:0", "0:1000"] {
            assert!(CcAddress::parse(key).is_err(), "accepted {key:?}");
        }

        assert_eq!(
            CcAddress::parse("256:1"),
            Err(KeyError::Number {
                part: "channel",
                text: "256".to_string()
            })
        );
    }

    proptest! {
        #[test]
        fn prop_round_trip(channel in any::<u8>(), controller in any::<u8>()) {
            let addr = CcAddress::new(channel, controller);
            prop_assert_eq!(CcAddress::parse(&addr.to_key()), Ok(addr));
        }

        #[test]
        fn prop_equal_iff_keys_equal(a in any::<(u8, u8)>(), b in any::<(u8, u8)>()) {
            let a = CcAddress::new(a.0, a.1);
            let b = CcAddress::new(b.0, b.1);
            prop_assert_eq!(a == b, a.to_key() == b.to_key());
        }
    }
}
