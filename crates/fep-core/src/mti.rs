use std::fmt;

use crate::error::CoreError;

/// A 4-character Message Type Indicator (e.g. `0200`, `0210`, `0800`).
///
/// Stored as a fixed byte array rather than `String` so that `Message` stays
/// cheap to clone and compare; ISO-8583-style MTIs are always 4 ASCII digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Mti([u8; 4]);

impl Mti {
    /// Parse an MTI from its 4-character string form.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let bytes = s.as_bytes();
        if bytes.len() != 4 || !bytes.iter().all(u8::is_ascii_digit) {
            return Err(CoreError::InvalidMti(s.to_string()));
        }
        let mut arr = [0u8; 4];
        arr.copy_from_slice(bytes);
        Ok(Mti(arr))
    }

    /// Raw 4-byte form, as transmitted on the wire.
    pub fn as_bytes(&self) -> [u8; 4] {
        self.0
    }

    pub fn as_str(&self) -> &str {
        // Safety: constructed only from ASCII digits in `parse`.
        std::str::from_utf8(&self.0).expect("Mti always holds ASCII digits")
    }

    /// The message class, i.e. the second digit (`0`/`2`/`4`/`8`, per
    /// ISO 8583's authorization/financial/reversal/network-management
    /// families) — the same index `as_reversal`/`is_network_management`
    /// already treat as the class digit.
    pub fn class_digit(&self) -> u8 {
        self.0[1] - b'0'
    }

    /// Whether this MTI is in the 08xx "network management" family (heartbeats,
    /// sign-on/sign-off).
    pub fn is_network_management(&self) -> bool {
        self.0[1] == b'8'
    }

    /// The response MTI for a request, per the ISO-8583 convention of
    /// adding 10 to the function code (last two digits): `0200` -> `0210`,
    /// `0800` -> `0810`.
    pub fn as_response(&self) -> Mti {
        let function_code: u32 = self.as_str()[2..4].parse().expect("Mti always holds ASCII digits");
        let next = (function_code + 10) % 100;
        let mut bytes = self.0;
        bytes[2] = b'0' + (next / 10) as u8;
        bytes[3] = b'0' + (next % 10) as u8;
        Mti(bytes)
    }

    /// The reversal MTI for this request, per the ISO-8583 04xx reversal
    /// family: the message class becomes `4`, the function code is kept.
    pub fn as_reversal(&self) -> Mti {
        let mut bytes = self.0;
        bytes[1] = b'4';
        Mti(bytes)
    }
}

impl fmt::Display for Mti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Mti {
    type Error = CoreError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Mti::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_mti() {
        let mti = Mti::parse("0200").unwrap();
        assert_eq!(mti.as_str(), "0200");
        assert_eq!(mti.class_digit(), 2);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(Mti::parse("020").is_err());
        assert!(Mti::parse("02000").is_err());
    }

    #[test]
    fn rejects_non_digit() {
        assert!(Mti::parse("02a0").is_err());
    }

    #[test]
    fn network_management_family() {
        assert!(Mti::parse("0800").unwrap().is_network_management());
        assert!(!Mti::parse("0200").unwrap().is_network_management());
    }

    #[test]
    fn display_matches_input() {
        let mti = Mti::parse("0210").unwrap();
        assert_eq!(format!("{mti}"), "0210");
    }

    #[test]
    fn response_mti_adds_ten_to_function_code() {
        assert_eq!(Mti::parse("0200").unwrap().as_response().as_str(), "0210");
        assert_eq!(Mti::parse("0800").unwrap().as_response().as_str(), "0810");
    }

    #[test]
    fn response_mti_wraps_past_ninety_nine() {
        assert_eq!(Mti::parse("0290").unwrap().as_response().as_str(), "0200");
    }

    #[test]
    fn reversal_mti_switches_message_class_to_four() {
        assert_eq!(Mti::parse("0200").unwrap().as_reversal().as_str(), "0400");
        assert_eq!(Mti::parse("0220").unwrap().as_reversal().as_str(), "0420");
    }
}
