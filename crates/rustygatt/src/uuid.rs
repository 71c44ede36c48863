use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use thiserror::Error;

/// Represents a 128-bit Bluetooth UUID.
///
/// 16-bit and 32-bit SIG-assigned values are expanded onto the Bluetooth base
/// UUID. Internally the UUID is always stored as a 128-bit value in
/// little-endian byte order, which is also the order used on the ATT wire.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Uuid {
    bytes: [u8; 16],
}

/// The base UUID "00000000-0000-1000-8000-00805F9B34FB" (little-endian).
const BASE_UUID_BYTES: [u8; 16] = [
    0xFB, 0x34, 0x9B, 0x5F, 0x80, 0x00, 0x00, 0x80, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Offset within the base UUID where the 16/32-bit value is inserted.
const BASE_OFFSET: usize = 12;

/// Length of the hyphenated textual form.
const HYPHENATED_LEN: usize = 36;

impl Uuid {
    /// Creates a new 128-bit UUID directly from 16 bytes (little-endian).
    pub const fn from_bytes_le(bytes: [u8; 16]) -> Self {
        Uuid { bytes }
    }

    /// Creates a new 128-bit UUID directly from 16 bytes (big-endian).
    pub fn from_bytes_be(mut bytes: [u8; 16]) -> Self {
        bytes.reverse();
        Uuid { bytes }
    }

    /// Creates a 128-bit UUID from a 16-bit SIG-assigned value.
    pub const fn from_u16(uuid16: u16) -> Self {
        let mut bytes = BASE_UUID_BYTES;
        bytes[BASE_OFFSET] = uuid16 as u8;
        bytes[BASE_OFFSET + 1] = (uuid16 >> 8) as u8;
        Uuid { bytes }
    }

    /// Creates a 128-bit UUID from a 32-bit SIG-assigned value.
    pub const fn from_u32(uuid32: u32) -> Self {
        let mut bytes = BASE_UUID_BYTES;
        bytes[BASE_OFFSET] = uuid32 as u8;
        bytes[BASE_OFFSET + 1] = (uuid32 >> 8) as u8;
        bytes[BASE_OFFSET + 2] = (uuid32 >> 16) as u8;
        bytes[BASE_OFFSET + 3] = (uuid32 >> 24) as u8;
        Uuid { bytes }
    }

    /// Tries to create a UUID from a little-endian byte slice of length 2, 4 or 16.
    pub fn try_from_slice_le(slice: &[u8]) -> Option<Self> {
        match slice.len() {
            2 => Some(Uuid::from_u16(u16::from_le_bytes([slice[0], slice[1]]))),
            4 => Some(Uuid::from_u32(u32::from_le_bytes([
                slice[0], slice[1], slice[2], slice[3],
            ]))),
            16 => {
                let mut bytes = [0u8; 16];
                bytes.copy_from_slice(slice);
                Some(Uuid::from_bytes_le(bytes))
            }
            _ => None,
        }
    }

    /// Returns the underlying 16 bytes in little-endian order.
    pub const fn as_bytes_le(&self) -> &[u8; 16] {
        &self.bytes
    }

    /// Returns the underlying 16 bytes in big-endian order.
    pub fn as_bytes_be(&self) -> [u8; 16] {
        let mut bytes = self.bytes;
        bytes.reverse();
        bytes
    }

    fn is_sig_assigned(&self) -> bool {
        self.bytes[0..BASE_OFFSET] == BASE_UUID_BYTES[0..BASE_OFFSET]
    }

    /// Returns the 16-bit value if this is a SIG-assigned 16-bit UUID.
    pub fn as_u16(&self) -> Option<u16> {
        if self.is_sig_assigned()
            && self.bytes[BASE_OFFSET + 2] == 0
            && self.bytes[BASE_OFFSET + 3] == 0
        {
            Some(u16::from_le_bytes([
                self.bytes[BASE_OFFSET],
                self.bytes[BASE_OFFSET + 1],
            ]))
        } else {
            None
        }
    }

    /// Encoding used inside ATT PDUs.
    ///
    /// ATT only carries 16-bit and 128-bit UUIDs, so 32-bit values go out in
    /// their full 128-bit form.
    pub fn to_att_bytes(&self) -> Vec<u8> {
        match self.as_u16() {
            Some(uuid16) => uuid16.to_le_bytes().to_vec(),
            None => self.bytes.to_vec(),
        }
    }
}

impl From<u16> for Uuid {
    fn from(uuid16: u16) -> Self {
        Uuid::from_u16(uuid16)
    }
}

impl From<u32> for Uuid {
    fn from(uuid32: u32) -> Self {
        Uuid::from_u32(uuid32)
    }
}

impl PartialEq<u16> for Uuid {
    fn eq(&self, other: &u16) -> bool {
        self.as_u16() == Some(*other)
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Always the full hyphenated form, even for 16-bit values
        let b = self.as_bytes_be();
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[0],
            b[1],
            b[2],
            b[3],
            b[4],
            b[5],
            b[6],
            b[7],
            b[8],
            b[9],
            b[10],
            b[11],
            b[12],
            b[13],
            b[14],
            b[15],
        )
    }
}

impl fmt::Debug for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_u16() {
            Some(u16_val) => write!(f, "Uuid(0x{:04X})", u16_val),
            None => write!(f, "Uuid({})", self),
        }
    }
}

/// Errors produced while parsing a textual UUID
#[derive(Debug, Error, PartialEq)]
pub enum UuidParseError {
    #[error("invalid UUID length")]
    InvalidLength,

    #[error("invalid UUID format")]
    InvalidFormat,

    #[error("invalid hex in UUID: {0}")]
    HexError(#[from] hex::FromHexError),
}

impl From<ParseIntError> for UuidParseError {
    fn from(_: ParseIntError) -> Self {
        UuidParseError::InvalidFormat
    }
}

impl FromStr for Uuid {
    type Err = UuidParseError;

    /// Accepts `180a`, `0x180a`, `0000180a`, `0x0000180a` and the hyphenated
    /// 128-bit form `0000180a-0000-1000-8000-00805f9b34fb`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == HYPHENATED_LEN {
            let dashes_ok = [8, 13, 18, 23].iter().all(|&i| s.as_bytes()[i] == b'-');
            if !dashes_ok {
                return Err(UuidParseError::InvalidFormat);
            }
            let cleaned: String = s.chars().filter(|c| *c != '-').collect();
            let mut bytes_be = [0u8; 16];
            hex::decode_to_slice(&cleaned, &mut bytes_be)?;
            return Ok(Uuid::from_bytes_be(bytes_be));
        }

        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(UuidParseError::InvalidFormat);
        }

        match digits.len() {
            4 => Ok(Uuid::from_u16(u16::from_str_radix(digits, 16)?)),
            8 => Ok(Uuid::from_u32(u32::from_str_radix(digits, 16)?)),
            32 => {
                let mut bytes_be = [0u8; 16];
                hex::decode_to_slice(digits, &mut bytes_be)?;
                Ok(Uuid::from_bytes_be(bytes_be))
            }
            _ => Err(UuidParseError::InvalidLength),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2800", 0x2800)]
    #[case("0x2803", 0x2803)]
    #[case("0X180A", 0x180A)]
    #[case("00002902-0000-1000-8000-00805f9b34fb", 0x2902)]
    fn parses_sig_assigned_forms(#[case] text: &str, #[case] expected: u16) {
        let uuid: Uuid = text.parse().unwrap();
        assert_eq!(uuid.as_u16(), Some(expected));
    }

    #[rstest]
    #[case("")]
    #[case("28")]
    #[case("28000")]
    #[case("zz00")]
    #[case("00002902_0000_1000_8000_00805f9b34fb")]
    fn rejects_malformed_text(#[case] text: &str) {
        assert!(text.parse::<Uuid>().is_err());
    }

    #[test]
    fn reports_bad_hex_in_hyphenated_form() {
        let err = "0000180g-0000-1000-8000-00805f9b34fb".parse::<Uuid>().unwrap_err();
        assert!(matches!(err, UuidParseError::HexError(_)), "{:?}", err);
        assert_eq!(
            "0000180a-0000-1000-8000-00805f9b34fb".parse::<Uuid>(),
            Ok(Uuid::from_u16(0x180a))
        );
    }

    #[test]
    fn displays_full_hyphenated_form() {
        assert_eq!(
            Uuid::from_u16(0x2800).to_string(),
            "00002800-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn vendor_uuid_keeps_128_bit_att_encoding() {
        let uuid: Uuid = "f000aa01-0451-4000-b000-000000000000".parse().unwrap();
        assert_eq!(uuid.as_u16(), None);
        let att = uuid.to_att_bytes();
        assert_eq!(att.len(), 16);
        assert_eq!(Uuid::try_from_slice_le(&att), Some(uuid));
        assert_eq!(uuid.to_string(), "f000aa01-0451-4000-b000-000000000000");
    }

    #[test]
    fn thirty_two_bit_value_is_sent_as_128_bit() {
        let uuid = Uuid::from_u32(0x0001_180A);
        assert_eq!(uuid.to_att_bytes().len(), 16);
        assert_eq!(Uuid::from_u16(0x180A).to_att_bytes(), vec![0x0A, 0x18]);
    }
}
