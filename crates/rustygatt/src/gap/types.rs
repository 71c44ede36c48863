use crate::gap::constants::*;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("Invalid Bluetooth address: {0}")]
    InvalidAddress(String),

    #[error("Invalid address type: {0}")]
    InvalidAddressType(String),

    #[error("Invalid security level: {0}")]
    InvalidSecurityLevel(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressType {
    #[default]
    Public,
    Random,
}

impl AddressType {
    /// Value of `l2_bdaddr_type` for an LE peer of this type
    pub fn le_bdaddr_type(self) -> u8 {
        match self {
            AddressType::Public => BDADDR_LE_PUBLIC,
            AddressType::Random => BDADDR_LE_RANDOM,
        }
    }
}

impl FromStr for AddressType {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("public") {
            Ok(AddressType::Public)
        } else if s.eq_ignore_ascii_case("random") {
            Ok(AddressType::Random)
        } else {
            Err(AddressParseError::InvalidAddressType(s.to_string()))
        }
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressType::Public => write!(f, "public"),
            AddressType::Random => write!(f, "random"),
        }
    }
}

/// Bluetooth device address, stored little-endian as on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BdAddr {
    pub bytes: [u8; 6],
}

impl BdAddr {
    pub const ANY: BdAddr = BdAddr { bytes: [0; 6] };
}

impl FromStr for BdAddr {
    type Err = AddressParseError;

    /// Parses the usual `XX:XX:XX:XX:XX:XX` form, most significant octet first.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AddressParseError::InvalidAddress(s.to_string());
        let octets: Vec<&str> = s.split(':').collect();
        if octets.len() != 6 {
            return Err(invalid());
        }

        let mut bytes = [0u8; 6];
        for (i, octet) in octets.iter().enumerate() {
            if octet.len() != 2 {
                return Err(invalid());
            }
            bytes[5 - i] = u8::from_str_radix(octet, 16).map_err(|_| invalid())?;
        }
        Ok(Self { bytes })
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.bytes[5],
            self.bytes[4],
            self.bytes[3],
            self.bytes[2],
            self.bytes[1],
            self.bytes[0]
        )
    }
}

/// Link security level requested for the ATT channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum SecurityLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl SecurityLevel {
    /// Value for the `BT_SECURITY` socket option
    pub fn to_kernel(self) -> u8 {
        match self {
            SecurityLevel::Low => BT_SECURITY_LOW,
            SecurityLevel::Medium => BT_SECURITY_MEDIUM,
            SecurityLevel::High => BT_SECURITY_HIGH,
        }
    }
}

impl FromStr for SecurityLevel {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(SecurityLevel::Low),
            "medium" => Ok(SecurityLevel::Medium),
            "high" => Ok(SecurityLevel::High),
            _ => Err(AddressParseError::InvalidSecurityLevel(s.to_string())),
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityLevel::Low => write!(f, "low"),
            SecurityLevel::Medium => write!(f, "medium"),
            SecurityLevel::High => write!(f, "high"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bdaddr_round_trips_text() {
        let addr: BdAddr = "00:11:22:33:44:55".parse().unwrap();
        assert_eq!(addr.bytes, [0x55, 0x44, 0x33, 0x22, 0x11, 0x00]);
        assert_eq!(addr.to_string(), "00:11:22:33:44:55");

        let lower: BdAddr = "aa:bb:cc:dd:ee:ff".parse().unwrap();
        assert_eq!(lower.to_string(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_bdaddr_rejects_bad_text() {
        assert!("00:11:22:33:44".parse::<BdAddr>().is_err());
        assert!("00:11:22:33:44:5".parse::<BdAddr>().is_err());
        assert!("00:11:22:33:44:zz".parse::<BdAddr>().is_err());
        assert!("001122334455".parse::<BdAddr>().is_err());
    }

    #[test]
    fn test_levels_parse_case_insensitively() {
        assert_eq!("HIGH".parse::<SecurityLevel>(), Ok(SecurityLevel::High));
        assert_eq!("Medium".parse::<SecurityLevel>(), Ok(SecurityLevel::Medium));
        assert!("max".parse::<SecurityLevel>().is_err());
        assert_eq!("Random".parse::<AddressType>(), Ok(AddressType::Random));
        assert!("static".parse::<AddressType>().is_err());
    }
}
