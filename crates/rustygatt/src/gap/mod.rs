//! Link-level identity and security types
//!
//! Bluetooth device addresses, LE address types and the link security levels
//! the operator can request.

pub mod constants;
pub mod types;

pub use types::{AddressParseError, AddressType, BdAddr, SecurityLevel};
