//! Output records
//!
//! Everything the session reports is a line of the form
//! `LABEL(hhhh): payload`, where `hhhh` is the connection handle. Scripts
//! driving the tool parse these lines, so the layout is fixed.

use std::fmt;

/// Success
pub const STATUS_OK: u32 = 0;
/// Missing or malformed argument
pub const STATUS_INVALID_ARGUMENT: u32 = 1;
/// Negotiated MTU below the protocol minimum
pub const STATUS_MTU_NOT_APPLIED: u32 = 129;
/// Command not possible in the current state
pub const STATUS_COMMAND_FAILED: u32 = 256;
/// Wrong usage
pub const STATUS_USAGE: u32 = 257;

/// One machine-readable output line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub label: &'static str,
    pub handle: u16,
    pub body: String,
}

impl Record {
    pub fn new(label: &'static str, handle: u16, body: impl Into<String>) -> Self {
        Self {
            label,
            handle,
            body: body.into(),
        }
    }

    /// `LABEL(h): 0`
    pub fn ok(label: &'static str, handle: u16) -> Self {
        Self::new(label, handle, STATUS_OK.to_string())
    }

    /// `LABEL(h): <code> <message>`
    pub fn status(label: &'static str, handle: u16, code: impl fmt::Display, message: &str) -> Self {
        if message.is_empty() {
            Self::new(label, handle, code.to_string())
        } else {
            Self::new(label, handle, format!("{} {}", code, message))
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:04x}): {}", self.label, self.handle, self.body)
    }
}

/// Anything the session wants shown to the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Record(Record),
    /// Free text, such as help listings
    Text(String),
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Record(record) => record.fmt(f),
            Output::Text(text) => f.write_str(text),
        }
    }
}

impl From<Record> for Output {
    fn from(record: Record) -> Self {
        Output::Record(record)
    }
}

/// Space separated lowercase hex octets
pub fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `hhhh xx xx ..`, the handle followed by the value octets
pub fn handle_and_bytes(handle: u16, bytes: &[u8]) -> String {
    if bytes.is_empty() {
        format!("{:04x}", handle)
    } else {
        format!("{:04x} {}", handle, hex_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_layout() {
        assert_eq!(Record::ok("CHAR-WRITE-CMD", 0x40).to_string(), "CHAR-WRITE-CMD(0040): 0");
        assert_eq!(
            Record::status("MTU", 0, STATUS_COMMAND_FAILED, "Command failed: not connected.").to_string(),
            "MTU(0000): 256 Command failed: not connected."
        );
        assert_eq!(Record::status("X", 0xabcd, 4, "").to_string(), "X(abcd): 4");
    }

    #[test]
    fn test_hex_bytes() {
        assert_eq!(hex_bytes(&[0x01, 0xab, 0x00]), "01 ab 00");
        assert_eq!(hex_bytes(&[]), "");
        assert_eq!(handle_and_bytes(0x10, &[0x01, 0x02]), "0010 01 02");
        assert_eq!(handle_and_bytes(0x10, &[]), "0010");
    }
}
