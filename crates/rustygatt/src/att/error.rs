//! Error handling for the ATT protocol
use super::constants::*;
use thiserror::Error;

/// ATT status codes carried in Error Response PDUs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttErrorCode {
    /// Invalid handle
    InvalidHandle,
    /// Read not permitted
    ReadNotPermitted,
    /// Write not permitted
    WriteNotPermitted,
    /// Invalid PDU
    InvalidPdu,
    /// Insufficient authentication
    InsufficientAuthentication,
    /// Request not supported
    RequestNotSupported,
    /// Invalid offset
    InvalidOffset,
    /// Insufficient authorization
    InsufficientAuthorization,
    /// Prepare queue full
    PrepareQueueFull,
    /// Attribute not found
    AttributeNotFound,
    /// Attribute not long
    AttributeNotLong,
    /// Insufficient encryption key size
    InsufficientEncryptionKeySize,
    /// Invalid attribute value length
    InvalidAttributeValueLength,
    /// Unlikely error
    Unlikely,
    /// Insufficient encryption
    InsufficientEncryption,
    /// Unsupported group type
    UnsupportedGroupType,
    /// Insufficient resources
    InsufficientResources,
    /// Local I/O failure
    Io,
    /// Local timeout
    Timeout,
    /// Local abort
    Aborted,
    /// Any other code
    Other(u8),
}

impl From<u8> for AttErrorCode {
    fn from(code: u8) -> Self {
        match code {
            ATT_ERROR_INVALID_HANDLE => AttErrorCode::InvalidHandle,
            ATT_ERROR_READ_NOT_PERMITTED => AttErrorCode::ReadNotPermitted,
            ATT_ERROR_WRITE_NOT_PERMITTED => AttErrorCode::WriteNotPermitted,
            ATT_ERROR_INVALID_PDU => AttErrorCode::InvalidPdu,
            ATT_ERROR_INSUFFICIENT_AUTHENTICATION => AttErrorCode::InsufficientAuthentication,
            ATT_ERROR_REQUEST_NOT_SUPPORTED => AttErrorCode::RequestNotSupported,
            ATT_ERROR_INVALID_OFFSET => AttErrorCode::InvalidOffset,
            ATT_ERROR_INSUFFICIENT_AUTHORIZATION => AttErrorCode::InsufficientAuthorization,
            ATT_ERROR_PREPARE_QUEUE_FULL => AttErrorCode::PrepareQueueFull,
            ATT_ERROR_ATTRIBUTE_NOT_FOUND => AttErrorCode::AttributeNotFound,
            ATT_ERROR_ATTRIBUTE_NOT_LONG => AttErrorCode::AttributeNotLong,
            ATT_ERROR_INSUFFICIENT_ENCRYPTION_KEY_SIZE => {
                AttErrorCode::InsufficientEncryptionKeySize
            }
            ATT_ERROR_INVALID_ATTRIBUTE_VALUE_LENGTH => AttErrorCode::InvalidAttributeValueLength,
            ATT_ERROR_UNLIKELY => AttErrorCode::Unlikely,
            ATT_ERROR_INSUFFICIENT_ENCRYPTION => AttErrorCode::InsufficientEncryption,
            ATT_ERROR_UNSUPPORTED_GROUP_TYPE => AttErrorCode::UnsupportedGroupType,
            ATT_ERROR_INSUFFICIENT_RESOURCES => AttErrorCode::InsufficientResources,
            ATT_ERROR_IO => AttErrorCode::Io,
            ATT_ERROR_TIMEOUT => AttErrorCode::Timeout,
            ATT_ERROR_ABORTED => AttErrorCode::Aborted,
            other => AttErrorCode::Other(other),
        }
    }
}

impl From<AttErrorCode> for u8 {
    fn from(code: AttErrorCode) -> Self {
        match code {
            AttErrorCode::InvalidHandle => ATT_ERROR_INVALID_HANDLE,
            AttErrorCode::ReadNotPermitted => ATT_ERROR_READ_NOT_PERMITTED,
            AttErrorCode::WriteNotPermitted => ATT_ERROR_WRITE_NOT_PERMITTED,
            AttErrorCode::InvalidPdu => ATT_ERROR_INVALID_PDU,
            AttErrorCode::InsufficientAuthentication => ATT_ERROR_INSUFFICIENT_AUTHENTICATION,
            AttErrorCode::RequestNotSupported => ATT_ERROR_REQUEST_NOT_SUPPORTED,
            AttErrorCode::InvalidOffset => ATT_ERROR_INVALID_OFFSET,
            AttErrorCode::InsufficientAuthorization => ATT_ERROR_INSUFFICIENT_AUTHORIZATION,
            AttErrorCode::PrepareQueueFull => ATT_ERROR_PREPARE_QUEUE_FULL,
            AttErrorCode::AttributeNotFound => ATT_ERROR_ATTRIBUTE_NOT_FOUND,
            AttErrorCode::AttributeNotLong => ATT_ERROR_ATTRIBUTE_NOT_LONG,
            AttErrorCode::InsufficientEncryptionKeySize => {
                ATT_ERROR_INSUFFICIENT_ENCRYPTION_KEY_SIZE
            }
            AttErrorCode::InvalidAttributeValueLength => ATT_ERROR_INVALID_ATTRIBUTE_VALUE_LENGTH,
            AttErrorCode::Unlikely => ATT_ERROR_UNLIKELY,
            AttErrorCode::InsufficientEncryption => ATT_ERROR_INSUFFICIENT_ENCRYPTION,
            AttErrorCode::UnsupportedGroupType => ATT_ERROR_UNSUPPORTED_GROUP_TYPE,
            AttErrorCode::InsufficientResources => ATT_ERROR_INSUFFICIENT_RESOURCES,
            AttErrorCode::Io => ATT_ERROR_IO,
            AttErrorCode::Timeout => ATT_ERROR_TIMEOUT,
            AttErrorCode::Aborted => ATT_ERROR_ABORTED,
            AttErrorCode::Other(code) => code,
        }
    }
}

impl AttErrorCode {
    /// Human readable text printed next to the numeric status
    pub fn describe(self) -> &'static str {
        match self {
            AttErrorCode::InvalidHandle => "Invalid handle",
            AttErrorCode::ReadNotPermitted => "Attribute can't be read",
            AttErrorCode::WriteNotPermitted => "Attribute can't be written",
            AttErrorCode::InvalidPdu => "Attribute PDU was invalid",
            AttErrorCode::InsufficientAuthentication => {
                "Attribute requires authentication before read/write"
            }
            AttErrorCode::RequestNotSupported => "Server doesn't support the request received",
            AttErrorCode::InvalidOffset => "Offset past the end of the attribute",
            AttErrorCode::InsufficientAuthorization => {
                "Attribute requires authorization before read/write"
            }
            AttErrorCode::PrepareQueueFull => "Too many prepare writes have been queued",
            AttErrorCode::AttributeNotFound => "No attribute found within the given range",
            AttErrorCode::AttributeNotLong => "Attribute can't be read/written using Read Blob Req",
            AttErrorCode::InsufficientEncryptionKeySize => "Encryption Key Size is insufficient",
            AttErrorCode::InvalidAttributeValueLength => "Attribute value length is invalid",
            AttErrorCode::Unlikely => "Request attribute has encountered an unlikely error",
            AttErrorCode::InsufficientEncryption => "Encryption required before read/write",
            AttErrorCode::UnsupportedGroupType => {
                "Attribute type is not a supported grouping attribute"
            }
            AttErrorCode::InsufficientResources => "Insufficient Resources to complete the request",
            AttErrorCode::Io => "Internal application error: I/O",
            AttErrorCode::Timeout => "A timeout occured",
            AttErrorCode::Aborted => "The operation was aborted",
            AttErrorCode::Other(_) => "Unexpected error code",
        }
    }
}

/// ATT Error type
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AttError {
    #[error("ATT error: {0:?} on handle {1}")]
    Protocol(AttErrorCode, u16),

    #[error("Invalid PDU")]
    InvalidPdu,

    #[error("Unexpected opcode: 0x{0:02x}")]
    UnexpectedOpcode(u8),
}

impl AttError {
    /// Status code used when this error terminates a procedure
    pub fn to_error_code(&self) -> AttErrorCode {
        match self {
            AttError::Protocol(code, _) => *code,
            AttError::InvalidPdu | AttError::UnexpectedOpcode(_) => AttErrorCode::InvalidPdu,
        }
    }
}

/// ATT Result type
pub type AttResult<T> = Result<T, AttError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip_through_u8() {
        for raw in 0u8..=0xFF {
            let code = AttErrorCode::from(raw);
            assert_eq!(u8::from(code), raw);
        }
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(
            AttErrorCode::from(0x0A).describe(),
            "No attribute found within the given range"
        );
        assert_eq!(AttErrorCode::from(0x81).describe(), "A timeout occured");
        assert_eq!(AttErrorCode::from(0x42).describe(), "Unexpected error code");
    }
}
