//! Error types for the transport collaborator
//!
//! Transport failures are reported to the operator as a numeric code followed
//! by a message, so every variant maps onto an errno-style code.

use crate::transport::ChannelId;
use thiserror::Error;

/// Errors raised by a [`crate::Transport`] implementation
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid adapter: {0}")]
    InvalidAdapter(String),

    #[error("Channel {0} is not open")]
    NotOpen(ChannelId),

    #[error("Connection handle unavailable")]
    NoHandle,

    #[error("Connection closed by peer")]
    Closed,

    #[error("{message}")]
    Rejected { code: i32, message: String },
}

impl TransportError {
    /// Numeric code reported alongside the message
    pub fn code(&self) -> i32 {
        match self {
            TransportError::Io(err) => err.raw_os_error().unwrap_or(libc::EIO),
            TransportError::InvalidAdapter(_) => libc::ENODEV,
            TransportError::NotOpen(_) => libc::ENOTCONN,
            TransportError::NoHandle => libc::ENOTCONN,
            TransportError::Closed => libc::ECONNRESET,
            TransportError::Rejected { code, .. } => *code,
        }
    }
}
