//! RustyGatt - an interactive GATT client session controller
//!
//! This library drives a connection to a remote Bluetooth peripheral from
//! line-oriented operator commands. Connection lifecycle, the multi round-trip
//! ATT procedures (discovery, long reads and writes, read by UUID) and the
//! handling of server-initiated notifications and indications all live in one
//! owned [`Session`] value, fed by operator lines and [`TransportEvent`]s.

pub mod att;
pub mod command;
pub mod error;
pub mod events;
pub mod gap;
pub mod procedure;
pub mod session;
pub mod transport;
pub mod uuid;

// Re-export common types for convenience
pub use att::{AttError, AttErrorCode};
pub use command::{Command, CommandSpec, COMMANDS};
pub use error::TransportError;
pub use gap::{AddressType, BdAddr, SecurityLevel};
pub use session::{ConnectionStatus, Output, Record, Session, SessionConfig, SessionState, TransportMode};
pub use transport::{ChannelId, ConnectParams, Transport, TransportEvent};
pub use uuid::Uuid;
