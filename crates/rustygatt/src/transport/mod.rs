//! Transport collaborator
//!
//! The session never touches sockets directly. It asks a [`Transport`] to
//! open a channel and send raw PDUs, and is told about everything else
//! (connection completion, inbound PDUs, hangups) through
//! [`TransportEvent`]s fed back by the owner of the event loop.

#[cfg(target_os = "linux")]
pub mod l2cap;
pub mod mock;

#[cfg(target_os = "linux")]
pub use l2cap::L2capTransport;
pub use mock::MockTransport;

use crate::error::TransportError;
use crate::gap::{AddressType, BdAddr, SecurityLevel};
use std::fmt;

/// Identifies one connection attempt
///
/// Every call to [`Transport::connect`] yields a fresh id, so events from a
/// channel that has since been closed can be told apart from the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Parameters for a connection attempt
#[derive(Debug, Clone)]
pub struct ConnectParams {
    /// Local adapter, as `hciN` or an address; `None` for any adapter
    pub source: Option<String>,
    /// Remote device
    pub destination: BdAddr,
    /// LE address type of the remote device
    pub address_type: AddressType,
    /// Security level requested for the channel
    pub security_level: SecurityLevel,
    /// BR/EDR PSM, or 0 for the LE fixed ATT channel
    pub psm: u16,
    /// Incoming MTU hint, or 0 for the transport default
    pub mtu: u16,
}

/// Asynchronous notifications produced by a transport
#[derive(Debug)]
pub enum TransportEvent {
    /// The channel is connected and ready for PDUs
    Connected(ChannelId),
    /// The connection attempt failed
    ConnectFailed(ChannelId, TransportError),
    /// A PDU was received
    Pdu(ChannelId, Vec<u8>),
    /// The peer closed the channel
    Hangup(ChannelId),
    /// The channel failed after connecting
    Error(ChannelId, TransportError),
}

impl TransportEvent {
    /// Channel this event belongs to
    pub fn channel(&self) -> ChannelId {
        match self {
            TransportEvent::Connected(ch)
            | TransportEvent::ConnectFailed(ch, _)
            | TransportEvent::Pdu(ch, _)
            | TransportEvent::Hangup(ch)
            | TransportEvent::Error(ch, _) => *ch,
        }
    }
}

/// Connection-oriented ATT bearer
pub trait Transport {
    /// Begins connecting; completion is reported as a [`TransportEvent`]
    fn connect(&mut self, params: &ConnectParams) -> Result<ChannelId, TransportError>;

    /// Sends one PDU on an open channel
    fn send(&mut self, channel: ChannelId, pdu: &[u8]) -> Result<(), TransportError>;

    /// Controller connection handle of an open channel
    fn handle(&self, channel: ChannelId) -> Result<u16, TransportError>;

    /// Largest PDU both ends of an open channel accept
    fn mtu(&self, channel: ChannelId) -> Result<u16, TransportError>;

    /// Changes the security level of a live channel
    fn set_security_level(
        &mut self,
        channel: ChannelId,
        level: SecurityLevel,
    ) -> Result<(), TransportError>;

    /// Releases a channel. Closing an unknown channel does nothing.
    fn close(&mut self, channel: ChannelId);
}
