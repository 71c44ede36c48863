//! Session state and configuration

use crate::att::{ATT_DEFAULT_L2CAP_MTU, ATT_DEFAULT_LE_MTU};
use crate::gap::{AddressType, BdAddr, SecurityLevel};
use std::fmt;

/// Connection status of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Bearer used for the next or current connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    /// LE fixed ATT channel
    #[default]
    Le,
    /// BR/EDR channel on a PSM
    BrEdr { psm: u16 },
}

impl TransportMode {
    pub fn from_psm(psm: u16) -> Self {
        match psm {
            0 => TransportMode::Le,
            psm => TransportMode::BrEdr { psm },
        }
    }

    pub fn psm(self) -> u16 {
        match self {
            TransportMode::Le => 0,
            TransportMode::BrEdr { psm } => psm,
        }
    }

    pub fn is_le(self) -> bool {
        self == TransportMode::Le
    }

    /// MTU in effect before any exchange
    pub fn default_mtu(self) -> u16 {
        match self {
            TransportMode::Le => ATT_DEFAULT_LE_MTU,
            TransportMode::BrEdr { .. } => ATT_DEFAULT_L2CAP_MTU,
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Le => write!(f, "LE"),
            TransportMode::BrEdr { .. } => write!(f, "BR"),
        }
    }
}

/// Startup configuration of a session
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Local adapter (`hciN` or address)
    pub source: Option<String>,
    /// Default remote device for `connect`
    pub destination: Option<BdAddr>,
    /// Default remote address type
    pub address_type: AddressType,
    /// Initial security level
    pub security_level: SecurityLevel,
    /// BR/EDR PSM, 0 for LE
    pub psm: u16,
    /// Incoming MTU hint passed to the transport, 0 for its default
    pub mtu: u16,
}

/// Observable state of a session
///
/// Only the session mutates it. `connection_handle` is nonzero exactly while
/// the status is [`ConnectionStatus::Connected`].
#[derive(Debug, Clone)]
pub struct SessionState {
    pub(crate) status: ConnectionStatus,
    pub(crate) peer_address: Option<BdAddr>,
    pub(crate) peer_address_type: AddressType,
    pub(crate) negotiated_mtu: Option<u16>,
    pub(crate) channel_mtu: Option<u16>,
    pub(crate) mtu_exchanged: bool,
    pub(crate) security_level: SecurityLevel,
    pub(crate) connection_handle: u16,
    pub(crate) mode: TransportMode,
}

impl SessionState {
    pub(crate) fn from_config(config: &SessionConfig) -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            peer_address: config.destination,
            peer_address_type: config.address_type,
            negotiated_mtu: None,
            channel_mtu: None,
            mtu_exchanged: false,
            security_level: config.security_level,
            connection_handle: 0,
            mode: TransportMode::from_psm(config.psm),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn peer_address(&self) -> Option<BdAddr> {
        self.peer_address
    }

    pub fn peer_address_type(&self) -> AddressType {
        self.peer_address_type
    }

    pub fn negotiated_mtu(&self) -> Option<u16> {
        self.negotiated_mtu
    }

    pub fn security_level(&self) -> SecurityLevel {
        self.security_level
    }

    pub fn connection_handle(&self) -> u16 {
        self.connection_handle
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    /// MTU of the BR/EDR channel, as reported by the transport
    pub fn channel_mtu(&self) -> Option<u16> {
        self.channel_mtu
    }

    /// ATT MTU currently in effect
    pub fn effective_mtu(&self) -> u16 {
        self.negotiated_mtu
            .or(self.channel_mtu)
            .unwrap_or_else(|| self.mode.default_mtu())
    }

    /// Peer address as printed in records
    pub(crate) fn peer_label(&self) -> String {
        self.peer_address.unwrap_or(BdAddr::ANY).to_string()
    }

    /// Clears everything tied to the current connection
    pub(crate) fn reset_connection(&mut self) {
        self.status = ConnectionStatus::Disconnected;
        self.negotiated_mtu = None;
        self.channel_mtu = None;
        self.mtu_exchanged = false;
        self.connection_handle = 0;
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}
