//! In-memory transport
//!
//! Records everything the session asks of it. Completion events are not
//! generated; tests feed them to the session themselves.

use super::{ChannelId, ConnectParams, Transport};
use crate::att::ATT_DEFAULT_L2CAP_MTU;
use crate::error::TransportError;
use crate::gap::SecurityLevel;
use std::collections::HashSet;

/// Transport double that records connects, sent PDUs and closes
#[derive(Debug, Default)]
pub struct MockTransport {
    /// Parameters of every connect call, in order
    pub connects: Vec<ConnectParams>,
    /// Every PDU sent, with the channel it was sent on
    pub sent: Vec<(ChannelId, Vec<u8>)>,
    /// Channels closed, in order
    pub closed: Vec<ChannelId>,
    /// Security levels applied to live channels
    pub security_changes: Vec<(ChannelId, SecurityLevel)>,
    /// Handle returned by [`Transport::handle`]
    pub connection_handle: u16,
    /// MTU returned by [`Transport::mtu`]
    pub channel_mtu: u16,
    /// When set, `connect` fails with this code and message
    pub connect_error: Option<(i32, String)>,
    /// When set, `set_security_level` fails with this code and message
    pub security_error: Option<(i32, String)>,
    open: HashSet<ChannelId>,
    next_channel: u64,
}

impl MockTransport {
    pub fn new(connection_handle: u16) -> Self {
        Self {
            connection_handle,
            channel_mtu: ATT_DEFAULT_L2CAP_MTU,
            ..Self::default()
        }
    }

    /// Most recently opened channel
    pub fn last_channel(&self) -> Option<ChannelId> {
        self.next_channel.checked_sub(1).map(ChannelId)
    }

    /// PDUs sent so far, without their channel
    pub fn sent_pdus(&self) -> Vec<Vec<u8>> {
        self.sent.iter().map(|(_, pdu)| pdu.clone()).collect()
    }

    /// Removes and returns the PDUs sent so far
    pub fn take_sent(&mut self) -> Vec<Vec<u8>> {
        self.sent.drain(..).map(|(_, pdu)| pdu).collect()
    }
}

impl Transport for MockTransport {
    fn connect(&mut self, params: &ConnectParams) -> Result<ChannelId, TransportError> {
        self.connects.push(params.clone());
        if let Some((code, message)) = &self.connect_error {
            return Err(TransportError::Rejected {
                code: *code,
                message: message.clone(),
            });
        }

        let channel = ChannelId(self.next_channel);
        self.next_channel += 1;
        self.open.insert(channel);
        Ok(channel)
    }

    fn send(&mut self, channel: ChannelId, pdu: &[u8]) -> Result<(), TransportError> {
        if !self.open.contains(&channel) {
            return Err(TransportError::NotOpen(channel));
        }
        self.sent.push((channel, pdu.to_vec()));
        Ok(())
    }

    fn handle(&self, channel: ChannelId) -> Result<u16, TransportError> {
        if !self.open.contains(&channel) {
            return Err(TransportError::NotOpen(channel));
        }
        Ok(self.connection_handle)
    }

    fn mtu(&self, channel: ChannelId) -> Result<u16, TransportError> {
        if !self.open.contains(&channel) {
            return Err(TransportError::NotOpen(channel));
        }
        Ok(self.channel_mtu)
    }

    fn set_security_level(
        &mut self,
        channel: ChannelId,
        level: SecurityLevel,
    ) -> Result<(), TransportError> {
        if let Some((code, message)) = &self.security_error {
            return Err(TransportError::Rejected {
                code: *code,
                message: message.clone(),
            });
        }
        if !self.open.contains(&channel) {
            return Err(TransportError::NotOpen(channel));
        }
        self.security_changes.push((channel, level));
        Ok(())
    }

    fn close(&mut self, channel: ChannelId) {
        if self.open.remove(&channel) {
            self.closed.push(channel);
        }
    }
}
