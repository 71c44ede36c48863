//! Session controller
//!
//! A [`Session`] owns the connection state, the transport and the single
//! in-flight [`Procedure`]. It is driven from one thread by two kinds of
//! input: operator lines ([`Session::handle_line`]) and transport events
//! ([`Session::handle_event`]). Everything it wants shown is queued as
//! [`Output`] and collected with [`Session::take_output`].

mod output;
mod state;


pub use output::*;
pub use state::{ConnectionStatus, SessionConfig, SessionState, TransportMode};

use crate::att::{is_response, ATT_DEFAULT_LE_MTU};
use crate::command::{self, handlers, tokenize};
use crate::error::TransportError;
use crate::events;
use crate::gap::SecurityLevel;
use crate::procedure::{Effect, Procedure};
use crate::transport::{ChannelId, ConnectParams, Transport, TransportEvent};
use log::{debug, info, trace, warn};

/// Why a connection is being torn down
#[derive(Debug)]
enum Teardown {
    /// Operator asked for it
    Local,
    /// Peer hung up
    PeerClosed,
    /// Channel failure
    Failed(TransportError),
}

/// Interactive GATT client session
pub struct Session<T: Transport> {
    config: SessionConfig,
    pub(crate) state: SessionState,
    transport: T,
    channel: Option<ChannelId>,
    pending: Option<Procedure>,
    output: Vec<Output>,
    exit: bool,
}

impl<T: Transport> Session<T> {
    pub fn new(config: SessionConfig, transport: T) -> Self {
        Self {
            state: SessionState::from_config(&config),
            config,
            transport,
            channel: None,
            pending: None,
            output: Vec::new(),
            exit: false,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Channel of the current connection attempt, if any
    pub fn channel(&self) -> Option<ChannelId> {
        self.channel
    }

    /// Whether a request is awaiting its response
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether the operator asked to leave
    pub fn should_exit(&self) -> bool {
        self.exit
    }

    /// Drains everything queued for display
    pub fn take_output(&mut self) -> Vec<Output> {
        std::mem::take(&mut self.output)
    }

    /// Prompt text reflecting the connection state
    pub fn prompt(&self) -> String {
        if self.state.status == ConnectionStatus::Connecting {
            return "Connecting...\n".to_string();
        }

        let status = if self.state.is_connected() { "[CON]" } else { "[   ]" };
        let address = self.state.peer_address.map(|a| a.to_string()).unwrap_or_default();
        format!("{}[{:>17}][{}]\n> ", status, address, self.state.mode)
    }

    /// Processes one operator line; `None` means end of input
    pub fn handle_line(&mut self, line: Option<&str>) {
        let Some(line) = line else {
            debug!("End of input");
            self.exit = true;
            return;
        };

        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let words = match tokenize(line) {
            Ok(words) => words,
            Err(err) => {
                self.emit(Record::status("ERROR", self.state.connection_handle, STATUS_USAGE, &err.to_string()));
                return;
            }
        };
        let Some(name) = words.first() else {
            return;
        };

        match command::lookup(name) {
            Some(spec) => {
                trace!("Running {} with {:?}", spec.name, &words[1..]);
                handlers::handler::<T>(spec.command)(self, &words)
            }
            None => self.emit(Record::status(
                "ERROR",
                self.state.connection_handle,
                STATUS_COMMAND_FAILED,
                &format!("{}: command not found", name),
            )),
        }
    }

    /// Processes one event from the transport
    pub fn handle_event(&mut self, event: TransportEvent) {
        let channel = event.channel();
        if self.channel != Some(channel) {
            warn!("Dropping event for stale channel {}: {:?}", channel, event);
            return;
        }

        match event {
            TransportEvent::Connected(_) => self.on_connected(channel),
            TransportEvent::ConnectFailed(_, err) => self.on_connect_failed(channel, err),
            TransportEvent::Pdu(_, pdu) => self.on_pdu(&pdu),
            TransportEvent::Hangup(_) => self.teardown(Teardown::PeerClosed),
            TransportEvent::Error(_, err) => self.teardown(Teardown::Failed(err)),
        }
    }

    /// Disconnects before the session is dropped
    pub fn shutdown(&mut self) {
        self.teardown(Teardown::Local);
    }

    pub(crate) fn emit(&mut self, record: Record) {
        self.output.push(Output::Record(record));
    }

    pub(crate) fn emit_text(&mut self, text: String) {
        self.output.push(Output::Text(text));
    }

    pub(crate) fn request_exit(&mut self) {
        self.exit = true;
    }

    /// Starts connecting to the stored peer; the caller checked the state
    pub(crate) fn begin_connect(&mut self) {
        let Some(destination) = self.state.peer_address else {
            return;
        };

        let params = ConnectParams {
            source: self.config.source.clone(),
            destination,
            address_type: self.state.peer_address_type,
            security_level: self.state.security_level,
            psm: self.state.mode.psm(),
            mtu: self.config.mtu,
        };

        self.state.status = ConnectionStatus::Connecting;
        info!("Connecting to {} ({})", destination, self.state.peer_address_type);

        match self.transport.connect(&params) {
            Ok(channel) => self.channel = Some(channel),
            Err(err) => {
                self.state.reset_connection();
                let body = format!("{} {} {}", destination, err.code(), err);
                self.emit(Record::new("CONNECTED", 0, body));
            }
        }
    }

    fn on_connected(&mut self, channel: ChannelId) {
        if self.state.status != ConnectionStatus::Connecting {
            warn!("Unexpected connection completion on {}", channel);
            return;
        }

        let handle = match self.transport.handle(channel) {
            Ok(0) => Err(TransportError::NoHandle),
            result => result,
        };

        match handle {
            Ok(handle) => {
                self.state.status = ConnectionStatus::Connected;
                self.state.connection_handle = handle;
                if !self.state.mode.is_le() {
                    self.state.channel_mtu = self.query_channel_mtu(channel);
                }
                info!("Connected to {} with handle {:04x}", self.state.peer_label(), handle);
                let body = format!("{} {}", self.state.peer_label(), STATUS_OK);
                self.emit(Record::new("CONNECTED", handle, body));
            }
            Err(err) => {
                self.transport.close(channel);
                self.channel = None;
                self.state.reset_connection();
                let body = format!("{} {} {}", self.state.peer_label(), err.code(), err);
                self.emit(Record::new("CONNECTED", 0, body));
            }
        }
    }

    /// BR/EDR has no MTU exchange; the L2CAP channel MTU is the ATT MTU
    fn query_channel_mtu(&self, channel: ChannelId) -> Option<u16> {
        match self.transport.mtu(channel) {
            Ok(mtu) if mtu >= ATT_DEFAULT_LE_MTU => {
                debug!("Channel {} MTU is {}", channel, mtu);
                Some(mtu)
            }
            Ok(mtu) => {
                warn!("Ignoring MTU {} reported for {}", mtu, channel);
                None
            }
            Err(err) => {
                warn!("MTU of {} unavailable: {}", channel, err);
                None
            }
        }
    }

    fn on_connect_failed(&mut self, channel: ChannelId, err: TransportError) {
        debug!("Connection attempt on {} failed: {}", channel, err);
        self.transport.close(channel);
        self.channel = None;
        self.pending = None;
        self.state.reset_connection();
        let body = format!("{} {} {}", self.state.peer_label(), err.code(), err);
        self.emit(Record::new("CONNECTED", 0, body));
    }

    /// Releases the channel and reports the disconnection
    ///
    /// Any in-flight procedure is dropped; responses arriving for it later
    /// carry a stale channel id.
    fn teardown(&mut self, reason: Teardown) {
        if self.state.status == ConnectionStatus::Disconnected {
            return;
        }

        if let Some(channel) = self.channel.take() {
            self.transport.close(channel);
        }
        if let Some(procedure) = self.pending.take() {
            debug!("Abandoning {} procedure", procedure.label());
        }

        let handle = self.state.connection_handle;
        let body = match &reason {
            Teardown::Local => self.state.peer_label(),
            Teardown::PeerClosed => format!("{} peer closed", self.state.peer_label()),
            Teardown::Failed(err) => format!("{} {} {}", self.state.peer_label(), err.code(), err),
        };
        info!("Disconnected from {} ({:?})", self.state.peer_label(), reason);

        self.state.reset_connection();
        self.emit(Record::new("DISCONNECTED", handle, body));
    }

    /// Sends the first request of `procedure` and makes it the pending one
    pub(crate) fn start(&mut self, procedure: Procedure) {
        let request = procedure.request();
        match self.send(&request) {
            Ok(()) => self.pending = Some(procedure),
            Err(err) => {
                let record = Record::status(
                    procedure.label(),
                    self.state.connection_handle,
                    err.code(),
                    &err.to_string(),
                );
                self.emit(record);
            }
        }
    }

    /// Applies a security level to the live channel
    pub(crate) fn apply_security_level(&mut self, level: SecurityLevel) -> Result<(), TransportError> {
        let channel = self.channel.ok_or(TransportError::Closed)?;
        debug!("Setting security of {} to {}", channel, level);
        self.transport.set_security_level(channel, level)
    }

    /// Sends one PDU on the live channel
    pub(crate) fn send(&mut self, pdu: &[u8]) -> Result<(), TransportError> {
        let channel = self.channel.ok_or(TransportError::Closed)?;
        trace!("Sending {}", hex::encode(pdu));
        self.transport.send(channel, pdu)
    }

    fn on_pdu(&mut self, pdu: &[u8]) {
        if !self.state.is_connected() {
            warn!("Dropping PDU received while {:?}", self.state.status);
            return;
        }
        let Some(&opcode) = pdu.first() else {
            warn!("Dropping empty PDU");
            return;
        };

        let handle = self.state.connection_handle;

        if !is_response(opcode) {
            let dispatch = events::dispatch(handle, pdu);
            self.emit(dispatch.record);
            if let Some(reply) = dispatch.reply {
                if let Err(err) = self.send(&reply) {
                    warn!("Failed to confirm indication: {}", err);
                }
            }
            return;
        }

        let Some(mut procedure) = self.pending.take() else {
            warn!("Late response 0x{:02x} with no request pending", opcode);
            return;
        };

        let step = procedure.step(handle, pdu);
        for record in step.records {
            self.emit(record);
        }

        if let Some(Effect::MtuNegotiated(mtu)) = step.effect {
            debug!("ATT MTU is now {}", mtu);
            self.state.negotiated_mtu = Some(mtu);
        }

        if let Some(next) = step.next {
            match self.send(&next) {
                Ok(()) => self.pending = Some(procedure),
                Err(err) => {
                    self.emit(Record::status(procedure.label(), handle, err.code(), &err.to_string()))
                }
            }
        }
    }
}
