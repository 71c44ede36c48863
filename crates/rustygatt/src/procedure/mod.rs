//! Multi round-trip ATT procedures
//!
//! Every operator command that talks to the peer runs as a [`Procedure`]: a
//! resumable state object that produces its first request, then consumes one
//! response at a time through [`Procedure::step`]. Each step reports the
//! records to print and either the next request or completion. Only one
//! procedure is in flight per session.

pub mod discovery;
pub mod mtu;
pub mod read;
pub mod write;

#[cfg(test)]
mod tests;

pub use discovery::{CharProperties, Characteristics, DiscoveryCursor, PrimaryAll, PrimaryByUuid};
pub use mtu::MtuExchange;
pub use read::{LongRead, ReadByUuidCursor};
pub use write::LongWrite;

use crate::att::AttError;
use crate::session::Record;

/// Session-level change requested by a completed step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// The peer accepted this ATT MTU
    MtuNegotiated(u16),
}

/// Outcome of feeding one response to a procedure
#[derive(Debug, Default)]
pub struct Step {
    /// Records to print, in order
    pub records: Vec<Record>,
    /// Next request, or `None` when the procedure is finished
    pub next: Option<Vec<u8>>,
    /// Side effect on the session
    pub effect: Option<Effect>,
}

impl Step {
    pub(crate) fn done(records: Vec<Record>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    pub(crate) fn resume(records: Vec<Record>, request: Vec<u8>) -> Self {
        Self {
            records,
            next: Some(request),
            effect: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.next.is_none()
    }
}

/// A pending ATT procedure
#[derive(Debug)]
pub enum Procedure {
    PrimaryAll(PrimaryAll),
    PrimaryByUuid(PrimaryByUuid),
    Characteristics(Characteristics),
    Descriptors(DiscoveryCursor),
    ReadByUuid(ReadByUuidCursor),
    ReadHandle(LongRead),
    WriteRequest(LongWrite),
    ExchangeMtu(MtuExchange),
}

impl Procedure {
    /// Request that starts the procedure
    pub fn request(&self) -> Vec<u8> {
        match self {
            Procedure::PrimaryAll(p) => p.request(),
            Procedure::PrimaryByUuid(p) => p.request(),
            Procedure::Characteristics(p) => p.request(),
            Procedure::Descriptors(p) => p.request(),
            Procedure::ReadByUuid(p) => p.request(),
            Procedure::ReadHandle(p) => p.request(),
            Procedure::WriteRequest(p) => p.request(),
            Procedure::ExchangeMtu(p) => p.request(),
        }
    }

    /// Consumes one response PDU
    ///
    /// `handle` is the connection handle printed in the records.
    pub fn step(&mut self, handle: u16, pdu: &[u8]) -> Step {
        match self {
            Procedure::PrimaryAll(p) => p.step(handle, pdu),
            Procedure::PrimaryByUuid(p) => p.step(handle, pdu),
            Procedure::Characteristics(p) => p.step(handle, pdu),
            Procedure::Descriptors(p) => p.step(handle, pdu),
            Procedure::ReadByUuid(p) => p.step(handle, pdu),
            Procedure::ReadHandle(p) => p.step(handle, pdu),
            Procedure::WriteRequest(p) => p.step(handle, pdu),
            Procedure::ExchangeMtu(p) => p.step(handle, pdu),
        }
    }

    /// Label used for records about this procedure
    pub fn label(&self) -> &'static str {
        match self {
            Procedure::PrimaryAll(_) => "PRIMARY-ALL-END",
            Procedure::PrimaryByUuid(_) => "PRIMARY-UUID-END",
            Procedure::Characteristics(_) => "CHAR-END",
            Procedure::Descriptors(_) => "CHAR-DESC-END",
            Procedure::ReadByUuid(_) => "CHAR-READ-UUID-END",
            Procedure::ReadHandle(_) => "CHAR-VAL-DESC",
            Procedure::WriteRequest(_) => "CHAR-WRITE-REQ",
            Procedure::ExchangeMtu(_) => "MTU",
        }
    }
}

/// `LABEL(h): <code> <description>` for an error ending a procedure
pub(crate) fn error_record(label: &'static str, handle: u16, err: &AttError) -> Record {
    let code = err.to_error_code();
    Record::status(label, handle, u8::from(code), code.describe())
}
