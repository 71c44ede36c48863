//! Acknowledged writes (`char-write-req`)

use super::{error_record, Step};
use crate::att::*;
use crate::session::{Record, STATUS_INVALID_ARGUMENT};

const LABEL: &str = "CHAR-WRITE-REQ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Single,
    Prepare { offset: usize },
    Execute,
}

/// Write Request, or a Prepare/Execute sequence for values too long for one
/// Write Request
#[derive(Debug)]
pub struct LongWrite {
    handle: u16,
    value: Vec<u8>,
    chunk_len: usize,
    phase: Phase,
}

impl LongWrite {
    pub fn new(handle: u16, value: Vec<u8>, mtu: u16) -> Self {
        let mtu = mtu as usize;
        let phase = if value.len() + 3 <= mtu {
            Phase::Single
        } else {
            Phase::Prepare { offset: 0 }
        };
        Self {
            handle,
            value,
            chunk_len: mtu.saturating_sub(5).max(1),
            phase,
        }
    }

    pub fn is_long(&self) -> bool {
        self.phase != Phase::Single
    }

    pub fn request(&self) -> Vec<u8> {
        match self.phase {
            Phase::Single => WriteRequest {
                handle: self.handle,
                value: self.value.clone(),
            }
            .serialize(),
            Phase::Prepare { offset } => {
                let end = (offset + self.chunk_len).min(self.value.len());
                PrepareWriteRequest {
                    handle: self.handle,
                    offset: offset as u16,
                    value: self.value[offset..end].to_vec(),
                }
                .serialize()
            }
            Phase::Execute => ExecuteWriteRequest {
                flags: ATT_EXEC_WRITE_COMMIT,
            }
            .serialize(),
        }
    }

    pub fn step(&mut self, handle: u16, pdu: &[u8]) -> Step {
        let expected = match self.phase {
            Phase::Single => ATT_WRITE_RSP,
            Phase::Prepare { .. } => ATT_PREPARE_WRITE_RSP,
            Phase::Execute => ATT_EXECUTE_WRITE_RSP,
        };

        let pdu = match expect_response(expected, pdu) {
            Ok(pdu) => pdu,
            Err(err @ AttError::Protocol(..)) => return Step::done(vec![error_record(LABEL, handle, &err)]),
            Err(_) => {
                return Step::done(vec![Record::new(LABEL, handle, STATUS_INVALID_ARGUMENT.to_string())])
            }
        };

        match self.phase {
            Phase::Single | Phase::Execute => Step::done(vec![Record::ok(LABEL, handle)]),
            Phase::Prepare { offset } => {
                if PrepareWriteResponse::parse(pdu).is_err() {
                    return Step::done(vec![Record::new(LABEL, handle, STATUS_INVALID_ARGUMENT.to_string())]);
                }

                let offset = (offset + self.chunk_len).min(self.value.len());
                self.phase = if offset == self.value.len() {
                    Phase::Execute
                } else {
                    Phase::Prepare { offset }
                };
                Step::resume(Vec::new(), self.request())
            }
        }
    }
}
