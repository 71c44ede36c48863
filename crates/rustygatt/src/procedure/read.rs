//! Reads by handle and by UUID

use super::{error_record, Step};
use crate::att::*;
use crate::session::{handle_and_bytes, hex_bytes, Record};
use crate::uuid::Uuid;
use log::trace;

/// Read-by-UUID cursor (`char-read-uuid`)
///
/// "Attribute not found" ends the sequence quietly once at least one page has
/// been read. On the first page it is reported as the terminal record.
#[derive(Debug)]
pub struct ReadByUuidCursor {
    range_start: u16,
    cursor_start: u16,
    range_end: u16,
    target_uuid: Uuid,
}

impl ReadByUuidCursor {
    pub fn new(uuid: Uuid, start: u16, end: u16) -> Self {
        Self {
            range_start: start,
            cursor_start: start,
            range_end: end,
            target_uuid: uuid,
        }
    }

    pub fn cursor_start(&self) -> u16 {
        self.cursor_start
    }

    pub fn request(&self) -> Vec<u8> {
        ReadByTypeRequest {
            start_handle: self.cursor_start,
            end_handle: self.range_end,
            attribute_type: self.target_uuid,
        }
        .serialize()
    }

    pub fn step(&mut self, handle: u16, pdu: &[u8]) -> Step {
        const END: &str = "CHAR-READ-UUID-END";

        let rsp = match expect_response(ATT_READ_BY_TYPE_RSP, pdu).and_then(ReadByTypeResponse::parse) {
            Ok(rsp) => rsp,
            Err(AttError::Protocol(AttErrorCode::AttributeNotFound, _))
                if self.cursor_start != self.range_start =>
            {
                return Step::done(vec![Record::ok(END, handle)]);
            }
            Err(err) => return Step::done(vec![error_record(END, handle, &err)]),
        };

        let mut records = Vec::with_capacity(rsp.data.len() + 1);
        let previous = self.cursor_start;
        let mut exhausted = false;
        for item in &rsp.data {
            match item.handle.checked_add(1) {
                Some(next) => self.cursor_start = self.cursor_start.max(next),
                None => exhausted = true,
            }
            records.push(Record::new(
                "CHAR-READ-UUID",
                handle,
                handle_and_bytes(item.handle, &item.value),
            ));
        }

        let stalled = self.cursor_start == previous;
        if exhausted || stalled || self.cursor_start > self.range_end {
            records.push(Record::ok(END, handle));
            return Step::done(records);
        }

        trace!("Read by UUID continues at {:04x}", self.cursor_start);
        Step::resume(records, self.request())
    }
}

/// Read of a value by handle (`char-read-hnd`)
///
/// Starts with Read, or Read Blob for a nonzero offset, and keeps issuing
/// Read Blob while each chunk fills the MTU.
#[derive(Debug)]
pub struct LongRead {
    handle: u16,
    offset: u16,
    mtu: u16,
    value: Vec<u8>,
}

impl LongRead {
    pub fn new(handle: u16, offset: u16, mtu: u16) -> Self {
        Self {
            handle,
            offset,
            mtu,
            value: Vec::new(),
        }
    }

    fn blob(&self) -> bool {
        self.offset != 0 || !self.value.is_empty()
    }

    fn next_offset(&self) -> Option<u16> {
        u16::try_from(self.value.len())
            .ok()
            .and_then(|len| self.offset.checked_add(len))
    }

    pub fn request(&self) -> Vec<u8> {
        if !self.blob() {
            return ReadRequest {
                handle: self.handle,
            }
            .serialize();
        }
        ReadBlobRequest {
            handle: self.handle,
            offset: self.next_offset().unwrap_or(u16::MAX),
        }
        .serialize()
    }

    fn finish(&self, handle: u16) -> Step {
        let body = if self.value.is_empty() {
            "0".to_string()
        } else {
            format!("0 {}", hex_bytes(&self.value))
        };
        Step::done(vec![Record::new("CHAR-VAL-DESC", handle, body)])
    }

    pub fn step(&mut self, handle: u16, pdu: &[u8]) -> Step {
        let expected = if self.blob() { ATT_READ_BLOB_RSP } else { ATT_READ_RSP };

        let chunk = match expect_response(expected, pdu) {
            Ok(pdu) => &pdu[1..],
            // Peer refuses to go further into a value already partly read
            Err(AttError::Protocol(AttErrorCode::AttributeNotLong | AttErrorCode::InvalidOffset, _))
                if !self.value.is_empty() =>
            {
                return self.finish(handle);
            }
            Err(err) => return Step::done(vec![error_record("CHAR-VAL-DESC", handle, &err)]),
        };

        self.value.extend_from_slice(chunk);

        let full_chunk = chunk.len() + 1 == self.mtu as usize;
        let room = self.offset as usize + self.value.len() < ATT_MAX_VALUE_LEN;
        if full_chunk && room && self.next_offset().is_some() {
            return Step::resume(Vec::new(), self.request());
        }

        self.finish(handle)
    }
}
