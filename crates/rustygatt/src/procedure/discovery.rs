//! Service, characteristic and descriptor discovery

use super::{error_record, Step};
use crate::att::*;
use crate::session::Record;
use crate::uuid::Uuid;
use bitflags::bitflags;
use log::debug;

bitflags! {
    /// Characteristic properties as defined in the Bluetooth specification
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CharProperties: u8 {
        const BROADCAST = 0x01;
        const READ = 0x02;
        const WRITE_WITHOUT_RESPONSE = 0x04;
        const WRITE = 0x08;
        const NOTIFY = 0x10;
        const INDICATE = 0x20;
        const AUTHENTICATED_SIGNED_WRITES = 0x40;
        const EXTENDED_PROPERTIES = 0x80;
    }
}

/// Advances `next` past `last`, or `None` when the range is exhausted or the
/// peer made no progress
fn advance(next: u16, last: u16, range_end: u16) -> Option<u16> {
    if last < next || last >= range_end {
        return None;
    }
    last.checked_add(1)
}

fn is_not_found(err: &AttError) -> bool {
    matches!(err, AttError::Protocol(AttErrorCode::AttributeNotFound, _))
}

/// A primary service found by discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRange {
    pub start: u16,
    pub end: u16,
    pub uuid: Option<Uuid>,
}

/// Discovery of every primary service (`primary`)
#[derive(Debug)]
pub struct PrimaryAll {
    next_handle: u16,
    services: Vec<ServiceRange>,
}

impl PrimaryAll {
    pub fn new() -> Self {
        Self {
            next_handle: ATT_HANDLE_MIN,
            services: Vec::new(),
        }
    }

    pub fn request(&self) -> Vec<u8> {
        ReadByGroupTypeRequest {
            start_handle: self.next_handle,
            end_handle: ATT_HANDLE_MAX,
            group_type: Uuid::from_u16(PRIMARY_SERVICE_UUID),
        }
        .serialize()
    }

    fn finish(&self, handle: u16) -> Step {
        let mut records: Vec<Record> = self
            .services
            .iter()
            .map(|s| {
                let uuid = s.uuid.map(|u| u.to_string()).unwrap_or_default();
                Record::new("PRIMARY-ALL", handle, format!("{:04x} {:04x} {}", s.start, s.end, uuid))
            })
            .collect();
        records.push(Record::ok("PRIMARY-ALL-END", handle));
        Step::done(records)
    }

    pub fn step(&mut self, handle: u16, pdu: &[u8]) -> Step {
        let rsp = expect_response(ATT_READ_BY_GROUP_TYPE_RSP, pdu)
            .and_then(ReadByGroupTypeResponse::parse);

        let rsp = match rsp {
            Ok(rsp) => rsp,
            Err(err) if is_not_found(&err) => return self.finish(handle),
            Err(err) => return Step::done(vec![error_record("PRIMARY-ALL-END", handle, &err)]),
        };

        let mut last = 0;
        for item in rsp.data {
            last = last.max(item.end_group_handle);
            self.services.push(ServiceRange {
                start: item.handle,
                end: item.end_group_handle,
                uuid: Uuid::try_from_slice_le(&item.value),
            });
        }

        match advance(self.next_handle, last, ATT_HANDLE_MAX) {
            Some(next) => {
                self.next_handle = next;
                Step::resume(Vec::new(), self.request())
            }
            None => self.finish(handle),
        }
    }
}

impl Default for PrimaryAll {
    fn default() -> Self {
        Self::new()
    }
}

/// Discovery of primary services of one type (`primary <uuid>`)
#[derive(Debug)]
pub struct PrimaryByUuid {
    uuid: Uuid,
    next_handle: u16,
    ranges: Vec<HandleRange>,
}

impl PrimaryByUuid {
    pub fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            next_handle: ATT_HANDLE_MIN,
            ranges: Vec::new(),
        }
    }

    pub fn request(&self) -> Vec<u8> {
        FindByTypeValueRequest {
            start_handle: self.next_handle,
            end_handle: ATT_HANDLE_MAX,
            attribute_type: PRIMARY_SERVICE_UUID,
            attribute_value: self.uuid.to_att_bytes(),
        }
        .serialize()
    }

    fn finish(&self, handle: u16) -> Step {
        let mut records: Vec<Record> = self
            .ranges
            .iter()
            .map(|r| {
                Record::new(
                    "PRIMARY-UUID",
                    handle,
                    format!("{:04x} {:04x}", r.found_handle, r.group_end_handle),
                )
            })
            .collect();
        records.push(Record::ok("PRIMARY-UUID-END", handle));
        Step::done(records)
    }

    pub fn step(&mut self, handle: u16, pdu: &[u8]) -> Step {
        let rsp = expect_response(ATT_FIND_BY_TYPE_VALUE_RSP, pdu)
            .and_then(FindByTypeValueResponse::parse);

        let rsp = match rsp {
            Ok(rsp) => rsp,
            Err(err) if is_not_found(&err) => return self.finish(handle),
            Err(err) => return Step::done(vec![error_record("PRIMARY-UUID-END", handle, &err)]),
        };

        let last = rsp.handles.iter().map(|r| r.group_end_handle).max().unwrap_or(0);
        self.ranges.extend(rsp.handles);

        match advance(self.next_handle, last, ATT_HANDLE_MAX) {
            Some(next) => {
                self.next_handle = next;
                Step::resume(Vec::new(), self.request())
            }
            None => self.finish(handle),
        }
    }
}

/// A characteristic declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicDecl {
    pub handle: u16,
    pub properties: CharProperties,
    pub value_handle: u16,
    pub uuid: Uuid,
}

impl CharacteristicDecl {
    fn parse(handle: u16, value: &[u8]) -> Option<Self> {
        if value.len() != 5 && value.len() != 19 {
            return None;
        }
        Some(Self {
            handle,
            properties: CharProperties::from_bits_retain(value[0]),
            value_handle: u16::from_le_bytes([value[1], value[2]]),
            uuid: Uuid::try_from_slice_le(&value[3..])?,
        })
    }
}

/// Characteristic discovery over a handle range (`characteristics`)
#[derive(Debug)]
pub struct Characteristics {
    next_handle: u16,
    range_end: u16,
    filter: Option<Uuid>,
    found: Vec<CharacteristicDecl>,
}

impl Characteristics {
    pub fn new(start: u16, end: u16, filter: Option<Uuid>) -> Self {
        Self {
            next_handle: start,
            range_end: end,
            filter,
            found: Vec::new(),
        }
    }

    pub fn request(&self) -> Vec<u8> {
        ReadByTypeRequest {
            start_handle: self.next_handle,
            end_handle: self.range_end,
            attribute_type: Uuid::from_u16(CHARACTERISTIC_UUID),
        }
        .serialize()
    }

    fn finish(&self, handle: u16) -> Step {
        let mut records: Vec<Record> = self
            .found
            .iter()
            .map(|c| {
                Record::new(
                    "CHAR",
                    handle,
                    format!(
                        "{:04x} {:02x} {:04x} {}",
                        c.handle,
                        c.properties.bits(),
                        c.value_handle,
                        c.uuid
                    ),
                )
            })
            .collect();
        records.push(Record::ok("CHAR-END", handle));
        Step::done(records)
    }

    pub fn step(&mut self, handle: u16, pdu: &[u8]) -> Step {
        let rsp = expect_response(ATT_READ_BY_TYPE_RSP, pdu).and_then(ReadByTypeResponse::parse);

        let rsp = match rsp {
            Ok(rsp) => rsp,
            Err(err) if is_not_found(&err) => return self.finish(handle),
            Err(err) => return Step::done(vec![error_record("CHAR-END", handle, &err)]),
        };

        let mut last = 0;
        for item in &rsp.data {
            last = last.max(item.handle);
            let Some(decl) = CharacteristicDecl::parse(item.handle, &item.value) else {
                debug!("Skipping malformed characteristic declaration at {:04x}", item.handle);
                continue;
            };
            if self.filter.map_or(true, |uuid| uuid == decl.uuid) {
                self.found.push(decl);
            }
        }

        match advance(self.next_handle, last, self.range_end) {
            Some(next) => {
                self.next_handle = next;
                Step::resume(Vec::new(), self.request())
            }
            None => self.finish(handle),
        }
    }
}

/// Descriptor discovery cursor (`char-desc`)
///
/// Prints each page as it arrives; the terminal record follows the page
/// covering the end of the range.
#[derive(Debug)]
pub struct DiscoveryCursor {
    next_handle: u16,
    range_end: u16,
}

impl DiscoveryCursor {
    pub fn new(start: u16, end: u16) -> Self {
        Self {
            next_handle: start,
            range_end: end,
        }
    }

    pub fn next_handle(&self) -> u16 {
        self.next_handle
    }

    pub fn request(&self) -> Vec<u8> {
        FindInformationRequest {
            start_handle: self.next_handle,
            end_handle: self.range_end,
        }
        .serialize()
    }

    pub fn step(&mut self, handle: u16, pdu: &[u8]) -> Step {
        let rsp = match expect_response(ATT_FIND_INFO_RSP, pdu).and_then(FindInformationResponse::parse) {
            Ok(rsp) => rsp,
            Err(err) => return Step::done(vec![error_record("CHAR-DESC-END", handle, &err)]),
        };

        let mut records = Vec::with_capacity(rsp.information_data.len() + 1);
        let mut last = 0;
        for pair in &rsp.information_data {
            last = last.max(pair.handle);
            records.push(Record::new(
                "CHAR-DESC",
                handle,
                format!("{:04x} {}", pair.handle, pair.uuid),
            ));
        }

        match advance(self.next_handle, last, self.range_end) {
            Some(next) => {
                self.next_handle = next;
                Step::resume(records, self.request())
            }
            None => {
                records.push(Record::ok("CHAR-DESC-END", handle));
                Step::done(records)
            }
        }
    }
}
