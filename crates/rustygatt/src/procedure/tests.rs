//! Unit tests for the ATT procedures

use super::*;
use crate::att::*;
use crate::uuid::Uuid;

const CONN: u16 = 0x0040;

fn error_rsp(request: u8, handle: u16, code: u8) -> Vec<u8> {
    ErrorResponse {
        request_opcode: request,
        handle,
        error_code: code.into(),
    }
    .serialize()
}

/// Find Information Response listing CCC descriptors at `handles`
fn find_info_page(handles: impl Iterator<Item = u16>) -> Vec<u8> {
    FindInformationResponse {
        format: ATT_FIND_INFO_RSP_FORMAT_16BIT,
        information_data: handles
            .map(|handle| HandleUuidPair {
                handle,
                uuid: Uuid::from_u16(0x2902),
            })
            .collect(),
    }
    .serialize()
}

fn read_by_type_page(items: &[(u16, &[u8])]) -> Vec<u8> {
    let length = 2 + items.first().map_or(0, |(_, v)| v.len()) as u8;
    ReadByTypeResponse {
        length,
        data: items
            .iter()
            .map(|(handle, value)| HandleValue {
                handle: *handle,
                value: value.to_vec(),
            })
            .collect(),
    }
    .serialize()
}

fn lines(step: &Step) -> Vec<String> {
    step.records.iter().map(|r| r.to_string()).collect()
}

/// Runs a descriptor discovery over [1, n] against a peer answering `k`
/// entries per page; returns the number of requests and the records
fn run_descriptor_discovery(n: u16, k: u16) -> (usize, Vec<String>) {
    let mut procedure = Procedure::Descriptors(DiscoveryCursor::new(1, n));
    let mut request = procedure.request();
    let mut requests = 0;
    let mut output = Vec::new();

    loop {
        requests += 1;
        let req = FindInformationRequest::parse(&request).unwrap();
        let last = req.end_handle.min(req.start_handle + k - 1);
        let step = procedure.step(CONN, &find_info_page(req.start_handle..=last));
        output.extend(lines(&step));
        match step.next {
            Some(next) => request = next,
            None => break,
        }
    }

    (requests, output)
}

#[test]
fn test_descriptor_discovery_issues_one_request_per_page() {
    for (n, k) in [(10u16, 4u16), (8, 4), (1, 5), (5, 1)] {
        let (requests, output) = run_descriptor_discovery(n, k);
        assert_eq!(requests, n.div_ceil(k) as usize, "n={} k={}", n, k);
        assert_eq!(output.len(), n as usize + 1);
        assert_eq!(output.last().unwrap(), "CHAR-DESC-END(0040): 0");
        assert_eq!(
            output[0],
            "CHAR-DESC(0040): 0001 00002902-0000-1000-8000-00805f9b34fb"
        );
    }
}

#[test]
fn test_descriptor_discovery_aborts_on_error() {
    let mut cursor = DiscoveryCursor::new(1, 0xffff);
    let step = cursor.step(CONN, &find_info_page(1..=3));
    assert!(!step.is_done());
    assert_eq!(cursor.next_handle(), 4);

    let step = cursor.step(CONN, &error_rsp(ATT_FIND_INFO_REQ, 4, ATT_ERROR_ATTRIBUTE_NOT_FOUND));
    assert!(step.is_done());
    assert_eq!(
        lines(&step),
        vec!["CHAR-DESC-END(0040): 10 No attribute found within the given range"]
    );
}

#[test]
fn test_descriptor_discovery_stops_without_progress() {
    let mut cursor = DiscoveryCursor::new(5, 0xffff);
    // Peer answers with handles below the requested start
    let step = cursor.step(CONN, &find_info_page(1..=2));
    assert!(step.is_done());
    assert_eq!(step.records.last().unwrap().to_string(), "CHAR-DESC-END(0040): 0");
}

#[test]
fn test_read_by_uuid_not_found_on_first_page() {
    let uuid = Uuid::from_u16(0x2a00);
    let mut cursor = ReadByUuidCursor::new(uuid, 1, 0xffff);
    assert_eq!(
        ReadByTypeRequest::parse(&cursor.request()).unwrap().attribute_type,
        uuid
    );

    let step = cursor.step(CONN, &error_rsp(ATT_READ_BY_TYPE_REQ, 1, ATT_ERROR_ATTRIBUTE_NOT_FOUND));
    assert!(step.is_done());
    assert_eq!(
        lines(&step),
        vec!["CHAR-READ-UUID-END(0040): 10 No attribute found within the given range"]
    );
}

#[test]
fn test_read_by_uuid_not_found_after_a_page_is_normal_end() {
    let mut cursor = ReadByUuidCursor::new(Uuid::from_u16(0x2a00), 1, 0xffff);

    let step = cursor.step(CONN, &read_by_type_page(&[(0x0003, b"ab"), (0x0007, b"cd")]));
    assert_eq!(
        lines(&step),
        vec!["CHAR-READ-UUID(0040): 0003 61 62", "CHAR-READ-UUID(0040): 0007 63 64"]
    );
    assert_eq!(cursor.cursor_start(), 8);
    let next = ReadByTypeRequest::parse(step.next.as_ref().unwrap()).unwrap();
    assert_eq!(next.start_handle, 8);

    let step = cursor.step(CONN, &error_rsp(ATT_READ_BY_TYPE_REQ, 8, ATT_ERROR_ATTRIBUTE_NOT_FOUND));
    assert!(step.is_done());
    assert_eq!(lines(&step), vec!["CHAR-READ-UUID-END(0040): 0"]);
}

#[test]
fn test_read_by_uuid_ends_at_range_end() {
    let mut cursor = ReadByUuidCursor::new(Uuid::from_u16(0x2a00), 1, 0x0010);
    let step = cursor.step(CONN, &read_by_type_page(&[(0x0010, &[0x01])]));
    assert!(step.is_done());
    assert_eq!(step.records.last().unwrap().to_string(), "CHAR-READ-UUID-END(0040): 0");

    let mut cursor = ReadByUuidCursor::new(Uuid::from_u16(0x2a00), 1, 0xffff);
    let step = cursor.step(CONN, &read_by_type_page(&[(0xffff, &[0x01])]));
    assert!(step.is_done());
}

#[test]
fn test_read_by_uuid_other_error_aborts() {
    let mut cursor = ReadByUuidCursor::new(Uuid::from_u16(0x2a00), 1, 0xffff);
    cursor.step(CONN, &read_by_type_page(&[(0x0003, &[0x01])]));
    let step = cursor.step(CONN, &error_rsp(ATT_READ_BY_TYPE_REQ, 4, ATT_ERROR_READ_NOT_PERMITTED));
    assert!(step.is_done());
    assert_eq!(lines(&step), vec!["CHAR-READ-UUID-END(0040): 2 Attribute can't be read"]);
}

#[test]
fn test_primary_all_accumulates_until_not_found() {
    let mut procedure = PrimaryAll::new();
    let page = ReadByGroupTypeResponse {
        length: 6,
        data: vec![
            GroupData {
                handle: 0x0001,
                end_group_handle: 0x0007,
                value: vec![0x00, 0x18],
            },
            GroupData {
                handle: 0x0008,
                end_group_handle: 0x000b,
                value: vec![0x01, 0x18],
            },
        ],
    }
    .serialize();

    let step = procedure.step(CONN, &page);
    assert!(step.records.is_empty());
    let next = ReadByGroupTypeRequest::parse(step.next.as_ref().unwrap()).unwrap();
    assert_eq!(next.start_handle, 0x000c);
    assert_eq!(next.group_type, PRIMARY_SERVICE_UUID);

    let step = procedure.step(CONN, &error_rsp(ATT_READ_BY_GROUP_TYPE_REQ, 0x0c, ATT_ERROR_ATTRIBUTE_NOT_FOUND));
    assert!(step.is_done());
    assert_eq!(
        lines(&step),
        vec![
            "PRIMARY-ALL(0040): 0001 0007 00001800-0000-1000-8000-00805f9b34fb",
            "PRIMARY-ALL(0040): 0008 000b 00001801-0000-1000-8000-00805f9b34fb",
            "PRIMARY-ALL-END(0040): 0",
        ]
    );
}

#[test]
fn test_primary_by_uuid_ends_at_last_handle() {
    let uuid = Uuid::from_u16(0x180a);
    let mut procedure = PrimaryByUuid::new(uuid);
    let req = FindByTypeValueRequest::parse(&procedure.request()).unwrap();
    assert_eq!(req.attribute_type, PRIMARY_SERVICE_UUID);
    assert_eq!(req.attribute_value, vec![0x0a, 0x18]);

    let page = FindByTypeValueResponse {
        handles: vec![HandleRange {
            found_handle: 0x0010,
            group_end_handle: 0xffff,
        }],
    }
    .serialize();
    let step = procedure.step(CONN, &page);
    assert_eq!(
        lines(&step),
        vec!["PRIMARY-UUID(0040): 0010 ffff", "PRIMARY-UUID-END(0040): 0"]
    );
}

#[test]
fn test_characteristics_filter_and_properties() {
    let mut procedure = Characteristics::new(1, 0xffff, Some(Uuid::from_u16(0x2a37)));
    let decl_a: &[u8] = &[0x02, 0x03, 0x00, 0x00, 0x2a];
    let decl_b: &[u8] = &[0x12, 0x05, 0x00, 0x37, 0x2a];
    let step = procedure.step(CONN, &read_by_type_page(&[(0x0002, decl_a), (0x0004, decl_b)]));
    assert!(!step.is_done());

    let step = procedure.step(CONN, &error_rsp(ATT_READ_BY_TYPE_REQ, 5, ATT_ERROR_ATTRIBUTE_NOT_FOUND));
    assert_eq!(
        lines(&step),
        vec![
            "CHAR(0040): 0004 12 0005 00002a37-0000-1000-8000-00805f9b34fb",
            "CHAR-END(0040): 0",
        ]
    );

    let props = CharProperties::from_bits_retain(0x12);
    assert!(props.contains(CharProperties::READ | CharProperties::NOTIFY));
    assert!(!props.contains(CharProperties::WRITE));
}

#[test]
fn test_long_read_follows_full_chunks() {
    let mut procedure = Procedure::ReadHandle(LongRead::new(0x0010, 0, ATT_DEFAULT_LE_MTU));
    assert_eq!(procedure.request(), vec![ATT_READ_REQ, 0x10, 0x00]);

    let mut first = vec![ATT_READ_RSP];
    first.extend(std::iter::repeat(0xaa).take(22));
    let step = procedure.step(CONN, &first);
    let next = ReadBlobRequest::parse(step.next.as_ref().unwrap()).unwrap();
    assert_eq!((next.handle, next.offset), (0x0010, 22));

    let step = procedure.step(CONN, &[ATT_READ_BLOB_RSP, 0x01, 0x02]);
    assert!(step.is_done());
    let expected = format!("CHAR-VAL-DESC(0040): 0 {} 01 02", vec!["aa"; 22].join(" "));
    assert_eq!(lines(&step), vec![expected]);
}

#[test]
fn test_read_with_offset_and_errors() {
    let mut procedure = LongRead::new(0x0010, 4, ATT_DEFAULT_LE_MTU);
    let req = ReadBlobRequest::parse(&procedure.request()).unwrap();
    assert_eq!(req.offset, 4);
    let step = procedure.step(CONN, &[ATT_READ_BLOB_RSP]);
    assert_eq!(lines(&step), vec!["CHAR-VAL-DESC(0040): 0"]);

    let mut procedure = LongRead::new(0x0010, 0, ATT_DEFAULT_LE_MTU);
    let step = procedure.step(CONN, &error_rsp(ATT_READ_REQ, 0x10, ATT_ERROR_INSUFFICIENT_AUTHENTICATION));
    assert_eq!(
        lines(&step),
        vec!["CHAR-VAL-DESC(0040): 5 Attribute requires authentication before read/write"]
    );

    let mut procedure = LongRead::new(0x0010, 0, ATT_DEFAULT_LE_MTU);
    let step = procedure.step(CONN, &[ATT_WRITE_RSP]);
    assert_eq!(lines(&step), vec!["CHAR-VAL-DESC(0040): 4 Attribute PDU was invalid"]);
}

#[test]
fn test_long_read_stops_when_peer_says_not_long() {
    let mut procedure = LongRead::new(0x0010, 0, ATT_DEFAULT_LE_MTU);
    let mut first = vec![ATT_READ_RSP];
    first.extend([0x11; 22]);
    assert!(!procedure.step(CONN, &first).is_done());

    let step = procedure.step(CONN, &error_rsp(ATT_READ_BLOB_REQ, 0x10, ATT_ERROR_ATTRIBUTE_NOT_LONG));
    assert!(step.is_done());
    assert!(lines(&step)[0].starts_with("CHAR-VAL-DESC(0040): 0 11 11"));
}

#[test]
fn test_short_write_uses_write_request() {
    let mut procedure = LongWrite::new(0x0010, vec![0x01, 0x00], ATT_DEFAULT_LE_MTU);
    assert!(!procedure.is_long());
    assert_eq!(procedure.request(), vec![ATT_WRITE_REQ, 0x10, 0x00, 0x01, 0x00]);

    let step = procedure.step(CONN, &[ATT_WRITE_RSP]);
    assert_eq!(lines(&step), vec!["CHAR-WRITE-REQ(0040): 0"]);

    let mut procedure = LongWrite::new(0x0010, vec![0x01], ATT_DEFAULT_LE_MTU);
    let step = procedure.step(CONN, &error_rsp(ATT_WRITE_REQ, 0x10, ATT_ERROR_WRITE_NOT_PERMITTED));
    assert_eq!(lines(&step), vec!["CHAR-WRITE-REQ(0040): 3 Attribute can't be written"]);

    let mut procedure = LongWrite::new(0x0010, vec![0x01], ATT_DEFAULT_LE_MTU);
    let step = procedure.step(CONN, &[ATT_READ_RSP]);
    assert_eq!(lines(&step), vec!["CHAR-WRITE-REQ(0040): 1"]);
}

#[test]
fn test_long_write_prepares_then_executes() {
    let value: Vec<u8> = (0..30).collect();
    let mut procedure = Procedure::WriteRequest(LongWrite::new(0x0010, value.clone(), ATT_DEFAULT_LE_MTU));

    let first = PrepareWriteRequest::parse(&procedure.request()).unwrap();
    assert_eq!(first.offset, 0);
    assert_eq!(first.value, value[..18].to_vec());

    let echo = PrepareWriteResponse {
        handle: first.handle,
        offset: first.offset,
        value: first.value.clone(),
    }
    .serialize();
    let step = procedure.step(CONN, &echo);
    let second = PrepareWriteRequest::parse(step.next.as_ref().unwrap()).unwrap();
    assert_eq!(second.offset, 18);
    assert_eq!(second.value, value[18..].to_vec());

    let echo = PrepareWriteResponse {
        handle: second.handle,
        offset: second.offset,
        value: second.value.clone(),
    }
    .serialize();
    let step = procedure.step(CONN, &echo);
    let exec = ExecuteWriteRequest::parse(step.next.as_ref().unwrap()).unwrap();
    assert_eq!(exec.flags, ATT_EXEC_WRITE_COMMIT);

    let step = procedure.step(CONN, &[ATT_EXECUTE_WRITE_RSP]);
    assert!(step.is_done());
    assert_eq!(lines(&step), vec!["CHAR-WRITE-REQ(0040): 0"]);
}

#[test]
fn test_mtu_exchange_outcomes() {
    let mut exchange = MtuExchange::new(100);
    assert_eq!(exchange.request(), vec![ATT_EXCHANGE_MTU_REQ, 100, 0]);
    let step = exchange.step(CONN, &[ATT_EXCHANGE_MTU_RSP, 50, 0]);
    assert_eq!(lines(&step), vec!["MTU(0040): 0"]);
    assert_eq!(step.effect, Some(Effect::MtuNegotiated(50)));

    let mut exchange = MtuExchange::new(100);
    let step = exchange.step(CONN, &[ATT_EXCHANGE_MTU_RSP, 17, 0]);
    assert_eq!(lines(&step), vec!["MTU(0040): 129 Error exchanging MTU"]);
    assert_eq!(step.effect, None);

    let mut exchange = MtuExchange::new(100);
    let step = exchange.step(CONN, &[ATT_EXCHANGE_MTU_RSP, 50]);
    assert_eq!(lines(&step), vec!["MTU(0040): 4 Protocol error"]);

    let mut exchange = MtuExchange::new(100);
    let step = exchange.step(CONN, &error_rsp(ATT_EXCHANGE_MTU_REQ, 0, ATT_ERROR_REQUEST_NOT_SUPPORTED));
    assert_eq!(
        lines(&step),
        vec!["MTU(0040): 6 Server doesn't support the request received"]
    );
}
