//! PDU codec for the client side of the ATT protocol
use super::constants::*;
use super::error::{AttError, AttErrorCode, AttResult};
use crate::uuid::Uuid;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// ATT packet formats
pub trait AttPacket: Sized {
    /// Opcode for this packet
    fn opcode() -> u8;

    /// Parse packet from bytes
    fn parse(data: &[u8]) -> AttResult<Self>;

    /// Serialize packet to bytes
    fn serialize(&self) -> Vec<u8>;
}

fn read_u16(cursor: &mut Cursor<&[u8]>) -> AttResult<u16> {
    cursor
        .read_u16::<LittleEndian>()
        .map_err(|_| AttError::InvalidPdu)
}

fn check_opcode<P: AttPacket>(data: &[u8], min_len: usize) -> AttResult<()> {
    if data.len() < min_len || data[0] != P::opcode() {
        return Err(AttError::InvalidPdu);
    }
    Ok(())
}

/// Checks that `pdu` answers a request expecting `expected`.
///
/// An Error Response becomes [`AttError::Protocol`]; any other opcode is
/// unexpected.
pub fn expect_response(expected: u8, pdu: &[u8]) -> AttResult<&[u8]> {
    match pdu.first() {
        Some(&op) if op == expected => Ok(pdu),
        Some(&ATT_ERROR_RSP) => {
            let err = ErrorResponse::parse(pdu)?;
            Err(AttError::Protocol(err.error_code, err.handle))
        }
        Some(&op) => Err(AttError::UnexpectedOpcode(op)),
        None => Err(AttError::InvalidPdu),
    }
}

/// Error response packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Request opcode in error
    pub request_opcode: u8,
    /// Attribute handle in error
    pub handle: u16,
    /// Error code
    pub error_code: AttErrorCode,
}

impl AttPacket for ErrorResponse {
    fn opcode() -> u8 {
        ATT_ERROR_RSP
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 5)?;
        let mut cursor = Cursor::new(&data[2..]);
        let handle = read_u16(&mut cursor)?;

        Ok(Self {
            request_opcode: data[1],
            handle,
            error_code: data[4].into(),
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(5);
        packet.push(Self::opcode());
        packet.push(self.request_opcode);
        packet.extend_from_slice(&self.handle.to_le_bytes());
        packet.push(self.error_code.into());
        packet
    }
}

/// Exchange MTU Request packet
#[derive(Debug, Clone)]
pub struct ExchangeMtuRequest {
    /// Client Rx MTU size
    pub client_mtu: u16,
}

impl AttPacket for ExchangeMtuRequest {
    fn opcode() -> u8 {
        ATT_EXCHANGE_MTU_REQ
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 3)?;
        let client_mtu = read_u16(&mut Cursor::new(&data[1..]))?;
        Ok(Self { client_mtu })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(3);
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.client_mtu.to_le_bytes());
        packet
    }
}

/// Exchange MTU Response packet
#[derive(Debug, Clone)]
pub struct ExchangeMtuResponse {
    /// Server Rx MTU size
    pub server_mtu: u16,
}

impl AttPacket for ExchangeMtuResponse {
    fn opcode() -> u8 {
        ATT_EXCHANGE_MTU_RSP
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 3)?;
        let server_mtu = read_u16(&mut Cursor::new(&data[1..]))?;
        Ok(Self { server_mtu })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(3);
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.server_mtu.to_le_bytes());
        packet
    }
}

/// Find Information Request packet
#[derive(Debug, Clone)]
pub struct FindInformationRequest {
    /// First requested handle
    pub start_handle: u16,
    /// Last requested handle
    pub end_handle: u16,
}

impl AttPacket for FindInformationRequest {
    fn opcode() -> u8 {
        ATT_FIND_INFO_REQ
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 5)?;
        let mut cursor = Cursor::new(&data[1..]);
        let start_handle = read_u16(&mut cursor)?;
        let end_handle = read_u16(&mut cursor)?;
        Ok(Self {
            start_handle,
            end_handle,
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(5);
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.start_handle.to_le_bytes());
        packet.extend_from_slice(&self.end_handle.to_le_bytes());
        packet
    }
}

/// Handle-UUID pair in Find Information Response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleUuidPair {
    pub handle: u16,
    pub uuid: Uuid,
}

/// Find Information Response packet
#[derive(Debug, Clone)]
pub struct FindInformationResponse {
    /// Format of information data
    pub format: u8,
    /// List of handle-UUID pairs
    pub information_data: Vec<HandleUuidPair>,
}

impl AttPacket for FindInformationResponse {
    fn opcode() -> u8 {
        ATT_FIND_INFO_RSP
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 2)?;

        let format = data[1];
        let uuid_len = match format {
            ATT_FIND_INFO_RSP_FORMAT_16BIT => 2,
            ATT_FIND_INFO_RSP_FORMAT_128BIT => 16,
            _ => return Err(AttError::InvalidPdu),
        };

        let pair_size = 2 + uuid_len;
        let body = &data[2..];
        if body.len() % pair_size != 0 {
            return Err(AttError::InvalidPdu);
        }

        let information_data = body
            .chunks_exact(pair_size)
            .map(|pair| {
                let handle = u16::from_le_bytes([pair[0], pair[1]]);
                let uuid = Uuid::try_from_slice_le(&pair[2..]).ok_or(AttError::InvalidPdu)?;
                Ok(HandleUuidPair { handle, uuid })
            })
            .collect::<AttResult<Vec<_>>>()?;

        Ok(Self {
            format,
            information_data,
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = vec![Self::opcode(), self.format];
        for pair in &self.information_data {
            packet.extend_from_slice(&pair.handle.to_le_bytes());
            if self.format == ATT_FIND_INFO_RSP_FORMAT_16BIT {
                packet.extend_from_slice(&pair.uuid.as_u16().unwrap_or_default().to_le_bytes());
            } else {
                packet.extend_from_slice(pair.uuid.as_bytes_le());
            }
        }
        packet
    }
}

/// Find By Type Value Request packet
#[derive(Debug, Clone)]
pub struct FindByTypeValueRequest {
    /// First requested handle
    pub start_handle: u16,
    /// Last requested handle
    pub end_handle: u16,
    /// Attribute type (must be 16-bit UUID)
    pub attribute_type: u16,
    /// Attribute value to match
    pub attribute_value: Vec<u8>,
}

impl AttPacket for FindByTypeValueRequest {
    fn opcode() -> u8 {
        ATT_FIND_BY_TYPE_VALUE_REQ
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 7)?;
        let mut cursor = Cursor::new(&data[1..]);
        let start_handle = read_u16(&mut cursor)?;
        let end_handle = read_u16(&mut cursor)?;
        let attribute_type = read_u16(&mut cursor)?;

        Ok(Self {
            start_handle,
            end_handle,
            attribute_type,
            attribute_value: data[7..].to_vec(),
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(7 + self.attribute_value.len());
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.start_handle.to_le_bytes());
        packet.extend_from_slice(&self.end_handle.to_le_bytes());
        packet.extend_from_slice(&self.attribute_type.to_le_bytes());
        packet.extend_from_slice(&self.attribute_value);
        packet
    }
}

/// Handle range in Find By Type Value Response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleRange {
    /// Found handle
    pub found_handle: u16,
    /// Group end handle
    pub group_end_handle: u16,
}

/// Find By Type Value Response packet
#[derive(Debug, Clone)]
pub struct FindByTypeValueResponse {
    /// List of handle ranges
    pub handles: Vec<HandleRange>,
}

impl AttPacket for FindByTypeValueResponse {
    fn opcode() -> u8 {
        ATT_FIND_BY_TYPE_VALUE_RSP
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 1)?;
        let body = &data[1..];
        if body.len() % 4 != 0 {
            return Err(AttError::InvalidPdu);
        }

        let handles = body
            .chunks_exact(4)
            .map(|range| HandleRange {
                found_handle: u16::from_le_bytes([range[0], range[1]]),
                group_end_handle: u16::from_le_bytes([range[2], range[3]]),
            })
            .collect();

        Ok(Self { handles })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(1 + self.handles.len() * 4);
        packet.push(Self::opcode());
        for range in &self.handles {
            packet.extend_from_slice(&range.found_handle.to_le_bytes());
            packet.extend_from_slice(&range.group_end_handle.to_le_bytes());
        }
        packet
    }
}

/// Read By Type Request packet
#[derive(Debug, Clone)]
pub struct ReadByTypeRequest {
    /// First requested handle
    pub start_handle: u16,
    /// Last requested handle
    pub end_handle: u16,
    /// Attribute type UUID
    pub attribute_type: Uuid,
}

impl AttPacket for ReadByTypeRequest {
    fn opcode() -> u8 {
        ATT_READ_BY_TYPE_REQ
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 7)?;
        let mut cursor = Cursor::new(&data[1..]);
        let start_handle = read_u16(&mut cursor)?;
        let end_handle = read_u16(&mut cursor)?;
        let attribute_type = match data.len() {
            7 | 21 => Uuid::try_from_slice_le(&data[5..]).ok_or(AttError::InvalidPdu)?,
            _ => return Err(AttError::InvalidPdu),
        };

        Ok(Self {
            start_handle,
            end_handle,
            attribute_type,
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(21);
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.start_handle.to_le_bytes());
        packet.extend_from_slice(&self.end_handle.to_le_bytes());
        packet.extend_from_slice(&self.attribute_type.to_att_bytes());
        packet
    }
}

/// Handle and value in Read By Type Response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleValue {
    /// Attribute handle
    pub handle: u16,
    /// Attribute value
    pub value: Vec<u8>,
}

/// Read By Type Response packet
#[derive(Debug, Clone)]
pub struct ReadByTypeResponse {
    /// Length of each item
    pub length: u8,
    /// List of handle-value pairs
    pub data: Vec<HandleValue>,
}

impl AttPacket for ReadByTypeResponse {
    fn opcode() -> u8 {
        ATT_READ_BY_TYPE_RSP
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 2)?;

        let length = data[1];
        if length < 2 {
            return Err(AttError::InvalidPdu);
        }

        let body = &data[2..];
        if body.len() % length as usize != 0 {
            return Err(AttError::InvalidPdu);
        }

        let data = body
            .chunks_exact(length as usize)
            .map(|item| HandleValue {
                handle: u16::from_le_bytes([item[0], item[1]]),
                value: item[2..].to_vec(),
            })
            .collect();

        Ok(Self { length, data })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = vec![Self::opcode(), self.length];
        for item in &self.data {
            packet.extend_from_slice(&item.handle.to_le_bytes());
            packet.extend_from_slice(&item.value);
        }
        packet
    }
}

/// Read Request packet
#[derive(Debug, Clone)]
pub struct ReadRequest {
    /// Handle to read
    pub handle: u16,
}

impl AttPacket for ReadRequest {
    fn opcode() -> u8 {
        ATT_READ_REQ
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 3)?;
        let handle = read_u16(&mut Cursor::new(&data[1..]))?;
        Ok(Self { handle })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(3);
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.handle.to_le_bytes());
        packet
    }
}

/// Read Response packet
#[derive(Debug, Clone)]
pub struct ReadResponse {
    /// Attribute value
    pub value: Vec<u8>,
}

impl AttPacket for ReadResponse {
    fn opcode() -> u8 {
        ATT_READ_RSP
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 1)?;
        Ok(Self {
            value: data[1..].to_vec(),
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(1 + self.value.len());
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.value);
        packet
    }
}

/// Read Blob Request packet
#[derive(Debug, Clone)]
pub struct ReadBlobRequest {
    /// Handle to read
    pub handle: u16,
    /// Offset to start reading from
    pub offset: u16,
}

impl AttPacket for ReadBlobRequest {
    fn opcode() -> u8 {
        ATT_READ_BLOB_REQ
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 5)?;
        let mut cursor = Cursor::new(&data[1..]);
        let handle = read_u16(&mut cursor)?;
        let offset = read_u16(&mut cursor)?;
        Ok(Self { handle, offset })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(5);
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.handle.to_le_bytes());
        packet.extend_from_slice(&self.offset.to_le_bytes());
        packet
    }
}

/// Read Blob Response packet
#[derive(Debug, Clone)]
pub struct ReadBlobResponse {
    /// Part of the attribute value
    pub value: Vec<u8>,
}

impl AttPacket for ReadBlobResponse {
    fn opcode() -> u8 {
        ATT_READ_BLOB_RSP
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 1)?;
        Ok(Self {
            value: data[1..].to_vec(),
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(1 + self.value.len());
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.value);
        packet
    }
}

/// Read By Group Type Request packet
#[derive(Debug, Clone)]
pub struct ReadByGroupTypeRequest {
    /// First requested handle
    pub start_handle: u16,
    /// Last requested handle
    pub end_handle: u16,
    /// Group type UUID
    pub group_type: Uuid,
}

impl AttPacket for ReadByGroupTypeRequest {
    fn opcode() -> u8 {
        ATT_READ_BY_GROUP_TYPE_REQ
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 7)?;
        let mut cursor = Cursor::new(&data[1..]);
        let start_handle = read_u16(&mut cursor)?;
        let end_handle = read_u16(&mut cursor)?;
        let group_type = match data.len() {
            7 | 21 => Uuid::try_from_slice_le(&data[5..]).ok_or(AttError::InvalidPdu)?,
            _ => return Err(AttError::InvalidPdu),
        };

        Ok(Self {
            start_handle,
            end_handle,
            group_type,
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(21);
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.start_handle.to_le_bytes());
        packet.extend_from_slice(&self.end_handle.to_le_bytes());
        packet.extend_from_slice(&self.group_type.to_att_bytes());
        packet
    }
}

/// Attribute data in Read By Group Type Response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupData {
    /// Attribute handle
    pub handle: u16,
    /// End group handle
    pub end_group_handle: u16,
    /// Attribute value
    pub value: Vec<u8>,
}

/// Read By Group Type Response packet
#[derive(Debug, Clone)]
pub struct ReadByGroupTypeResponse {
    /// Length of each item
    pub length: u8,
    /// List of attribute data
    pub data: Vec<GroupData>,
}

impl AttPacket for ReadByGroupTypeResponse {
    fn opcode() -> u8 {
        ATT_READ_BY_GROUP_TYPE_RSP
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 2)?;

        let length = data[1];
        if length < 4 {
            return Err(AttError::InvalidPdu);
        }

        let body = &data[2..];
        if body.len() % length as usize != 0 {
            return Err(AttError::InvalidPdu);
        }

        let data = body
            .chunks_exact(length as usize)
            .map(|item| GroupData {
                handle: u16::from_le_bytes([item[0], item[1]]),
                end_group_handle: u16::from_le_bytes([item[2], item[3]]),
                value: item[4..].to_vec(),
            })
            .collect();

        Ok(Self { length, data })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = vec![Self::opcode(), self.length];
        for item in &self.data {
            packet.extend_from_slice(&item.handle.to_le_bytes());
            packet.extend_from_slice(&item.end_group_handle.to_le_bytes());
            packet.extend_from_slice(&item.value);
        }
        packet
    }
}

/// Write Request packet
#[derive(Debug, Clone)]
pub struct WriteRequest {
    /// Handle to write
    pub handle: u16,
    /// Value to write
    pub value: Vec<u8>,
}

impl AttPacket for WriteRequest {
    fn opcode() -> u8 {
        ATT_WRITE_REQ
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 3)?;
        let handle = read_u16(&mut Cursor::new(&data[1..]))?;
        Ok(Self {
            handle,
            value: data[3..].to_vec(),
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(3 + self.value.len());
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.handle.to_le_bytes());
        packet.extend_from_slice(&self.value);
        packet
    }
}

/// Write Response packet
#[derive(Debug, Clone)]
pub struct WriteResponse;

impl AttPacket for WriteResponse {
    fn opcode() -> u8 {
        ATT_WRITE_RSP
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 1)?;
        Ok(Self)
    }

    fn serialize(&self) -> Vec<u8> {
        vec![Self::opcode()]
    }
}

/// Write Command packet (no response)
#[derive(Debug, Clone)]
pub struct WriteCommand {
    /// Handle to write
    pub handle: u16,
    /// Value to write
    pub value: Vec<u8>,
}

impl AttPacket for WriteCommand {
    fn opcode() -> u8 {
        ATT_WRITE_CMD
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 3)?;
        let handle = read_u16(&mut Cursor::new(&data[1..]))?;
        Ok(Self {
            handle,
            value: data[3..].to_vec(),
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(3 + self.value.len());
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.handle.to_le_bytes());
        packet.extend_from_slice(&self.value);
        packet
    }
}

/// Prepare Write Request packet
#[derive(Debug, Clone)]
pub struct PrepareWriteRequest {
    /// Handle to write
    pub handle: u16,
    /// Offset of this part
    pub offset: u16,
    /// Part of the value
    pub value: Vec<u8>,
}

impl AttPacket for PrepareWriteRequest {
    fn opcode() -> u8 {
        ATT_PREPARE_WRITE_REQ
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 5)?;
        let mut cursor = Cursor::new(&data[1..]);
        let handle = read_u16(&mut cursor)?;
        let offset = read_u16(&mut cursor)?;
        Ok(Self {
            handle,
            offset,
            value: data[5..].to_vec(),
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(5 + self.value.len());
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.handle.to_le_bytes());
        packet.extend_from_slice(&self.offset.to_le_bytes());
        packet.extend_from_slice(&self.value);
        packet
    }
}

/// Prepare Write Response packet
#[derive(Debug, Clone)]
pub struct PrepareWriteResponse {
    /// Handle written
    pub handle: u16,
    /// Offset of this part
    pub offset: u16,
    /// Echoed part of the value
    pub value: Vec<u8>,
}

impl AttPacket for PrepareWriteResponse {
    fn opcode() -> u8 {
        ATT_PREPARE_WRITE_RSP
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 5)?;
        let mut cursor = Cursor::new(&data[1..]);
        let handle = read_u16(&mut cursor)?;
        let offset = read_u16(&mut cursor)?;
        Ok(Self {
            handle,
            offset,
            value: data[5..].to_vec(),
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(5 + self.value.len());
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.handle.to_le_bytes());
        packet.extend_from_slice(&self.offset.to_le_bytes());
        packet.extend_from_slice(&self.value);
        packet
    }
}

/// Execute Write Request packet
#[derive(Debug, Clone)]
pub struct ExecuteWriteRequest {
    /// Commit or cancel
    pub flags: u8,
}

impl AttPacket for ExecuteWriteRequest {
    fn opcode() -> u8 {
        ATT_EXECUTE_WRITE_REQ
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 2)?;
        Ok(Self { flags: data[1] })
    }

    fn serialize(&self) -> Vec<u8> {
        vec![Self::opcode(), self.flags]
    }
}

/// Execute Write Response packet
#[derive(Debug, Clone)]
pub struct ExecuteWriteResponse;

impl AttPacket for ExecuteWriteResponse {
    fn opcode() -> u8 {
        ATT_EXECUTE_WRITE_RSP
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 1)?;
        Ok(Self)
    }

    fn serialize(&self) -> Vec<u8> {
        vec![Self::opcode()]
    }
}

/// Handle Value Notification packet
#[derive(Debug, Clone)]
pub struct HandleValueNotification {
    /// Source attribute handle
    pub handle: u16,
    /// Attribute value
    pub value: Vec<u8>,
}

impl AttPacket for HandleValueNotification {
    fn opcode() -> u8 {
        ATT_HANDLE_VALUE_NTF
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 3)?;
        let handle = read_u16(&mut Cursor::new(&data[1..]))?;
        Ok(Self {
            handle,
            value: data[3..].to_vec(),
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(3 + self.value.len());
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.handle.to_le_bytes());
        packet.extend_from_slice(&self.value);
        packet
    }
}

/// Handle Value Indication packet
#[derive(Debug, Clone)]
pub struct HandleValueIndication {
    /// Source attribute handle
    pub handle: u16,
    /// Attribute value
    pub value: Vec<u8>,
}

impl AttPacket for HandleValueIndication {
    fn opcode() -> u8 {
        ATT_HANDLE_VALUE_IND
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 3)?;
        let handle = read_u16(&mut Cursor::new(&data[1..]))?;
        Ok(Self {
            handle,
            value: data[3..].to_vec(),
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(3 + self.value.len());
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.handle.to_le_bytes());
        packet.extend_from_slice(&self.value);
        packet
    }
}

/// Handle Value Confirmation packet
#[derive(Debug, Clone)]
pub struct HandleValueConfirmation;

impl AttPacket for HandleValueConfirmation {
    fn opcode() -> u8 {
        ATT_HANDLE_VALUE_CONF
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        check_opcode::<Self>(data, 1)?;
        Ok(Self)
    }

    fn serialize(&self) -> Vec<u8> {
        vec![Self::opcode()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_information_response_16bit() {
        let pdu = [0x05, 0x01, 0x01, 0x00, 0x00, 0x28, 0x02, 0x00, 0x03, 0x28];
        let rsp = FindInformationResponse::parse(&pdu).unwrap();
        assert_eq!(rsp.information_data.len(), 2);
        assert_eq!(rsp.information_data[0].handle, 0x0001);
        assert_eq!(rsp.information_data[0].uuid, 0x2800u16);
        assert_eq!(rsp.information_data[1].handle, 0x0002);
        assert_eq!(rsp.information_data[1].uuid, 0x2803u16);
    }

    #[test]
    fn test_find_information_response_rejects_truncated_pair() {
        let pdu = [0x05, 0x01, 0x01, 0x00, 0x00];
        assert_eq!(FindInformationResponse::parse(&pdu).unwrap_err(), AttError::InvalidPdu);
        let bad_format = [0x05, 0x03, 0x01, 0x00, 0x00, 0x28];
        assert!(FindInformationResponse::parse(&bad_format).is_err());
    }

    #[test]
    fn test_read_by_type_response_items() {
        // Two characteristic declarations of length 7
        let pdu = [
            0x09, 0x07, 0x02, 0x00, 0x02, 0x03, 0x00, 0x00, 0x2A, 0x04, 0x00, 0x10, 0x05, 0x00,
            0x37, 0x2A,
        ];
        let rsp = ReadByTypeResponse::parse(&pdu).unwrap();
        assert_eq!(rsp.data.len(), 2);
        assert_eq!(rsp.data[0].handle, 0x0002);
        assert_eq!(rsp.data[0].value, vec![0x02, 0x03, 0x00, 0x00, 0x2A]);
        assert_eq!(rsp.data[1].handle, 0x0004);
    }

    #[test]
    fn test_read_by_type_request_encodes_uuid_width() {
        let short = ReadByTypeRequest {
            start_handle: 0x0001,
            end_handle: 0xFFFF,
            attribute_type: Uuid::from_u16(0x2803),
        };
        assert_eq!(short.serialize(), vec![0x08, 0x01, 0x00, 0xFF, 0xFF, 0x03, 0x28]);

        let long = ReadByTypeRequest {
            start_handle: 0x0001,
            end_handle: 0xFFFF,
            attribute_type: "f000aa01-0451-4000-b000-000000000000".parse().unwrap(),
        };
        assert_eq!(long.serialize().len(), 21);
        assert_eq!(ReadByTypeRequest::parse(&long.serialize()).unwrap().attribute_type, long.attribute_type);
    }

    #[test]
    fn test_expect_response_classifies_error_response() {
        let err = [0x01, 0x08, 0x05, 0x00, 0x0A];
        assert_eq!(
            expect_response(ATT_READ_BY_TYPE_RSP, &err),
            Err(AttError::Protocol(AttErrorCode::AttributeNotFound, 0x0005))
        );
        assert_eq!(
            expect_response(ATT_READ_RSP, &[0x13]),
            Err(AttError::UnexpectedOpcode(0x13))
        );
        assert_eq!(expect_response(ATT_WRITE_RSP, &[0x13]), Ok(&[0x13][..]));
        assert_eq!(expect_response(ATT_WRITE_RSP, &[]), Err(AttError::InvalidPdu));
    }

    #[test]
    fn test_group_response_and_find_by_type_value() {
        let pdu = [0x11, 0x06, 0x01, 0x00, 0x07, 0x00, 0x00, 0x18, 0x08, 0x00, 0x0B, 0x00, 0x01, 0x18];
        let rsp = ReadByGroupTypeResponse::parse(&pdu).unwrap();
        assert_eq!(rsp.data.len(), 2);
        assert_eq!(rsp.data[1].handle, 0x0008);
        assert_eq!(rsp.data[1].end_group_handle, 0x000B);
        assert_eq!(rsp.data[1].value, vec![0x01, 0x18]);

        let pdu = [0x07, 0x01, 0x00, 0x07, 0x00];
        let rsp = FindByTypeValueResponse::parse(&pdu).unwrap();
        assert_eq!(
            rsp.handles,
            vec![HandleRange { found_handle: 1, group_end_handle: 7 }]
        );
    }

    #[test]
    fn test_notification_parse() {
        let ntf = HandleValueNotification::parse(&[0x1B, 0x10, 0x00, 0x01, 0x02]).unwrap();
        assert_eq!(ntf.handle, 0x0010);
        assert_eq!(ntf.value, vec![0x01, 0x02]);
        assert!(HandleValueIndication::parse(&[0x1D, 0x10]).is_err());
        assert_eq!(HandleValueConfirmation.serialize(), vec![0x1E]);
    }
}
