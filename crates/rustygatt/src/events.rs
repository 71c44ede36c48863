//! Server-initiated PDUs
//!
//! Notifications are printed. Indications are printed and acknowledged with a
//! Handle Value Confirmation. Anything else reaching this path is reported
//! as an invalid opcode.

use crate::att::*;
use crate::session::{handle_and_bytes, Record, STATUS_COMMAND_FAILED};

/// What to do with one inbound server PDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub record: Record,
    /// PDU to send back, if any
    pub reply: Option<Vec<u8>>,
}

/// Classifies a pushed PDU received on a connection with handle `conn_handle`
pub fn dispatch(conn_handle: u16, pdu: &[u8]) -> Dispatch {
    let invalid = || Dispatch {
        record: Record::status(
            "ERROR",
            conn_handle,
            ATT_ERROR_INVALID_PDU,
            AttErrorCode::InvalidPdu.describe(),
        ),
        reply: None,
    };

    match pdu.first() {
        Some(&ATT_HANDLE_VALUE_NTF) => match HandleValueNotification::parse(pdu) {
            Ok(ntf) => Dispatch {
                record: Record::new("NOTIFICATION", conn_handle, handle_and_bytes(ntf.handle, &ntf.value)),
                reply: None,
            },
            Err(_) => invalid(),
        },
        Some(&ATT_HANDLE_VALUE_IND) => match HandleValueIndication::parse(pdu) {
            Ok(ind) => {
                let confirmation = HandleValueConfirmation.serialize();
                Dispatch {
                    record: Record::new("INDICATION", conn_handle, handle_and_bytes(ind.handle, &ind.value)),
                    reply: (!confirmation.is_empty()).then_some(confirmation),
                }
            }
            Err(_) => invalid(),
        },
        _ => Dispatch {
            record: Record::status("ERROR", conn_handle, STATUS_COMMAND_FAILED, "Invalid opcode"),
            reply: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_is_printed_without_reply() {
        let d = dispatch(0x40, &[ATT_HANDLE_VALUE_NTF, 0x25, 0x00, 0xde, 0xad]);
        assert_eq!(d.record.to_string(), "NOTIFICATION(0040): 0025 de ad");
        assert_eq!(d.reply, None);
    }

    #[test]
    fn test_indication_is_confirmed() {
        let d = dispatch(0x40, &[ATT_HANDLE_VALUE_IND, 0x25, 0x00, 0x01]);
        assert_eq!(d.record.to_string(), "INDICATION(0040): 0025 01");
        assert_eq!(d.reply, Some(vec![ATT_HANDLE_VALUE_CONF]));
    }

    #[test]
    fn test_other_opcodes_are_rejected() {
        let d = dispatch(0x40, &[ATT_READ_REQ, 0x01, 0x00]);
        assert_eq!(d.record.to_string(), "ERROR(0040): 256 Invalid opcode");
        assert_eq!(d.reply, None);

        let d = dispatch(0x40, &[ATT_HANDLE_VALUE_IND, 0x25]);
        assert_eq!(d.record.to_string(), "ERROR(0040): 4 Attribute PDU was invalid");
        assert_eq!(d.reply, None);
    }
}
