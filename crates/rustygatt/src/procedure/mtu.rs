//! ATT MTU exchange (`mtu`)

use super::{Effect, Step};
use crate::att::*;
use crate::session::{Record, STATUS_MTU_NOT_APPLIED};

const LABEL: &str = "MTU";

#[derive(Debug)]
pub struct MtuExchange {
    requested: u16,
}

impl MtuExchange {
    pub fn new(requested: u16) -> Self {
        Self { requested }
    }

    pub fn request(&self) -> Vec<u8> {
        ExchangeMtuRequest {
            client_mtu: self.requested,
        }
        .serialize()
    }

    /// The agreed MTU is the smaller of both sides and must be at least the
    /// LE default
    pub fn step(&mut self, handle: u16, pdu: &[u8]) -> Step {
        let rsp = match expect_response(ATT_EXCHANGE_MTU_RSP, pdu).and_then(ExchangeMtuResponse::parse) {
            Ok(rsp) => rsp,
            Err(AttError::Protocol(code, _)) => {
                return Step::done(vec![Record::status(LABEL, handle, u8::from(code), code.describe())])
            }
            Err(_) => {
                return Step::done(vec![Record::status(
                    LABEL,
                    handle,
                    ATT_ERROR_INVALID_PDU,
                    "Protocol error",
                )])
            }
        };

        let mtu = rsp.server_mtu.min(self.requested);
        if mtu < ATT_DEFAULT_LE_MTU {
            return Step::done(vec![Record::status(
                LABEL,
                handle,
                STATUS_MTU_NOT_APPLIED,
                "Error exchanging MTU",
            )]);
        }

        Step {
            records: vec![Record::ok(LABEL, handle)],
            next: None,
            effect: Some(Effect::MtuNegotiated(mtu)),
        }
    }
}
