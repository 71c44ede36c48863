//! Command handlers
//!
//! Each handler receives the whole word list, command name included. It
//! validates state and arguments, reporting failures as records, before
//! touching the transport.

use super::{help_lines, parse_handle, parse_number, parse_value, Command};
use crate::att::*;
use crate::gap::{AddressType, BdAddr, SecurityLevel};
use crate::procedure::*;
use crate::session::*;
use crate::transport::Transport;
use crate::uuid::Uuid;

pub(crate) type Handler<T> = fn(&mut Session<T>, &[String]);

/// Resolves a command tag to its handler
pub(crate) fn handler<T: Transport>(command: Command) -> Handler<T> {
    match command {
        Command::Help => cmd_help,
        Command::Exit => cmd_exit,
        Command::Connect => cmd_connect,
        Command::Disconnect => cmd_disconnect,
        Command::Primary => cmd_primary,
        Command::Characteristics => cmd_characteristics,
        Command::CharDesc => cmd_char_desc,
        Command::CharReadHnd => cmd_read_hnd,
        Command::CharReadUuid => cmd_read_uuid,
        Command::CharWriteReq => cmd_write_req,
        Command::CharWriteCmd => cmd_write_cmd,
        Command::SecLevel => cmd_sec_level,
        Command::Mtu => cmd_mtu,
        Command::Psm => cmd_psm,
    }
}

fn require_connected<T: Transport>(session: &mut Session<T>, label: &'static str) -> bool {
    if session.state.is_connected() {
        return true;
    }
    session.emit(Record::status(label, 0, STATUS_COMMAND_FAILED, "Command failed: disconnected"));
    false
}

fn require_idle<T: Transport>(session: &mut Session<T>, label: &'static str) -> bool {
    if !session.is_busy() {
        return true;
    }
    let handle = session.state.connection_handle;
    session.emit(Record::status(label, handle, STATUS_COMMAND_FAILED, "Command failed: busy"));
    false
}

fn invalid<T: Transport>(session: &mut Session<T>, label: &'static str, code: impl std::fmt::Display, message: &str) {
    let handle = session.state.connection_handle;
    session.emit(Record::status(label, handle, code, message));
}

/// Optional `[start] [end]` handle range at `args[first]` and `args[first + 1]`
fn parse_range<T: Transport>(
    session: &mut Session<T>,
    label: &'static str,
    args: &[String],
    first: usize,
) -> Option<(u16, u16)> {
    let start = match args.get(first) {
        Some(text) => match parse_handle(text) {
            Some(start) if start >= ATT_HANDLE_MIN => start,
            _ => {
                invalid(session, label, STATUS_INVALID_ARGUMENT, &format!("Invalid start handle: {}", text));
                return None;
            }
        },
        None => ATT_HANDLE_MIN,
    };

    let end = match args.get(first + 1) {
        Some(text) => match parse_handle(text) {
            Some(end) if end >= start => end,
            _ => {
                invalid(session, label, STATUS_INVALID_ARGUMENT, &format!("Invalid end handle: {}", text));
                return None;
            }
        },
        None => ATT_HANDLE_MAX,
    };

    Some((start, end))
}

fn cmd_help<T: Transport>(session: &mut Session<T>, _args: &[String]) {
    for line in help_lines() {
        session.emit_text(line);
    }
}

fn cmd_exit<T: Transport>(session: &mut Session<T>, _args: &[String]) {
    session.request_exit();
}

fn cmd_connect<T: Transport>(session: &mut Session<T>, args: &[String]) {
    const LABEL: &str = "CONNECT";

    if session.state.status() != ConnectionStatus::Disconnected {
        return;
    }

    if let Some(text) = args.get(1) {
        let Ok(address) = text.parse::<BdAddr>() else {
            let message = format!("{} Invalid Bluetooth address", text);
            session.emit(Record::status(LABEL, 0, STATUS_INVALID_ARGUMENT, &message));
            return;
        };

        let address_type = match args.get(2).map(|t| t.parse::<AddressType>()) {
            Some(Ok(address_type)) => address_type,
            Some(Err(err)) => {
                let message = format!("{} {}", text, err);
                session.emit(Record::status(LABEL, 0, STATUS_INVALID_ARGUMENT, &message));
                return;
            }
            None => AddressType::Public,
        };

        session.state.peer_address = Some(address);
        session.state.peer_address_type = address_type;
    }

    if session.state.peer_address().is_none() {
        let message = format!("{} Remote Bluetooth address required", BdAddr::ANY);
        session.emit(Record::status(LABEL, 0, STATUS_INVALID_ARGUMENT, &message));
        return;
    }

    session.begin_connect();
}

fn cmd_disconnect<T: Transport>(session: &mut Session<T>, _args: &[String]) {
    session.shutdown();
}

fn cmd_primary<T: Transport>(session: &mut Session<T>, args: &[String]) {
    let Some(text) = args.get(1) else {
        if require_connected(session, "PRIMARY-ALL") && require_idle(session, "PRIMARY-ALL") {
            session.start(Procedure::PrimaryAll(PrimaryAll::new()));
        }
        return;
    };

    const LABEL: &str = "PRIMARY-UUID";
    if !require_connected(session, LABEL) {
        return;
    }
    let Ok(uuid) = text.parse::<Uuid>() else {
        invalid(session, LABEL, STATUS_INVALID_ARGUMENT, "Invalid UUID");
        return;
    };
    if require_idle(session, LABEL) {
        session.start(Procedure::PrimaryByUuid(PrimaryByUuid::new(uuid)));
    }
}

fn cmd_characteristics<T: Transport>(session: &mut Session<T>, args: &[String]) {
    const LABEL: &str = "CHAR-END";

    if !require_connected(session, LABEL) {
        return;
    }
    let Some((start, end)) = parse_range(session, LABEL, args, 1) else {
        return;
    };
    let filter = match args.get(3).map(|t| t.parse::<Uuid>()) {
        Some(Ok(uuid)) => Some(uuid),
        Some(Err(_)) => {
            invalid(session, LABEL, ATT_ERROR_UNLIKELY, "Invalid UUID");
            return;
        }
        None => None,
    };
    if require_idle(session, LABEL) {
        session.start(Procedure::Characteristics(Characteristics::new(start, end, filter)));
    }
}

fn cmd_char_desc<T: Transport>(session: &mut Session<T>, args: &[String]) {
    const LABEL: &str = "CHAR-DESC-END";

    if !require_connected(session, LABEL) {
        return;
    }
    let Some((start, end)) = parse_range(session, LABEL, args, 1) else {
        return;
    };
    if require_idle(session, LABEL) {
        session.start(Procedure::Descriptors(DiscoveryCursor::new(start, end)));
    }
}

fn cmd_read_hnd<T: Transport>(session: &mut Session<T>, args: &[String]) {
    const LABEL: &str = "CHAR-READ-HND";

    if !require_connected(session, LABEL) {
        return;
    }
    let Some(text) = args.get(1) else {
        invalid(session, LABEL, STATUS_INVALID_ARGUMENT, "Missing argument: handle");
        return;
    };
    let handle = match parse_handle(text) {
        Some(handle) if handle != 0 => handle,
        _ => {
            invalid(session, LABEL, STATUS_INVALID_ARGUMENT, &format!("Invalid handle: {}", text));
            return;
        }
    };
    let offset = match args.get(2) {
        Some(text) => match parse_number(text).and_then(|n| u16::try_from(n).ok()) {
            Some(offset) => offset,
            None => {
                invalid(session, LABEL, ATT_ERROR_INVALID_OFFSET, &format!("Invalid offset: {}", text));
                return;
            }
        },
        None => 0,
    };
    if require_idle(session, LABEL) {
        let mtu = session.state.effective_mtu();
        session.start(Procedure::ReadHandle(LongRead::new(handle, offset, mtu)));
    }
}

fn cmd_read_uuid<T: Transport>(session: &mut Session<T>, args: &[String]) {
    const LABEL: &str = "CHAR-READ-UUID";

    if !require_connected(session, LABEL) {
        return;
    }
    let Some(text) = args.get(1) else {
        invalid(session, LABEL, STATUS_INVALID_ARGUMENT, "Missing argument: UUID");
        return;
    };
    let Ok(uuid) = text.parse::<Uuid>() else {
        invalid(session, LABEL, STATUS_INVALID_ARGUMENT, "Invalid UUID");
        return;
    };
    let Some((start, end)) = parse_range(session, LABEL, args, 2) else {
        return;
    };
    if require_idle(session, LABEL) {
        session.start(Procedure::ReadByUuid(ReadByUuidCursor::new(uuid, start, end)));
    }
}

/// Shared validation of `<handle> <new value>`
fn write_args<T: Transport>(
    session: &mut Session<T>,
    label: &'static str,
    name: &str,
    args: &[String],
) -> Option<(u16, Vec<u8>)> {
    if args.len() < 3 {
        invalid(session, label, STATUS_USAGE, &format!("Usage: {} <handle> <new value>", name));
        return None;
    }
    if !require_connected(session, label) {
        return None;
    }

    let handle = match parse_handle(&args[1]) {
        Some(handle) if handle != 0 => handle,
        _ => {
            invalid(session, label, STATUS_INVALID_ARGUMENT, "A valid handle is required");
            return None;
        }
    };
    let value = match parse_value(&args[2]) {
        Some(value) if value.len() <= ATT_MAX_VALUE_LEN => value,
        _ => {
            invalid(session, label, STATUS_INVALID_ARGUMENT, "invalid value");
            return None;
        }
    };

    Some((handle, value))
}

fn cmd_write_req<T: Transport>(session: &mut Session<T>, args: &[String]) {
    const LABEL: &str = "CHAR-WRITE-REQ";

    let Some((handle, value)) = write_args(session, LABEL, "char-write-req", args) else {
        return;
    };
    if require_idle(session, LABEL) {
        let mtu = session.state.effective_mtu();
        session.start(Procedure::WriteRequest(LongWrite::new(handle, value, mtu)));
    }
}

/// Write without response; allowed while another request is pending
fn cmd_write_cmd<T: Transport>(session: &mut Session<T>, args: &[String]) {
    const LABEL: &str = "CHAR-WRITE-CMD";

    let Some((handle, value)) = write_args(session, LABEL, "char-write-cmd", args) else {
        return;
    };
    if value.len() + 3 > session.state.effective_mtu() as usize {
        let code = AttErrorCode::InvalidAttributeValueLength;
        invalid(session, LABEL, u8::from(code), code.describe());
        return;
    }

    let pdu = WriteCommand { handle, value }.serialize();
    match session.send(&pdu) {
        Ok(()) => {
            let conn_handle = session.state.connection_handle();
            session.emit(Record::ok(LABEL, conn_handle));
        }
        Err(err) => invalid(session, LABEL, err.code(), &err.to_string()),
    }
}

fn cmd_sec_level<T: Transport>(session: &mut Session<T>, args: &[String]) {
    const LABEL: &str = "SEC-LEVEL";

    let handle = session.state.connection_handle();
    let Some(text) = args.get(1) else {
        let level = session.state.security_level();
        session.emit(Record::status(LABEL, handle, STATUS_OK, &level.to_string()));
        return;
    };
    let Ok(level) = text.parse::<SecurityLevel>() else {
        invalid(session, LABEL, STATUS_USAGE, "Allowed values: low | medium | high");
        return;
    };

    // Stored even when it cannot be applied now
    session.state.security_level = level;

    let status = session.state.status();
    if session.state.mode().is_le() {
        if status != ConnectionStatus::Connected {
            session.emit(Record::status(
                LABEL,
                0,
                STATUS_COMMAND_FAILED,
                "It can only be done when connected for LE connections",
            ));
            return;
        }
        match session.apply_security_level(level) {
            Ok(()) => session.emit(Record::status(LABEL, handle, STATUS_OK, &level.to_string())),
            Err(err) => invalid(session, LABEL, err.code(), &err.to_string()),
        }
    } else if status != ConnectionStatus::Disconnected {
        invalid(
            session,
            LABEL,
            STATUS_COMMAND_FAILED,
            "It must be disconnected to this change take effect",
        );
    } else {
        session.emit(Record::status(LABEL, 0, STATUS_OK, &level.to_string()));
    }
}

fn cmd_mtu<T: Transport>(session: &mut Session<T>, args: &[String]) {
    const LABEL: &str = "MTU";

    if !session.state.is_connected() {
        session.emit(Record::status(LABEL, 0, STATUS_COMMAND_FAILED, "Command failed: not connected."));
        return;
    }
    if !session.state.mode().is_le() {
        invalid(
            session,
            LABEL,
            STATUS_COMMAND_FAILED,
            "Command failed: operation is only available for LE transport.",
        );
        return;
    }
    let Some(text) = args.get(1) else {
        invalid(session, LABEL, STATUS_USAGE, "Usage: mtu <value>");
        return;
    };
    if session.state.mtu_exchanged {
        invalid(
            session,
            LABEL,
            ATT_ERROR_UNLIKELY,
            "Command failed: MTU exchange can only occur once per connection.",
        );
        return;
    }
    let mtu = match parse_number(text).and_then(|n| u16::try_from(n).ok()) {
        Some(mtu) if mtu >= ATT_DEFAULT_LE_MTU => mtu,
        _ => {
            let message = format!("Invalid value. Minimum MTU size is {}", ATT_DEFAULT_LE_MTU);
            invalid(session, LABEL, ATT_ERROR_UNLIKELY, &message);
            return;
        }
    };
    if require_idle(session, LABEL) {
        session.state.mtu_exchanged = true;
        session.start(Procedure::ExchangeMtu(MtuExchange::new(mtu)));
    }
}

fn cmd_psm<T: Transport>(session: &mut Session<T>, args: &[String]) {
    const LABEL: &str = "PSM";

    // The bearer is fixed once a connect has been issued
    match session.state.status {
        ConnectionStatus::Disconnected => {}
        ConnectionStatus::Connecting => {
            invalid(session, LABEL, STATUS_COMMAND_FAILED, "Command failed: connecting.");
            return;
        }
        ConnectionStatus::Connected => {
            invalid(session, LABEL, STATUS_COMMAND_FAILED, "Command failed: connected.");
            return;
        }
    }
    let psm = match args.get(1).and_then(|t| parse_number(t)).and_then(|n| u16::try_from(n).ok()) {
        Some(psm) => psm,
        None => {
            session.emit(Record::status(LABEL, 0, STATUS_USAGE, "Usage: psm <value>"));
            return;
        }
    };

    session.state.mode = TransportMode::from_psm(psm);
    session.emit(Record::new(LABEL, 0, psm.to_string()));
}
