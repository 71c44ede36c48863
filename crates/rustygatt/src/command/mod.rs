//! Operator command table
//!
//! Commands are a closed set of [`Command`] tags. [`COMMANDS`] maps names to
//! tags along with the help text, and the session resolves each tag to its
//! handler.

pub mod handlers;
pub mod parse;

pub use parse::{parse_handle, parse_number, parse_value, tokenize, ParseError};

/// Every operation reachable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Help,
    Exit,
    Connect,
    Disconnect,
    Primary,
    Characteristics,
    CharDesc,
    CharReadHnd,
    CharReadUuid,
    CharWriteReq,
    CharWriteCmd,
    SecLevel,
    Mtu,
    Psm,
}

/// One entry of the command table
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub command: Command,
    pub params: &'static str,
    pub description: &'static str,
}

pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "help",
        command: Command::Help,
        params: "",
        description: "Show this help",
    },
    CommandSpec {
        name: "exit",
        command: Command::Exit,
        params: "",
        description: "Exit interactive mode",
    },
    CommandSpec {
        name: "quit",
        command: Command::Exit,
        params: "",
        description: "Exit interactive mode",
    },
    CommandSpec {
        name: "connect",
        command: Command::Connect,
        params: "[address [address type]]",
        description: "Connect to a remote device",
    },
    CommandSpec {
        name: "disconnect",
        command: Command::Disconnect,
        params: "",
        description: "Disconnect from a remote device",
    },
    CommandSpec {
        name: "primary",
        command: Command::Primary,
        params: "[UUID]",
        description: "Primary Service Discovery",
    },
    CommandSpec {
        name: "characteristics",
        command: Command::Characteristics,
        params: "[start hnd [end hnd [UUID]]]",
        description: "Characteristics Discovery",
    },
    CommandSpec {
        name: "char-desc",
        command: Command::CharDesc,
        params: "[start hnd] [end hnd]",
        description: "Characteristics Descriptor Discovery",
    },
    CommandSpec {
        name: "char-read-hnd",
        command: Command::CharReadHnd,
        params: "<handle> [offset]",
        description: "Characteristics Value/Descriptor Read by handle",
    },
    CommandSpec {
        name: "char-read-uuid",
        command: Command::CharReadUuid,
        params: "<UUID> [start hnd] [end hnd]",
        description: "Characteristics Value/Descriptor Read by UUID",
    },
    CommandSpec {
        name: "char-write-req",
        command: Command::CharWriteReq,
        params: "<handle> <new value>",
        description: "Characteristic Value Write (Write Request)",
    },
    CommandSpec {
        name: "char-write-cmd",
        command: Command::CharWriteCmd,
        params: "<handle> <new value>",
        description: "Characteristic Value Write (No response)",
    },
    CommandSpec {
        name: "sec-level",
        command: Command::SecLevel,
        params: "[low | medium | high]",
        description: "Set security level. Default: low",
    },
    CommandSpec {
        name: "mtu",
        command: Command::Mtu,
        params: "<value>",
        description: "Exchange MTU for GATT/ATT",
    },
    CommandSpec {
        name: "psm",
        command: Command::Psm,
        params: "<value>",
        description: "Set PSM for GATT/ATT over BR",
    },
];

/// Finds a command by case-insensitive exact name
pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.name.eq_ignore_ascii_case(name))
}

/// Command names starting with `prefix`
///
/// Hook for front ends with a line editor. The bundled binary reads plain
/// lines from stdin and does not complete.
pub fn completions(prefix: &str) -> Vec<&'static str> {
    COMMANDS
        .iter()
        .map(|spec| spec.name)
        .filter(|name| name.starts_with(prefix))
        .collect()
}

/// Help listing, one line per table entry
pub fn help_lines() -> Vec<String> {
    COMMANDS
        .iter()
        .map(|spec| format!("{:<15} {:<30} {}", spec.name, spec.params, spec.description))
        .collect()
}
