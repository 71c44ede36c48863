// rustygatt - interactive GATT client
//
// Reads operator commands from stdin, prints output records on stdout and
// logs to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use rustygatt::transport::L2capTransport;
use rustygatt::{AddressType, BdAddr, SecurityLevel, Session, SessionConfig, TransportEvent};
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Sender};
use std::thread;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rustygatt")]
#[command(about = "Interactive GATT client", long_about = None)]
#[command(version)]
struct Cli {
    /// Local adapter (hciN or address)
    #[arg(short = 'i', long = "adapter")]
    adapter: Option<String>,

    /// Remote Bluetooth address
    #[arg(short = 'b', long = "device")]
    device: Option<BdAddr>,

    /// Remote address type: public or random
    #[arg(short = 't', long = "addr-type", default_value = "public")]
    addr_type: AddressType,

    /// Security level: low, medium or high
    #[arg(short = 'l', long = "sec-level", default_value = "low")]
    sec_level: SecurityLevel,

    /// PSM for GATT/ATT over BR/EDR, 0 for LE
    #[arg(short = 'P', long = "psm", default_value_t = 0)]
    psm: u16,

    /// Incoming MTU hint for the L2CAP channel, 0 for the default
    #[arg(short = 'm', long = "mtu", default_value_t = 0)]
    mtu: u16,

    /// Log filter, overriding RUST_LOG
    #[arg(long = "log-filter")]
    log_filter: Option<String>,
}

impl Cli {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            source: self.adapter.clone(),
            destination: self.device,
            address_type: self.addr_type,
            security_level: self.sec_level,
            psm: self.psm,
            mtu: self.mtu,
        }
    }
}

/// Everything the event loop reacts to
#[derive(Debug)]
enum LoopEvent {
    /// An operator line, `None` at end of input
    Line(Option<String>),
    Transport(TransportEvent),
}

fn init_logging(filter: Option<&str>) -> Result<()> {
    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives).context("invalid log filter")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

/// Forwards operator lines until end of input or until the loop goes away
///
/// Bytes that are not UTF-8 are replaced rather than ending the session.
fn forward_lines(mut input: impl BufRead, events: &Sender<LoopEvent>) {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match input.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                while matches!(buf.last(), Some(b'\n' | b'\r')) {
                    buf.pop();
                }
                let line = String::from_utf8_lossy(&buf).into_owned();
                if events.send(LoopEvent::Line(Some(line))).is_err() {
                    return;
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                warn!("Failed to read input: {}", err);
                break;
            }
        }
    }
    let _ = events.send(LoopEvent::Line(None));
}

fn spawn_stdin_reader(events: Sender<LoopEvent>) -> Result<()> {
    thread::Builder::new()
        .name("stdin".into())
        .spawn(move || forward_lines(io::stdin().lock(), &events))
        .context("failed to start input thread")?;
    Ok(())
}

fn flush_output(session: &mut Session<L2capTransport>, out: &mut impl Write, prompt: bool) -> Result<()> {
    let output = session.take_output();
    for item in &output {
        writeln!(out, "{}", item)?;
    }
    if prompt && !session.should_exit() {
        write!(out, "{}", session.prompt())?;
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_filter.as_deref())?;

    let (tx, rx) = mpsc::channel();
    let transport_tx = tx.clone();
    let transport = L2capTransport::new(move |event| {
        let _ = transport_tx.send(LoopEvent::Transport(event));
    });

    let mut session = Session::new(cli.session_config(), transport);
    info!("Starting interactive session (mode {})", session.state().mode());

    spawn_stdin_reader(tx)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write!(out, "{}", session.prompt())?;
    out.flush()?;

    while !session.should_exit() {
        let Ok(event) = rx.recv() else {
            debug!("Event sources closed");
            break;
        };

        match event {
            LoopEvent::Line(line) => {
                session.handle_line(line.as_deref());
                flush_output(&mut session, &mut out, true)?;
            }
            LoopEvent::Transport(event) => {
                session.handle_event(event);
                flush_output(&mut session, &mut out, true)?;
            }
        }
    }

    session.shutdown();
    flush_output(&mut session, &mut out, false)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn forwarded(input: &[u8]) -> Vec<Option<String>> {
        let (tx, rx) = mpsc::channel();
        forward_lines(Cursor::new(input.to_vec()), &tx);
        drop(tx);
        rx.iter()
            .map(|event| match event {
                LoopEvent::Line(line) => line,
                other => panic!("unexpected event {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_invalid_utf8_line_does_not_end_input() {
        let lines = forwarded(b"char-write-req 0010 \xff\xfe\nhelp\r\n");
        assert_eq!(
            lines,
            vec![
                Some("char-write-req 0010 \u{fffd}\u{fffd}".to_string()),
                Some("help".to_string()),
                None,
            ]
        );
    }

    #[test]
    fn test_end_of_input_is_reported_once() {
        assert_eq!(forwarded(b""), vec![None]);
        assert_eq!(forwarded(b"quit"), vec![Some("quit".to_string()), None]);
        assert_eq!(forwarded(b"\n"), vec![Some(String::new()), None]);
    }
}
