//! L2CAP socket transport for Linux
//!
//! Opens a `SOCK_SEQPACKET` L2CAP socket per connection: the fixed ATT
//! channel for LE peers, or a PSM for BR/EDR peers. Each channel gets a reader
//! thread that reports connection completion, inbound PDUs and hangups through
//! the notify callback.

use super::{ChannelId, ConnectParams, Transport, TransportEvent};
use crate::att::ATT_CID;
use crate::error::TransportError;
use crate::gap::constants::{BDADDR_BREDR, BDADDR_LE_PUBLIC};
use crate::gap::{BdAddr, SecurityLevel};
use log::{debug, trace, warn};
use std::collections::HashMap;
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::sync::Arc;
use std::thread;

// Bluetooth socket constants
const AF_BLUETOOTH: i32 = 31;
const BTPROTO_HCI: i32 = 1;
const BTPROTO_L2CAP: i32 = 0;
const SOL_BLUETOOTH: i32 = 274;
const SOL_L2CAP: i32 = 6;
const BT_SECURITY: i32 = 4;
const L2CAP_OPTIONS: i32 = 0x01;
const L2CAP_CONNINFO: i32 = 0x02;
const HCIGETDEVINFO: u64 = 0x800448d3;

/// Largest PDU the reader thread accepts in one read
const READ_BUFFER_SIZE: usize = 65535;

/// Callback receiving events from reader threads
pub type Notify = Arc<dyn Fn(TransportEvent) + Send + Sync>;

#[repr(C)]
struct SockaddrL2 {
    l2_family: libc::sa_family_t,
    l2_psm: u16,
    l2_bdaddr: [u8; 6],
    l2_cid: u16,
    l2_bdaddr_type: u8,
}

#[repr(C)]
#[derive(Default)]
struct BtSecurity {
    level: u8,
    key_size: u8,
}

#[repr(C)]
#[derive(Default)]
struct L2capConninfo {
    hci_handle: u16,
    dev_class: [u8; 3],
}

#[repr(C)]
#[derive(Default)]
struct L2capOptions {
    omtu: u16,
    imtu: u16,
    flush_to: u16,
    mode: u8,
    fcs: u8,
    max_tx: u8,
    txwin_size: u16,
}

// Leading part of hci_dev_info; the kernel fills the whole structure
#[repr(C)]
struct HciDevInfo {
    dev_id: u16,
    name: [u8; 8],
    bdaddr: [u8; 6],
    rest: [u8; 76],
}

/// Transport over kernel L2CAP sockets
pub struct L2capTransport {
    notify: Notify,
    channels: HashMap<ChannelId, Arc<OwnedFd>>,
    next_channel: u64,
}

impl L2capTransport {
    /// Creates a transport reporting events through `notify`
    ///
    /// `notify` runs on reader threads, never on the caller's thread.
    pub fn new<F>(notify: F) -> Self
    where
        F: Fn(TransportEvent) + Send + Sync + 'static,
    {
        Self {
            notify: Arc::new(notify),
            channels: HashMap::new(),
            next_channel: 0,
        }
    }

    fn fd(&self, channel: ChannelId) -> Result<&Arc<OwnedFd>, TransportError> {
        self.channels
            .get(&channel)
            .ok_or(TransportError::NotOpen(channel))
    }

    fn open_socket(params: &ConnectParams) -> Result<OwnedFd, TransportError> {
        let source = resolve_source(params.source.as_deref())?;
        let le = params.psm == 0;

        let raw = unsafe {
            libc::socket(
                AF_BLUETOOTH,
                libc::SOCK_SEQPACKET | libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
                BTPROTO_L2CAP,
            )
        };
        if raw < 0 {
            return Err(io::Error::last_os_error().into());
        }
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let local = SockaddrL2 {
            l2_family: AF_BLUETOOTH as libc::sa_family_t,
            l2_psm: 0,
            l2_bdaddr: source,
            l2_cid: if le { ATT_CID.to_le() } else { 0 },
            l2_bdaddr_type: if le { BDADDR_LE_PUBLIC } else { BDADDR_BREDR },
        };
        let result = unsafe {
            libc::bind(
                fd.as_raw_fd(),
                &local as *const _ as *const libc::sockaddr,
                mem::size_of::<SockaddrL2>() as libc::socklen_t,
            )
        };
        if result < 0 {
            return Err(io::Error::last_os_error().into());
        }

        set_security(fd.as_raw_fd(), params.security_level)?;

        if !le && params.mtu != 0 {
            let mut options: L2capOptions = getsockopt(fd.as_raw_fd(), SOL_L2CAP, L2CAP_OPTIONS)?;
            options.imtu = params.mtu;
            setsockopt(fd.as_raw_fd(), SOL_L2CAP, L2CAP_OPTIONS, &options)?;
        }

        let remote = SockaddrL2 {
            l2_family: AF_BLUETOOTH as libc::sa_family_t,
            l2_psm: params.psm.to_le(),
            l2_bdaddr: params.destination.bytes,
            l2_cid: if le { ATT_CID.to_le() } else { 0 },
            l2_bdaddr_type: if le {
                params.address_type.le_bdaddr_type()
            } else {
                BDADDR_BREDR
            },
        };
        let result = unsafe {
            libc::connect(
                fd.as_raw_fd(),
                &remote as *const _ as *const libc::sockaddr,
                mem::size_of::<SockaddrL2>() as libc::socklen_t,
            )
        };
        if result < 0 {
            let err = io::Error::last_os_error();
            if !matches!(err.raw_os_error(), Some(libc::EINPROGRESS) | Some(libc::EAGAIN)) {
                return Err(err.into());
            }
        }

        Ok(fd)
    }
}

impl Transport for L2capTransport {
    fn connect(&mut self, params: &ConnectParams) -> Result<ChannelId, TransportError> {
        let fd = Arc::new(Self::open_socket(params)?);
        let channel = ChannelId(self.next_channel);
        self.next_channel += 1;

        debug!("Connecting {} to {} (psm {})", channel, params.destination, params.psm);

        let reader_fd = Arc::clone(&fd);
        let notify = Arc::clone(&self.notify);
        thread::Builder::new()
            .name(format!("l2cap-{}", channel.0))
            .spawn(move || run_reader(reader_fd, channel, notify))?;

        self.channels.insert(channel, fd);
        Ok(channel)
    }

    fn send(&mut self, channel: ChannelId, pdu: &[u8]) -> Result<(), TransportError> {
        let fd = self.fd(channel)?;
        trace!("{} > {}", channel, hex::encode(pdu));
        let written = unsafe {
            libc::send(
                fd.as_raw_fd(),
                pdu.as_ptr() as *const libc::c_void,
                pdu.len(),
                libc::MSG_NOSIGNAL,
            )
        };
        if written < 0 {
            return Err(io::Error::last_os_error().into());
        }
        Ok(())
    }

    fn handle(&self, channel: ChannelId) -> Result<u16, TransportError> {
        let fd = self.fd(channel)?;
        let info: L2capConninfo = getsockopt(fd.as_raw_fd(), SOL_L2CAP, L2CAP_CONNINFO)?;
        Ok(info.hci_handle)
    }

    fn mtu(&self, channel: ChannelId) -> Result<u16, TransportError> {
        let fd = self.fd(channel)?;
        let options: L2capOptions = getsockopt(fd.as_raw_fd(), SOL_L2CAP, L2CAP_OPTIONS)?;
        debug!("{} imtu {} omtu {}", channel, options.imtu, options.omtu);
        Ok(options.imtu.min(options.omtu))
    }

    fn set_security_level(
        &mut self,
        channel: ChannelId,
        level: SecurityLevel,
    ) -> Result<(), TransportError> {
        let fd = self.fd(channel)?;
        set_security(fd.as_raw_fd(), level)
    }

    fn close(&mut self, channel: ChannelId) {
        if let Some(fd) = self.channels.remove(&channel) {
            debug!("Closing {}", channel);
            // Wakes the reader thread, which drops its reference on hangup
            unsafe { libc::shutdown(fd.as_raw_fd(), libc::SHUT_RDWR) };
        }
    }
}

impl Drop for L2capTransport {
    fn drop(&mut self) {
        let channels: Vec<ChannelId> = self.channels.keys().copied().collect();
        for channel in channels {
            self.close(channel);
        }
    }
}

fn run_reader(fd: Arc<OwnedFd>, channel: ChannelId, notify: Notify) {
    let raw = fd.as_raw_fd();

    match wait_connected(raw) {
        Ok(()) => notify(TransportEvent::Connected(channel)),
        Err(err) => {
            notify(TransportEvent::ConnectFailed(channel, err));
            return;
        }
    }

    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let revents = match poll_fd(raw, libc::POLLIN) {
            Ok(revents) => revents,
            Err(err) => {
                notify(TransportEvent::Error(channel, err.into()));
                return;
            }
        };

        if revents & libc::POLLIN == 0 {
            match socket_error(raw) {
                Ok(0) => notify(TransportEvent::Hangup(channel)),
                Ok(code) => notify(TransportEvent::Error(
                    channel,
                    io::Error::from_raw_os_error(code).into(),
                )),
                Err(err) => notify(TransportEvent::Error(channel, err.into())),
            }
            return;
        }

        let read = unsafe { libc::read(raw, buffer.as_mut_ptr() as *mut libc::c_void, buffer.len()) };
        if read < 0 {
            let err = io::Error::last_os_error();
            if matches!(err.raw_os_error(), Some(libc::EAGAIN) | Some(libc::EINTR)) {
                continue;
            }
            if err.raw_os_error() == Some(libc::ECONNRESET) {
                notify(TransportEvent::Hangup(channel));
            } else {
                notify(TransportEvent::Error(channel, err.into()));
            }
            return;
        }
        if read == 0 {
            notify(TransportEvent::Hangup(channel));
            return;
        }

        let pdu = buffer[..read as usize].to_vec();
        trace!("{} < {}", channel, hex::encode(&pdu));
        notify(TransportEvent::Pdu(channel, pdu));
    }
}

fn wait_connected(fd: RawFd) -> Result<(), TransportError> {
    poll_fd(fd, libc::POLLOUT)?;
    match socket_error(fd)? {
        0 => Ok(()),
        code => Err(io::Error::from_raw_os_error(code).into()),
    }
}

fn poll_fd(fd: RawFd, events: libc::c_short) -> io::Result<libc::c_short> {
    let mut pollfd = libc::pollfd {
        fd,
        events,
        revents: 0,
    };
    loop {
        let result = unsafe { libc::poll(&mut pollfd, 1, -1) };
        if result >= 0 {
            return Ok(pollfd.revents);
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::EINTR) {
            return Err(err);
        }
    }
}

fn socket_error(fd: RawFd) -> io::Result<i32> {
    getsockopt::<libc::c_int>(fd, libc::SOL_SOCKET, libc::SO_ERROR)
}

fn set_security(fd: RawFd, level: SecurityLevel) -> Result<(), TransportError> {
    let security = BtSecurity {
        level: level.to_kernel(),
        key_size: 0,
    };
    setsockopt(fd, SOL_BLUETOOTH, BT_SECURITY, &security)?;
    Ok(())
}

fn getsockopt<T: Default>(fd: RawFd, level: i32, name: i32) -> io::Result<T> {
    let mut value = T::default();
    let mut len = mem::size_of::<T>() as libc::socklen_t;
    let result = unsafe {
        libc::getsockopt(fd, level, name, &mut value as *mut T as *mut libc::c_void, &mut len)
    };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(value)
}

fn setsockopt<T>(fd: RawFd, level: i32, name: i32, value: &T) -> io::Result<()> {
    let result = unsafe {
        libc::setsockopt(
            fd,
            level,
            name,
            value as *const T as *const libc::c_void,
            mem::size_of::<T>() as libc::socklen_t,
        )
    };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Resolves the local adapter to bind to
///
/// Accepts `hciN`, a Bluetooth address, or nothing for any adapter.
fn resolve_source(source: Option<&str>) -> Result<[u8; 6], TransportError> {
    let Some(source) = source else {
        return Ok(BdAddr::ANY.bytes);
    };

    if let Some(index) = source.strip_prefix("hci") {
        let dev_id: u16 = index
            .parse()
            .map_err(|_| TransportError::InvalidAdapter(source.to_string()))?;
        return adapter_address(dev_id);
    }

    source
        .parse::<BdAddr>()
        .map(|addr| addr.bytes)
        .map_err(|_| TransportError::InvalidAdapter(source.to_string()))
}

fn adapter_address(dev_id: u16) -> Result<[u8; 6], TransportError> {
    let raw = unsafe { libc::socket(AF_BLUETOOTH, libc::SOCK_RAW | libc::SOCK_CLOEXEC, BTPROTO_HCI) };
    if raw < 0 {
        return Err(io::Error::last_os_error().into());
    }
    let fd = unsafe { OwnedFd::from_raw_fd(raw) };

    let mut info = HciDevInfo {
        dev_id,
        name: [0; 8],
        bdaddr: [0; 6],
        rest: [0; 76],
    };
    let result = unsafe { libc::ioctl(fd.as_raw_fd(), HCIGETDEVINFO as _, &mut info as *mut HciDevInfo) };
    if result < 0 {
        warn!("HCIGETDEVINFO failed for hci{}", dev_id);
        return Err(TransportError::InvalidAdapter(format!("hci{}", dev_id)));
    }

    Ok(info.bdaddr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sockaddr_layout_matches_kernel() {
        assert_eq!(mem::size_of::<SockaddrL2>(), 14);
        assert_eq!(mem::size_of::<L2capOptions>(), 12);
        assert_eq!(mem::size_of::<HciDevInfo>(), 92);
    }

    #[test]
    fn test_resolve_source() {
        assert_eq!(resolve_source(None).unwrap(), [0; 6]);
        assert_eq!(
            resolve_source(Some("00:11:22:33:44:55")).unwrap(),
            [0x55, 0x44, 0x33, 0x22, 0x11, 0x00]
        );
        assert!(matches!(
            resolve_source(Some("hcix")),
            Err(TransportError::InvalidAdapter(_))
        ));
        assert!(matches!(
            resolve_source(Some("bogus")),
            Err(TransportError::InvalidAdapter(_))
        ));
    }
}
