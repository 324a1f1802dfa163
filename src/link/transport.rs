//! Byte transport to the stand controller.
//!
//! Everything here blocks for at most the configured link timeout. The
//! control loop runs at a fixed interval; a wedged socket must surface as
//! [`LinkError::Timeout`], not as a missed safety tick.

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, info};

use crate::error::LinkError;

/// Raw byte transport. [`codec`](super::codec) sits on top of this.
pub trait LinkPort {
    /// Write all bytes, bounded by the link timeout.
    fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError>;

    /// Read whatever is available into `buf`, bounded by the link timeout.
    /// `Ok(0)` means nothing arrived within the bound.
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, LinkError>;
}

// ---------------------------------------------------------------------------
// TCP transport
// ---------------------------------------------------------------------------

/// TCP connection to the controller with bounded send/receive.
pub struct TcpLink {
    stream: TcpStream,
}

impl TcpLink {
    /// Connect and apply the timeout to the connection attempt and to every
    /// later send/receive.
    pub fn connect(addr: impl ToSocketAddrs, timeout_ms: u32) -> Result<Self, LinkError> {
        let timeout = Duration::from_millis(u64::from(timeout_ms));
        let addr = addr
            .to_socket_addrs()
            .map_err(|_| LinkError::ConnectFailed)?
            .next()
            .ok_or(LinkError::ConnectFailed)?;

        let stream =
            TcpStream::connect_timeout(&addr, timeout).map_err(|_| LinkError::ConnectFailed)?;
        stream
            .set_read_timeout(Some(timeout))
            .map_err(|_| LinkError::ConnectFailed)?;
        stream
            .set_write_timeout(Some(timeout))
            .map_err(|_| LinkError::ConnectFailed)?;
        stream.set_nodelay(true).ok();

        info!("TcpLink: connected to {addr}");
        Ok(Self { stream })
    }
}

impl LinkPort for TcpLink {
    fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.stream.write_all(bytes).map_err(|e| match e.kind() {
            ErrorKind::WouldBlock | ErrorKind::TimedOut => LinkError::Timeout,
            ErrorKind::BrokenPipe | ErrorKind::ConnectionReset => LinkError::Closed,
            _ => LinkError::SendFailed,
        })
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        match self.stream.read(buf) {
            // A clean EOF is the peer hanging up, not an empty read.
            Ok(0) => Err(LinkError::Closed),
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                debug!("TcpLink: recv timed out");
                Ok(0)
            }
            Err(_) => Err(LinkError::Closed),
        }
    }
}

// ---------------------------------------------------------------------------
// Null transport
// ---------------------------------------------------------------------------

/// Discards sends, never receives. Stands in for the controller in dry
/// runs of the hardware path.
#[derive(Debug, Default)]
pub struct NullLink {
    pub sent: Vec<u8>,
}

impl LinkPort for NullLink {
    fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.sent.extend_from_slice(bytes);
        Ok(())
    }

    fn recv(&mut self, _buf: &mut [u8]) -> Result<usize, LinkError> {
        Ok(0)
    }
}
