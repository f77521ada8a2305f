//! TCP transport implementation for the gateway link.
//!
//! Frames travel as a u32 big-endian length prefix followed by the frame
//! bytes. The inbound endpoint listens at the local address and accepts a
//! single relay connection lazily on the first receive; if the relay drops
//! the connection, the endpoint goes back to accepting so the link heals
//! without tearing down the session.

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::{Duration, Instant};

use super::{parse_url, Endpoint, Role, Transport};

/// Upper bound on a single frame; larger prefixes indicate a corrupt or
/// hostile peer.
const MAX_FRAME_LEN: u32 = 4 * 1024 * 1024;

/// Interval between accept attempts while waiting for the relay.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Bound on how long an outbound connect may block.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// TCP transport with length-prefixed framing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransport;

impl Transport for TcpTransport {
    fn open(&self, role: Role, url: &str) -> io::Result<Box<dyn Endpoint>> {
        let addr = parse_url(url)?;
        match role {
            Role::Bind => {
                let listener = TcpListener::bind(addr)?;
                listener.set_nonblocking(true)?;
                tracing::debug!(%addr, "inbound endpoint listening");
                Ok(Box::new(TcpInbound {
                    listener,
                    stream: None,
                    timeout: None,
                }))
            }
            Role::Connect => {
                let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)?;
                stream.set_nodelay(true)?;
                tracing::debug!(%addr, "outbound endpoint connected");
                Ok(Box::new(TcpOutbound { stream }))
            }
        }
    }
}

/// Inbound pipe end: listener plus the currently accepted relay stream.
struct TcpInbound {
    listener: TcpListener,
    stream: Option<TcpStream>,
    timeout: Option<Duration>,
}

impl TcpInbound {
    /// Wait for the relay to connect, bounded by the receive timeout.
    fn accept(&mut self) -> io::Result<()> {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    stream.set_read_timeout(self.timeout)?;
                    tracing::debug!(%peer, "relay connected");
                    self.stream = Some(stream);
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if let Some(deadline) = deadline {
                        if Instant::now() >= deadline {
                            return Err(io::Error::from(io::ErrorKind::WouldBlock));
                        }
                    }
                    std::thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }
}

impl Endpoint for TcpInbound {
    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.timeout = timeout;
        if let Some(stream) = &self.stream {
            stream.set_read_timeout(timeout)?;
        }
        Ok(())
    }

    fn send(&mut self, _frame: &[u8]) -> io::Result<usize> {
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }

    fn recv(&mut self) -> io::Result<Vec<u8>> {
        if self.stream.is_none() {
            self.accept()?;
        }
        let Some(stream) = self.stream.as_mut() else {
            return Err(io::Error::from(io::ErrorKind::NotConnected));
        };
        match read_frame(stream) {
            Ok(frame) => Ok(frame),
            Err(read_err) => {
                if read_err.desynced {
                    // Frame boundary lost; drop the stream and re-accept.
                    self.stream = None;
                }
                Err(read_err.error)
            }
        }
    }

    fn readiness_fd(&self) -> io::Result<RawFd> {
        Ok(match &self.stream {
            Some(stream) => stream.as_raw_fd(),
            None => self.listener.as_raw_fd(),
        })
    }
}

/// Outbound pipe end: a connected relay stream.
struct TcpOutbound {
    stream: TcpStream,
}

impl Endpoint for TcpOutbound {
    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.set_write_timeout(timeout)
    }

    fn send(&mut self, frame: &[u8]) -> io::Result<usize> {
        let len = u32::try_from(frame.len())
            .ok()
            .filter(|len| *len <= MAX_FRAME_LEN)
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "frame exceeds maximum length")
            })?;
        self.stream.write_all(&len.to_be_bytes())?;
        self.stream.write_all(frame)?;
        self.stream.flush()?;
        Ok(frame.len())
    }

    fn recv(&mut self) -> io::Result<Vec<u8>> {
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }

    fn readiness_fd(&self) -> io::Result<RawFd> {
        Ok(self.stream.as_raw_fd())
    }
}

/// Read failure plus whether the stream lost frame alignment.
struct FrameReadError {
    error: io::Error,
    desynced: bool,
}

fn is_timeout(kind: io::ErrorKind) -> bool {
    matches!(kind, io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

/// Read one length-prefixed frame.
///
/// A timeout with zero header bytes consumed leaves the stream aligned on
/// a frame boundary; every other failure marks the stream desynced.
fn read_frame(stream: &mut TcpStream) -> Result<Vec<u8>, FrameReadError> {
    let mut header = [0u8; 4];
    let mut filled = 0;
    while filled < header.len() {
        match stream.read(&mut header[filled..]) {
            Ok(0) => {
                return Err(FrameReadError {
                    error: io::Error::from(io::ErrorKind::UnexpectedEof),
                    desynced: true,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                return Err(FrameReadError {
                    desynced: filled > 0 || !is_timeout(e.kind()),
                    error: e,
                })
            }
        }
    }

    let len = u32::from_be_bytes(header);
    if len > MAX_FRAME_LEN {
        return Err(FrameReadError {
            error: io::Error::new(io::ErrorKind::InvalidData, "frame exceeds maximum length"),
            desynced: true,
        });
    }
    let mut frame = vec![0u8; len as usize];
    stream.read_exact(&mut frame).map_err(|error| FrameReadError {
        error,
        desynced: true,
    })?;
    Ok(frame)
}
