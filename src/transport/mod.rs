//! Transport layer abstraction for the gateway link.
//!
//! The session holds two unidirectional, message-oriented endpoints: an
//! inbound endpoint bound at a local address (the relay connects in and
//! pushes frames) and an outbound endpoint connected to the relay. Both
//! sides of that seam are traits so tests can substitute doubles that
//! count opens and closes or synthesize failures:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │                Session                   │
//! │          (transport-agnostic)            │
//! └───────┬─────────────────────────┬────────┘
//!         │ Bind                    │ Connect
//!         ▼                         ▼
//! ┌───────────────┐         ┌───────────────┐
//! │  inbound       │         │  outbound     │
//! │  Endpoint      │         │  Endpoint     │
//! └───────────────┘         └───────────────┘
//! ```
//!
//! [`TcpTransport`] is the shipped implementation: whole frames carried
//! over TCP with a u32 length prefix. Addresses use the textual
//! `tcp://host:port` form.

mod tcp;

pub use tcp::TcpTransport;

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::os::unix::io::RawFd;
use std::time::Duration;

/// Role an endpoint is opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Listen at a local address for the relay to connect in.
    Bind,
    /// Connect out to the relay.
    Connect,
}

/// One unidirectional, message-oriented pipe end.
///
/// Inbound endpoints support [`recv`](Endpoint::recv), outbound endpoints
/// support [`send`](Endpoint::send); calling the wrong direction returns
/// [`io::ErrorKind::Unsupported`]. Timeouts surface as
/// [`io::ErrorKind::WouldBlock`] or [`io::ErrorKind::TimedOut`].
/// Dropping an endpoint releases its underlying resources.
pub trait Endpoint: Send {
    /// Bound the blocking time of subsequent operations; `None` blocks
    /// indefinitely.
    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;

    /// Write one whole frame, returning the number of bytes accepted.
    fn send(&mut self, frame: &[u8]) -> io::Result<usize>;

    /// Read one whole frame.
    fn recv(&mut self) -> io::Result<Vec<u8>>;

    /// Descriptor an external event loop can watch for readiness.
    fn readiness_fd(&self) -> io::Result<RawFd>;
}

/// Factory for endpoints; the seam where test doubles plug in.
pub trait Transport: Send + Sync {
    /// Open an endpoint in the given role at a `tcp://host:port` address.
    fn open(&self, role: Role, url: &str) -> io::Result<Box<dyn Endpoint>>;
}

/// Parse a `tcp://host:port` address into a socket address.
pub fn parse_url(url: &str) -> io::Result<SocketAddr> {
    let authority = url.strip_prefix("tcp://").ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("unsupported address scheme: {url}"),
        )
    })?;
    authority
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("address resolved to nothing: {url}"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url() {
        let addr = parse_url("tcp://127.0.0.1:6666").unwrap();
        assert_eq!(addr.port(), 6666);
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn test_parse_url_rejects_other_schemes() {
        for url in ["ipc:///tmp/x", "127.0.0.1:6666", "http://127.0.0.1:80", ""] {
            let err = parse_url(url).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput, "{url}");
        }
    }

    #[test]
    fn test_parse_url_rejects_missing_port() {
        assert!(parse_url("tcp://127.0.0.1").is_err());
    }
}
