//! End-to-end tests over real loopback TCP.
//!
//! A minimal in-process relay stands in for the real counterparty: it
//! accepts the session's outbound connection, reads the registration,
//! connects back to the session's inbound endpoint, and drives the
//! authorization handshake over actual sockets.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::{Duration, Instant};

use gwlink::{Delivery, Envelope, LinkError, MessageKind, SessionBuilder};

/// Reserve a loopback port by binding and releasing it.
fn free_local_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("tcp://127.0.0.1:{port}")
}

/// Relay-side frame I/O: u32 big-endian length prefix.
fn write_frame(stream: &mut TcpStream, frame: &[u8]) {
    let len = u32::try_from(frame.len()).unwrap();
    stream.write_all(&len.to_be_bytes()).unwrap();
    stream.write_all(frame).unwrap();
}

fn read_frame(stream: &mut TcpStream) -> Vec<u8> {
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).unwrap();
    let mut frame = vec![0u8; u32::from_be_bytes(header) as usize];
    stream.read_exact(&mut frame).unwrap();
    frame
}

/// The fixed counterparty for one test: a listener playing the relay.
struct FakeRelay {
    listener: TcpListener,
    url: String,
}

impl FakeRelay {
    fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        Self {
            listener,
            url: format!("tcp://127.0.0.1:{port}"),
        }
    }

    /// Accept the session's outbound connection.
    fn accept(&self) -> TcpStream {
        let (stream, _) = self.listener.accept().unwrap();
        stream
    }
}

#[test]
fn test_handshake_and_traffic_over_loopback() {
    let relay = FakeRelay::start();
    let local_url = free_local_url();

    let session = SessionBuilder::new()
        .service_name("iot")
        .relay_url(&relay.url)
        .local_url(&local_url)
        .recv_timeout_secs(5)
        .establish()
        .unwrap();

    // The relay sees the registration announce first.
    let mut from_session = relay.accept();
    let frame = read_frame(&mut from_session);
    let Envelope::Registration(reg) = Envelope::decode(&frame).unwrap() else {
        panic!("expected registration");
    };
    assert_eq!(reg.service_name, "iot");
    assert_eq!(reg.url, local_url);

    // Relay connects back to the announced address and authorizes.
    let inbound_addr = local_url.strip_prefix("tcp://").unwrap();
    let mut to_session = TcpStream::connect(inbound_addr).unwrap();
    write_frame(
        &mut to_session,
        &Envelope::auth(200).encode().unwrap(),
    );

    assert!(!session.is_authorized());
    assert_eq!(
        session.recv_one().unwrap(),
        Delivery::Handled(MessageKind::Auth)
    );
    assert!(session.is_authorized());
    assert_eq!(session.last_auth_status(), 200);

    // Addressed traffic flows to the session...
    write_frame(
        &mut to_session,
        &Envelope::event("dns:cloud", "mac:AABBCCDDEEFF/iot", b"tick".to_vec())
            .encode()
            .unwrap(),
    );
    assert_eq!(
        session.recv_one().unwrap(),
        Delivery::Handled(MessageKind::Event)
    );

    // ...and traffic for other services is dropped without fuss.
    write_frame(
        &mut to_session,
        &Envelope::event("dns:cloud", "mac:AABBCCDDEEFF/camera", vec![])
            .encode()
            .unwrap(),
    );
    assert!(matches!(
        session.recv_one().unwrap(),
        Delivery::Ignored { .. }
    ));

    // Authorized sends reach the relay intact.
    session
        .send(&Envelope::event(
            "mac:AABBCCDDEEFF/iot",
            "event:device-status",
            b"up".to_vec(),
        ))
        .unwrap();
    let frame = read_frame(&mut from_session);
    let Envelope::Event(event) = Envelope::decode(&frame).unwrap() else {
        panic!("expected event");
    };
    assert_eq!(event.payload, b"up");

    session.shutdown().unwrap();
}

#[test]
fn test_receive_timeout_elapses_without_traffic() {
    let relay = FakeRelay::start();

    let session = SessionBuilder::new()
        .relay_url(&relay.url)
        .local_url(&free_local_url())
        .recv_timeout_secs(1)
        .establish()
        .unwrap();

    let start = Instant::now();
    let err = session.recv_one().unwrap_err();
    assert!(matches!(err, LinkError::RecvTimeout));
    assert!(start.elapsed() >= Duration::from_secs(1));
    assert!(err.is_retryable());
}

#[test]
fn test_establish_fails_cleanly_when_relay_is_down() {
    // Nothing listens at the relay address.
    let err = SessionBuilder::new()
        .relay_url(&free_local_url())
        .local_url(&free_local_url())
        .establish()
        .unwrap_err();
    assert!(matches!(err, LinkError::SendEndpointCreate(_)));
}

#[test]
fn test_readiness_descriptors_are_exposed() {
    let relay = FakeRelay::start();
    let session = SessionBuilder::new()
        .relay_url(&relay.url)
        .local_url(&free_local_url())
        .establish()
        .unwrap();

    assert!(session.recv_readiness_fd() >= 0);
    assert!(session.send_readiness_fd() >= 0);
    assert_ne!(session.recv_readiness_fd(), session.send_readiness_fd());
}
