//! # Gateway Link - Client Session Library
//!
//! Client-side session management for a message-oriented gateway link:
//! paired unidirectional pipes to a central relay, a registration and
//! authorization handshake, and typed dispatch of envelope-encoded
//! messages to pluggable handlers.
//!
//! ## Features
//!
//! - **Endpoint pair**: inbound pull endpoint bound locally, outbound push
//!   endpoint connected to the relay, both timeout-bounded
//! - **Registration handshake**: service identity announced at establish,
//!   authorization granted/revoked by relay AUTH messages
//! - **Typed dispatch**: per-kind handlers with destination matching for
//!   addressed messages
//! - **Event-loop friendly**: readiness descriptors exposed for external
//!   polling
//!
//! ## Architecture
//!
//! ```text
//! Application                 Session                      Relay
//!      |                         |                           |
//!      |   establish() --------->|--- REGISTRATION --------->|
//!      |                         |<-- AUTH (200) ------------|
//!      |   recv_one() ---------->|   decode + match + dispatch
//!      |<-- handler callback ----|                           |
//!      |   send(envelope) ------>|--- framed envelope ------>|
//!      |   shutdown() ---------->|   close endpoint pair     |
//! ```
//!
//! Exactly one relay, exactly one endpoint pair per session; no routing,
//! queuing, retry, or persistence. The session serializes all endpoint
//! access internally and never holds its lock across a handler call, so
//! one thread can poll receives while another sends.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use gwlink::{Envelope, EventMessage, Result, ServiceHandler, Session};
//!
//! struct Thermostat;
//!
//! impl ServiceHandler for Thermostat {
//!     fn on_event(&self, msg: &EventMessage) -> Result<()> {
//!         println!("event from {}", msg.source);
//!         Ok(())
//!     }
//! }
//!
//! let session = Session::builder()
//!     .service_name("thermostat")
//!     .handler(Arc::new(Thermostat))
//!     .establish()?;
//!
//! loop {
//!     match session.recv_one() {
//!         Ok(delivery) => println!("{delivery:?}"),
//!         Err(e) if e.is_retryable() => continue,
//!         Err(e) => break eprintln!("link failed: {e}"),
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`session`]: session lifecycle, dispatch, handlers
//! - [`envelope`]: message model and binary wire codec
//! - [`transport`]: pipe abstraction and the TCP implementation
//! - [`config`]: defaults, TOML files, environment overrides
//! - [`error`]: error taxonomy and result alias

pub mod config;
pub mod envelope;
pub mod error;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use config::SessionConfig;
pub use envelope::{
    AuthMessage, CodecError, CrudMessage, Envelope, EventMessage, MessageKind,
    RegistrationMessage, RequestMessage,
};
pub use error::{LinkError, Result};
pub use session::{Delivery, NoopHandler, ServiceHandler, Session, SessionBuilder};
pub use transport::{Endpoint, Role, TcpTransport, Transport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
