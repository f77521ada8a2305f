//! Session lifecycle, receive/dispatch, and the send path.

use std::os::unix::io::RawFd;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::config::SessionConfig;
use crate::envelope::{CodecError, CrudMessage, Envelope, MessageKind};
use crate::error::{LinkError, Result};
use crate::transport::{Endpoint, Role, TcpTransport, Transport};

use super::handler::{NoopHandler, ServiceHandler};
use super::routing::destination_matches;

/// Authorization status the relay grants access with.
const AUTH_STATUS_GRANTED: i32 = 200;

/// Outcome of one [`Session::recv_one`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The message was dispatched; exactly one handler ran (or the session
    /// consumed it internally, for AUTH).
    Handled(MessageKind),
    /// The message was addressed to some other service and dropped without
    /// invoking a handler. Routine in multi-service deployments.
    Ignored {
        /// Destination locator that failed to match.
        destination: String,
    },
}

/// State shared between concurrent callers, all behind one lock.
struct Shared {
    inbound: Option<Box<dyn Endpoint>>,
    outbound: Option<Box<dyn Endpoint>>,
    authorized: bool,
    last_auth_status: i32,
}

/// A client session on the gateway link.
///
/// Holds the inbound/outbound endpoint pair to one relay, tracks the
/// authorization state the relay assigns, and dispatches received
/// envelopes to the bound [`ServiceHandler`]. All operations are blocking
/// and safe to call from multiple threads; endpoint access is serialized
/// internally, and the internal lock is never held across a handler
/// invocation.
///
/// Dropping the session closes both endpoints; [`Session::shutdown`] does
/// the same eagerly and is idempotent.
pub struct Session {
    service_name: String,
    relay_url: String,
    local_url: String,
    handler: Arc<dyn ServiceHandler>,
    recv_fd: RawFd,
    send_fd: RawFd,
    shared: Mutex<Shared>,
}

impl Session {
    /// Start building a session.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Establish a session from a configuration, with the default handler
    /// and transport.
    pub fn establish(config: SessionConfig) -> Result<Self> {
        SessionBuilder::from_config(config).establish()
    }

    /// Service identity this session answers to.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Relay address the outbound endpoint is connected to.
    pub fn relay_url(&self) -> &str {
        &self.relay_url
    }

    /// Local address the inbound endpoint is bound at.
    pub fn local_url(&self) -> &str {
        &self.local_url
    }

    /// Whether the most recent AUTH message granted authorization.
    pub fn is_authorized(&self) -> bool {
        self.shared.lock().map(|s| s.authorized).unwrap_or(false)
    }

    /// Status carried by the most recent AUTH message, -1 before any.
    pub fn last_auth_status(&self) -> i32 {
        self.shared.lock().map(|s| s.last_auth_status).unwrap_or(-1)
    }

    /// Readiness descriptor for the inbound endpoint.
    pub fn recv_readiness_fd(&self) -> RawFd {
        self.recv_fd
    }

    /// Readiness descriptor for the outbound endpoint.
    pub fn send_readiness_fd(&self) -> RawFd {
        self.send_fd
    }

    /// Receive and dispatch one message.
    ///
    /// Blocks up to the configured receive timeout; a timeout returns
    /// [`LinkError::RecvTimeout`], which polling callers should treat as a
    /// tick and retry. Exactly one handler invocation occurs per
    /// successfully decoded message, except for destination mismatches,
    /// which return [`Delivery::Ignored`] without touching a handler.
    /// Handler results propagate unchanged.
    pub fn recv_one(&self) -> Result<Delivery> {
        let envelope = {
            let mut shared = self.lock()?;
            let inbound = shared
                .inbound
                .as_mut()
                .ok_or(LinkError::Internal("session already shut down"))?;
            let frame = inbound.recv().map_err(|e| match e.kind() {
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => {
                    LinkError::RecvTimeout
                }
                _ => LinkError::RecvRead(e),
            })?;
            Envelope::decode(&frame).map_err(|e| match e {
                CodecError::UnknownKind(kind) => LinkError::UnknownMessageType(kind),
                other => LinkError::RecvDecode(other),
            })?
        };
        self.dispatch(envelope)
    }

    /// Send an envelope to the relay.
    ///
    /// Authorization is checked immediately before encoding; an AUTH
    /// revocation processed concurrently can still let one in-flight frame
    /// out, matching the relay protocol's tolerance for it.
    pub fn send(&self, envelope: &Envelope) -> Result<()> {
        let authorized = self.lock()?.authorized;
        if !authorized {
            return Err(LinkError::Unauthorized);
        }
        self.write_envelope(envelope)
    }

    /// Close both endpoints. Idempotent; concurrent recv/send calls finish
    /// first (they share the lock), then observe the shutdown.
    pub fn shutdown(&self) -> Result<()> {
        let mut shared = self.lock()?;
        if shared.inbound.is_none() && shared.outbound.is_none() {
            return Ok(());
        }
        shared.inbound = None;
        shared.outbound = None;
        tracing::info!(service = %self.service_name, "gateway link shut down");
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Shared>> {
        self.shared
            .lock()
            .map_err(|_| LinkError::Internal("session lock poisoned"))
    }

    /// Announce this session's identity to the relay. Runs before any AUTH
    /// can have arrived, so it does not pass the authorization gate.
    fn register(&self) -> Result<()> {
        let envelope = Envelope::registration(&self.service_name, &self.local_url);
        self.write_envelope(&envelope)
            .map_err(|e| LinkError::Registration(Box::new(e)))
    }

    fn write_envelope(&self, envelope: &Envelope) -> Result<()> {
        let frame = envelope.encode().map_err(LinkError::SendEncode)?;
        let mut shared = self.lock()?;
        let outbound = shared
            .outbound
            .as_mut()
            .ok_or(LinkError::Internal("session already shut down"))?;
        let sent = outbound.send(&frame).map_err(LinkError::SendWrite)?;
        if sent != frame.len() {
            return Err(LinkError::SendPartial {
                sent,
                expected: frame.len(),
            });
        }
        tracing::debug!(kind = %envelope.kind(), bytes = frame.len(), "envelope sent");
        Ok(())
    }

    fn dispatch(&self, envelope: Envelope) -> Result<Delivery> {
        let kind = envelope.kind();
        match envelope {
            Envelope::Auth(msg) => {
                let mut shared = self.lock()?;
                let was_authorized = shared.authorized;
                shared.authorized = msg.status == AUTH_STATUS_GRANTED;
                shared.last_auth_status = msg.status;
                if was_authorized && !shared.authorized {
                    tracing::warn!(status = msg.status, "authorization revoked");
                } else {
                    tracing::debug!(
                        status = msg.status,
                        authorized = shared.authorized,
                        "authorization updated"
                    );
                }
                Ok(Delivery::Handled(kind))
            }
            Envelope::Registration(msg) => {
                tracing::debug!(service = %msg.service_name, "registration echo received");
                self.handler.on_registration_ack(&msg)?;
                Ok(Delivery::Handled(kind))
            }
            Envelope::Alive => {
                self.handler.on_alive()?;
                Ok(Delivery::Handled(kind))
            }
            Envelope::Request(msg) => {
                if !destination_matches(&msg.destination, &self.service_name) {
                    return Ok(self.ignored(msg.destination));
                }
                self.handler.on_request(&msg)?;
                Ok(Delivery::Handled(kind))
            }
            Envelope::Event(msg) => {
                if !destination_matches(&msg.destination, &self.service_name) {
                    return Ok(self.ignored(msg.destination));
                }
                self.handler.on_event(&msg)?;
                Ok(Delivery::Handled(kind))
            }
            Envelope::Create(msg)
            | Envelope::Retrieve(msg)
            | Envelope::Update(msg)
            | Envelope::Delete(msg) => self.dispatch_crud(kind, msg),
        }
    }

    fn dispatch_crud(&self, kind: MessageKind, msg: CrudMessage) -> Result<Delivery> {
        if !destination_matches(&msg.destination, &self.service_name) {
            return Ok(self.ignored(msg.destination));
        }
        match kind {
            MessageKind::Create => self.handler.on_create(&msg)?,
            MessageKind::Retrieve => self.handler.on_retrieve(&msg)?,
            MessageKind::Update => self.handler.on_update(&msg)?,
            MessageKind::Delete => self.handler.on_delete(&msg)?,
            _ => return Err(LinkError::Internal("non-crud kind in crud dispatch")),
        }
        Ok(Delivery::Handled(kind))
    }

    fn ignored(&self, destination: String) -> Delivery {
        tracing::trace!(%destination, service = %self.service_name, "destination not for this service");
        Delivery::Ignored { destination }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("service_name", &self.service_name)
            .field("relay_url", &self.relay_url)
            .field("local_url", &self.local_url)
            .field("authorized", &self.is_authorized())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Session`].
///
/// Unset fields take the defaults from [`SessionConfig::default`]; the
/// handler defaults to [`NoopHandler`] and the transport to
/// [`TcpTransport`].
pub struct SessionBuilder {
    config: SessionConfig,
    handler: Option<Arc<dyn ServiceHandler>>,
    transport: Option<Box<dyn Transport>>,
}

impl SessionBuilder {
    /// Builder with default configuration.
    pub fn new() -> Self {
        Self::from_config(SessionConfig::default())
    }

    /// Builder seeded from an existing configuration.
    pub fn from_config(config: SessionConfig) -> Self {
        Self {
            config,
            handler: None,
            transport: None,
        }
    }

    /// Service identity this session answers to.
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.config.service_name = name.into();
        self
    }

    /// Relay address (`tcp://host:port`) to connect to.
    pub fn relay_url(mut self, url: impl Into<String>) -> Self {
        self.config.relay_url = url.into();
        self
    }

    /// Local address (`tcp://host:port`) to bind for inbound messages.
    pub fn local_url(mut self, url: impl Into<String>) -> Self {
        self.config.local_url = url.into();
        self
    }

    /// Receive timeout in seconds; 0 blocks indefinitely.
    pub fn recv_timeout_secs(mut self, secs: u64) -> Self {
        self.config.recv_timeout_secs = secs;
        self
    }

    /// Send timeout in seconds.
    pub fn send_timeout_secs(mut self, secs: u64) -> Self {
        self.config.send_timeout_secs = secs;
        self
    }

    /// Message handler; defaults to [`NoopHandler`].
    pub fn handler(mut self, handler: Arc<dyn ServiceHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Transport implementation; defaults to [`TcpTransport`].
    pub fn transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Open both endpoints, apply timeouts, announce the service identity
    /// to the relay, and return the live session.
    ///
    /// Each step reports its own error variant; on any failure every
    /// endpoint opened so far is closed before returning.
    pub fn establish(self) -> Result<Session> {
        let config = self.config;
        config.validate()?;
        let transport = self
            .transport
            .unwrap_or_else(|| Box::new(TcpTransport::default()));
        let handler = self.handler.unwrap_or_else(|| Arc::new(NoopHandler));

        tracing::info!(
            service = %config.service_name,
            relay = %config.relay_url,
            local = %config.local_url,
            "establishing gateway link"
        );

        let mut inbound = transport
            .open(Role::Bind, &config.local_url)
            .map_err(LinkError::RecvEndpointCreate)?;
        if config.recv_timeout_secs > 0 {
            inbound
                .set_timeout(Some(Duration::from_secs(config.recv_timeout_secs)))
                .map_err(LinkError::RecvTimeoutConfig)?;
        }
        let recv_fd = inbound
            .readiness_fd()
            .map_err(LinkError::RecvReadinessQuery)?;

        let mut outbound = transport
            .open(Role::Connect, &config.relay_url)
            .map_err(LinkError::SendEndpointCreate)?;
        outbound
            .set_timeout(Some(Duration::from_secs(config.send_timeout_secs)))
            .map_err(LinkError::SendTimeoutConfig)?;
        let send_fd = outbound
            .readiness_fd()
            .map_err(LinkError::SendReadinessQuery)?;

        let session = Session {
            service_name: config.service_name,
            relay_url: config.relay_url,
            local_url: config.local_url,
            handler,
            recv_fd,
            send_fd,
            shared: Mutex::new(Shared {
                inbound: Some(inbound),
                outbound: Some(outbound),
                authorized: false,
                last_auth_status: -1,
            }),
        };
        session.register()?;

        tracing::info!(service = %session.service_name, "gateway link established");
        Ok(session)
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
