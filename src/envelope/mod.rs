//! Envelope message model and binary codec.
//!
//! An envelope is one typed message on the gateway link. Each kind carries
//! its own fields; the session only inspects the kind tag, the destination
//! (for addressed kinds), the authorization status, and the registration
//! identity — payloads pass through opaque.
//!
//! # Message Kinds
//!
//! | Kind         | Code | Direction      | Purpose                          |
//! |--------------|------|----------------|----------------------------------|
//! | AUTH         | 2    | Relay→Client   | Authorization status update      |
//! | REQUEST      | 3    | Relay→Client   | Addressed request                |
//! | EVENT        | 4    | Bidirectional  | Addressed notification           |
//! | CREATE       | 5    | Relay→Client   | Addressed resource creation      |
//! | RETRIEVE     | 6    | Relay→Client   | Addressed resource read          |
//! | UPDATE       | 7    | Relay→Client   | Addressed resource update        |
//! | DELETE       | 8    | Relay→Client   | Addressed resource removal       |
//! | REGISTRATION | 9    | Client→Relay   | Service identity announcement    |
//! | ALIVE        | 10   | Relay→Client   | Link liveness check              |
//!
//! Wire layout is documented in [`codec`].

mod codec;

pub use codec::CodecError;

/// Message kinds on the gateway link wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    /// Authorization status update.
    Auth = 2,
    /// Addressed request expecting a response.
    Request = 3,
    /// Addressed fire-and-forget notification.
    Event = 4,
    /// Addressed resource creation.
    Create = 5,
    /// Addressed resource read.
    Retrieve = 6,
    /// Addressed resource update.
    Update = 7,
    /// Addressed resource removal.
    Delete = 8,
    /// Service identity announcement.
    Registration = 9,
    /// Link liveness check.
    Alive = 10,
}

impl MessageKind {
    /// Whether this kind carries a destination subject to service matching.
    pub fn is_addressed(&self) -> bool {
        matches!(
            self,
            Self::Request | Self::Event | Self::Create | Self::Retrieve | Self::Update | Self::Delete
        )
    }

    /// Kind name as it appears on the wire protocol documentation.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auth => "AUTH",
            Self::Request => "REQUEST",
            Self::Event => "EVENT",
            Self::Create => "CREATE",
            Self::Retrieve => "RETRIEVE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Registration => "REGISTRATION",
            Self::Alive => "ALIVE",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TryFrom<u8> for MessageKind {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, u8> {
        match value {
            2 => Ok(Self::Auth),
            3 => Ok(Self::Request),
            4 => Ok(Self::Event),
            5 => Ok(Self::Create),
            6 => Ok(Self::Retrieve),
            7 => Ok(Self::Update),
            8 => Ok(Self::Delete),
            9 => Ok(Self::Registration),
            10 => Ok(Self::Alive),
            other => Err(other),
        }
    }
}

/// Authorization status from the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthMessage {
    /// Status code; 200 grants authorization, anything else revokes it.
    pub status: i32,
}

/// Service identity announcement, sent during establishment and echoed back
/// by the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationMessage {
    /// Logical service identity this session answers to.
    pub service_name: String,
    /// Address the relay should deliver inbound messages to.
    pub url: String,
}

/// Addressed request expecting a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMessage {
    /// Correlation identifier for the request/response pair.
    pub transaction: String,
    /// Originating locator.
    pub source: String,
    /// Target locator, matched against the session's service name.
    pub destination: String,
    /// Opaque application payload.
    pub payload: Vec<u8>,
}

/// Addressed fire-and-forget notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMessage {
    /// Originating locator.
    pub source: String,
    /// Target locator, matched against the session's service name.
    pub destination: String,
    /// Opaque application payload.
    pub payload: Vec<u8>,
}

/// Addressed resource operation (CREATE, RETRIEVE, UPDATE, DELETE).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrudMessage {
    /// Correlation identifier for the operation.
    pub transaction: String,
    /// Originating locator.
    pub source: String,
    /// Target locator, matched against the session's service name.
    pub destination: String,
    /// Resource path within the target service.
    pub path: String,
    /// Opaque application payload.
    pub payload: Vec<u8>,
}

/// One decoded gateway link message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// Authorization status update.
    Auth(AuthMessage),
    /// Service identity announcement or its relay echo.
    Registration(RegistrationMessage),
    /// Link liveness check; carries no fields.
    Alive,
    /// Addressed request.
    Request(RequestMessage),
    /// Addressed notification.
    Event(EventMessage),
    /// Addressed resource creation.
    Create(CrudMessage),
    /// Addressed resource read.
    Retrieve(CrudMessage),
    /// Addressed resource update.
    Update(CrudMessage),
    /// Addressed resource removal.
    Delete(CrudMessage),
}

impl Envelope {
    /// Create an AUTH envelope.
    pub fn auth(status: i32) -> Self {
        Self::Auth(AuthMessage { status })
    }

    /// Create a REGISTRATION envelope.
    pub fn registration(service_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Registration(RegistrationMessage {
            service_name: service_name.into(),
            url: url.into(),
        })
    }

    /// Create an ALIVE envelope.
    pub fn alive() -> Self {
        Self::Alive
    }

    /// Create a REQUEST envelope with a fresh transaction identifier.
    pub fn request(
        source: impl Into<String>,
        destination: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self::Request(RequestMessage {
            transaction: new_transaction(),
            source: source.into(),
            destination: destination.into(),
            payload,
        })
    }

    /// Create an EVENT envelope.
    pub fn event(
        source: impl Into<String>,
        destination: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self::Event(EventMessage {
            source: source.into(),
            destination: destination.into(),
            payload,
        })
    }

    /// Create a CREATE envelope with a fresh transaction identifier.
    pub fn create(
        source: impl Into<String>,
        destination: impl Into<String>,
        path: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self::Create(new_crud(source, destination, path, payload))
    }

    /// Create a RETRIEVE envelope with a fresh transaction identifier.
    pub fn retrieve(
        source: impl Into<String>,
        destination: impl Into<String>,
        path: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self::Retrieve(new_crud(source, destination, path, payload))
    }

    /// Create an UPDATE envelope with a fresh transaction identifier.
    pub fn update(
        source: impl Into<String>,
        destination: impl Into<String>,
        path: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self::Update(new_crud(source, destination, path, payload))
    }

    /// Create a DELETE envelope with a fresh transaction identifier.
    pub fn delete(
        source: impl Into<String>,
        destination: impl Into<String>,
        path: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self::Delete(new_crud(source, destination, path, payload))
    }

    /// The kind tag of this envelope.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Auth(_) => MessageKind::Auth,
            Self::Registration(_) => MessageKind::Registration,
            Self::Alive => MessageKind::Alive,
            Self::Request(_) => MessageKind::Request,
            Self::Event(_) => MessageKind::Event,
            Self::Create(_) => MessageKind::Create,
            Self::Retrieve(_) => MessageKind::Retrieve,
            Self::Update(_) => MessageKind::Update,
            Self::Delete(_) => MessageKind::Delete,
        }
    }

    /// Destination locator for addressed kinds, `None` otherwise.
    pub fn destination(&self) -> Option<&str> {
        match self {
            Self::Request(msg) => Some(&msg.destination),
            Self::Event(msg) => Some(&msg.destination),
            Self::Create(msg) | Self::Retrieve(msg) | Self::Update(msg) | Self::Delete(msg) => {
                Some(&msg.destination)
            }
            Self::Auth(_) | Self::Registration(_) | Self::Alive => None,
        }
    }
}

fn new_crud(
    source: impl Into<String>,
    destination: impl Into<String>,
    path: impl Into<String>,
    payload: Vec<u8>,
) -> CrudMessage {
    CrudMessage {
        transaction: new_transaction(),
        source: source.into(),
        destination: destination.into(),
        path: path.into(),
        payload,
    }
}

fn new_transaction() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_codes() {
        assert_eq!(MessageKind::Auth as u8, 2);
        assert_eq!(MessageKind::Delete as u8, 8);
        assert_eq!(MessageKind::Alive as u8, 10);
        for code in 2..=10u8 {
            let kind = MessageKind::try_from(code).unwrap();
            assert_eq!(kind as u8, code);
        }
        assert_eq!(MessageKind::try_from(0), Err(0));
        assert_eq!(MessageKind::try_from(42), Err(42));
    }

    #[test]
    fn test_addressed_kinds() {
        assert!(MessageKind::Request.is_addressed());
        assert!(MessageKind::Event.is_addressed());
        assert!(MessageKind::Retrieve.is_addressed());
        assert!(!MessageKind::Auth.is_addressed());
        assert!(!MessageKind::Registration.is_addressed());
        assert!(!MessageKind::Alive.is_addressed());
    }

    #[test]
    fn test_envelope_accessors() {
        let env = Envelope::request("mac:112233445566/cloud", "mac:AABBCCDDEEFF/iot", vec![1]);
        assert_eq!(env.kind(), MessageKind::Request);
        assert_eq!(env.destination(), Some("mac:AABBCCDDEEFF/iot"));

        let env = Envelope::auth(200);
        assert_eq!(env.kind(), MessageKind::Auth);
        assert_eq!(env.destination(), None);

        assert_eq!(Envelope::alive().destination(), None);
    }

    #[test]
    fn test_request_transactions_are_unique() {
        let a = Envelope::request("s", "d", vec![]);
        let b = Envelope::request("s", "d", vec![]);
        let (Envelope::Request(a), Envelope::Request(b)) = (a, b) else {
            panic!("expected request envelopes");
        };
        assert_ne!(a.transaction, b.transaction);
        assert!(!a.transaction.is_empty());
    }
}
