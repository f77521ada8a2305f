//! Gateway link error types.
//!
//! Every reportable condition gets its own variant; a specific error is
//! never collapsed into a generic one. Variants backed by a transport
//! failure keep the underlying [`std::io::Error`] as their source, so the
//! platform error number stays available for diagnostics via
//! [`LinkError::os_error`].
//!
//! Two outcomes are expected in steady state rather than faults:
//! [`LinkError::RecvTimeout`] (retryable, see [`LinkError::is_retryable`])
//! and a destination mismatch, which is not an error at all — it surfaces
//! as [`crate::session::Delivery::Ignored`].

use std::io;

use thiserror::Error;

use crate::envelope::CodecError;

/// Gateway link errors.
#[derive(Error, Debug)]
pub enum LinkError {
    /// A caller-supplied parameter failed validation.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// Inbound endpoint could not be created or bound.
    #[error("inbound endpoint create failed: {0}")]
    RecvEndpointCreate(#[source] io::Error),

    /// Receive timeout could not be applied to the inbound endpoint.
    #[error("receive timeout configuration failed: {0}")]
    RecvTimeoutConfig(#[source] io::Error),

    /// Inbound readiness descriptor could not be queried.
    #[error("inbound readiness query failed: {0}")]
    RecvReadinessQuery(#[source] io::Error),

    /// Outbound endpoint could not be created or connected.
    #[error("outbound endpoint create failed: {0}")]
    SendEndpointCreate(#[source] io::Error),

    /// Send timeout could not be applied to the outbound endpoint.
    #[error("send timeout configuration failed: {0}")]
    SendTimeoutConfig(#[source] io::Error),

    /// Outbound readiness descriptor could not be queried.
    #[error("outbound readiness query failed: {0}")]
    SendReadinessQuery(#[source] io::Error),

    /// No message arrived within the configured receive timeout.
    ///
    /// Expected in steady state; callers polling the link should retry.
    #[error("receive timed out")]
    RecvTimeout,

    /// Reading from the inbound endpoint failed.
    #[error("inbound read failed: {0}")]
    RecvRead(#[source] io::Error),

    /// The received frame could not be decoded as an envelope.
    #[error("received frame could not be decoded: {0}")]
    RecvDecode(#[source] CodecError),

    /// The received envelope carried a message kind this session does not
    /// dispatch.
    #[error("unknown message kind {0}")]
    UnknownMessageType(u8),

    /// The session has not been authorized by the relay.
    #[error("session is not authorized to send")]
    Unauthorized,

    /// The outbound envelope could not be encoded.
    #[error("envelope could not be encoded: {0}")]
    SendEncode(#[source] CodecError),

    /// Writing to the outbound endpoint failed.
    #[error("outbound write failed: {0}")]
    SendWrite(#[source] io::Error),

    /// The transport accepted fewer bytes than the frame contains.
    #[error("short write: {sent} of {expected} bytes accepted")]
    SendPartial {
        /// Bytes the transport accepted.
        sent: usize,
        /// Bytes the encoded frame contains.
        expected: usize,
    },

    /// The registration handshake during session establishment failed.
    #[error("registration failed: {0}")]
    Registration(#[source] Box<LinkError>),

    /// Configuration could not be loaded or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

/// Result type alias for gateway link operations.
pub type Result<T> = std::result::Result<T, LinkError>;

impl LinkError {
    /// Stable identifier for this error, suitable for log correlation.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidParams(_) => "INVALID_PARAMS",
            Self::RecvEndpointCreate(_) => "RECV_ENDPOINT_CREATE",
            Self::RecvTimeoutConfig(_) => "RECV_TIMEOUT_CONFIG",
            Self::RecvReadinessQuery(_) => "RECV_READINESS_QUERY",
            Self::SendEndpointCreate(_) => "SEND_ENDPOINT_CREATE",
            Self::SendTimeoutConfig(_) => "SEND_TIMEOUT_CONFIG",
            Self::SendReadinessQuery(_) => "SEND_READINESS_QUERY",
            Self::RecvTimeout => "RECV_TIMEOUT",
            Self::RecvRead(_) => "RECV_READ",
            Self::RecvDecode(_) => "RECV_DECODE",
            Self::UnknownMessageType(_) => "UNKNOWN_MESSAGE_TYPE",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::SendEncode(_) => "SEND_ENCODE",
            Self::SendWrite(_) => "SEND_WRITE",
            Self::SendPartial { .. } => "SEND_PARTIAL",
            Self::Registration(_) => "REGISTRATION",
            Self::Config(_) => "CONFIG",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether retrying the failed operation unchanged can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RecvTimeout)
    }

    /// The underlying platform error number, when one exists.
    pub fn os_error(&self) -> Option<i32> {
        match self {
            Self::RecvEndpointCreate(e)
            | Self::RecvTimeoutConfig(e)
            | Self::RecvReadinessQuery(e)
            | Self::SendEndpointCreate(e)
            | Self::SendTimeoutConfig(e)
            | Self::SendReadinessQuery(e)
            | Self::RecvRead(e)
            | Self::SendWrite(e) => e.raw_os_error(),
            Self::Registration(inner) => inner.os_error(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_is_stable_per_variant() {
        assert_eq!(LinkError::RecvTimeout.code(), "RECV_TIMEOUT");
        assert_eq!(LinkError::Unauthorized.code(), "UNAUTHORIZED");
        assert_eq!(
            LinkError::SendPartial { sent: 1, expected: 2 }.code(),
            "SEND_PARTIAL"
        );
        assert_eq!(
            LinkError::InvalidParams("x".to_string()).code(),
            "INVALID_PARAMS"
        );
    }

    #[test]
    fn test_only_timeout_is_retryable() {
        assert!(LinkError::RecvTimeout.is_retryable());
        assert!(!LinkError::Unauthorized.is_retryable());
        assert!(!LinkError::RecvRead(io::Error::from(io::ErrorKind::BrokenPipe)).is_retryable());
    }

    #[test]
    fn test_os_error_passthrough() {
        let err = LinkError::RecvRead(io::Error::from_raw_os_error(110));
        assert_eq!(err.os_error(), Some(110));

        let wrapped = LinkError::Registration(Box::new(LinkError::SendWrite(
            io::Error::from_raw_os_error(32),
        )));
        assert_eq!(wrapped.os_error(), Some(32));

        assert_eq!(LinkError::RecvTimeout.os_error(), None);
    }
}
