//! Pluggable message handlers.
//!
//! The session dispatches each delivered message to exactly one method of
//! a caller-supplied [`ServiceHandler`]. Every method defaults to an
//! explicit no-op, so an implementation overrides only the kinds it cares
//! about; [`NoopHandler`] accepts everything unchanged. The handler is
//! bound once at session construction and never swapped.
//!
//! Handlers run outside the session's internal lock: a slow handler delays
//! only its own `recv_one` call, never a concurrent send.

use crate::envelope::{CrudMessage, EventMessage, RegistrationMessage, RequestMessage};
use crate::error::Result;

/// Per-kind message callbacks.
#[allow(unused_variables)]
pub trait ServiceHandler: Send + Sync {
    /// Addressed request matched to this service.
    fn on_request(&self, msg: &RequestMessage) -> Result<()> {
        Ok(())
    }

    /// Addressed notification matched to this service.
    fn on_event(&self, msg: &EventMessage) -> Result<()> {
        Ok(())
    }

    /// Addressed resource creation matched to this service.
    fn on_create(&self, msg: &CrudMessage) -> Result<()> {
        Ok(())
    }

    /// Addressed resource read matched to this service.
    fn on_retrieve(&self, msg: &CrudMessage) -> Result<()> {
        Ok(())
    }

    /// Addressed resource update matched to this service.
    fn on_update(&self, msg: &CrudMessage) -> Result<()> {
        Ok(())
    }

    /// Addressed resource removal matched to this service.
    fn on_delete(&self, msg: &CrudMessage) -> Result<()> {
        Ok(())
    }

    /// Link liveness check from the relay.
    fn on_alive(&self) -> Result<()> {
        Ok(())
    }

    /// Relay echo of this session's registration.
    fn on_registration_ack(&self, msg: &RegistrationMessage) -> Result<()> {
        Ok(())
    }
}

/// Handler that ignores every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl ServiceHandler for NoopHandler {}
