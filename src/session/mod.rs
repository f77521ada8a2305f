//! Session management for the gateway link.
//!
//! Implements the client side of the relay protocol: endpoint pair
//! lifecycle, the registration/authorization handshake, and per-kind
//! message dispatch with destination matching.
//!
//! # Message Flow
//!
//! ```text
//! Client                               Relay
//!    |                                   |
//!    |----- REGISTRATION (name, url) -->|   establish()
//!    |                                   |
//!    |<---- AUTH (status) --------------|   recv_one(): authorization
//!    |                                   |   granted iff status == 200
//!    |<---- REQUEST/EVENT/CRUD ---------|   recv_one(): destination
//!    |                                   |   matching, then one handler
//!    |----- EVENT/... ----------------->|   send(): gated on AUTH 200
//!    |                                   |
//!    |<---- AUTH (status != 200) -------|   authorization revoked;
//!    |                                   |   sends fail until re-granted
//! ```
//!
//! # Authorization State Machine
//!
//! ```text
//!                  AUTH status == 200
//! [UNAUTHORIZED] ────────────────────> [AUTHORIZED]
//!        ^                                  │
//!        └──────────────────────────────────┘
//!                  AUTH status != 200
//! ```
//!
//! Both states stay re-enterable for the life of the session; every AUTH
//! message overwrites the previous state.

mod handler;
mod routing;
#[allow(clippy::module_inception)]
mod session;

pub use handler::{NoopHandler, ServiceHandler};
pub use session::{Delivery, Session, SessionBuilder};
