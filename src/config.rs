//! Session configuration.
//!
//! Every field has a default, so an empty configuration establishes a
//! working loopback session. Sources, lowest precedence first: built-in
//! defaults, a TOML file, `GWLINK_*` environment variables, then whatever
//! the caller sets directly on the builder.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{LinkError, Result};

/// Service identity used when none is configured.
pub const SERVICE_NAME_DEFAULT: &str = "iot";

/// Relay address the outbound endpoint connects to by default.
pub const RELAY_URL_DEFAULT: &str = "tcp://127.0.0.1:6666";

/// Local address the inbound endpoint binds by default.
pub const LOCAL_URL_DEFAULT: &str = "tcp://127.0.0.1:6667";

/// Default receive timeout in seconds; 0 disables the timeout.
pub const RECV_TIMEOUT_SECS_DEFAULT: u64 = 2;

/// Default send timeout in seconds.
pub const SEND_TIMEOUT_SECS_DEFAULT: u64 = 2;

/// Longest accepted service name, in bytes.
pub const SERVICE_NAME_LEN_MAX: usize = 63;

/// Gateway link session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Logical service identity; destination matching filters on it.
    pub service_name: String,

    /// Relay address (`tcp://host:port`) the outbound endpoint connects to.
    pub relay_url: String,

    /// Local address (`tcp://host:port`) the inbound endpoint binds.
    pub local_url: String,

    /// Receive timeout in seconds; 0 blocks indefinitely.
    pub recv_timeout_secs: u64,

    /// Send timeout in seconds.
    pub send_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            service_name: SERVICE_NAME_DEFAULT.to_string(),
            relay_url: RELAY_URL_DEFAULT.to_string(),
            local_url: LOCAL_URL_DEFAULT.to_string(),
            recv_timeout_secs: RECV_TIMEOUT_SECS_DEFAULT,
            send_timeout_secs: SEND_TIMEOUT_SECS_DEFAULT,
        }
    }
}

impl SessionConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| LinkError::Config(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| LinkError::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Load configuration overrides from `GWLINK_*` environment variables.
    ///
    /// Unset variables keep their defaults; unparseable numeric values are
    /// ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(name) = std::env::var("GWLINK_SERVICE_NAME") {
            config.service_name = name;
        }
        if let Ok(url) = std::env::var("GWLINK_RELAY_URL") {
            config.relay_url = url;
        }
        if let Ok(url) = std::env::var("GWLINK_LOCAL_URL") {
            config.local_url = url;
        }
        if let Ok(secs) = std::env::var("GWLINK_RECV_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.recv_timeout_secs = secs;
            }
        }
        if let Ok(secs) = std::env::var("GWLINK_SEND_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.send_timeout_secs = secs;
            }
        }
        config
    }

    /// Merge with another config; `other`'s non-default fields win.
    pub fn merge(self, other: Self) -> Self {
        let defaults = Self::default();
        Self {
            service_name: if other.service_name != defaults.service_name {
                other.service_name
            } else {
                self.service_name
            },
            relay_url: if other.relay_url != defaults.relay_url {
                other.relay_url
            } else {
                self.relay_url
            },
            local_url: if other.local_url != defaults.local_url {
                other.local_url
            } else {
                self.local_url
            },
            recv_timeout_secs: if other.recv_timeout_secs != defaults.recv_timeout_secs {
                other.recv_timeout_secs
            } else {
                self.recv_timeout_secs
            },
            send_timeout_secs: if other.send_timeout_secs != defaults.send_timeout_secs {
                other.send_timeout_secs
            } else {
                self.send_timeout_secs
            },
        }
    }

    /// Validate caller-controlled fields.
    pub fn validate(&self) -> Result<()> {
        if self.service_name.is_empty() {
            return Err(LinkError::InvalidParams(
                "service name must not be empty".to_string(),
            ));
        }
        if self.service_name.len() > SERVICE_NAME_LEN_MAX {
            return Err(LinkError::InvalidParams(format!(
                "service name exceeds {SERVICE_NAME_LEN_MAX} bytes"
            )));
        }
        if self.relay_url.is_empty() || self.local_url.is_empty() {
            return Err(LinkError::InvalidParams(
                "relay and local addresses must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
