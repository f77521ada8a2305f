//! Gateway link diagnostic monitor.
//!
//! Establishes a client session against a relay, then polls the link and
//! prints every delivery. Useful for verifying relay reachability, watching
//! the authorization handshake, and inspecting traffic addressed to a
//! service without writing a handler.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use gwlink::{Delivery, Session, SessionBuilder, SessionConfig, VERSION};

#[derive(Parser)]
#[command(name = "gwlink")]
#[command(version = VERSION)]
#[command(about = "Gateway link monitor - watch relay traffic for a service", long_about = None)]
struct Cli {
    /// Service identity to register as
    #[arg(short, long)]
    service_name: Option<String>,

    /// Relay address (tcp://host:port)
    #[arg(short, long)]
    relay_url: Option<String>,

    /// Local bind address (tcp://host:port)
    #[arg(short, long)]
    local_url: Option<String>,

    /// Receive timeout in seconds (0 = block forever)
    #[arg(long)]
    recv_timeout_secs: Option<u64>,

    /// Send timeout in seconds
    #[arg(long)]
    send_timeout_secs: Option<u64>,

    /// Config file path (default: $XDG_CONFIG_HOME/gwlink/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit one JSON line per delivery instead of log lines
    #[arg(long)]
    json: bool,

    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .init();

    let config = load_config(&cli)?;
    let session = SessionBuilder::from_config(config)
        .establish()
        .context("failed to establish gateway link")?;

    tracing::info!(
        service = session.service_name(),
        relay = session.relay_url(),
        recv_fd = session.recv_readiness_fd(),
        send_fd = session.send_readiness_fd(),
        "monitoring"
    );

    monitor(&session, cli.json)
}

/// Defaults, then config file, then environment, then flags.
fn load_config(cli: &Cli) -> anyhow::Result<SessionConfig> {
    let mut config = match &cli.config {
        Some(path) => SessionConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => match default_config_path() {
            Some(path) if path.exists() => SessionConfig::from_file(&path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            _ => SessionConfig::default(),
        },
    };
    config = config.merge(SessionConfig::from_env());

    if let Some(name) = &cli.service_name {
        config.service_name = name.clone();
    }
    if let Some(url) = &cli.relay_url {
        config.relay_url = url.clone();
    }
    if let Some(url) = &cli.local_url {
        config.local_url = url.clone();
    }
    if let Some(secs) = cli.recv_timeout_secs {
        config.recv_timeout_secs = secs;
    }
    if let Some(secs) = cli.send_timeout_secs {
        config.send_timeout_secs = secs;
    }
    Ok(config)
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gwlink").join("config.toml"))
}

fn monitor(session: &Session, json: bool) -> anyhow::Result<()> {
    loop {
        match session.recv_one() {
            Ok(delivery) => print_delivery(session, &delivery, json),
            Err(e) if e.is_retryable() => {
                tracing::trace!("receive window elapsed, polling again");
            }
            Err(e) => {
                tracing::error!(code = e.code(), os_error = ?e.os_error(), "link failed: {e}");
                return Err(e.into());
            }
        }
    }
}

fn print_delivery(session: &Session, delivery: &Delivery, json: bool) {
    if json {
        let line = match delivery {
            Delivery::Handled(kind) => serde_json::json!({
                "delivery": "handled",
                "kind": kind.name(),
                "authorized": session.is_authorized(),
                "auth_status": session.last_auth_status(),
            }),
            Delivery::Ignored { destination } => serde_json::json!({
                "delivery": "ignored",
                "destination": destination,
            }),
        };
        println!("{line}");
    } else {
        match delivery {
            Delivery::Handled(kind) => tracing::info!(
                kind = kind.name(),
                authorized = session.is_authorized(),
                "delivered"
            ),
            Delivery::Ignored { destination } => {
                tracing::debug!(%destination, "ignored (addressed elsewhere)");
            }
        }
    }
}
