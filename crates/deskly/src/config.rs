//! Merge the config file, environment, and CLI flags into the resolved
//! per-process application settings.

use std::time::Duration;

use deskly_core::{Command, ConnectionSettings, ServerSettings, SessionContext};

use crate::cli::Cli;
use crate::error::CliError;

/// Everything one process invocation needs, resolved and validated.
#[derive(Debug, Clone)]
pub struct App {
    pub connection: ConnectionSettings,
    pub server: ServerSettings,
    /// Base session context; forwarding servers derive per-request
    /// contexts from it.
    pub base: SessionContext,
    pub forward: bool,
    pub forever: bool,
    pub session_retry_delay: Duration,
}

/// Build the `App` from the config file, `DESKLY_*` env vars, and CLI
/// flag overrides (highest precedence).
pub fn build(cli: &Cli) -> Result<App, CliError> {
    let mut settings = deskly_config::load(cli.global.config.as_deref())?;

    if let Some(address) = &cli.global.mac_address {
        settings.mac_address = Some(address.clone());
    }
    if let Some(adapter) = &cli.global.adapter {
        settings.adapter = Some(adapter.clone());
    }
    if let Some(secs) = cli.global.scan_timeout {
        settings.scan_timeout_secs = secs;
    }
    if let Some(secs) = cli.global.connection_timeout {
        settings.connection_timeout_secs = secs;
    }
    if let Some(address) = &cli.global.server_address {
        settings.server_address = address.clone();
    }
    if let Some(port) = cli.global.server_port {
        settings.server_port = port;
    }
    let forever = settings.forever || cli.global.forever;

    let command = cli
        .command
        .as_ref()
        .and_then(crate::cli::Command::to_desk_command)
        .unwrap_or(Command::Status);

    // Scans and forwarded commands never open a device connection; everything
    // else needs an address to connect to.
    let needs_connection = !cli.global.forward && command != Command::Scan;
    if needs_connection && settings.mac_address.is_none() {
        return Err(CliError::NoAddress);
    }

    Ok(App {
        connection: settings.connection(),
        server: settings.server(),
        base: SessionContext::new(command, cli.global.quiet, settings.favourites.clone()),
        forward: cli.global.forward,
        forever,
        session_retry_delay: Duration::from_secs(settings.session_retry_delay_secs),
    })
}
