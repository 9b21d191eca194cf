//! Configuration for the deskly CLI.
//!
//! TOML file at the platform config dir, overridden by `DESKLY_*`
//! environment variables, overridden in turn by CLI flags (the CLI owns
//! that last step). Translates into the resolved settings types in
//! `deskly_core`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use deskly_core::{ConnectionSettings, ReconnectPolicy, ServerSettings};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Desk address (MAC on Linux/Windows, peripheral UUID on macOS).
    pub mac_address: Option<String>,

    /// Bluetooth adapter to use (e.g. "hci0"); first adapter if unset.
    pub adapter: Option<String>,

    /// How long to scan before giving up on discovery.
    #[serde(default = "default_scan_timeout")]
    pub scan_timeout_secs: u64,

    /// Bound on a single connect attempt.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Forwarding server bind/target address.
    #[serde(default = "default_server_address")]
    pub server_address: String,

    /// Forwarding server port.
    #[serde(default = "default_server_port")]
    pub server_port: u16,

    /// Restart the whole session after it finishes, indefinitely.
    #[serde(default)]
    pub forever: bool,

    /// Delay between forever-mode sessions.
    #[serde(default = "default_session_retry_delay")]
    pub session_retry_delay_secs: u64,

    /// Named target heights in millimetres.
    #[serde(default)]
    pub favourites: BTreeMap<String, f64>,

    /// Auto-reconnect policy after an unexpected drop.
    #[serde(default)]
    pub reconnect: ReconnectSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mac_address: None,
            adapter: None,
            scan_timeout_secs: default_scan_timeout(),
            connection_timeout_secs: default_connection_timeout(),
            server_address: default_server_address(),
            server_port: default_server_port(),
            forever: false,
            session_retry_delay_secs: default_session_retry_delay(),
            favourites: BTreeMap::new(),
            reconnect: ReconnectSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconnectSettings {
    #[serde(default = "default_reconnect_initial")]
    pub initial_delay_secs: u64,

    #[serde(default = "default_reconnect_max")]
    pub max_delay_secs: u64,

    /// `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            initial_delay_secs: default_reconnect_initial(),
            max_delay_secs: default_reconnect_max(),
            max_retries: None,
        }
    }
}

fn default_scan_timeout() -> u64 {
    5
}
fn default_connection_timeout() -> u64 {
    10
}
fn default_server_address() -> String {
    "127.0.0.1".into()
}
fn default_server_port() -> u16 {
    9123
}
fn default_session_retry_delay() -> u64 {
    1
}
fn default_reconnect_initial() -> u64 {
    1
}
fn default_reconnect_max() -> u64 {
    30
}

// ── Translation to resolved settings ────────────────────────────────

impl Settings {
    pub fn connection(&self) -> ConnectionSettings {
        ConnectionSettings {
            address: self.mac_address.clone(),
            adapter: self.adapter.clone(),
            scan_timeout: Duration::from_secs(self.scan_timeout_secs),
            connection_timeout: Duration::from_secs(self.connection_timeout_secs),
            reconnect: ReconnectPolicy {
                initial_delay: Duration::from_secs(self.reconnect.initial_delay_secs),
                max_delay: Duration::from_secs(self.reconnect.max_delay_secs),
                max_retries: self.reconnect.max_retries,
            },
        }
    }

    pub fn server(&self) -> ServerSettings {
        ServerSettings {
            address: self.server_address.clone(),
            port: self.server_port,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "deskly", "deskly").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("deskly");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load Settings from file + environment. `path` overrides the canonical
/// config location.
pub fn load(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);

    let figment = Figment::new()
        .merge(Serialized::defaults(Settings::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("DESKLY_"));

    let settings: Settings = figment.extract()?;
    Ok(settings)
}
