//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help
//! text. The process exit contract is binary: every failure maps to 1.

use miette::Diagnostic;
use thiserror::Error;

use deskly_ble::BleError;
use deskly_core::CoreError;

/// Process exit codes: success, or failure of any kind.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Device with address {address} was not found")]
    #[diagnostic(
        code(deskly::connect_not_found),
        help(
            "Check that the desk is powered and in range.\n\
             Try: deskly scan"
        )
    )]
    ConnectNotFound { address: String },

    #[error("Connecting to {address} timed out after {timeout_secs}s")]
    #[diagnostic(
        code(deskly::connect_timeout),
        help("Move closer to the desk or raise --connection-timeout.")
    )]
    ConnectTimeout { address: String, timeout_secs: u64 },

    #[error("No desk address configured")]
    #[diagnostic(
        code(deskly::no_address),
        help(
            "Set mac_address in the config file, pass --mac-address,\n\
             or export DESKLY_MAC_ADDRESS. Find the address with: deskly scan"
        )
    )]
    NoAddress,

    #[error("Bluetooth transport error: {message}")]
    #[diagnostic(code(deskly::transport))]
    Transport { message: String },

    // ── Forwarding ───────────────────────────────────────────────────

    #[error("Command cannot be forwarded: {command}")]
    #[diagnostic(
        code(deskly::not_forwardable),
        help("Only status, move, and watch can be sent to a remote server.")
    )]
    NotForwardable { command: String },

    #[error("Could not reach deskly server at {url}")]
    #[diagnostic(
        code(deskly::forward_connect),
        help("Check that `deskly server` is running on the target machine.")
    )]
    ForwardConnect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[error("Forwarding exchange failed: {0}")]
    #[diagnostic(code(deskly::forward))]
    Forward(#[from] tokio_tungstenite::tungstenite::Error),

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(deskly::config))]
    Config(#[from] deskly_config::ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid command descriptor: {0}")]
    #[diagnostic(code(deskly::descriptor), help("The descriptor must be one JSON object."))]
    Json(#[from] serde_json::Error),

    // ── Catch-all ────────────────────────────────────────────────────

    #[error("{0}")]
    #[diagnostic(code(deskly::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        // The contract is binary; every error is a failure.
        exit_code::FAILURE
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectNotFound { address } => Self::ConnectNotFound { address },
            CoreError::ConnectTimeout {
                address,
                timeout_secs,
            } => Self::ConnectTimeout {
                address,
                timeout_secs,
            },
            CoreError::NotForwardable { command } => Self::NotForwardable { command },
            CoreError::Transport { message } => Self::Transport { message },
            CoreError::Disconnected => Self::Transport {
                message: "device connection lost".into(),
            },
            CoreError::NoAdapter { name } => Self::Transport {
                message: match name {
                    Some(name) => format!("Bluetooth adapter '{name}' not found"),
                    None => "no Bluetooth adapter found".into(),
                },
            },
            CoreError::InvalidTarget { target } => {
                // Normally handled inside the executor; kept as a guard.
                Self::Internal(format!("invalid target: {target}"))
            }
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

impl From<BleError> for CliError {
    fn from(err: BleError) -> Self {
        Self::from(CoreError::from(err))
    }
}
