// ── Core error types ──
//
// User-facing errors shared by every deskly crate. These are NOT
// radio-specific -- consumers never see btleplug failures directly. The
// transport crate translates its errors into the variants here.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Device with address {address} was not found")]
    ConnectNotFound { address: String },

    #[error("Connecting to {address} timed out after {timeout_secs}s")]
    ConnectTimeout { address: String, timeout_secs: u64 },

    #[error("Device connection lost")]
    Disconnected,

    // ── Command errors ───────────────────────────────────────────────
    #[error("Not a valid height or favourite position: {target}")]
    InvalidTarget { target: String },

    #[error("Command cannot be forwarded: {command}")]
    NotForwardable { command: String },

    // ── Transport errors (wrapped, not exposed raw) ──────────────────
    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("No usable Bluetooth adapter found")]
    NoAdapter { name: Option<String> },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}
