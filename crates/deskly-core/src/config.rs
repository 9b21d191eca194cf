//! Runtime settings consumed by the transport and the servers.
//!
//! These are the resolved, validated forms -- the `deskly-config` crate owns
//! loading them from the TOML file, environment, and CLI flags.

use std::time::Duration;

// ── ConnectionSettings ──────────────────────────────────────────────

/// Parameters for establishing and supervising the device link.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Device address (MAC on Linux/Windows, peripheral UUID on macOS).
    /// Required to connect; optional for scans, where it acts as a filter.
    pub address: Option<String>,

    /// Adapter name to scan with (e.g. "hci0"). `None` uses the first
    /// adapter the platform reports.
    pub adapter: Option<String>,

    /// How long discovery may take before the device counts as absent.
    pub scan_timeout: Duration,

    /// Bound on a single connect call.
    pub connection_timeout: Duration,

    /// Policy for reconnecting after an unexpected drop.
    pub reconnect: ReconnectPolicy,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            address: None,
            adapter: None,
            scan_timeout: Duration::from_secs(5),
            connection_timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

// ── ServerSettings ──────────────────────────────────────────────────

/// Bind address for the forwarding servers; target address for the client.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub address: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_owned(),
            port: 9123,
        }
    }
}

// ── ReconnectPolicy ─────────────────────────────────────────────────

/// Exponential backoff configuration for automatic reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

impl ReconnectPolicy {
    /// Exponential backoff with jitter.
    ///
    /// `delay = min(initial * 2^attempt, max) + jitter`
    ///
    /// Jitter is +-25% to spread out reconnection storms; it is seeded
    /// deterministically from the attempt number, which is plenty for
    /// backoff spread.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * 2.0_f64.powi(attempt.min(63) as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        let jitter_factor = 1.0 + 0.25 * ((f64::from(attempt) * 7.3).sin());
        let with_jitter = (capped * jitter_factor).max(0.0);

        Duration::from_secs_f64(with_jitter)
    }

    /// Whether another attempt is allowed after `attempt` failures.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_retries.is_none_or(|max| attempt < max)
    }
}
