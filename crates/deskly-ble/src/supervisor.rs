// ── Connection lifecycle supervisor ──
//
// Owns the single device link: scan-and-connect with distinct not-found and
// timed-out failures, idempotent clean disconnect, and a background monitor
// that classifies every transport-level drop as expected or lost. Expected
// drops are announced through the intent flag, which is set strictly before
// the transport disconnect is issued; anything else triggers reconnection
// with bounded exponential backoff.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use btleplug::api::{Central as _, CentralEvent, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Peripheral};
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use deskly_core::{ConnectionSettings, ReconnectPolicy};

use crate::adapter::resolve_adapter;
use crate::desk::BleDesk;
use crate::error::BleError;

/// Poll interval while waiting for the device to appear in scan results.
const DISCOVERY_POLL: Duration = Duration::from_millis(200);

pub struct ConnectionSupervisor {
    settings: ConnectionSettings,
    adapter: Adapter,
    disconnecting: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl ConnectionSupervisor {
    pub async fn new(settings: ConnectionSettings) -> Result<Self, BleError> {
        let adapter = resolve_adapter(settings.adapter.as_deref()).await?;
        Ok(Self {
            settings,
            adapter,
            disconnecting: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
        })
    }

    /// Establish the device link and run the initialisation handshake.
    ///
    /// `ConnectNotFound` when the scan window closes without seeing the
    /// configured address; `ConnectTimeout` when the connect call outlives
    /// its bound. The two are told apart by the failure's nature, never by
    /// a separate probe.
    pub async fn connect(&self) -> Result<BleDesk, BleError> {
        let address = self
            .settings
            .address
            .clone()
            .ok_or(BleError::MissingAddress)?;

        // A new connection implicitly clears any stale disconnect intent.
        self.disconnecting.store(false, Ordering::SeqCst);

        debug!(%address, "scanning for device");
        let peripheral = self.discover(&address).await?;

        match timeout(self.settings.connection_timeout, peripheral.connect()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(BleError::ConnectTimeout {
                    address,
                    timeout_secs: self.settings.connection_timeout.as_secs(),
                });
            }
        }
        peripheral.discover_services().await?;

        let desk = BleDesk::new(peripheral)?;
        desk.init().await?;

        info!(%address, "connected");
        Ok(desk)
    }

    /// Clean disconnect. Idempotent: a link that already reports itself
    /// disconnected is left alone. The intent flag is set before the
    /// transport call so the monitor never mistakes this for a loss.
    pub async fn disconnect(&self, desk: &BleDesk) -> Result<(), BleError> {
        if !desk.peripheral().is_connected().await? {
            return Ok(());
        }
        self.disconnecting.store(true, Ordering::SeqCst);
        desk.peripheral().disconnect().await?;
        info!("disconnected");
        Ok(())
    }

    /// Spawn the disconnect monitor for `desk`. The monitor consumes the
    /// adapter's event stream independently of whatever operation is
    /// suspended on the transport, so recovery never blocks the foreground.
    pub fn spawn_monitor(&self, desk: &BleDesk) -> JoinHandle<()> {
        let adapter = self.adapter.clone();
        let desk = desk.clone();
        let disconnecting = Arc::clone(&self.disconnecting);
        let policy = self.settings.reconnect.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            if let Err(err) = monitor(adapter, desk, disconnecting, policy, cancel).await {
                warn!(error = %err, "disconnect monitor stopped");
            }
        })
    }

    /// Stop the disconnect monitor.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    async fn discover(&self, address: &str) -> Result<Peripheral, BleError> {
        self.adapter.start_scan(ScanFilter::default()).await?;

        let found = timeout(self.settings.scan_timeout, async {
            loop {
                for peripheral in self.adapter.peripherals().await? {
                    if peripheral.address().to_string().eq_ignore_ascii_case(address) {
                        return Ok::<_, BleError>(peripheral);
                    }
                }
                sleep(DISCOVERY_POLL).await;
            }
        })
        .await;

        if let Err(err) = self.adapter.stop_scan().await {
            debug!(error = %err, "stop_scan failed");
        }

        match found {
            Ok(result) => result,
            Err(_) => Err(BleError::NotFound {
                address: address.to_owned(),
            }),
        }
    }
}

// ── Drop classification ─────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum DropKind {
    /// Announced through the intent flag; no recovery.
    Expected,
    /// Genuine loss; reconnect.
    Lost,
}

/// Single decision point for expected-vs-lost, consuming the intent flag.
fn classify_drop(disconnecting: &AtomicBool) -> DropKind {
    if disconnecting.swap(false, Ordering::SeqCst) {
        DropKind::Expected
    } else {
        DropKind::Lost
    }
}

// ── Monitor task ────────────────────────────────────────────────────

async fn monitor(
    adapter: Adapter,
    desk: BleDesk,
    disconnecting: Arc<AtomicBool>,
    policy: ReconnectPolicy,
    cancel: CancellationToken,
) -> Result<(), BleError> {
    let mut events = adapter.events().await?;
    let id = desk.peripheral().id();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            event = events.next() => {
                let Some(event) = event else { return Ok(()) };
                let CentralEvent::DeviceDisconnected(peripheral_id) = event else {
                    continue;
                };
                if peripheral_id != id {
                    continue;
                }
                match classify_drop(&disconnecting) {
                    DropKind::Expected => debug!("expected disconnect"),
                    DropKind::Lost => {
                        warn!(address = %desk.peripheral().address(), "lost connection with desk");
                        reconnect(&desk, &policy, &cancel).await?;
                    }
                }
            }
        }
    }
}

async fn reconnect(
    desk: &BleDesk,
    policy: &ReconnectPolicy,
    cancel: &CancellationToken,
) -> Result<(), BleError> {
    let mut attempt: u32 = 0;

    loop {
        if !policy.allows(attempt) {
            return Err(BleError::ReconnectExhausted { attempts: attempt });
        }

        let delay = policy.backoff(attempt);
        debug!(attempt, delay_ms = delay.as_millis() as u64, "waiting before reconnect");
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            () = sleep(delay) => {}
        }

        match try_reconnect(desk).await {
            Ok(()) => {
                info!(attempt, "reconnected");
                return Ok(());
            }
            Err(err) => {
                warn!(error = %err, attempt, "reconnect attempt failed");
                attempt += 1;
            }
        }
    }
}

/// Revive the same peripheral handle: connect, rediscover, re-run the
/// initialisation handshake.
async fn try_reconnect(desk: &BleDesk) -> Result<(), BleError> {
    desk.peripheral().connect().await?;
    desk.peripheral().discover_services().await?;
    desk.init().await
}
