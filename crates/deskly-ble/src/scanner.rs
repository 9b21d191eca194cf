//! Device discovery.

use btleplug::api::{Central as _, Peripheral as _, ScanFilter};
use tokio::time::sleep;
use tracing::debug;

use deskly_core::{ConnectionSettings, Reporter};

use crate::adapter::resolve_adapter;
use crate::error::BleError;

/// One device seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub address: String,
    pub name: Option<String>,
}

/// Discover reachable devices and report each exactly once.
///
/// With an address configured the result is filtered to that device;
/// without one, everything in range is returned.
pub async fn scan(
    settings: &ConnectionSettings,
    reporter: &Reporter,
) -> Result<Vec<DiscoveredDevice>, BleError> {
    let adapter = resolve_adapter(settings.adapter.as_deref()).await?;

    reporter.info("Scanning");
    adapter.start_scan(ScanFilter::default()).await?;
    sleep(settings.scan_timeout).await;
    adapter.stop_scan().await?;

    let mut seen = Vec::new();
    for peripheral in adapter.peripherals().await? {
        let address = peripheral.address().to_string();
        let name = match peripheral.properties().await {
            Ok(properties) => properties.and_then(|p| p.local_name),
            Err(err) => {
                debug!(%address, error = %err, "could not read device properties");
                None
            }
        };
        seen.push(DiscoveredDevice { address, name });
    }

    let devices = filter_devices(seen, settings.address.as_deref());
    report_devices(&devices, reporter);
    Ok(devices)
}

/// Keep only the configured device when a filter address is set.
fn filter_devices(devices: Vec<DiscoveredDevice>, filter: Option<&str>) -> Vec<DiscoveredDevice> {
    match filter {
        Some(wanted) => devices
            .into_iter()
            .filter(|device| device.address.eq_ignore_ascii_case(wanted))
            .collect(),
        None => devices,
    }
}

/// One count line, then one line per device.
fn report_devices(devices: &[DiscoveredDevice], reporter: &Reporter) {
    reporter.info(format!("Found {} devices", devices.len()));
    for device in devices {
        reporter.info(format!(
            "{} {}",
            device.address,
            device.name.as_deref().unwrap_or("(unknown)")
        ));
    }
}
