//! Adapter selection shared by the scanner and the connection supervisor.

use btleplug::api::{Central as _, Manager as _};
use btleplug::platform::{Adapter, Manager};
use tracing::debug;

use crate::error::BleError;

/// Resolve the adapter to use: the first one the platform reports, or the
/// one whose info string mentions `name` (e.g. "hci0").
pub(crate) async fn resolve_adapter(name: Option<&str>) -> Result<Adapter, BleError> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    let Some(wanted) = name else {
        return adapters
            .into_iter()
            .next()
            .ok_or(BleError::NoAdapter { name: None });
    };

    for adapter in adapters {
        match adapter.adapter_info().await {
            Ok(info) if info.contains(wanted) => {
                debug!(adapter = %info, "selected adapter");
                return Ok(adapter);
            }
            Ok(_) => {}
            Err(err) => debug!(error = %err, "skipping unreadable adapter"),
        }
    }

    Err(BleError::NoAdapter {
        name: Some(wanted.to_owned()),
    })
}
