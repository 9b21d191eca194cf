// ── Transport error types ──
//
// Radio-level failures stay inside this crate; the `From<BleError>` impl
// translates them into the domain variants consumers actually handle.

use thiserror::Error;
use uuid::Uuid;

use deskly_core::CoreError;

#[derive(Debug, Error)]
pub enum BleError {
    #[error("device with address {address} was not found")]
    NotFound { address: String },

    #[error("connecting to {address} timed out after {timeout_secs}s")]
    ConnectTimeout { address: String, timeout_secs: u64 },

    #[error("no device address configured")]
    MissingAddress,

    #[error("Bluetooth adapter not found")]
    NoAdapter { name: Option<String> },

    #[error("characteristic {uuid} not found -- is this a LINAK desk?")]
    MissingCharacteristic { uuid: Uuid },

    #[error("malformed height notification ({len} bytes)")]
    BadNotification { len: usize },

    #[error("desk never started moving towards the target")]
    NotMoving,

    #[error("device connection lost")]
    Disconnected,

    #[error("gave up reconnecting after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error(transparent)]
    Ble(#[from] btleplug::Error),
}

// ── Translation into domain errors ──────────────────────────────────

impl From<BleError> for CoreError {
    fn from(err: BleError) -> Self {
        match err {
            BleError::NotFound { address } => CoreError::ConnectNotFound { address },
            BleError::ConnectTimeout {
                address,
                timeout_secs,
            } => CoreError::ConnectTimeout {
                address,
                timeout_secs,
            },
            BleError::NoAdapter { name } => CoreError::NoAdapter { name },
            BleError::Disconnected => CoreError::Disconnected,
            BleError::MissingAddress => {
                CoreError::Internal("connect attempted without a device address".into())
            }
            other => CoreError::Transport {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn connect_failures_keep_their_identity() {
        let err = CoreError::from(BleError::NotFound {
            address: "E8:5B:5B:01:02:03".into(),
        });
        assert!(matches!(err, CoreError::ConnectNotFound { ref address }
            if address == "E8:5B:5B:01:02:03"));

        let err = CoreError::from(BleError::ConnectTimeout {
            address: "E8:5B:5B:01:02:03".into(),
            timeout_secs: 10,
        });
        assert!(matches!(err, CoreError::ConnectTimeout { timeout_secs: 10, .. }));
    }

    #[test]
    fn radio_failures_become_transport_errors() {
        let err = CoreError::from(BleError::BadNotification { len: 2 });
        assert!(matches!(err, CoreError::Transport { .. }));

        let err = CoreError::from(BleError::NotMoving);
        assert!(matches!(err, CoreError::Transport { .. }));
    }
}
