//! LINAK DPG desk protocol over GATT.
//!
//! Three characteristics in the `99fa` service family carry everything this
//! crate needs: a height/speed output (read + notify, 4 bytes LE), a command
//! input (wake/stop opcodes), and a reference input that takes an encoded
//! target height. The controller only honours a reference write for a short
//! window, so a move re-issues the target until the desk arrives or stalls.

use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Characteristic, Peripheral as _, WriteType};
use btleplug::platform::Peripheral;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use tokio::time::sleep;
use tracing::{debug, warn};
use uuid::{Uuid, uuid};

use deskly_core::{CoreError, Desk, Height, Speed};

use crate::error::BleError;

// ── GATT surface ────────────────────────────────────────────────────

/// Height/speed output: u16 LE raw height, i16 LE raw speed.
pub const OUTPUT_CHAR: Uuid = uuid!("99fa0021-338a-1024-8a49-009c0215f78a");

/// Command input for wake/stop opcodes.
pub const COMMAND_CHAR: Uuid = uuid!("99fa0002-338a-1024-8a49-009c0215f78a");

/// Reference input: write an encoded target height to start movement.
pub const REFERENCE_INPUT_CHAR: Uuid = uuid!("99fa0031-338a-1024-8a49-009c0215f78a");

const WAKEUP: [u8; 2] = [0xFE, 0x00];
const STOP: [u8; 2] = [0xFF, 0x00];
const REFERENCE_STOP: [u8; 2] = [0x01, 0x80];

/// How long the controller acts on one reference-input write.
const MOVE_COMMAND_WINDOW: Duration = Duration::from_millis(700);

/// Windows with no observed movement before a move is abandoned.
const MAX_IDLE_WINDOWS: u32 = 4;

// ── BleDesk ─────────────────────────────────────────────────────────

/// A connected LINAK desk. Clones share the underlying peripheral, so the
/// disconnect monitor can revive the same handles after a reconnect.
#[derive(Debug, Clone)]
pub struct BleDesk {
    peripheral: Peripheral,
    output: Characteristic,
    command: Characteristic,
    reference: Characteristic,
}

impl BleDesk {
    /// Wrap a connected peripheral whose services have been discovered.
    pub fn new(peripheral: Peripheral) -> Result<Self, BleError> {
        let characteristics = peripheral.characteristics();
        let find = |uuid: Uuid| {
            characteristics
                .iter()
                .find(|c| c.uuid == uuid)
                .cloned()
                .ok_or(BleError::MissingCharacteristic { uuid })
        };

        Ok(Self {
            output: find(OUTPUT_CHAR)?,
            command: find(COMMAND_CHAR)?,
            reference: find(REFERENCE_INPUT_CHAR)?,
            peripheral,
        })
    }

    pub fn peripheral(&self) -> &Peripheral {
        &self.peripheral
    }

    /// Initialisation handshake: wake the controller and subscribe to the
    /// height/speed output.
    pub(crate) async fn init(&self) -> Result<(), BleError> {
        self.peripheral
            .write(&self.command, &WAKEUP, WriteType::WithoutResponse)
            .await?;
        self.peripheral
            .write(&self.command, &STOP, WriteType::WithoutResponse)
            .await?;
        self.peripheral.subscribe(&self.output).await?;
        debug!("desk initialised");
        Ok(())
    }

    async fn read_state(&self) -> Result<(Height, Speed), BleError> {
        let bytes = self.peripheral.read(&self.output).await?;
        decode_state(&bytes)
    }

    async fn drive_to(&self, target: Height) -> Result<(), BleError> {
        let mut updates = self.peripheral.notifications().await?;
        let encoded = target.raw().to_le_bytes();
        let mut moved = false;
        let mut idle_windows = 0u32;

        loop {
            self.peripheral
                .write(&self.reference, &encoded, WriteType::WithoutResponse)
                .await?;

            let window = sleep(MOVE_COMMAND_WINDOW);
            tokio::pin!(window);
            let mut moved_this_window = false;

            loop {
                tokio::select! {
                    () = &mut window => break,
                    notification = updates.next() => {
                        let Some(notification) = notification else {
                            return Err(BleError::Disconnected);
                        };
                        if notification.uuid != OUTPUT_CHAR {
                            continue;
                        }
                        let (height, speed) = decode_state(&notification.value)?;
                        if height.raw() == target.raw() {
                            return Ok(());
                        }
                        if speed.is_moving() {
                            moved = true;
                            moved_this_window = true;
                        } else if moved {
                            // Stopped short of the target: end stop or the
                            // controller's collision detection kicked in.
                            warn!(
                                at_mm = height.mm(),
                                target_mm = target.mm(),
                                "desk stopped before reaching target"
                            );
                            return Ok(());
                        }
                    }
                }
            }

            if moved_this_window {
                idle_windows = 0;
            } else {
                idle_windows += 1;
                if idle_windows > MAX_IDLE_WINDOWS {
                    return Err(BleError::NotMoving);
                }
            }
        }
    }

    async fn halt(&self) -> Result<(), BleError> {
        self.peripheral
            .write(&self.command, &STOP, WriteType::WithoutResponse)
            .await?;
        self.peripheral
            .write(&self.reference, &REFERENCE_STOP, WriteType::WithoutResponse)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Desk for BleDesk {
    async fn initialise(&self) -> Result<(), CoreError> {
        Ok(self.init().await?)
    }

    async fn height_speed(&self) -> Result<(Height, Speed), CoreError> {
        Ok(self.read_state().await?)
    }

    async fn updates(&self) -> Result<BoxStream<'static, (Height, Speed)>, CoreError> {
        let notifications = self
            .peripheral
            .notifications()
            .await
            .map_err(BleError::from)?;
        Ok(notifications
            .filter_map(|notification| async move {
                if notification.uuid != OUTPUT_CHAR {
                    return None;
                }
                decode_state(&notification.value).ok()
            })
            .boxed())
    }

    async fn move_to(&self, target: Height) -> Result<(), CoreError> {
        Ok(self.drive_to(target).await?)
    }

    async fn stop(&self) -> Result<(), CoreError> {
        Ok(self.halt().await?)
    }
}

// ── Wire decoding ───────────────────────────────────────────────────

/// Decode one height/speed output frame.
pub(crate) fn decode_state(bytes: &[u8]) -> Result<(Height, Speed), BleError> {
    let (Some(raw_height), Some(raw_speed)) = (bytes.get(0..2), bytes.get(2..4)) else {
        return Err(BleError::BadNotification { len: bytes.len() });
    };
    let height = u16::from_le_bytes([raw_height[0], raw_height[1]]);
    let speed = i16::from_le_bytes([raw_speed[0], raw_speed[1]]);
    Ok((Height::from_raw(height), Speed::from_raw(speed)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_height_and_speed_little_endian() {
        // 0x1400 = 5120 tenths of a mm above base, 0x0064 = 1 mm/s.
        let (height, speed) = decode_state(&[0x00, 0x14, 0x64, 0x00]).unwrap();
        assert_eq!(height.raw(), 0x1400);
        assert_eq!(height.mm(), 620.0 + 512.0);
        assert_eq!(speed.raw(), 100);
        assert_eq!(speed.mm_per_s(), 1.0);
    }

    #[test]
    fn decode_negative_speed() {
        let (_, speed) = decode_state(&[0x00, 0x00, 0x9C, 0xFF]).unwrap();
        assert_eq!(speed.raw(), -100);
        assert!(speed.is_moving());
    }

    #[test]
    fn decode_rejects_short_frames() {
        assert!(matches!(
            decode_state(&[0x01, 0x02]),
            Err(BleError::BadNotification { len: 2 })
        ));
        assert!(matches!(
            decode_state(&[]),
            Err(BleError::BadNotification { len: 0 })
        ));
    }

    #[test]
    fn decode_tolerates_trailing_bytes() {
        let (height, _) = decode_state(&[0x10, 0x00, 0x00, 0x00, 0xAA, 0xBB]).unwrap();
        assert_eq!(height.raw(), 16);
    }
}
