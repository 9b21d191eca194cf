//! Desk position and speed value types.
//!
//! The desk reports its position in tenths of a millimetre above a fixed
//! base height (the lowest physical position of the frame), and its speed
//! in hundredths of a millimetre per second. Both types keep the raw
//! device value and derive the human-scale reading from it, so a value
//! read off the wire round-trips exactly.

use serde::{Deserialize, Serialize};

/// Height of the lowest desk position above the floor, in millimetres.
///
/// LINAK DPG frames report positions relative to this offset.
pub const BASE_HEIGHT_MM: f64 = 620.0;

/// Device position resolution: one raw unit is 0.1 mm.
pub const RAW_UNITS_PER_MM: f64 = 10.0;

// ── Height ──────────────────────────────────────────────────────────

/// An absolute desk height.
///
/// Construct with [`Height::from_raw`] for values read from the device and
/// [`Height::from_mm`] for human-scale values (favourites, CLI arguments).
/// The two constructors replace the original controller's "is this already
/// human?" flag: the interpretation is fixed at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Height {
    raw: u16,
}

impl Height {
    /// A height from a raw device reading (tenths of a mm above base).
    pub fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    /// A height from a human-scale value in millimetres above the floor.
    ///
    /// Values below the base height clamp to the base; the desk cannot go
    /// lower than its frame allows.
    pub fn from_mm(mm: f64) -> Self {
        let raw = ((mm - BASE_HEIGHT_MM) * RAW_UNITS_PER_MM).round().max(0.0);
        Self {
            raw: if raw > f64::from(u16::MAX) {
                u16::MAX
            } else {
                raw as u16
            },
        }
    }

    /// The raw device value.
    pub fn raw(&self) -> u16 {
        self.raw
    }

    /// The height in millimetres above the floor.
    pub fn mm(&self) -> f64 {
        BASE_HEIGHT_MM + f64::from(self.raw) / RAW_UNITS_PER_MM
    }
}

// ── Speed ───────────────────────────────────────────────────────────

/// Desk movement speed. Negative values are downward movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Speed {
    raw: i16,
}

impl Speed {
    /// A speed from a raw device reading (hundredths of a mm/s).
    pub fn from_raw(raw: i16) -> Self {
        Self { raw }
    }

    /// The raw device value.
    pub fn raw(&self) -> i16 {
        self.raw
    }

    /// The speed in millimetres per second.
    pub fn mm_per_s(&self) -> f64 {
        f64::from(self.raw) / 100.0
    }

    /// Whether the desk is currently in motion.
    pub fn is_moving(&self) -> bool {
        self.raw != 0
    }
}
