// deskly-ble: btleplug-backed transport layer. Owns device discovery, the
// connection lifecycle (including unexpected-drop recovery), and the LINAK
// GATT protocol behind the `deskly_core::Desk` trait.

mod adapter;
pub mod desk;
pub mod error;
pub mod scanner;
pub mod supervisor;

// ── Primary re-exports ──────────────────────────────────────────────
pub use desk::BleDesk;
pub use error::BleError;
pub use scanner::{DiscoveredDevice, scan};
pub use supervisor::ConnectionSupervisor;
