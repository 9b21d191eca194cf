// deskly-core: value types, command set, and execution engine shared by the
// deskly CLI and the BLE transport crate.

pub mod command;
pub mod config;
pub mod desk;
pub mod error;
pub mod executor;
pub mod height;
pub mod report;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandDescriptor, SessionContext};
pub use config::{ConnectionSettings, ReconnectPolicy, ServerSettings};
pub use desk::Desk;
pub use error::CoreError;
pub use executor::execute;
pub use height::{Height, Speed};
pub use report::Reporter;
