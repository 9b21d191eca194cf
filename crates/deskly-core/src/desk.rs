//! The device collaborator contract.
//!
//! The executor and the forwarding servers only ever talk to a [`Desk`];
//! `deskly-ble` provides the LINAK GATT implementation, tests provide mocks
//! that record which operations were issued.

use async_trait::async_trait;
use futures_core::stream::BoxStream;

use crate::error::CoreError;
use crate::height::{Height, Speed};

/// One connected desk.
#[async_trait]
pub trait Desk: Send + Sync {
    /// Run the device's initialisation handshake. Called once per
    /// (re)connection, before any other operation.
    async fn initialise(&self) -> Result<(), CoreError>;

    /// Read the current height and speed.
    async fn height_speed(&self) -> Result<(Height, Speed), CoreError>;

    /// Stream height/speed updates. The stream ends when the connection
    /// drops; there is no other cancellation signal.
    async fn updates(&self) -> Result<BoxStream<'static, (Height, Speed)>, CoreError>;

    /// Drive the desk to `target` and return once it stops moving.
    async fn move_to(&self, target: Height) -> Result<(), CoreError>;

    /// Quiesce any in-flight motion.
    async fn stop(&self) -> Result<(), CoreError>;
}
