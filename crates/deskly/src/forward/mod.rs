//! Command forwarding bridge.
//!
//! Two server variants over the same exchange shape (one JSON command
//! descriptor in, report lines out) plus the client that sends a local
//! invocation to a remote server. Both servers handle connections strictly
//! one at a time; the desk is a single shared device and two callers must
//! never drive it at once.

pub mod client;
pub mod tcp;
pub mod ws;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod testing {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use futures_core::stream::BoxStream;
    use futures_util::StreamExt;

    use deskly_core::{Command, CoreError, Desk, Height, SessionContext, Speed};

    /// Desk double returning a scripted sequence of heights.
    pub struct FakeDesk {
        heights: Mutex<Vec<Height>>,
    }

    impl FakeDesk {
        /// Heights returned by successive reads, in order; the last one
        /// repeats.
        pub fn with_heights(mms: &[f64]) -> Self {
            let mut heights: Vec<Height> = mms.iter().map(|mm| Height::from_mm(*mm)).collect();
            heights.reverse();
            Self {
                heights: Mutex::new(heights),
            }
        }
    }

    #[async_trait]
    impl Desk for FakeDesk {
        async fn initialise(&self) -> Result<(), CoreError> {
            Ok(())
        }

        async fn height_speed(&self) -> Result<(Height, Speed), CoreError> {
            let mut heights = self.heights.lock().unwrap();
            let height = if heights.len() > 1 {
                heights.pop().unwrap()
            } else {
                *heights.last().unwrap()
            };
            Ok((height, Speed::from_raw(0)))
        }

        async fn updates(&self) -> Result<BoxStream<'static, (Height, Speed)>, CoreError> {
            Ok(futures_util::stream::empty().boxed())
        }

        async fn move_to(&self, _target: Height) -> Result<(), CoreError> {
            Ok(())
        }

        async fn stop(&self) -> Result<(), CoreError> {
            Ok(())
        }
    }

    pub fn base_context() -> SessionContext {
        let mut favourites = BTreeMap::new();
        favourites.insert("standing".to_owned(), 1100.0);
        SessionContext::new(Command::Status, false, favourites)
    }
}
