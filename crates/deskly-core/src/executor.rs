// ── Command execution engine ──
//
// Resolves and runs exactly one command against a live desk connection.
// Server and scan variants never reach this point; the session supervisor
// dispatches those before an executor is involved.

use futures_util::StreamExt;
use tracing::debug;

use crate::command::{Command, SessionContext};
use crate::desk::Desk;
use crate::error::CoreError;
use crate::height::Height;
use crate::report::Reporter;

/// Run the context's command against `desk`.
///
/// Always begins by reading and reporting the current height, whatever the
/// command. An unresolvable move-to target is reported to the operator and
/// the call returns `Ok` without touching the device -- a bad favourite
/// name is a user mistake, not a session failure.
pub async fn execute<D: Desk + ?Sized>(
    desk: &D,
    ctx: &SessionContext,
    reporter: &Reporter,
) -> Result<(), CoreError> {
    let (current, _) = desk.height_speed().await?;
    reporter.info(format!("Height: {:.0}mm", current.mm()));

    match &ctx.command {
        Command::Status => Ok(()),

        Command::Watch => {
            reporter.info("Watching for changes to desk height and speed");
            let mut updates = desk.updates().await?;
            while let Some((height, speed)) = updates.next().await {
                reporter.info(format!(
                    "Height: {:.0}mm Speed: {:.0}mm/s",
                    height.mm(),
                    speed.mm_per_s()
                ));
            }
            debug!("update stream ended");
            Ok(())
        }

        Command::MoveTo { target } => {
            let resolved = match resolve_target(target, ctx) {
                Some(resolved) => resolved,
                None => {
                    reporter.error(format!(
                        "Not a valid height or favourite position: {target}"
                    ));
                    return Ok(());
                }
            };

            match &resolved {
                Target::Favourite(height) => reporter.info(format!(
                    "Moving to favourite height: {target} ({:.0} mm)",
                    height.mm()
                )),
                Target::Literal(_) => reporter.info(format!("Moving to height: {target}")),
            }

            let height = resolved.height();
            if height == current {
                reporter.warn("Nothing to do - already at specified height");
                return Ok(());
            }

            desk.move_to(height).await?;

            let (final_height, _) = desk.height_speed().await?;
            reporter.info(format!(
                "Final height: {:.0}mm (Target: {:.0}mm)",
                final_height.mm(),
                height.mm()
            ));
            Ok(())
        }

        other => Err(CoreError::Internal(format!(
            "command '{}' is not executable against a connection",
            other.name()
        ))),
    }
}

enum Target {
    Favourite(Height),
    Literal(Height),
}

impl Target {
    fn height(&self) -> Height {
        match self {
            Self::Favourite(height) | Self::Literal(height) => *height,
        }
    }
}

/// Favourite name first, then a literal millimetre value.
fn resolve_target(target: &str, ctx: &SessionContext) -> Option<Target> {
    if let Some(mm) = ctx.favourites.get(target) {
        return Some(Target::Favourite(Height::from_mm(*mm)));
    }
    match target.trim().parse::<f64>() {
        Ok(mm) if mm.is_finite() && mm > 0.0 => Some(Target::Literal(Height::from_mm(mm))),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use futures_core::stream::BoxStream;
    use futures_util::stream;
    use tokio::sync::mpsc;

    use super::*;
    use crate::height::Speed;

    #[derive(Debug, PartialEq, Eq)]
    enum Call {
        HeightSpeed,
        Updates,
        MoveTo(u16),
        Stop,
    }

    /// Desk double that records every operation issued against it.
    struct MockDesk {
        heights: Mutex<Vec<Height>>,
        updates: Vec<(Height, Speed)>,
        calls: Mutex<Vec<Call>>,
    }

    impl MockDesk {
        fn at(mm: f64) -> Self {
            Self {
                heights: Mutex::new(vec![Height::from_mm(mm)]),
                updates: Vec::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Heights returned by successive reads, in order; the last one
        /// repeats.
        fn with_heights(mms: &[f64]) -> Self {
            let mut heights: Vec<Height> = mms.iter().map(|mm| Height::from_mm(*mm)).collect();
            heights.reverse();
            Self {
                heights: Mutex::new(heights),
                updates: Vec::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().drain(..).collect()
        }
    }

    #[async_trait]
    impl Desk for MockDesk {
        async fn initialise(&self) -> Result<(), CoreError> {
            Ok(())
        }

        async fn height_speed(&self) -> Result<(Height, Speed), CoreError> {
            self.calls.lock().unwrap().push(Call::HeightSpeed);
            let mut heights = self.heights.lock().unwrap();
            let height = if heights.len() > 1 {
                heights.pop().unwrap()
            } else {
                *heights.last().unwrap()
            };
            Ok((height, Speed::from_raw(0)))
        }

        async fn updates(&self) -> Result<BoxStream<'static, (Height, Speed)>, CoreError> {
            self.calls.lock().unwrap().push(Call::Updates);
            Ok(stream::iter(self.updates.clone()).boxed())
        }

        async fn move_to(&self, target: Height) -> Result<(), CoreError> {
            self.calls.lock().unwrap().push(Call::MoveTo(target.raw()));
            Ok(())
        }

        async fn stop(&self) -> Result<(), CoreError> {
            self.calls.lock().unwrap().push(Call::Stop);
            Ok(())
        }
    }

    fn ctx(command: Command) -> SessionContext {
        let mut favourites = BTreeMap::new();
        favourites.insert("standing".to_owned(), 1100.0);
        favourites.insert("sitting".to_owned(), 750.0);
        SessionContext::new(command, false, favourites)
    }

    fn tapped() -> (Reporter, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Reporter::new(false).with_tap(tx), rx)
    }

    fn lines(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(line) = rx.try_recv() {
            out.push(line);
        }
        out
    }

    #[tokio::test]
    async fn status_only_reads_and_reports() {
        let desk = MockDesk::at(750.0);
        let (reporter, mut rx) = tapped();

        execute(&desk, &ctx(Command::Status), &reporter).await.unwrap();

        assert_eq!(desk.calls(), vec![Call::HeightSpeed]);
        assert_eq!(lines(&mut rx), vec!["Height: 750mm"]);
    }

    #[tokio::test]
    async fn move_to_favourite_reports_final_height() {
        let desk = MockDesk::with_heights(&[750.0, 1100.0]);
        let (reporter, mut rx) = tapped();

        let command = Command::MoveTo {
            target: "standing".into(),
        };
        execute(&desk, &ctx(command), &reporter).await.unwrap();

        assert_eq!(
            desk.calls(),
            vec![
                Call::HeightSpeed,
                Call::MoveTo(Height::from_mm(1100.0).raw()),
                Call::HeightSpeed,
            ]
        );
        let lines = lines(&mut rx);
        assert!(lines.contains(&"Moving to favourite height: standing (1100 mm)".to_owned()));
        assert_eq!(
            lines.last().unwrap(),
            "Final height: 1100mm (Target: 1100mm)"
        );
    }

    #[tokio::test]
    async fn move_to_numeric_target() {
        let desk = MockDesk::with_heights(&[750.0, 900.0]);
        let (reporter, mut rx) = tapped();

        let command = Command::MoveTo {
            target: "900".into(),
        };
        execute(&desk, &ctx(command), &reporter).await.unwrap();

        assert_eq!(
            desk.calls(),
            vec![
                Call::HeightSpeed,
                Call::MoveTo(Height::from_mm(900.0).raw()),
                Call::HeightSpeed,
            ]
        );
        assert!(lines(&mut rx).contains(&"Moving to height: 900".to_owned()));
    }

    #[tokio::test]
    async fn move_to_current_height_never_writes() {
        let desk = MockDesk::at(1100.0);
        let (reporter, mut rx) = tapped();

        let command = Command::MoveTo {
            target: "standing".into(),
        };
        execute(&desk, &ctx(command), &reporter).await.unwrap();

        // One read, no move, no re-read.
        assert_eq!(desk.calls(), vec![Call::HeightSpeed]);
        assert!(
            lines(&mut rx)
                .contains(&"Nothing to do - already at specified height".to_owned())
        );
    }

    #[tokio::test]
    async fn invalid_target_never_contacts_the_device() {
        let desk = MockDesk::at(750.0);
        let (reporter, mut rx) = tapped();

        let command = Command::MoveTo {
            target: "flying".into(),
        };
        let result = execute(&desk, &ctx(command), &reporter).await;

        // Reported to the operator, not escalated.
        assert!(result.is_ok());
        assert_eq!(desk.calls(), vec![Call::HeightSpeed]);
        assert!(
            lines(&mut rx)
                .contains(&"Not a valid height or favourite position: flying".to_owned())
        );
    }

    #[tokio::test]
    async fn watch_reports_every_update() {
        let mut desk = MockDesk::at(750.0);
        desk.updates = vec![
            (Height::from_mm(760.0), Speed::from_raw(320)),
            (Height::from_mm(780.0), Speed::from_raw(0)),
        ];
        let (reporter, mut rx) = tapped();

        execute(&desk, &ctx(Command::Watch), &reporter).await.unwrap();

        assert_eq!(desk.calls(), vec![Call::HeightSpeed, Call::Updates]);
        let lines = lines(&mut rx);
        assert!(lines.contains(&"Height: 760mm Speed: 3mm/s".to_owned()));
        assert!(lines.contains(&"Height: 780mm Speed: 0mm/s".to_owned()));
    }

    #[tokio::test]
    async fn server_commands_are_not_executable() {
        let desk = MockDesk::at(750.0);
        let (reporter, _rx) = tapped();

        let result = execute(&desk, &ctx(Command::Scan), &reporter).await;
        assert!(matches!(result, Err(CoreError::Internal(_))));
    }
}
