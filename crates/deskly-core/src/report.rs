//! User-facing output.
//!
//! The Reporter is the replaceable log sink: plain lines for the operator,
//! separate from `tracing` diagnostics. A forwarding server attaches a tap
//! so every line a command produces is also delivered to the remote caller.

use tokio::sync::mpsc;

/// Sink for operator-facing report lines. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Reporter {
    quiet: bool,
    tap: Option<mpsc::UnboundedSender<String>>,
}

impl Reporter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet, tap: None }
    }

    /// The same reporter with every emitted line teed into `tap`.
    pub fn with_tap(&self, tap: mpsc::UnboundedSender<String>) -> Self {
        Self {
            quiet: self.quiet,
            tap: Some(tap),
        }
    }

    /// Informational line; suppressed entirely when quiet.
    pub fn info(&self, message: impl Into<String>) {
        if self.quiet {
            return;
        }
        let message = message.into();
        println!("{message}");
        self.forward(message);
    }

    /// Relayed line from a remote executor; printed and tapped regardless
    /// of quiet, since filtering already happened at the source.
    pub fn line(&self, message: impl Into<String>) {
        let message = message.into();
        println!("{message}");
        self.forward(message);
    }

    /// Warning line; printed regardless of quiet.
    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        println!("{message}");
        self.forward(message);
    }

    /// Error line; printed to stderr regardless of quiet.
    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        eprintln!("{message}");
        self.forward(message);
    }

    fn forward(&self, message: String) {
        if let Some(tap) = &self.tap {
            // A closed tap means the remote side is gone; lines still print
            // locally, so the send result is deliberately ignored.
            let _ = tap.send(message);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn tap_receives_all_severities() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reporter = Reporter::new(false).with_tap(tx);

        reporter.info("height");
        reporter.warn("nothing to do");
        reporter.error("bad target");

        assert_eq!(rx.try_recv().unwrap(), "height");
        assert_eq!(rx.try_recv().unwrap(), "nothing to do");
        assert_eq!(rx.try_recv().unwrap(), "bad target");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn quiet_suppresses_info_but_not_warnings() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reporter = Reporter::new(true).with_tap(tx);

        reporter.info("suppressed");
        reporter.warn("still here");

        assert_eq!(rx.try_recv().unwrap(), "still here");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn relayed_lines_bypass_quiet_and_reach_the_tap() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reporter = Reporter::new(true).with_tap(tx);

        reporter.line("Height: 750mm");

        assert_eq!(rx.try_recv().unwrap(), "Height: 750mm");
    }

    #[test]
    fn closed_tap_does_not_panic() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let reporter = Reporter::new(false).with_tap(tx);
        reporter.info("nobody listening");
    }
}
