// ── Session supervisor ──
//
// Runs one session start to finish: establish the connection (unless the
// command is a scan or a forwarded invocation), dispatch the command, and
// always clean up. Cleanup quiesces any in-flight motion and closes the
// link through the supervisor so the disconnect registers as expected.

use tokio::task::JoinHandle;
use tracing::debug;

use deskly_ble::{BleDesk, ConnectionSupervisor, scan};
use deskly_core::{Command, Desk as _, Reporter, execute};

use crate::config::App;
use crate::error::CliError;
use crate::forward;

/// How one session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The command ran to completion.
    Completed,
    /// The operator interrupted; forever-mode looping stops too.
    Interrupted,
}

/// Run one session of the configured command.
pub async fn run(app: &App, reporter: &Reporter) -> Result<SessionEnd, CliError> {
    if app.forward {
        forward::client::run(&app.server, &app.base, reporter).await?;
        return Ok(SessionEnd::Completed);
    }
    if app.base.command == Command::Scan {
        scan(&app.connection, reporter).await?;
        return Ok(SessionEnd::Completed);
    }

    let supervisor = ConnectionSupervisor::new(app.connection.clone()).await?;
    let desk = supervisor.connect().await?;
    let monitor = supervisor.spawn_monitor(&desk);

    let outcome = tokio::select! {
        biased;
        _ = tokio::signal::ctrl_c() => {
            debug!("interrupted");
            Ok(SessionEnd::Interrupted)
        }
        result = dispatch(&desk, app, reporter) => result.map(|()| SessionEnd::Completed),
    };

    cleanup(&supervisor, &desk, monitor).await;
    outcome
}

async fn dispatch(desk: &BleDesk, app: &App, reporter: &Reporter) -> Result<(), CliError> {
    match app.base.command {
        Command::SocketServer => forward::tcp::serve(desk, &app.server, &app.base, reporter).await,
        Command::MessageServer => forward::ws::serve(desk, &app.server, &app.base, reporter).await,
        _ => Ok(execute(desk, &app.base, reporter).await?),
    }
}

/// Runs however the session ended. Failures here are logged, never
/// escalated; the session's own outcome is what the operator sees.
async fn cleanup(supervisor: &ConnectionSupervisor, desk: &BleDesk, monitor: JoinHandle<()>) {
    if let Err(err) = desk.stop().await {
        debug!(error = %err, "stop during cleanup failed");
    }
    if let Err(err) = supervisor.disconnect(desk).await {
        debug!(error = %err, "disconnect during cleanup failed");
    }
    supervisor.shutdown();
    if let Err(err) = monitor.await {
        debug!(error = %err, "monitor task did not stop cleanly");
    }
}
