//! deskly entry point.

mod cli;
mod config;
mod error;
mod forward;
mod session;

use std::future::Future;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use tracing::error;
use tracing_subscriber::EnvFilter;

use deskly_core::Reporter;

use crate::cli::Cli;
use crate::error::CliError;
use crate::session::SessionEnd;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    if let Some(cli::Command::Completions { shell }) = &cli.command {
        let mut command = Cli::command();
        let name = command.get_name().to_owned();
        clap_complete::generate(*shell, &mut command, name, &mut std::io::stdout());
        return;
    }

    if let Err(err) = run(&cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

async fn run(cli: &Cli) -> Result<(), CliError> {
    let app = config::build(cli)?;
    let reporter = Reporter::new(app.base.quiet);
    supervise(app.forever, app.session_retry_delay, || {
        session::run(&app, &reporter)
    })
    .await
}

/// Drive sessions until the process's work is done. An interrupt always
/// stops; without forever the first outcome is final; with forever,
/// completed and failed sessions alike are followed by a fresh one after
/// the retry delay.
async fn supervise<S, F>(forever: bool, retry_delay: Duration, mut session: S) -> Result<(), CliError>
where
    S: FnMut() -> F,
    F: Future<Output = Result<SessionEnd, CliError>>,
{
    loop {
        match session().await {
            Ok(SessionEnd::Interrupted) => return Ok(()),
            Ok(SessionEnd::Completed) if !forever => return Ok(()),
            Ok(SessionEnd::Completed) => {}
            Err(err) if forever => {
                error!(error = %err, "session failed; restarting");
            }
            Err(err) => return Err(err),
        }
        tokio::time::sleep(retry_delay).await;
    }
}

/// Map `-v` counts onto a default filter; `RUST_LOG` wins when set.
fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
