// ── Socket bridge ──
//
// One JSON descriptor per connection: the caller writes the whole object
// and half-closes its write side; every report line the command produces
// is written back as a newline-terminated line, then the connection is
// closed.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use deskly_core::{CommandDescriptor, Desk, Reporter, ServerSettings, SessionContext, execute};

use crate::error::CliError;

/// Accept and serve forwarded commands until the process is interrupted.
pub async fn serve<D: Desk + ?Sized>(
    desk: &D,
    server: &ServerSettings,
    base: &SessionContext,
    reporter: &Reporter,
) -> Result<(), CliError> {
    let listener = TcpListener::bind((server.address.as_str(), server.port)).await?;
    reporter.info(format!(
        "TCP server listening on {}:{}",
        server.address, server.port
    ));

    loop {
        let (stream, peer) = listener.accept().await?;
        debug!(%peer, "inbound connection");
        // A failed exchange ends that connection, never the server.
        if let Err(err) = handle(desk, base, reporter, stream).await {
            warn!(error = %err, "forwarded command failed");
        }
    }
}

pub(crate) async fn handle<D, S>(
    desk: &D,
    base: &SessionContext,
    reporter: &Reporter,
    stream: S,
) -> Result<(), CliError>
where
    D: Desk + ?Sized,
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut read, mut write) = tokio::io::split(stream);

    let mut raw = Vec::new();
    read.read_to_end(&mut raw).await?;
    reporter.info("Received command");

    let descriptor: CommandDescriptor = serde_json::from_slice(&raw)?;
    let ctx = base.apply(&descriptor)?;

    let (tap, mut lines) = mpsc::unbounded_channel();
    let tapped = Reporter::new(ctx.quiet).with_tap(tap);

    let result = {
        let exec = execute(desk, &ctx, &tapped);
        tokio::pin!(exec);
        loop {
            tokio::select! {
                result = &mut exec => break result,
                Some(line) = lines.recv() => {
                    write.write_all(line.as_bytes()).await?;
                    write.write_all(b"\n").await?;
                }
            }
        }
    };

    // Drain lines the executor emitted after the last poll of the tap.
    drop(tapped);
    while let Ok(line) = lines.try_recv() {
        write.write_all(line.as_bytes()).await?;
        write.write_all(b"\n").await?;
    }
    write.shutdown().await?;

    result?;
    Ok(())
}
