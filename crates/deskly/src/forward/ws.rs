// ── Message bridge ──
//
// WebSocket variant of the forwarding exchange: the first text frame is the
// command descriptor, every report line the command produces goes back as a
// text frame while it runs, and the connection is closed after a short
// flush grace period.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};
use tracing::{debug, warn};

use deskly_core::{CommandDescriptor, Desk, Reporter, ServerSettings, SessionContext, execute};

use crate::error::CliError;

/// Grace period before closing so in-flight frames reach the caller.
const FLUSH_GRACE: Duration = Duration::from_secs(1);

/// Accept and serve forwarded commands until the process is interrupted.
pub async fn serve<D: Desk + ?Sized>(
    desk: &D,
    server: &ServerSettings,
    base: &SessionContext,
    reporter: &Reporter,
) -> Result<(), CliError> {
    let listener = TcpListener::bind((server.address.as_str(), server.port)).await?;
    reporter.info(format!(
        "Server listening on ws://{}:{}/",
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
    let mut ws = accept_async(stream).await?;

    while let Some(message) = ws.next().await {
        match message? {
            Message::Text(text) => {
                reporter.info("Received command");
                run_forwarded(desk, base, text.as_str(), &mut ws).await?;
                break;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    sleep(FLUSH_GRACE).await;
    if let Err(err) = ws.close(None).await {
        debug!(error = %err, "close handshake failed");
    }
    Ok(())
}

async fn run_forwarded<D, S>(
    desk: &D,
    base: &SessionContext,
    raw: &str,
    ws: &mut WebSocketStream<S>,
) -> Result<(), CliError>
where
    D: Desk + ?Sized,
    S: AsyncRead + AsyncWrite + Unpin,
{
    let descriptor: CommandDescriptor = serde_json::from_str(raw)?;
    let ctx = match base.apply(&descriptor) {
        Ok(ctx) => ctx,
        Err(err) => {
            // The caller sent something outside the invocable subset; tell
            // them and keep the server healthy.
            ws.send(Message::text(err.to_string())).await?;
            return Ok(());
        }
    };

    let (tap, mut lines) = mpsc::unbounded_channel();
    let tapped = Reporter::new(ctx.quiet).with_tap(tap);

    let result = {
        let exec = execute(desk, &ctx, &tapped);
        tokio::pin!(exec);
        loop {
            tokio::select! {
                result = &mut exec => break result,
                Some(line) = lines.recv() => ws.send(Message::text(line)).await?,
            }
        }
    };

    // Drain lines the executor emitted after the last poll of the tap.
    drop(tapped);
    while let Ok(line) = lines.try_recv() {
        ws.send(Message::text(line)).await?;
    }

    result?;
    Ok(())
}
