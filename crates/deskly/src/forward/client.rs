//! Forwarding client.
//!
//! Sends one local invocation to a running server and relays every line it
//! sends back. Commands outside the remote-invocable subset are refused
//! before any connection is opened.

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use deskly_core::{CommandDescriptor, Reporter, ServerSettings, SessionContext};

use crate::error::CliError;

pub async fn run(
    server: &ServerSettings,
    ctx: &SessionContext,
    reporter: &Reporter,
) -> Result<(), CliError> {
    // Quiet travels inside the descriptor; the remote end applies it, so
    // everything that does come back is relayed verbatim.
    let descriptor = CommandDescriptor::from_command(&ctx.command, ctx.quiet)?;

    let url = format!("ws://{}:{}/", server.address, server.port);
    debug!(%url, "connecting to forwarding server");
    let (ws, _) = connect_async(url.as_str())
        .await
        .map_err(|source| CliError::ForwardConnect {
            url: url.clone(),
            source,
        })?;
    let (mut sink, mut stream) = ws.split();

    sink.send(Message::text(serde_json::to_string(&descriptor)?))
        .await?;

    while let Some(message) = stream.next().await {
        match message? {
            Message::Text(text) => reporter.line(text.as_str()),
            Message::Close(_) => break,
            _ => {}
        }
    }
    debug!("server closed the exchange");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use deskly_core::Command;

    use super::*;

    #[tokio::test]
    async fn local_only_commands_are_refused_before_connecting() {
        let ctx = SessionContext::new(Command::Scan, false, BTreeMap::new());
        let server = ServerSettings {
            address: "127.0.0.1".into(),
            port: 1,
        };

        let err = run(&server, &ctx, &Reporter::new(false)).await.unwrap_err();
        assert!(matches!(err, CliError::NotForwardable { .. }));
    }
}
