// ── Command set and forwarding descriptor ──
//
// Every invocable operation is one variant of the closed `Command` enum, so
// the subset that may be forwarded from a remote caller is checkable in one
// place. The wire descriptor is a serde struct carrying exactly the
// allow-listed fields; a remote caller cannot express anything else, which
// removes the need for key-by-key filtering on the server.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ── Command ─────────────────────────────────────────────────────────

/// All operations the controller can run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Read and report the current height. The default when no command is
    /// given.
    Status,

    /// Move to a target height: a favourite name or a literal value in mm.
    MoveTo { target: String },

    /// Stream height/speed updates until the connection drops.
    Watch,

    /// Discover reachable devices; no desk connection is made.
    Scan,

    /// Serve forwarded commands over a raw TCP socket.
    SocketServer,

    /// Serve forwarded commands over a WebSocket endpoint.
    MessageServer,
}

impl Command {
    /// Whether a remote caller may invoke this command through the
    /// forwarding bridge. Only `Status`, `MoveTo`, and `Watch` qualify;
    /// scans and nested servers stay local.
    pub fn is_remote_invocable(&self) -> bool {
        matches!(self, Self::Status | Self::MoveTo { .. } | Self::Watch)
    }

    /// Stable name used on the wire and in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::MoveTo { .. } => "move_to",
            Self::Watch => "watch",
            Self::Scan => "scan",
            Self::SocketServer => "tcp_server",
            Self::MessageServer => "server",
        }
    }
}

// ── CommandDescriptor ───────────────────────────────────────────────

/// The forwarding wire descriptor.
///
/// One JSON object per exchange, e.g. `{"command":"move_to","move_to":"standing"}`.
/// An absent or null `command` means `Status`. Unknown keys in inbound JSON
/// are ignored; fields outside this struct cannot reach a [`SessionContext`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiet: Option<bool>,
}

impl CommandDescriptor {
    /// Build a descriptor for sending a local command to a remote server.
    ///
    /// Fails for commands outside the remote-invocable subset; callers check
    /// this *before* opening any connection.
    pub fn from_command(command: &Command, quiet: bool) -> Result<Self, CoreError> {
        let (name, move_to) = match command {
            Command::Status => (None, None),
            Command::MoveTo { target } => (Some("move_to".to_owned()), Some(target.clone())),
            Command::Watch => (Some("watch".to_owned()), None),
            other => {
                return Err(CoreError::NotForwardable {
                    command: other.name().to_owned(),
                });
            }
        };
        Ok(Self {
            command: name,
            move_to,
            quiet: Some(quiet),
        })
    }

    /// Resolve the descriptor's command field into a [`Command`].
    pub fn command(&self) -> Result<Command, CoreError> {
        match self.command.as_deref() {
            None | Some("status") => Ok(Command::Status),
            Some("move_to") => Ok(Command::MoveTo {
                target: self.move_to.clone().unwrap_or_default(),
            }),
            Some("watch") => Ok(Command::Watch),
            Some(other) => Err(CoreError::NotForwardable {
                command: other.to_owned(),
            }),
        }
    }
}

// ── SessionContext ──────────────────────────────────────────────────

/// Per-session execution context.
///
/// Built once from the loaded configuration for a local invocation; a
/// forwarding server builds a *fresh* context per inbound request with
/// [`SessionContext::apply`], so nothing a remote caller sends can leak
/// into the next request.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub command: Command,
    pub quiet: bool,
    /// Favourite position names mapped to heights in mm.
    pub favourites: BTreeMap<String, f64>,
}

impl SessionContext {
    pub fn new(command: Command, quiet: bool, favourites: BTreeMap<String, f64>) -> Self {
        Self {
            command,
            quiet,
            favourites,
        }
    }

    /// A new context for one forwarded request: this context's fields with
    /// the descriptor's allow-listed fields (command, move-to target, quiet)
    /// applied on top. The favourites table and everything else stay as
    /// configured locally.
    pub fn apply(&self, descriptor: &CommandDescriptor) -> Result<Self, CoreError> {
        Ok(Self {
            command: descriptor.command()?,
            quiet: descriptor.quiet.unwrap_or(self.quiet),
            favourites: self.favourites.clone(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base_context() -> SessionContext {
        let mut favourites = BTreeMap::new();
        favourites.insert("standing".to_owned(), 1100.0);
        SessionContext::new(Command::Status, false, favourites)
    }

    #[test]
    fn remote_invocable_subset() {
        assert!(Command::Status.is_remote_invocable());
        assert!(
            Command::MoveTo {
                target: "standing".into()
            }
            .is_remote_invocable()
        );
        assert!(Command::Watch.is_remote_invocable());
        assert!(!Command::Scan.is_remote_invocable());
        assert!(!Command::SocketServer.is_remote_invocable());
        assert!(!Command::MessageServer.is_remote_invocable());
    }

    #[test]
    fn descriptor_round_trips_move_to() {
        let command = Command::MoveTo {
            target: "standing".into(),
        };
        let descriptor = CommandDescriptor::from_command(&command, false).unwrap();
        let json = serde_json::to_string(&descriptor).unwrap();
        assert_eq!(json, r#"{"command":"move_to","move_to":"standing","quiet":false}"#);

        let parsed: CommandDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.command().unwrap(), command);
    }

    #[test]
    fn descriptor_refuses_local_only_commands() {
        let err = CommandDescriptor::from_command(&Command::Scan, false).unwrap_err();
        assert!(matches!(err, CoreError::NotForwardable { .. }));
    }

    #[test]
    fn absent_command_means_status() {
        let parsed: CommandDescriptor = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.command().unwrap(), Command::Status);

        let parsed: CommandDescriptor = serde_json::from_str(r#"{"command":null}"#).unwrap();
        assert_eq!(parsed.command().unwrap(), Command::Status);
    }

    #[test]
    fn unrecognized_command_string_is_rejected() {
        let parsed: CommandDescriptor =
            serde_json::from_str(r#"{"command":"reboot"}"#).unwrap();
        assert!(matches!(
            parsed.command(),
            Err(CoreError::NotForwardable { .. })
        ));
    }

    #[test]
    fn disallowed_keys_never_reach_the_context() {
        // Keys outside {command, move_to, quiet} are dropped at parse time.
        let json = r#"{
            "command": "move_to",
            "move_to": "standing",
            "mac_address": "FF:FF:FF:FF:FF:FF",
            "favourites": {"standing": 1},
            "server_port": 1
        }"#;
        let descriptor: CommandDescriptor = serde_json::from_str(json).unwrap();

        let base = base_context();
        let applied = base.apply(&descriptor).unwrap();
        assert_eq!(applied.favourites, base.favourites);
        assert_eq!(applied.quiet, base.quiet);
        assert_eq!(
            applied.command,
            Command::MoveTo {
                target: "standing".into()
            }
        );
    }

    #[test]
    fn apply_overrides_quiet_only_when_present() {
        let base = base_context();

        let descriptor: CommandDescriptor =
            serde_json::from_str(r#"{"quiet":true}"#).unwrap();
        assert!(base.apply(&descriptor).unwrap().quiet);

        let descriptor: CommandDescriptor = serde_json::from_str("{}").unwrap();
        assert!(!base.apply(&descriptor).unwrap().quiet);
    }
}
