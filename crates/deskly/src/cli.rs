//! Clap derive structures for the `deskly` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use deskly_core::Command as DeskCommand;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// deskly -- control a BLE height-adjustable desk from the command line
#[derive(Debug, Parser)]
#[command(
    name = "deskly",
    version,
    about = "Control a BLE height-adjustable desk from the command line",
    long_about = "Read, watch, and move a LINAK-style Bluetooth desk, and\n\
        forward those commands to a machine with radio range via a small\n\
        TCP or WebSocket bridge.",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    /// Defaults to reporting the current height.
    #[command(subcommand)]
    pub command: Option<Command>,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Desk address (MAC, or peripheral UUID on macOS)
    #[arg(long, short = 'm', env = "DESKLY_MAC_ADDRESS", global = true)]
    pub mac_address: Option<String>,

    /// Bluetooth adapter to use (e.g. hci0)
    #[arg(long, env = "DESKLY_ADAPTER", global = true)]
    pub adapter: Option<String>,

    /// Device discovery window in seconds
    #[arg(long, env = "DESKLY_SCAN_TIMEOUT", global = true)]
    pub scan_timeout: Option<u64>,

    /// Bound on a single connect attempt in seconds
    #[arg(long, env = "DESKLY_CONNECTION_TIMEOUT", global = true)]
    pub connection_timeout: Option<u64>,

    /// Forwarding server bind/target address
    #[arg(long, env = "DESKLY_SERVER_ADDRESS", global = true)]
    pub server_address: Option<String>,

    /// Forwarding server port
    #[arg(long, env = "DESKLY_SERVER_PORT", global = true)]
    pub server_port: Option<u16>,

    /// Send the command to a running deskly server instead of a desk
    #[arg(long, short = 'f', global = true)]
    pub forward: bool,

    /// Restart the session indefinitely after it finishes
    #[arg(long, global = true)]
    pub forever: bool,

    /// Suppress informational output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Config file path (defaults to the platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Report the current desk height (the default)
    Status,

    /// Move the desk to a favourite position or a height in mm
    #[command(alias = "move-to")]
    Move {
        /// Favourite name (e.g. "standing") or height in mm (e.g. 1100)
        target: String,
    },

    /// Stream height and speed changes until interrupted
    Watch,

    /// Discover reachable Bluetooth devices
    Scan,

    /// Serve forwarded commands over a WebSocket endpoint
    Server,

    /// Serve forwarded commands over a raw TCP socket
    TcpServer,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

impl Command {
    /// The core command this invocation selects; completions are handled
    /// before a session ever starts.
    pub fn to_desk_command(&self) -> Option<DeskCommand> {
        match self {
            Self::Status => Some(DeskCommand::Status),
            Self::Move { target } => Some(DeskCommand::MoveTo {
                target: target.clone(),
            }),
            Self::Watch => Some(DeskCommand::Watch),
            Self::Scan => Some(DeskCommand::Scan),
            Self::Server => Some(DeskCommand::MessageServer),
            Self::TcpServer => Some(DeskCommand::SocketServer),
            Self::Completions { .. } => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn no_subcommand_defaults_to_status() {
        let cli = Cli::parse_from(["deskly"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn move_takes_a_target() {
        let cli = Cli::parse_from(["deskly", "move", "standing"]);
        assert_eq!(
            cli.command.unwrap().to_desk_command(),
            Some(DeskCommand::MoveTo {
                target: "standing".into()
            })
        );
    }

    #[test]
    fn global_flags_apply_after_the_subcommand() {
        let cli = Cli::parse_from(["deskly", "watch", "--forward", "-q"]);
        assert!(cli.global.forward);
        assert!(cli.global.quiet);
        assert_eq!(
            cli.command.unwrap().to_desk_command(),
            Some(DeskCommand::Watch)
        );
    }
}
