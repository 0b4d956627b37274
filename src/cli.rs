//! Command-line interface definition for chatmon
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// chatmon - chat platform monitoring agent
///
/// Matches gateway message events against the rules in a profile, prints
/// records of matching events and auto-downloads their attachments.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatmon")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the profile
    #[arg(short, long, default_value = "profile.yaml")]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for chatmon
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Monitor gateway events
    Watch {
        /// JSON-lines file of recorded events (reads stdin when omitted)
        #[arg(short, long)]
        events: Option<PathBuf>,

        /// User id of the account the monitor runs as
        #[arg(long)]
        self_user_id: Option<u64>,

        /// Match and print without downloading attachments
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate the profile and print a summary of its rules
    Check,
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_config_path() {
        let cli = Cli::try_parse_from(["chatmon", "check"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("profile.yaml"));
        assert!(!cli.verbose);
        assert!(matches!(cli.command, Commands::Check));
    }

    #[test]
    fn test_cli_parse_watch_defaults() {
        let cli = Cli::try_parse_from(["chatmon", "watch"]).unwrap();
        match cli.command {
            Commands::Watch {
                events,
                self_user_id,
                dry_run,
            } => {
                assert!(events.is_none());
                assert!(self_user_id.is_none());
                assert!(!dry_run);
            }
            other => panic!("expected Watch, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_watch_with_options() {
        let cli = Cli::try_parse_from([
            "chatmon",
            "--config",
            "/etc/chatmon.yaml",
            "-v",
            "watch",
            "--events",
            "events.jsonl",
            "--self-user-id",
            "42",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("/etc/chatmon.yaml"));
        assert!(cli.verbose);
        match cli.command {
            Commands::Watch {
                events,
                self_user_id,
                dry_run,
            } => {
                assert_eq!(events, Some(PathBuf::from("events.jsonl")));
                assert_eq!(self_user_id, Some(42));
                assert!(dry_run);
            }
            other => panic!("expected Watch, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_rejects_non_numeric_user_id() {
        let result = Cli::try_parse_from(["chatmon", "watch", "--self-user-id", "me"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["chatmon"]).is_err());
    }
}
