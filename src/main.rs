//! chatmon - chat platform monitoring agent
//!
//! Main entry point for the chatmon binary.

use anyhow::Result;

use chatmon::cli::{Cli, Commands};
use chatmon::commands;
use chatmon::config::Config;
use chatmon::monitor::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let (mut config, env_warnings) = Config::load_deferred(&cli.config)?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    init_logging(&config.logging)?;
    for warning in &env_warnings {
        tracing::warn!("{}", warning);
    }

    config.normalize();
    if let Commands::Watch {
        self_user_id: Some(id),
        ..
    } = &cli.command
    {
        config.apply_self_reply_guard(*id);
    }
    config.validate()?;

    match cli.command {
        Commands::Watch {
            events, dry_run, ..
        } => {
            tracing::info!("Starting monitor");
            if let Some(path) = &events {
                tracing::debug!("Reading events from: {}", path.display());
            }
            commands::watch::run_watch(&config, events, dry_run).await?;
            Ok(())
        }
        Commands::Check => {
            commands::check::run_check(&config)?;
            Ok(())
        }
    }
}
