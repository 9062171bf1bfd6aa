//! Portal CLI - sign in and manage a Portal session from the terminal

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::{Commands, Runtime};
use std::path::PathBuf;
use tracing::{Level, debug, error};

#[derive(Parser)]
#[command(name = "portal")]
#[command(about = "Manage a Portal session")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Configuration file (TOML or YAML)
    #[arg(short = 'c', long, global = true, env = "PORTAL_CONFIG")]
    config: Option<PathBuf>,

    /// Where the session is stored
    #[arg(short = 's', long, global = true)]
    state_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level.into(), cli.log_json)?;

    let config = config::load(cli.config.as_deref())?;
    let state_file = config::state_file(cli.state_file, &config)?;
    debug!(state_file = %state_file.display(), base_url = %config.api.base_url, "Starting Portal CLI");

    let runtime = Runtime { config, state_file };
    if let Err(e) = cli.command.execute(&runtime).await {
        error!("Command failed: {e:#}");
        eprintln!("Error: {e:#}");
        if let Some(hint) = commands::failure_hint(&e, &runtime.config.api.base_url) {
            eprintln!("Hint: {hint}");
        }
        std::process::exit(1);
    }

    Ok(())
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_register() {
        let cli = Cli::try_parse_from([
            "portal",
            "--state-file",
            "/tmp/session.json",
            "register",
            "--email",
            "ada@example.com",
            "--password",
            "Valid1Pass!",
            "--name",
            "Ada",
        ])
        .unwrap();

        assert_eq!(cli.state_file, Some(PathBuf::from("/tmp/session.json")));
        assert!(matches!(
            cli.command,
            Commands::Register { ref name, date_of_birth: None, .. } if name == "Ada"
        ));
    }
}
