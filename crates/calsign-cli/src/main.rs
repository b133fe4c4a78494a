//! calsign entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::Level;

use calsign_cli::cli::{Cli, Command, ConfigAction};
use calsign_cli::commands;
use calsign_cli::config::SignConfig;
use calsign_cli::error::{ClientError, ClientResult};
use calsign_core::{LogSink, TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    // Load configuration
    let config = if let Some(ref path) = cli.config {
        SignConfig::load_from(path).map_err(ClientError::Config)?
    } else {
        SignConfig::load().map_err(ClientError::Config)?
    };

    // Config commands print to stdout and skip logging setup
    if let Some(Command::Config { action }) = cli.command {
        return match action {
            ConfigAction::Dump => {
                let path = cli.config.clone().unwrap_or_else(SignConfig::default_path);
                commands::config::dump(&config, &path)
            }
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(),
        };
    }

    init_tracing(tracing_config(&cli, &config))?;

    if cli.test {
        commands::check::run(&config).await
    } else {
        commands::run::run(&cli, &config).await
    }
}

fn tracing_config(cli: &Cli, config: &SignConfig) -> TracingConfig {
    if cli.debug {
        return TracingConfig::debug();
    }

    let sink = cli
        .log_file
        .clone()
        .or_else(|| config.daemon.log_file.clone())
        .map(LogSink::File)
        .unwrap_or_default();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    TracingConfig::default().with_sink(sink).with_level(level)
}
