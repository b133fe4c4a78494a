//! Daemon command: drives the sign in the foreground until signalled.
//!
//! Startup order:
//! - PID file (prevents two daemons fighting over the serial port)
//! - sign connection, or a dry-run session under `--debug`
//! - signal listener
//! - refresh loop, owned by the shutdown coordinator

use std::sync::Arc;

use calsign_core::MessageRenderer;
use calsign_server::{
    DisplaySession, PidFile, RefreshScheduler, SerialSign, ShutdownCoordinator, SignalHandler,
    default_pid_path,
};
use tracing::info;

use crate::cli::Cli;
use crate::config::SignConfig;
use crate::error::{ClientError, ClientResult};
use crate::source::build_source;

/// Runs the daemon until SIGINT, SIGTERM or SIGHUP.
pub async fn run(cli: &Cli, config: &SignConfig) -> ClientResult<()> {
    config.validate_limits().map_err(ClientError::Config)?;

    let pid_file = if cli.debug {
        None
    } else {
        let path = cli
            .pid_file
            .clone()
            .or_else(|| config.daemon.pid_file.clone())
            .unwrap_or_else(default_pid_path);
        Some(PidFile::create(path)?)
    };

    let session = open_session(cli, config)?.with_max_len(config.display.max_message_length);

    let scheduler = RefreshScheduler::new(
        build_source(&config.calendar),
        MessageRenderer::new(config.render_options()),
        session,
        config.scheduler_config(),
    )
    .with_clock(Arc::new(config.clock()));

    let signals = SignalHandler::new();
    signals.spawn_listener()?;

    let mut coordinator = ShutdownCoordinator::new(signals);
    if let Some(pid_file) = pid_file {
        info!(path = %pid_file.path().display(), "PID file created");
        coordinator = coordinator.with_pid_file(pid_file);
    }

    let report = coordinator.run(scheduler).await?;
    info!(
        disconnected = report.disconnected,
        drained = report.drained_active_cycle,
        "calsign stopped"
    );
    Ok(())
}

fn open_session(cli: &Cli, config: &SignConfig) -> ClientResult<DisplaySession> {
    if cli.debug {
        info!("Debug mode: messages are logged, not sent to a sign");
        return Ok(DisplaySession::dry_run());
    }

    let serial = config.serial_config().ok_or_else(|| {
        ClientError::Config("[device] port is not set (use --debug to run without a sign)".into())
    })?;
    let sign = SerialSign::connect(&serial)?;
    info!(port = %serial.port, baud_rate = serial.baud_rate, "Connected to sign");
    Ok(DisplaySession::new(Box::new(sign)))
}
