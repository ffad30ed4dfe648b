//! gt7-agent - Gran Turismo 7 telemetry lap saver
//!
//! Streams telemetry from a console on the local network, cuts it into laps
//! and saves each lap as JSON, either locally or on the GT Telemetry backend.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod cli;
mod config;
mod error;
mod prompt;
mod session;

use std::error::Error as _;
use std::io;
use std::process::ExitCode;
use std::sync::atomic::Ordering;

use clap::Parser;
use gt7_backend::BackendClient;
use gt7_capture::{CaptureSockets, StopReason};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;
use crate::config::{AgentConfig, Storage};
use crate::error::AgentError;
use crate::prompt::{Prompter, Terminal};
use crate::session::SessionPlan;

const LOG_TARGETS: [&str; 4] = ["gt7_agent", "gt7_capture", "gt7_backend", "gt7_protocol"];

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(StopReason::Interrupted) => {
            prompt::print_line(&mut io::stdout(), "Exiting...");
            ExitCode::SUCCESS
        }
        Err(e) => {
            report(&e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn default_filter(level: &str) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn run(cli: Cli) -> Result<StopReason, AgentError> {
    let mut config = AgentConfig::load(cli.config.as_deref()).map_err(AgentError::Config)?;
    config.apply_cli(&cli);
    config.validate().map_err(AgentError::Config)?;

    let mut terminal = Terminal::detect();
    let console = match config.console {
        Some(ip) => ip,
        None => prompt::console_address(&mut terminal)?,
    };

    let capture = config.capture_config(console);
    let sockets = CaptureSockets::bind(&capture)?;

    let storage = match config.storage {
        Some(storage) => storage,
        None => prompt::storage(&mut terminal)?,
    };
    let backend = match storage {
        Storage::Remote => {
            let backend_config = config.backend_config();
            let client = prompt::validated_token(&mut terminal, cli.token, |token| {
                let client = BackendClient::new(&backend_config, token)?;
                client.validate_token()?;
                Ok(client)
            })?;
            Some(client)
        }
        Storage::Local => {
            terminal.say("Laps will be saved locally.");
            None
        }
    };

    let plan = SessionPlan {
        sockets,
        capture,
        export_mode: config.export_mode,
        output_dir: config.output_dir.clone(),
        backend,
        heartbeat_interval: config.heartbeat_interval(),
        join_timeout: config.join_timeout(),
    };
    let summary = session::run(plan, |stop| {
        ctrlc::set_handler(move || stop.store(true, Ordering::Release))
            .map_err(AgentError::InterruptHandler)
    })?;

    info!(
        laps_saved = summary.laps_saved,
        laps_completed = summary.stats.laps_emitted,
        samples = summary.stats.samples,
        "session ended"
    );
    Ok(summary.stop)
}

fn report(err: &AgentError) {
    if matches!(err, AgentError::Cancelled) {
        prompt::print_line(&mut io::stdout(), "Exiting...");
        return;
    }
    eprintln!("Error: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
    debug!(error = ?err, "agent stopped with an error");
}
