//! courier - CLI for courier sessions.
//!
//! A thin wrapper over the courier client for seeding a session by hand and
//! poking the backend with authenticated requests while debugging.

mod cli;
mod commands;
mod output;
mod vault;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use commands::{refresh, request, session};

/// Exit status when the session was ended and a new login is required.
const EXIT_SESSION_ENDED: u8 = 2;
/// Exit status when the refresh failed but the session was kept.
const EXIT_RETRYABLE: u8 = 3;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let vault = cli.vault.as_deref();
    match cli.command {
        Commands::Session(cmd) => session::handle(cmd, vault).await,
        Commands::Refresh => refresh::run(&cli.backend, vault).await,
        Commands::Request(args) => request::run(args, &cli.backend, vault).await,
    }
}

fn report(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<courier_core::Error>() {
        Some(e) if e.is_session_ended() => {
            output::error(&format!("Session ended, sign in again: {}", e));
            ExitCode::from(EXIT_SESSION_ENDED)
        }
        Some(e) if e.is_retryable() => {
            output::error(&format!("Temporary failure, session kept. Retry later: {}", e));
            ExitCode::from(EXIT_RETRYABLE)
        }
        _ => {
            output::error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
