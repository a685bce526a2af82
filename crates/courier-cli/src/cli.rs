//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use courier_http::DEFAULT_REFRESH_PATH;

use crate::commands::request::RequestArgs;
use crate::commands::session::SessionCommand;

/// Inspect courier sessions and send authenticated requests.
#[derive(Parser, Debug)]
#[command(name = "courier")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub backend: BackendArgs,

    /// Session vault file (defaults to the platform data directory)
    #[arg(long, env = "COURIER_VAULT", global = true)]
    pub vault: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the backend lives.
#[derive(clap::Args, Debug, Clone)]
pub struct BackendArgs {
    /// Backend base URL
    #[arg(long, env = "COURIER_API", global = true)]
    pub api: Option<String>,

    /// Refresh endpoint path, relative to the API URL
    #[arg(long, env = "COURIER_REFRESH_PATH", default_value = DEFAULT_REFRESH_PATH, global = true)]
    pub refresh_path: String,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage the stored session
    Session(SessionCommand),

    /// Exchange the refresh token for a new access token
    Refresh,

    /// Send an authenticated request
    Request(RequestArgs),
}
