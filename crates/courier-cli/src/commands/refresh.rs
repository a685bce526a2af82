//! Refresh command implementation.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::cli::BackendArgs;
use crate::output;
use crate::vault;

pub async fn run(backend: &BackendArgs, vault_path: Option<&Path>) -> Result<()> {
    let (config, client) = vault::open_client(backend, vault_path).await?;

    eprintln!("{}", "Refreshing session...".dimmed());
    client.refresh().await?;

    output::success("Session refreshed");
    output::field("Refresh endpoint", &config.refresh_url());
    Ok(())
}
