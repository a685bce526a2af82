//! Session subcommands.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;

use courier_core::{AccessToken, RefreshToken, SessionStatus};

use crate::output;
use crate::vault::{self, CliSession};

#[derive(Args, Debug)]
pub struct SessionCommand {
    #[command(subcommand)]
    pub command: SessionSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum SessionSubcommand {
    /// Store tokens issued by a login flow
    Set(SetArgs),

    /// Display the stored session
    Show(ShowArgs),

    /// Remove the stored tokens
    Logout,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Access token sent as the bearer credential
    #[arg(long)]
    pub access_token: String,

    /// Refresh token exchanged when the access token expires
    #[arg(long)]
    pub refresh_token: Option<String>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Print the token values
    #[arg(long)]
    pub reveal: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionSummary {
    vault: String,
    status: &'static str,
    access_token: Option<String>,
    refresh_token: Option<String>,
}

pub async fn handle(cmd: SessionCommand, vault: Option<&Path>) -> Result<()> {
    match cmd.command {
        SessionSubcommand::Set(args) => set(args, vault).await,
        SessionSubcommand::Show(args) => show(args, vault).await,
        SessionSubcommand::Logout => logout(vault).await,
    }
}

async fn set(args: SetArgs, vault: Option<&Path>) -> Result<()> {
    let session = vault::open_session(vault).await?;

    session
        .set_tokens(
            AccessToken::new(args.access_token),
            args.refresh_token.map(RefreshToken::new),
        )
        .await
        .context("Failed to store session")?;

    output::success("Session stored");
    Ok(())
}

async fn show(args: ShowArgs, vault: Option<&Path>) -> Result<()> {
    let path = vault::vault_path(vault)?;
    let session = vault::open_session(Some(path.as_path())).await?;
    let summary = summarize(&session, &path, args.reveal).await;

    if args.json {
        return output::json_pretty(&summary);
    }

    output::field("Vault", &summary.vault);
    output::field("Status", summary.status);
    output::field("Access token", &describe(summary.access_token.as_deref()));
    output::field("Refresh token", &describe(summary.refresh_token.as_deref()));
    Ok(())
}

async fn logout(vault: Option<&Path>) -> Result<()> {
    let session = vault::open_session(vault).await?;

    if !session.is_authenticated().await && session.refresh_token().await.is_none() {
        eprintln!("{}", "No active session".dimmed());
        return Ok(());
    }

    session.logout().await.context("Failed to clear session")?;
    output::success("Logged out");
    Ok(())
}

async fn summarize(session: &CliSession, path: &Path, reveal: bool) -> SessionSummary {
    let conceal = |value: &str| {
        if reveal {
            value.to_string()
        } else {
            "present".to_string()
        }
    };

    SessionSummary {
        vault: path.display().to_string(),
        status: status_label(session.status()),
        access_token: session.access_token().await.map(|t| conceal(t.as_str())),
        refresh_token: session.refresh_token().await.map(|t| conceal(t.as_str())),
    }
}

fn status_label(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::SignedOut => "signed out",
        SessionStatus::Active => "active",
        SessionStatus::Ended => "ended",
    }
}

fn describe(value: Option<&str>) -> String {
    value.unwrap_or("absent").to_string()
}
