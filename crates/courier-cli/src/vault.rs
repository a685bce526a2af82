//! Session vault location and client assembly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use tracing::debug;

use courier_core::{ApiUrl, Session};
use courier_file::FileVault;
use courier_http::{ApiClient, ClientConfig, connect};

use crate::cli::BackendArgs;

pub type CliSession = Session<FileVault>;

/// Resolve the vault file, falling back to the platform data directory.
pub fn vault_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let dirs =
        ProjectDirs::from("", "", "courier").context("Could not determine data directory")?;
    Ok(dirs.data_dir().join("session.json"))
}

/// Load the session stored in the vault.
pub async fn open_session(explicit: Option<&Path>) -> Result<CliSession> {
    let path = vault_path(explicit)?;
    debug!(path = %path.display(), "Opening session vault");

    Session::restore(FileVault::new(&path))
        .await
        .with_context(|| format!("Failed to read session vault {}", path.display()))
}

/// Build the client configuration from the backend flags.
pub fn client_config(args: &BackendArgs) -> Result<ClientConfig> {
    let api = args
        .api
        .as_deref()
        .context("No API URL. Pass --api or set COURIER_API.")?;
    let api = ApiUrl::new(api).context("Invalid API URL")?;

    let mut config = ClientConfig::new(api).with_refresh_path(args.refresh_path.clone());
    if let Some(secs) = args.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    Ok(config)
}

/// Connect an authenticated client over the stored session.
pub async fn open_client(
    backend: &BackendArgs,
    vault: Option<&Path>,
) -> Result<(ClientConfig, ApiClient<CliSession>)> {
    let config = client_config(backend)?;
    let session = open_session(vault).await?;
    let client = connect(&config, session).context("Failed to build HTTP client")?;
    Ok((config, client))
}
