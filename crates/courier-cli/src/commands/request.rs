//! Request command implementation.

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Args;

use courier_core::{Method, RequestOptions};

use crate::cli::BackendArgs;
use crate::output;
use crate::vault;

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Path relative to the API URL, or an absolute URL
    pub path: String,

    /// HTTP method (defaults to POST with --data, GET otherwise)
    #[arg(short = 'X', long = "method")]
    pub method: Option<String>,

    /// Extra header as 'Name: value' (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Request body
    #[arg(short = 'd', long = "data")]
    pub data: Option<String>,
}

pub async fn run(args: RequestArgs, backend: &BackendArgs, vault_path: Option<&Path>) -> Result<()> {
    let (config, client) = vault::open_client(backend, vault_path).await?;

    let url = config.api.endpoint(&args.path);
    let options = build_options(&args)?;

    let response = client.request(&url, options).await?;

    output::status(response.status);
    output::body(&response.body)
}

fn build_options(args: &RequestArgs) -> Result<RequestOptions> {
    let method = match &args.method {
        Some(m) => m.parse::<Method>()?,
        None if args.data.is_some() => Method::Post,
        None => Method::Get,
    };

    let mut options = RequestOptions::with_method(method);
    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        options = options.header(name, value);
    }

    if let Some(data) = &args.data {
        if options.header_value("content-type").is_none()
            && serde_json::from_str::<serde_json::Value>(data).is_ok()
        {
            options = options.header("Content-Type", "application/json");
        }
        options = options.body(data.as_bytes().to_vec());
    }

    Ok(options)
}

fn parse_header(raw: &str) -> Result<(&str, &str)> {
    let (name, value) = raw
        .split_once(':')
        .with_context(|| format!("Header '{}' must look like 'Name: value'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("Header '{}' has an empty name", raw);
    }
    Ok((name, value.trim()))
}
