use std::path::Path;
use std::process::{Command, Output};

/// Run the CLI against an isolated vault, with the backend at `api` if given.
pub fn run_cli(args: &[&str], vault: &Path, api: Option<&str>) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_courier"));
    cmd.args(args);
    cmd.env("COURIER_VAULT", vault);
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("COURIER_REFRESH_PATH");
    cmd.env_remove("RUST_LOG");
    match api {
        Some(api) => cmd.env("COURIER_API", api),
        None => cmd.env_remove("COURIER_API"),
    };
    cmd.output().expect("Failed to execute CLI")
}

/// Run the CLI and expect success, returning stdout.
pub fn run_cli_success(args: &[&str], vault: &Path, api: Option<&str>) -> String {
    let output = run_cli(args, vault, api);
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Read the raw vault file.
pub fn vault_contents(vault: &Path) -> serde_json::Value {
    let content = std::fs::read_to_string(vault).expect("vault file missing");
    serde_json::from_str(&content).expect("vault file is not JSON")
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
