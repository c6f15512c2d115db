use anyhow::{anyhow, Result};
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, warn};

/// Run a dump tool without a shell, returning stdout.
///
/// Secrets go through `envs`, never through the logged argument list.
pub async fn run_tool(
    program: &str,
    args: &[String],
    envs: &[(&str, String)],
    timeout: Option<Duration>,
) -> Result<String> {
    debug!("Executing {} {}", program, redact(args).join(" "));

    let mut command = AsyncCommand::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in envs {
        command.env(key, value);
    }

    let child = command.spawn().map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            anyhow!("'{}' not found, is it installed and on PATH?", program)
        } else {
            anyhow!("Failed to spawn {}: {}", program, e)
        }
    })?;

    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| anyhow!("{} timed out after {}s", program, limit.as_secs()))??,
        None => child.wait_with_output().await?,
    };

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if output.status.success() {
        Ok(stdout)
    } else {
        warn!("{} exited with {}: {}", program, output.status, stderr);
        let error_msg = if !stderr.is_empty() { stderr } else { stdout };
        Err(anyhow!("{} failed ({}): {}", program, output.status, error_msg.trim()))
    }
}

/// Mask the value following any password flag
fn redact(args: &[String]) -> Vec<String> {
    let mut redacted = Vec::with_capacity(args.len());
    let mut mask_next = false;
    for arg in args {
        if mask_next {
            redacted.push("****".to_string());
            mask_next = false;
        } else if arg == "--password" || arg == "-p" {
            redacted.push(arg.clone());
            mask_next = true;
        } else if arg.starts_with("--password=") {
            redacted.push("--password=****".to_string());
        } else {
            redacted.push(arg.clone());
        }
    }
    redacted
}
