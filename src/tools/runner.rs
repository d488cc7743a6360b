//! Subprocess execution for external tools

use super::ToolError;
use crate::scanner::ScanRequest;
use std::path::Path;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Captured output of a successful tool run
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs a tool to completion
///
/// The child is killed if `cancel` fires first.
///
/// # Arguments
///
/// * `label` - Name used in logs and errors
/// * `program` - Path of the executable
/// * `args` - Command-line arguments
/// * `cancel` - Cancellation token of the owning scan
///
/// # Returns
///
/// * `Ok(ToolOutput)` - The tool exited with status zero
/// * `Err(ToolError::Failed)` - Nonzero exit, with lossily decoded stdout/stderr
pub async fn run_tool(
    label: &str,
    program: &Path,
    args: &[String],
    cancel: &CancellationToken,
) -> Result<ToolOutput, ToolError> {
    tracing::debug!("Running {}: {} {}", label, program.display(), args.join(" "));

    let child = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output();

    let output = tokio::select! {
        result = child => result.map_err(|source| ToolError::Spawn {
            label: label.to_string(),
            source,
        })?,
        _ = cancel.cancelled() => {
            return Err(ToolError::Cancelled {
                label: label.to_string(),
            });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        return Err(ToolError::Failed {
            label: label.to_string(),
            code: output.status.code().unwrap_or(-1),
            stdout,
            stderr,
        });
    }

    Ok(ToolOutput { stdout, stderr })
}

/// Arguments of a katana crawl writing JSON lines to `out_file`
pub fn katana_args(request: &ScanRequest, out_file: &Path) -> Vec<String> {
    let mut args = vec![
        "-u".to_string(),
        request.base_url.clone(),
        "-d".to_string(),
        request.depth.to_string(),
        "-j".to_string(),
        "-silent".to_string(),
        "-timeout".to_string(),
        request.timeout_seconds.to_string(),
        "-o".to_string(),
        out_file.to_string_lossy().into_owned(),
        "-fs".to_string(),
        "fqdn".to_string(),
    ];
    if !request.follow_redirects {
        args.push("-dr".to_string());
    }
    args
}

/// Arguments of an httpx probe over the URL list in `input_file`
pub fn httpx_args(request: &ScanRequest, input_file: &Path, out_file: &Path) -> Vec<String> {
    let mut args = vec![
        "-l".to_string(),
        input_file.to_string_lossy().into_owned(),
        "-j".to_string(),
        "-silent".to_string(),
        "-sc".to_string(),
        "-ct".to_string(),
        "-cl".to_string(),
        "-timeout".to_string(),
        request.timeout_seconds.to_string(),
        "-o".to_string(),
        out_file.to_string_lossy().into_owned(),
    ];
    if request.follow_redirects {
        args.push("-fr".to_string());
    }
    args
}
