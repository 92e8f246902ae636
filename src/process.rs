//! Thin wrapper over `tokio::process` for external tool invocations.

use crate::error::{CliError, ReleaseError, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::process::Command;

/// Captured result of an external command
#[derive(Debug, Clone)]
pub(crate) struct CommandOutput {
    pub success: bool,
    /// Exit code; `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Last non-empty stderr lines, for error messages
    pub fn stderr_tail(&self) -> String {
        let lines: Vec<&str> = self.stderr.lines().filter(|l| !l.trim().is_empty()).collect();
        let start = lines.len().saturating_sub(20);
        lines[start..].join("\n")
    }
}

/// Render a command line for logs and error messages
pub(crate) fn display_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run a command to completion, capturing output
///
/// Spawn failures are errors; a non-zero exit is reported through `success`.
pub(crate) async fn run(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    envs: &BTreeMap<String, String>,
) -> Result<CommandOutput> {
    let rendered = display_command(program, args);
    log::debug!("Running: {}", rendered);

    let mut command = Command::new(program);
    command.args(args).envs(envs).kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let output = command.output().await.map_err(|e| {
        ReleaseError::Cli(CliError::ExecutionFailed {
            command: rendered.clone(),
            reason: e.to_string(),
        })
    })?;

    let result = CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    };
    if !result.success {
        log::debug!("'{}' exited with {}", rendered, output.status);
    }
    Ok(result)
}
