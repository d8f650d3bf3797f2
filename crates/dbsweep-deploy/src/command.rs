//! Blocking execution of external tools with captured output.
//!
//! Every collaborator the harness drives (the Compose CLI, the YCSB launcher,
//! `mongosh` inside a container) is an external process. This module runs
//! them to completion and captures stdout/stderr so callers can persist or
//! report them. No timeout is imposed: the external tool decides when it is
//! done.

use std::ffi::OsStr;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::DeployError;

/// Maximum number of stderr characters kept in error messages.
const STDERR_EXCERPT_CHARS: usize = 2000;

/// Captured result of a finished external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Rendered command line, for logs and errors
    pub command: String,
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    /// Complete standard output
    pub stdout: String,
    /// Complete standard error
    pub stderr: String,
    /// Wall-clock time from spawn to exit
    pub elapsed: Duration,
}

impl CommandOutput {
    /// Whether the command exited with status 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// The tail of stderr, trimmed, for inclusion in error messages.
    ///
    /// Falls back to stdout when stderr is empty; some tools report
    /// failures only on stdout.
    pub fn stderr_excerpt(&self) -> String {
        let source = if self.stderr.trim().is_empty() { &self.stdout } else { &self.stderr };
        let trimmed = source.trim();
        let count = trimmed.chars().count();
        if count <= STDERR_EXCERPT_CHARS {
            return trimmed.to_string();
        }
        let tail: String = trimmed.chars().skip(count - STDERR_EXCERPT_CHARS).collect();
        format!("...{tail}")
    }
}

/// Render a command as a shell-like string.
pub fn describe(command: &Command) -> String {
    let mut parts = vec![command.get_program().to_string_lossy().into_owned()];
    parts.extend(command.get_args().map(quote));
    parts.join(" ")
}

fn quote(arg: &OsStr) -> String {
    let arg = arg.to_string_lossy();
    if arg.is_empty() || arg.contains(char::is_whitespace) || arg.contains('"') {
        format!("'{}'", arg.replace('\'', "'\\''"))
    } else {
        arg.into_owned()
    }
}

/// Run `command` to completion, capturing stdout and stderr.
///
/// stdin is closed so the child can never block waiting for input.
///
/// # Errors
///
/// Returns [`DeployError::Spawn`] if the program cannot be started. A
/// non-zero exit status is reported through [`CommandOutput::code`], not as
/// an error.
pub fn run_captured(command: &mut Command) -> Result<CommandOutput, DeployError> {
    let rendered = describe(command);
    tracing::debug!("Running: {}", rendered);

    let start = Instant::now();
    let output = command
        .stdin(Stdio::null())
        .output()
        .map_err(|source| DeployError::Spawn { command: rendered.clone(), source })?;
    let elapsed = start.elapsed();

    let captured = CommandOutput {
        command: rendered,
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        elapsed,
    };

    tracing::debug!(
        "`{}` finished with {:?} after {:.1?}",
        captured.command,
        captured.code,
        captured.elapsed
    );
    Ok(captured)
}

/// Run `command` and turn a non-zero exit into [`DeployError::CommandFailed`].
pub fn run_checked(command: &mut Command) -> Result<CommandOutput, DeployError> {
    let output = run_captured(command)?;
    if output.success() {
        Ok(output)
    } else {
        Err(DeployError::command_failed(&output))
    }
}
