//! Shell invocation for plan commands
//!
//! One command line runs through the configured shell with stdin closed.
//! Both streams are captured and cut to a byte budget; a timeout kills the
//! child.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::{suggest_fix, BuildError};

/// Default cap on each captured stream, in bytes
const DEFAULT_MAX_OUTPUT: usize = 100_000;

const TRUNCATION_MARKER: &str = "\n... [output truncated] ...\n";

/// Limits applied to every shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOptions {
    /// None waits forever
    pub timeout: Option<Duration>,
    pub max_output: usize,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            max_output: DEFAULT_MAX_OUTPUT,
        }
    }
}

impl ExecOptions {
    /// 0 disables the timeout
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }

    pub fn with_max_output(mut self, bytes: usize) -> Self {
        self.max_output = bytes;
        self
    }
}

/// What a finished shell command left behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellOutput {
    /// None if the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Arguments that make `shell` run `command` (`/C` for cmd, `-c` otherwise)
pub fn shell_args<'a>(shell: &str, command: &'a str) -> [&'a str; 2] {
    let is_cmd = shell.eq_ignore_ascii_case("cmd") || shell.eq_ignore_ascii_case("cmd.exe");
    if is_cmd {
        ["/C", command]
    } else {
        ["-c", command]
    }
}

/// Lossy UTF-8 of `bytes`, cut on a char boundary once it exceeds `max`
fn capped(bytes: &[u8], max: usize) -> String {
    let mut text = String::from_utf8_lossy(bytes).into_owned();
    if text.len() > max {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
        text.push_str(TRUNCATION_MARKER);
    }
    text
}

/// Run `command` through `shell` and wait for it
///
/// # Errors
/// * `BuildError::SpawnFailed` - the shell could not be started
/// * `BuildError::Timeout` - the timeout elapsed first
pub async fn run_shell(shell: &str, command: &str, options: &ExecOptions) -> Result<ShellOutput, BuildError> {
    tracing::debug!("Executing: {}", command);

    let child = Command::new(shell)
        .args(shell_args(shell, command))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| BuildError::SpawnFailed {
            command: command.to_string(),
            error: e.to_string(),
        })?;

    let output = match options.timeout {
        Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| BuildError::Timeout {
                command: command.to_string(),
                timeout_secs: limit.as_secs(),
            })??,
        None => child.wait_with_output().await?,
    };

    Ok(ShellOutput {
        exit_code: output.status.code(),
        stdout: capped(&output.stdout, options.max_output),
        stderr: capped(&output.stderr, options.max_output),
    })
}

/// `CommandFailed` error with a suggestion derived from stderr
pub fn command_error(command: &str, exit_code: Option<i32>, stderr: &str) -> BuildError {
    BuildError::CommandFailed {
        command: command.to_string(),
        exit_code,
        stderr: stderr.to_string(),
        suggestion: suggest_fix(command, stderr),
    }
}
