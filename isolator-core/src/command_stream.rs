// Standard library
use std::ffi::OsStr;
use std::thread;
use std::time::{Duration, Instant};

// External crates
use duct::cmd;
use tracing::debug;

// Internal imports
use crate::error::{CoreError, Result};

/// How often a running child is polled while waiting for it to exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captured result of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Trimmed stderr, falling back to stdout when the tool wrote nothing there.
    pub fn error_text(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Run a command to completion, capturing stdout and stderr.
///
/// A non-zero exit is *not* an error here; callers inspect
/// [`CommandOutput::success`]. Failing to spawn the program and exceeding
/// `timeout` are errors. On timeout the child is killed before returning.
pub fn run_with_timeout<A: AsRef<OsStr>>(
    command: &str,
    args: &[A],
    timeout: Duration,
) -> Result<CommandOutput> {
    let full_command = format!(
        "{} {}",
        command,
        args.iter()
            .map(|a| a.as_ref().to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    );

    debug!(command = %full_command, timeout_secs = timeout.as_secs(), "running command");

    let handle = cmd(command, args.iter().map(|a| a.as_ref().to_os_string()))
        .stdout_capture()
        .stderr_capture()
        .unchecked()
        .start()
        .map_err(|source| CoreError::Spawn {
            command: full_command.clone(),
            source,
        })?;

    let start = Instant::now();

    loop {
        match handle.try_wait() {
            Ok(Some(output)) => {
                return Ok(CommandOutput {
                    code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                });
            }
            Ok(None) => {
                if start.elapsed() >= timeout {
                    let _ = handle.kill();
                    return Err(CoreError::Timeout {
                        command: full_command,
                        secs: timeout.as_secs(),
                    });
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                return Err(CoreError::Internal(format!(
                    "Error waiting for command '{}': {}",
                    full_command, e
                )));
            }
        }
    }
}
