//! Docker command builder.
//!
//! Every Docker invocation goes through [`DockerCommand`] so that each call
//! carries an explicit deadline, is logged the same way and has its failure
//! mapped onto [`ProviderError`].

use std::time::Duration;

use isolator_core::CommandOutput;
use tracing::{debug, warn};

use crate::error::{ProviderError, Result};
use crate::runner::CommandRunner;

/// Builder for Docker commands with fluent interface and consistent error handling.
pub(crate) struct DockerCommand<'a> {
    runner: &'a dyn CommandRunner,
    binary: &'a str,
    args: Vec<String>,
    timeout: Duration,
}

impl<'a> DockerCommand<'a> {
    pub(crate) fn new(runner: &'a dyn CommandRunner, binary: &'a str, timeout: Duration) -> Self {
        Self {
            runner,
            binary,
            args: Vec::new(),
            timeout,
        }
    }

    /// Add a single argument to the command.
    pub(crate) fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments to the command.
    pub(crate) fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn display(&self) -> String {
        format!("{} {}", self.binary, self.args.join(" "))
    }

    /// Run the command; a non-zero exit is returned as output, not as an error.
    pub(crate) fn execute_raw(self) -> Result<CommandOutput> {
        debug!(command = %self.display(), "executing docker command");
        Ok(self.runner.run(self.binary, &self.args, self.timeout)?)
    }

    /// Run the command and return stdout, failing on a non-zero exit.
    pub(crate) fn execute_with_output(self) -> Result<String> {
        let command_line = self.display();
        let output = self.execute_raw()?;

        if output.success() {
            Ok(output.stdout)
        } else {
            let message = output.error_text();
            warn!(command = %command_line, error = %message, "docker command failed");
            Err(ProviderError::CommandFailed(format!("{}: {}", command_line, message)))
        }
    }

    /// Run the command for its effect only.
    pub(crate) fn execute(self) -> Result<()> {
        self.execute_with_output().map(|_| ())
    }

    /// Whether the command ran and exited zero. Every failure reads as `false`.
    pub(crate) fn succeeds(self) -> bool {
        matches!(self.execute_raw(), Ok(output) if output.success())
    }
}
