//! The seam between providers and the processes they spawn.

use isolator_core::{run_with_timeout, CommandOutput, Config};
use std::time::Duration;

/// Runs an external program to completion with a deadline.
///
/// Providers only ever talk to their tool through this trait, so tests can
/// substitute canned output for a real daemon.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> isolator_core::Result<CommandOutput>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> isolator_core::Result<CommandOutput> {
        run_with_timeout(program, args, timeout)
    }
}

/// Deadlines for the three classes of tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTimeouts {
    /// Read-only probes: version, inspect, ls, ps, stats, logs.
    pub probe: Duration,
    /// Mutating calls: run, stop, rm, network create/rm.
    pub command: Duration,
    /// Image build and pull.
    pub build: Duration,
}

impl Default for CommandTimeouts {
    fn default() -> Self {
        Self {
            probe: Duration::from_secs(5),
            command: Duration::from_secs(30),
            build: Duration::from_secs(600),
        }
    }
}

impl From<&Config> for CommandTimeouts {
    fn from(config: &Config) -> Self {
        Self {
            probe: config.probe_timeout(),
            command: config.command_timeout(),
            build: config.build_timeout(),
        }
    }
}
