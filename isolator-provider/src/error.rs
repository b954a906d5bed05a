//! Error types for isolation provider operations.

use isolator_core::CoreError;
use thiserror::Error;

/// Errors that can occur while driving an external isolation tool.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The tool is not installed or its daemon cannot be reached.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Service '{service}' failed: {message}")]
    Service { service: String, message: String },

    #[error("Network '{network}' failed: {message}")]
    Network { network: String, message: String },

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Command timed out after {secs}s: {command}")]
    Timeout { command: String, secs: u64 },
}

impl ProviderError {
    pub fn service(service: impl Into<String>, message: impl ToString) -> Self {
        Self::Service {
            service: service.into(),
            message: message.to_string(),
        }
    }

    pub fn network(network: impl Into<String>, message: impl ToString) -> Self {
        Self::Network {
            network: network.into(),
            message: message.to_string(),
        }
    }
}

impl From<CoreError> for ProviderError {
    fn from(err: CoreError) -> Self {
        if err.is_missing_program() {
            return Self::Unavailable(err.to_string());
        }

        match err {
            CoreError::Timeout { command, secs } => Self::Timeout { command, secs },
            other => Self::CommandFailed(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_missing_binary_is_unavailable() {
        let err: ProviderError = CoreError::Spawn {
            command: "docker --version".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        }
        .into();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }

    #[test]
    fn test_timeout_is_preserved() {
        let err: ProviderError = CoreError::Timeout {
            command: "docker stop api".into(),
            secs: 30,
        }
        .into();
        assert!(matches!(err, ProviderError::Timeout { secs: 30, .. }));
    }
}
