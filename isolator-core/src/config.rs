use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::user_paths::{isolator_state_dir, STATE_DIR_NAME};

/// Runtime configuration, resolved from `ISOLATOR_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_home_dir")]
    pub home_dir: PathBuf,

    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_master_key_path")]
    pub master_key_path: PathBuf,

    /// Provider tried before the built-in preference order.
    #[serde(default = "default_provider")]
    pub default_provider: Option<String>,

    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    #[serde(default = "default_build_timeout")]
    pub build_timeout_secs: u64,
}

fn default_home_dir() -> PathBuf {
    if let Ok(path) = std::env::var("ISOLATOR_HOME") {
        return PathBuf::from(path);
    }

    isolator_state_dir().unwrap_or_else(|_| PathBuf::from(STATE_DIR_NAME))
}

fn default_db_path() -> PathBuf {
    std::env::var("ISOLATOR_DB_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_home_dir().join("isolator.db"))
}

fn default_master_key_path() -> PathBuf {
    std::env::var("ISOLATOR_MASTER_KEY")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_home_dir().join("master.key"))
}

fn default_provider() -> Option<String> {
    std::env::var("ISOLATOR_PROVIDER")
        .ok()
        .filter(|s| !s.trim().is_empty())
}

fn env_secs(name: &str, fallback: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(fallback)
}

fn default_probe_timeout() -> u64 {
    env_secs("ISOLATOR_PROBE_TIMEOUT", 5)
}

fn default_command_timeout() -> u64 {
    env_secs("ISOLATOR_COMMAND_TIMEOUT", 30)
}

fn default_build_timeout() -> u64 {
    env_secs("ISOLATOR_BUILD_TIMEOUT", 600) // 10 minutes
}

impl Default for Config {
    fn default() -> Self {
        Self {
            home_dir: default_home_dir(),
            db_path: default_db_path(),
            master_key_path: default_master_key_path(),
            default_provider: default_provider(),
            probe_timeout_secs: default_probe_timeout(),
            command_timeout_secs: default_command_timeout(),
            build_timeout_secs: default_build_timeout(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Configuration rooted at `home`, with the database and key file inside it.
    pub fn with_home(home: impl AsRef<Path>) -> Self {
        let home = home.as_ref().to_path_buf();
        Self {
            db_path: home.join("isolator.db"),
            master_key_path: home.join("master.key"),
            home_dir: home,
            ..Self::default()
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }
}
