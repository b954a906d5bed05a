//! Foundation crate shared by every Isolator layer.
//!
//! Holds the pieces that have no domain knowledge of their own: the common
//! error type, the blocking subprocess runner used by providers, per-user
//! state paths, environment-driven configuration and tracing setup.

pub mod command_stream;
pub mod config;
pub mod error;
pub mod tracing_init;
pub mod user_paths;

pub use command_stream::{run_with_timeout, CommandOutput};
pub use config::Config;
pub use error::{CoreError, Result};
