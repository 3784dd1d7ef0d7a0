//! Process-level plumbing shared by the server binary: layered configuration,
//! logging setup and shutdown signals.

pub mod config;
pub mod logging;
mod paths;
pub mod shutdown;

pub use config::{default_logging_config, AppConfig, CliArgs, LoggingConfig, Section, ServerConfig};
pub use paths::resolve_home_dir;
