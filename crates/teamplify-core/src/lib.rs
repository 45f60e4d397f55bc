//! teamplify-core: Core library for the Teamplify on-premise runner
//!
//! This library owns the deployment configuration and drives the container
//! stack built from it. It is used by the `teamplify` CLI.
//!
//! # Main Entry Points
//!
//! - [`config`] - Load, validate, and project the INI configuration
//! - [`runner`] - Start, stop, back up, restore, update, and erase the stack

pub mod config;
pub mod errors;
pub mod events;
pub mod logging;
pub mod runner;

// Re-export commonly used types at crate root for convenience
pub use config::{ConfigStore, EnvironmentMap, OptionKey, SectionKind, SslMode};
pub use errors::{ConfigError, TeamplifyError, ValidationErrors};
pub use runner::{Runner, RunnerError};

// Re-export logging initialization
pub use logging::init_logging;
