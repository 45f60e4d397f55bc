//! Deployment runner: drives the container engine for the configured stack.

pub mod command;
pub mod compose;
pub mod errors;
pub mod images;
pub mod operations;

pub use compose::{Compose, ComposeFlavor};
pub use errors::RunnerError;
pub use operations::{BackupPlan, EraseReport, Runner, UpdateReport};
