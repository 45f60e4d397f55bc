use std::path::PathBuf;

use crate::errors::TeamplifyError;

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("'{program}' was not found in PATH. Please install Docker first")]
    EngineNotFound { program: String },

    #[error("Failed to execute '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command failed, exit code {code}: {command}")]
    CommandFailed { command: String, code: i32 },

    #[error(
        "The backup and restore commands work with \"builtin_db\" only. The current \
         configuration specifies an external DB at: {host}"
    )]
    ExternalDatabase { host: String },

    #[error("Missing '{key}' in the deployment environment")]
    MissingEnv { key: String },

    #[error("Can't write the backup to '{}': {source}", path.display())]
    BackupTarget {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

impl RunnerError {
    /// Process exit status to report for this error. A failed external step
    /// passes its own exit code through.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunnerError::CommandFailed { code, .. } => *code,
            _ => 1,
        }
    }
}

impl TeamplifyError for RunnerError {
    fn error_code(&self) -> &'static str {
        match self {
            RunnerError::EngineNotFound { .. } => "RUNNER_ENGINE_NOT_FOUND",
            RunnerError::SpawnFailed { .. } => "RUNNER_SPAWN_FAILED",
            RunnerError::CommandFailed { .. } => "RUNNER_COMMAND_FAILED",
            RunnerError::ExternalDatabase { .. } => "RUNNER_EXTERNAL_DATABASE",
            RunnerError::MissingEnv { .. } => "RUNNER_MISSING_ENV",
            RunnerError::BackupTarget { .. } => "RUNNER_BACKUP_TARGET",
            RunnerError::IoError { .. } => "RUNNER_IO_ERROR",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            RunnerError::EngineNotFound { .. }
                | RunnerError::ExternalDatabase { .. }
                | RunnerError::BackupTarget { .. }
        )
    }
}
