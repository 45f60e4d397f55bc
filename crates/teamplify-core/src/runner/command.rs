//! Thin wrapper around `std::process::Command` for the container engine.
//!
//! Each call logs structured start/finish events and maps a non-zero exit
//! status to [`RunnerError::CommandFailed`] with the exact exit code.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use crate::runner::errors::RunnerError;

/// What happens to the child's stdout and stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Stream straight to the terminal.
    Inherit,
    /// Capture, and echo everything once the command has finished.
    Echo,
    /// Capture, and echo only when the command fails.
    Silent,
    /// Capture and never echo.
    Quiet,
}

#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout_lines: Vec<String>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Render a command line for messages and logs.
pub fn describe(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Locate an executable in `PATH`.
pub fn find_program(program: &str) -> Result<PathBuf, RunnerError> {
    which::which(program).map_err(|_| RunnerError::EngineNotFound {
        program: program.to_string(),
    })
}

/// Run and fail on a non-zero exit code.
pub fn run(command: &mut Command, mode: OutputMode) -> Result<CommandOutput, RunnerError> {
    let output = run_unchecked(command, mode)?;
    if output.success() {
        Ok(output)
    } else {
        Err(RunnerError::CommandFailed {
            command: describe(command),
            code: output.code,
        })
    }
}

/// Run and report the exit code without treating failure as an error.
pub fn run_unchecked(command: &mut Command, mode: OutputMode) -> Result<CommandOutput, RunnerError> {
    let description = describe(command);
    debug!(event = "core.runner.command_started", command = %description);

    let spawn_error = |source| RunnerError::SpawnFailed {
        command: description.clone(),
        source,
    };

    let output = if mode == OutputMode::Inherit {
        let status = command
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(spawn_error)?;
        CommandOutput {
            code: exit_code(status),
            stdout_lines: Vec::new(),
        }
    } else {
        let captured = command.stdin(Stdio::null()).output().map_err(spawn_error)?;
        let stdout = String::from_utf8_lossy(&captured.stdout);
        let stderr = String::from_utf8_lossy(&captured.stderr);
        let code = exit_code(captured.status);

        if mode == OutputMode::Echo || (mode == OutputMode::Silent && code != 0) {
            if !stdout.trim().is_empty() {
                println!("{}", stdout.trim_end());
            }
            if !stderr.trim().is_empty() {
                eprintln!("{}", stderr.trim_end());
            }
        }
        CommandOutput {
            code,
            stdout_lines: stdout.lines().map(str::to_string).collect(),
        }
    };

    if output.success() {
        info!(event = "core.runner.command_completed", command = %description);
    } else {
        warn!(
            event = "core.runner.command_failed",
            command = %description,
            code = output.code
        );
    }
    Ok(output)
}

#[cfg(unix)]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    // Killed by a signal: report it the way shells do.
    status
        .code()
        .unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}

#[cfg(not(unix))]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let mut command = Command::new("docker");
        command.args(["compose", "ps", "-q", "app"]);
        assert_eq!(describe(&command), "docker compose ps -q app");
    }

    #[test]
    fn test_run_captures_stdout_lines() {
        let mut command = Command::new("sh");
        command.args(["-c", "printf 'a\\nb\\n'"]);
        let output = run(&mut command, OutputMode::Silent).unwrap();
        assert_eq!(output.stdout_lines, vec!["a", "b"]);
    }

    #[test]
    fn test_run_surfaces_exact_exit_code() {
        let mut command = Command::new("sh");
        command.args(["-c", "exit 7"]);
        let err = run(&mut command, OutputMode::Silent).unwrap_err();
        assert!(matches!(err, RunnerError::CommandFailed { code: 7, .. }));
        assert_eq!(err.exit_code(), 7);
    }

    #[test]
    fn test_run_unchecked_reports_code() {
        let mut command = Command::new("sh");
        command.args(["-c", "exit 1"]);
        let output = run_unchecked(&mut command, OutputMode::Silent).unwrap();
        assert_eq!(output.code, 1);
        assert!(!output.success());
    }

    #[test]
    fn test_missing_program_is_a_spawn_error() {
        let mut command = Command::new("definitely-not-a-real-program-xyz");
        let err = run(&mut command, OutputMode::Silent).unwrap_err();
        assert!(matches!(err, RunnerError::SpawnFailed { .. }));
    }
}
