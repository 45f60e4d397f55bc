//! Docker Compose launcher for the bundled stack.
//!
//! The compose file ships inside the binary and is written next to an env
//! file holding the projected configuration before every compose call.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use crate::config::EnvironmentMap;
use crate::runner::command::{self, CommandOutput, OutputMode, find_program};
use crate::runner::errors::RunnerError;

/// Compose project name; networks and volumes are prefixed with it.
pub const PROJECT_NAME: &str = "teamplify_runner";
pub const COMPOSE_FILE_NAME: &str = "docker-compose.yml";
pub const ENV_FILE_NAME: &str = "teamplify.env";

const COMPOSE_FILE: &str = include_str!("../../assets/docker-compose.yml");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeFlavor {
    /// `docker compose` (Compose V2 plugin).
    Plugin,
    /// Legacy standalone `docker-compose`.
    Standalone,
}

/// `~/.teamplify/compose`
pub fn compose_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".teamplify")
        .join("compose")
}

#[derive(Debug, Clone)]
pub struct Compose {
    docker: PathBuf,
    flavor: ComposeFlavor,
    program: PathBuf,
    dir: PathBuf,
    env: EnvironmentMap,
}

impl Compose {
    /// Find the container engine and pick the compose flavor it supports.
    pub fn detect(env: EnvironmentMap, dir: PathBuf) -> Result<Self, RunnerError> {
        let docker = find_program("docker")?;

        let mut probe = Command::new(&docker);
        probe.args(["compose", "version"]);
        let plugin = command::run_unchecked(&mut probe, OutputMode::Quiet)?.success();

        let (flavor, program) = if plugin {
            (ComposeFlavor::Plugin, docker.clone())
        } else {
            warn!(event = "core.compose.standalone_fallback");
            (ComposeFlavor::Standalone, find_program("docker-compose")?)
        };

        info!(
            event = "core.compose.detected",
            flavor = ?flavor,
            program = %program.display()
        );

        Ok(Self {
            docker,
            flavor,
            program,
            dir,
            env,
        })
    }

    pub fn flavor(&self) -> ComposeFlavor {
        self.flavor
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn env(&self) -> &EnvironmentMap {
        &self.env
    }

    /// Write the compose file and the env file into the working directory.
    pub fn prepare(&self) -> Result<(), RunnerError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(COMPOSE_FILE_NAME), COMPOSE_FILE)?;
        write_env_file(&self.dir.join(ENV_FILE_NAME), &self.env)?;
        debug!(event = "core.compose.prepared", dir = %self.dir.display());
        Ok(())
    }

    /// A compose invocation for this project.
    pub fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut command = Command::new(&self.program);
        if self.flavor == ComposeFlavor::Plugin {
            command.arg("compose");
        }
        command
            .arg("--project-name")
            .arg(PROJECT_NAME)
            .arg("--file")
            .arg(self.dir.join(COMPOSE_FILE_NAME))
            .args(args)
            .current_dir(&self.dir)
            .envs(&self.env)
            .env("COMPOSE_PROJECT_NAME", PROJECT_NAME);
        command
    }

    /// A plain container engine invocation.
    pub fn docker<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut command = Command::new(&self.docker);
        command.args(args);
        command
    }

    pub fn run(&self, args: &[&str], mode: OutputMode) -> Result<CommandOutput, RunnerError> {
        self.prepare()?;
        command::run(&mut self.command(args), mode)
    }

    pub fn up(&self) -> Result<(), RunnerError> {
        self.run(&["up", "-d", "--remove-orphans"], OutputMode::Inherit)
            .map(|_| ())
    }

    pub fn remove(&self) -> Result<(), RunnerError> {
        self.run(&["rm", "-v", "--stop", "--force"], OutputMode::Inherit)
            .map(|_| ())
    }

    /// Container ids of a running service.
    pub fn service_containers(&self, service: &str) -> Result<Vec<String>, RunnerError> {
        let output = self.run(&["ps", "-q", service], OutputMode::Silent)?;
        Ok(non_empty(output.stdout_lines))
    }
}

/// Drop blank lines from captured output.
pub fn non_empty(lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// `KEY=value` per line, owner-only on unix.
pub fn write_env_file(path: &Path, env: &EnvironmentMap) -> Result<(), RunnerError> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    for (key, value) in env {
        writeln!(file, "{}={}", key, value.replace('\n', "\\n"))?;
    }
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn compose_in(dir: &Path, flavor: ComposeFlavor) -> Compose {
        let mut env = EnvironmentMap::new();
        env.insert("WEB_HOST".into(), "localhost".into());
        env.insert("DB_PASSWORD".into(), "secret".into());
        Compose {
            docker: PathBuf::from("docker"),
            flavor,
            program: PathBuf::from(match flavor {
                ComposeFlavor::Plugin => "docker",
                ComposeFlavor::Standalone => "docker-compose",
            }),
            dir: dir.to_path_buf(),
            env,
        }
    }

    #[test]
    fn test_prepare_writes_compose_and_env_files() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("compose");
        let compose = compose_in(&dir, ComposeFlavor::Plugin);

        compose.prepare().unwrap();

        let written = fs::read_to_string(dir.join(COMPOSE_FILE_NAME)).unwrap();
        assert_eq!(written, COMPOSE_FILE);
        let env = fs::read_to_string(dir.join(ENV_FILE_NAME)).unwrap();
        assert_eq!(env, "DB_PASSWORD=secret\nWEB_HOST=localhost\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_env_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join(ENV_FILE_NAME);
        write_env_file(&path, &EnvironmentMap::new()).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_plugin_command_line() {
        let temp = TempDir::new().unwrap();
        let compose = compose_in(temp.path(), ComposeFlavor::Plugin);
        let line = command::describe(&compose.command(["ps", "-q", "app"]));
        assert!(line.starts_with("docker compose --project-name teamplify_runner --file "));
        assert!(line.ends_with("docker-compose.yml ps -q app"));
    }

    #[test]
    fn test_standalone_command_line() {
        let temp = TempDir::new().unwrap();
        let compose = compose_in(temp.path(), ComposeFlavor::Standalone);
        let line = command::describe(&compose.command(["up", "-d"]));
        assert!(line.starts_with("docker-compose --project-name teamplify_runner"));
    }

    #[test]
    fn test_command_carries_environment() {
        let temp = TempDir::new().unwrap();
        let compose = compose_in(temp.path(), ComposeFlavor::Plugin);
        let command = compose.command(["config"]);
        let envs: Vec<_> = command
            .get_envs()
            .map(|(k, v)| (k.to_os_string(), v.map(|v| v.to_os_string())))
            .collect();
        assert!(envs.contains(&("COMPOSE_PROJECT_NAME".into(), Some(PROJECT_NAME.into()))));
        assert!(envs.contains(&("WEB_HOST".into(), Some("localhost".into()))));
    }

    #[test]
    fn test_non_empty_drops_blank_lines() {
        let lines = vec!["abc".to_string(), "".to_string(), "  ".to_string()];
        assert_eq!(non_empty(lines), vec!["abc"]);
    }

    #[test]
    fn test_compose_file_declares_profiles() {
        assert!(COMPOSE_FILE.contains("profiles: [\"nossl\"]"));
        assert!(COMPOSE_FILE.contains("profiles: [\"letsencrypt\"]"));
        assert!(COMPOSE_FILE.contains("container_name: teamplify_app"));
        assert!(COMPOSE_FILE.contains("container_name: teamplify_db"));
    }
}
