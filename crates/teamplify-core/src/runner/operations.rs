//! Lifecycle operations on the deployed stack.
//!
//! Each operation logs structured events and returns what the caller needs
//! to report; printing is left to the CLI.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Utc};
use tracing::{error, info, warn};

use crate::config::EnvironmentMap;
use crate::config::env::root_url;
use crate::config::schema::BUILTIN_DB_HOST;
use crate::runner::command::{self, OutputMode};
use crate::runner::compose::{self, Compose, ComposeFlavor, PROJECT_NAME, non_empty};
use crate::runner::errors::RunnerError;
use crate::runner::images::{self, APP_IMAGE};

pub const APP_CONTAINER: &str = "teamplify_app";
pub const DB_CONTAINER: &str = "teamplify_db";

/// Backup mount path inside the DB container.
pub const CONTAINER_BACKUP_DIR: &str = "/backup";
pub const RESTORE_FILE_NAME: &str = "restore.sql.gz";

/// `<db>_<YYYY-MM-DD_HH-MM-SS>.sql.gz`
pub fn backup_filename(db_name: &str, now: NaiveDateTime) -> String {
    format!("{}_{}.sql.gz", db_name, now.format("%Y-%m-%d_%H-%M-%S"))
}

/// No path: the default name in the working directory. A directory: the
/// default name inside it. Anything else is taken as the file path.
pub fn resolve_backup_target(requested: Option<&Path>, default_name: &str) -> PathBuf {
    match requested {
        None => PathBuf::from(default_name),
        Some(path) if path.is_dir() => path.join(default_name),
        Some(path) => path.to_path_buf(),
    }
}

/// Backup and restore talk to the bundled DB container only.
pub fn ensure_builtin_db(env: &EnvironmentMap) -> Result<(), RunnerError> {
    let host = require(env, "DB_HOST")?;
    if host.eq_ignore_ascii_case(BUILTIN_DB_HOST) {
        Ok(())
    } else {
        Err(RunnerError::ExternalDatabase {
            host: host.to_string(),
        })
    }
}

fn require<'a>(env: &'a EnvironmentMap, key: &str) -> Result<&'a str, RunnerError> {
    env.get(key)
        .map(String::as_str)
        .ok_or_else(|| RunnerError::MissingEnv {
            key: key.to_string(),
        })
}

/// Rename, falling back to copy and delete across filesystems.
fn move_file(source: &Path, target: &Path) -> std::io::Result<()> {
    if fs::rename(source, target).is_ok() {
        return Ok(());
    }
    fs::copy(source, target)?;
    fs::remove_file(source)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPlan {
    /// File name used inside the backup mount.
    pub file_name: String,
    pub target: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub restarted: bool,
    pub stale_images: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EraseReport {
    pub networks: usize,
    pub volumes: usize,
}

pub struct Runner {
    compose: Compose,
}

impl Runner {
    /// Bind a projected configuration to the container engine on this host.
    pub fn new(env: EnvironmentMap) -> Result<Self, RunnerError> {
        Self::with_compose_dir(env, compose::compose_dir())
    }

    pub fn with_compose_dir(env: EnvironmentMap, dir: PathBuf) -> Result<Self, RunnerError> {
        let compose = Compose::detect(images::with_images(env), dir)?;
        Ok(Self { compose })
    }

    pub fn env(&self) -> &EnvironmentMap {
        self.compose.env()
    }

    pub fn uses_legacy_compose(&self) -> bool {
        self.compose.flavor() == ComposeFlavor::Standalone
    }

    pub fn root_url(&self) -> String {
        root_url(self.env())
    }

    pub fn start(&self) -> Result<String, RunnerError> {
        info!(event = "core.runner.start_started");
        fs::create_dir_all(require(self.env(), "DB_BACKUP_MOUNT")?)?;
        self.compose.up()?;
        let url = self.root_url();
        info!(event = "core.runner.start_completed", root_url = %url);
        Ok(url)
    }

    pub fn stop(&self) -> Result<(), RunnerError> {
        info!(event = "core.runner.stop_started");
        self.compose.remove()?;
        info!(event = "core.runner.stop_completed");
        Ok(())
    }

    pub fn restart(&self) -> Result<String, RunnerError> {
        self.stop()?;
        self.start()
    }

    pub fn is_running(&self) -> Result<bool, RunnerError> {
        Ok(!self.compose.service_containers("app")?.is_empty())
    }

    pub fn create_admin(&self, email: &str, full_name: Option<&str>) -> Result<(), RunnerError> {
        info!(event = "core.runner.create_admin_started", email = email);
        let mut args = vec![
            "exec",
            "-it",
            APP_CONTAINER,
            "/code/manage.py",
            "createadmin",
            "--email",
            email,
        ];
        if let Some(name) = full_name
            && !name.is_empty()
        {
            args.extend(["--full-name", name]);
        }
        command::run(&mut self.compose.docker(args), OutputMode::Inherit)?;
        info!(event = "core.runner.create_admin_completed", email = email);
        Ok(())
    }

    pub fn plan_backup(&self, requested: Option<&Path>) -> Result<BackupPlan, RunnerError> {
        ensure_builtin_db(self.env())?;
        let file_name = backup_filename(require(self.env(), "DB_NAME")?, Utc::now().naive_utc());
        let target = resolve_backup_target(requested, &file_name);
        Ok(BackupPlan { file_name, target })
    }

    /// Dump the bundled DB into the backup mount, then move it to the target.
    pub fn backup(&self, plan: &BackupPlan) -> Result<(), RunnerError> {
        let env = self.env();
        ensure_builtin_db(env)?;
        info!(
            event = "core.runner.backup_started",
            target = %plan.target.display()
        );

        let created = !plan.target.exists();
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&plan.target)
            .map_err(|source| RunnerError::BackupTarget {
                path: plan.target.clone(),
                source,
            })?;

        let dump = format!(
            "mysqldump --single-transaction -u{} -h localhost {} | gzip > {}/{}",
            require(env, "DB_USER")?,
            require(env, "DB_NAME")?,
            CONTAINER_BACKUP_DIR,
            plan.file_name,
        );
        let password = format!("MYSQL_PWD={}", require(env, "DB_PASSWORD")?);
        let mut exec = self.compose.docker([
            "exec",
            "-e",
            password.as_str(),
            DB_CONTAINER,
            "bash",
            "-c",
            dump.as_str(),
        ]);
        if let Err(e) = command::run(&mut exec, OutputMode::Silent) {
            if created && let Err(cleanup) = fs::remove_file(&plan.target) {
                warn!(
                    event = "core.runner.backup_cleanup_failed",
                    target = %plan.target.display(),
                    error = %cleanup
                );
            }
            error!(event = "core.runner.backup_failed", error = %e);
            return Err(e);
        }

        let mounted = Path::new(require(env, "DB_BACKUP_MOUNT")?).join(&plan.file_name);
        move_file(&mounted, &plan.target).map_err(|source| RunnerError::BackupTarget {
            path: plan.target.clone(),
            source,
        })?;

        info!(
            event = "core.runner.backup_completed",
            target = %plan.target.display()
        );
        Ok(())
    }

    /// Replace the bundled DB with a gzipped SQL dump.
    pub fn restore(&self, source: &Path) -> Result<(), RunnerError> {
        let env = self.env();
        ensure_builtin_db(env)?;
        info!(event = "core.runner.restore_started", source = %source.display());

        let staged = Path::new(require(env, "DB_BACKUP_MOUNT")?).join(RESTORE_FILE_NAME);
        fs::copy(source, &staged)?;

        let result = self.load_dump(env);
        if let Err(e) = fs::remove_file(&staged) {
            warn!(
                event = "core.runner.restore_cleanup_failed",
                path = %staged.display(),
                error = %e
            );
        }
        result?;

        info!(event = "core.runner.restore_completed");
        Ok(())
    }

    fn load_dump(&self, env: &EnvironmentMap) -> Result<(), RunnerError> {
        let user = format!("-u{}", require(env, "DB_USER")?);
        let password = format!("MYSQL_PWD={}", require(env, "DB_PASSWORD")?);
        let db = require(env, "DB_NAME")?;

        for statement in [format!("drop database {}", db), format!("create database {}", db)] {
            let mut sql = self.compose.docker([
                "exec",
                "-e",
                password.as_str(),
                DB_CONTAINER,
                "mysql",
                user.as_str(),
                "-e",
                statement.as_str(),
            ]);
            command::run(&mut sql, OutputMode::Echo)?;
        }

        let load = format!(
            "gunzip < {}/{} | mysql {} {}",
            CONTAINER_BACKUP_DIR, RESTORE_FILE_NAME, user, db
        );
        let mut exec = self.compose.docker([
            "exec",
            "-e",
            password.as_str(),
            DB_CONTAINER,
            "bash",
            "-c",
            load.as_str(),
        ]);
        command::run(&mut exec, OutputMode::Echo)?;
        Ok(())
    }

    /// Full image id of a local image, if present.
    pub fn image_id(&self, reference: &str) -> Result<Option<String>, RunnerError> {
        let mut list = self
            .compose
            .docker(["image", "ls", "-q", "--no-trunc", reference]);
        let output = command::run(&mut list, OutputMode::Silent)?;
        Ok(non_empty(output.stdout_lines).into_iter().next())
    }

    /// Pull the app image; a running stack is restarted when the image changed.
    pub fn update(&self) -> Result<UpdateReport, RunnerError> {
        let app = require(self.env(), "IMAGE_APP")?.to_string();
        info!(event = "core.runner.update_started", image = %app);

        let mut report = UpdateReport::default();
        if self.is_running()? {
            let before = self.image_id(&app)?;
            command::run(&mut self.compose.docker(["pull", app.as_str()]), OutputMode::Inherit)?;
            let after = self.image_id(&app)?;
            if before != after {
                self.restart()?;
                report.restarted = true;
            }
        } else {
            command::run(&mut self.compose.docker(["pull", app.as_str()]), OutputMode::Echo)?;
        }
        report.stale_images = self.remove_stale_images()?;

        info!(
            event = "core.runner.update_completed",
            restarted = report.restarted,
            stale_images = report.stale_images
        );
        Ok(report)
    }

    /// Remove dangling app images. Images still in use are left alone.
    pub fn remove_stale_images(&self) -> Result<usize, RunnerError> {
        let reference = format!("reference={}", APP_IMAGE);
        let mut list = self.compose.docker([
            "images",
            "-f",
            reference.as_str(),
            "-f",
            "dangling=true",
            "-q",
        ]);
        let stale = non_empty(command::run(&mut list, OutputMode::Silent)?.stdout_lines);
        if !stale.is_empty() {
            let mut rmi = self.compose.docker(["rmi"]);
            rmi.args(&stale);
            command::run_unchecked(&mut rmi, OutputMode::Quiet)?;
        }
        Ok(stale.len())
    }

    /// Stop the stack and remove its networks, volumes and images.
    pub fn erase(&self) -> Result<EraseReport, RunnerError> {
        warn!(event = "core.runner.erase_started");
        self.stop()?;

        let networks = self.remove_project_objects("network")?;
        let volumes = self.remove_project_objects("volume")?;

        let mut rmi = self.compose.docker(["rmi"]);
        rmi.args(images::all_references());
        command::run_unchecked(&mut rmi, OutputMode::Echo)?;

        let report = EraseReport { networks, volumes };
        warn!(
            event = "core.runner.erase_completed",
            networks = report.networks,
            volumes = report.volumes
        );
        Ok(report)
    }

    fn remove_project_objects(&self, kind: &str) -> Result<usize, RunnerError> {
        let filter = format!("name={}*", PROJECT_NAME);
        let mut list = self.compose.docker([kind, "ls", "-f", filter.as_str(), "-q"]);
        let ids = non_empty(command::run(&mut list, OutputMode::Silent)?.stdout_lines);
        if !ids.is_empty() {
            let mut rm = self.compose.docker([kind, "rm"]);
            rm.args(&ids);
            command::run_unchecked(&mut rm, OutputMode::Echo)?;
        }
        Ok(ids.len())
    }
}
