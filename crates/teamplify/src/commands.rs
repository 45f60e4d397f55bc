use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::ArgMatches;
use tracing::{error, info, warn};

use teamplify_core::config::ConfigStore;
use teamplify_core::events;
use teamplify_core::runner::operations::ensure_builtin_db;
use teamplify_core::{Runner, RunnerError, ValidationErrors};

const TROUBLESHOOTING_URL: &str = "https://github.com/teamplify/teamplify-runner/#troubleshooting";

/// Returned once the reason has already been reported to the user.
#[derive(Debug)]
pub struct CommandAborted;

impl fmt::Display for CommandAborted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command aborted.")
    }
}

impl std::error::Error for CommandAborted {}

pub fn run_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    events::log_app_startup();

    let config_path = matches.get_one::<PathBuf>("config").map(PathBuf::as_path);
    let mut store = ConfigStore::open(config_path)?;
    events::log_config_source(store.path());
    if let Some(path) = store.path() {
        println!("Using the configuration file at {}", path.display());
    }

    if let Some(("configure", _)) = matches.subcommand() {
        return handle_configure_command(&mut store);
    }

    if let Err(errors) = store.validate() {
        report_configuration_problem(&errors);
        return Err(CommandAborted.into());
    }

    match matches.subcommand() {
        Some(("start", _)) => handle_start_command(&store),
        Some(("stop", _)) => handle_stop_command(&store),
        Some(("restart", _)) => handle_restart_command(&store),
        Some(("createadmin", sub_matches)) => handle_createadmin_command(sub_matches, &store),
        Some(("backup", sub_matches)) => handle_backup_command(sub_matches, &store),
        Some(("restore", sub_matches)) => handle_restore_command(sub_matches, &store),
        Some(("update", _)) => handle_update_command(&store),
        Some(("erase", sub_matches)) => handle_erase_command(sub_matches, &store),
        _ => {
            error!(event = "cli.command_unknown");
            Err("Unknown command".into())
        }
    }
}

/// `Configuration problem:\n -> msg` for one error, `Configuration problem -
/// N errors found:` and a bullet per error otherwise.
fn format_configuration_problem(errors: &ValidationErrors) -> String {
    let separator = if errors.len() > 1 { " - " } else { ":\n -> " };
    format!("Configuration problem{}{}", separator, errors)
}

fn report_configuration_problem(errors: &ValidationErrors) {
    eprintln!("{}", format_configuration_problem(errors));
    warn!(event = "cli.config.validation_failed", errors = errors.len());
}

/// Check if user confirmation input indicates acceptance.
/// Accepts "y" or "yes" (case-insensitive).
fn is_confirmation_accepted(input: &str) -> bool {
    let normalized = input.trim().to_lowercase();
    normalized == "y" || normalized == "yes"
}

fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(is_confirmation_accepted(&input))
}

fn connect(store: &ConfigStore) -> Result<Runner, RunnerError> {
    let runner = Runner::new(store.env())?;
    if runner.uses_legacy_compose() {
        println!("WARNING: docker-compose is deprecated, please use Docker Compose V2");
    }
    Ok(runner)
}

/// Backup and restore only talk to the bundled DB container.
fn require_builtin_db(store: &ConfigStore) -> Result<(), Box<dyn std::error::Error>> {
    match ensure_builtin_db(&store.env()) {
        Ok(()) => Ok(()),
        Err(RunnerError::ExternalDatabase { host }) => {
            eprintln!(
                "\nWe are sorry, but the \"teamplify backup\" and \"teamplify restore\" \
                 commands are designed to work with \"builtin_db\" only. The current \
                 configuration specifies an external DB at:\n -> {}\n\
                 To perform backup or restore operations, please use tools that connect \
                 to this DB server directly.\n",
                host
            );
            Err(CommandAborted.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn handle_configure_command(store: &mut ConfigStore) -> Result<(), Box<dyn std::error::Error>> {
    info!(event = "cli.configure_started");

    let path = store.remove_unknown().dump(None)?;
    println!("Current configuration saved to:\n -> {}", path.display());
    println!(
        "\nThe file above contains the full list of configurable options. Please use \
         your favorite text editor to adjust them as necessary. When ready, run the \
         following command to verify and apply your changes:\n -> teamplify restart"
    );

    info!(event = "cli.configure_completed", path = %path.display());
    Ok(())
}

fn start(runner: &Runner) -> Result<(), Box<dyn std::error::Error>> {
    println!("Starting services...");
    let url = runner.start()?;
    println!(
        "\nDone. It may take a few moments for the app to come online at:\n -> {}\n\n\
         If it isn't available immediately, please check again after a minute or two. \
         If you experience any problems with the installation, please check the \
         Troubleshooting guide:\n -> {}",
        url, TROUBLESHOOTING_URL
    );

    let host = runner.env().get("WEB_HOST").map(String::as_str).unwrap_or("");
    if host.eq_ignore_ascii_case("localhost") {
        println!(
            "\nWARNING: you're running Teamplify on localhost. This is probably OK if you \
             only need to run a demo on your local machine. However, in this mode it will \
             not be available to anyone from the network. If you'd like to make it \
             available on the network, you need to provide a publicly visible domain name \
             that points to this server."
        );
    }
    Ok(())
}

fn stop(runner: &Runner) -> Result<(), Box<dyn std::error::Error>> {
    println!("Stopping services...");
    runner.stop()?;
    Ok(())
}

fn handle_start_command(store: &ConfigStore) -> Result<(), Box<dyn std::error::Error>> {
    info!(event = "cli.start_started");
    let runner = connect(store)?;
    start(&runner)?;
    info!(event = "cli.start_completed");
    Ok(())
}

fn handle_stop_command(store: &ConfigStore) -> Result<(), Box<dyn std::error::Error>> {
    info!(event = "cli.stop_started");
    let runner = connect(store)?;
    stop(&runner)?;
    info!(event = "cli.stop_completed");
    Ok(())
}

fn handle_restart_command(store: &ConfigStore) -> Result<(), Box<dyn std::error::Error>> {
    info!(event = "cli.restart_started");
    let runner = connect(store)?;
    stop(&runner)?;
    start(&runner)?;
    info!(event = "cli.restart_completed");
    Ok(())
}

fn handle_createadmin_command(
    matches: &ArgMatches,
    store: &ConfigStore,
) -> Result<(), Box<dyn std::error::Error>> {
    let email = matches
        .get_one::<String>("email")
        .ok_or("Email argument is required")?;
    let full_name = matches.get_one::<String>("full-name").map(String::as_str);

    let runner = connect(store)?;
    println!("Creating admin...");
    match runner.create_admin(email, full_name) {
        Ok(()) => {
            info!(event = "cli.createadmin_completed", email = email);
            Ok(())
        }
        Err(e) => {
            error!(event = "cli.createadmin_failed", email = email, error = %e);
            Err(e.into())
        }
    }
}

fn handle_backup_command(
    matches: &ArgMatches,
    store: &ConfigStore,
) -> Result<(), Box<dyn std::error::Error>> {
    require_builtin_db(store)?;
    let requested = matches.get_one::<PathBuf>("filename").map(PathBuf::as_path);

    let runner = connect(store)?;
    let plan = runner.plan_backup(requested)?;
    println!("Making backup of Teamplify DB to:\n -> {}", plan.target.display());
    println!("Please wait...");

    match runner.backup(&plan) {
        Ok(()) => {
            println!("Done.");
            info!(event = "cli.backup_completed", target = %plan.target.display());
            Ok(())
        }
        Err(e) => {
            error!(event = "cli.backup_failed", error = %e);
            Err(e.into())
        }
    }
}

fn handle_restore_command(
    matches: &ArgMatches,
    store: &ConfigStore,
) -> Result<(), Box<dyn std::error::Error>> {
    require_builtin_db(store)?;
    let source: &Path = matches
        .get_one::<PathBuf>("filename")
        .ok_or("Filename argument is required")?;

    if !matches.get_flag("quiet") {
        let prompt = format!(
            "Current Teamplify DB will be overwritten from:\n -> {}\nContinue (y/N)? ",
            source.display()
        );
        if !confirm(&prompt)? {
            println!("DB restore cancelled, exiting");
            info!(event = "cli.restore_aborted");
            return Ok(());
        }
    }

    let runner = connect(store)?;
    println!("Restoring DB backup...");
    match runner.restore(source) {
        Ok(()) => {
            println!("Done.");
            info!(event = "cli.restore_completed", source = %source.display());
            Ok(())
        }
        Err(e) => {
            error!(event = "cli.restore_failed", error = %e);
            Err(e.into())
        }
    }
}

fn handle_update_command(store: &ConfigStore) -> Result<(), Box<dyn std::error::Error>> {
    info!(event = "cli.update_started");
    let runner = connect(store)?;
    let report = runner.update()?;

    if report.restarted {
        println!("A new version was installed and Teamplify has been restarted:");
        println!(" -> {}\n", runner.root_url());
    }
    println!("Cleanup: {} stale image(s) found", report.stale_images);
    println!("Done.");

    info!(
        event = "cli.update_completed",
        restarted = report.restarted,
        stale_images = report.stale_images
    );
    Ok(())
}

fn handle_erase_command(
    matches: &ArgMatches,
    store: &ConfigStore,
) -> Result<(), Box<dyn std::error::Error>> {
    if !matches.get_flag("quiet") {
        let prompt = "\nIMPORTANT: This command will erase all of the data stored in the \
                      built-in Teamplify DB, and also remove all Docker images, volumes, \
                      and networks used by Teamplify.\n\n\
                      Do you want to confirm the deletion of all Teamplify data (y/N)? ";
        if !confirm(prompt)? {
            println!("Erase command cancelled, exiting");
            info!(event = "cli.erase_aborted");
            return Ok(());
        }
    }

    let runner = connect(store)?;
    println!("Stopping services and removing Docker networks, volumes, and images...");
    let report = runner.erase()?;
    println!("Removed {} Docker network(s)", report.networks);
    println!("Removed {} Docker volume(s)", report.volumes);
    println!("Done.");

    info!(
        event = "cli.erase_completed",
        networks = report.networks,
        volumes = report.volumes
    );
    Ok(())
}
