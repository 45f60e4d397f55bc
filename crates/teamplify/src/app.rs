use std::path::PathBuf;

use clap::{Arg, ArgAction, Command, value_parser};

pub fn build_cli() -> Command {
    Command::new("teamplify")
        .version(env!("CARGO_PKG_VERSION"))
        .about(concat!("Teamplify runner v", env!("CARGO_PKG_VERSION")))
        .long_about("Configure and run an on-premise Teamplify installation. The stack runs in Docker containers; configuration lives in a single INI file.")
        .arg(
            Arg::new("config")
                .long("config")
                .help("Optional, config file to use")
                .value_parser(existing_file)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("configure")
                .about("Write the full configuration, without unknown entries, to the config file")
        )
        .subcommand(Command::new("start").about("Start Teamplify"))
        .subcommand(Command::new("stop").about("Stop Teamplify"))
        .subcommand(Command::new("restart").about("Restart Teamplify"))
        .subcommand(
            Command::new("createadmin")
                .about("Create an admin")
                .arg(
                    Arg::new("email")
                        .long("email")
                        .help("The email that the admin uses to sign in")
                        .required(true)
                )
                .arg(
                    Arg::new("full-name")
                        .long("full-name")
                        .help("Admin's full name")
                )
        )
        .subcommand(
            Command::new("backup")
                .about("Backup Teamplify DB to a GZipped archive")
                .arg(
                    Arg::new("filename")
                        .help("Target file or directory (default: current directory)")
                        .value_parser(value_parser!(PathBuf))
                        .index(1)
                )
        )
        .subcommand(
            Command::new("restore")
                .about("Restore Teamplify DB from a GZipped archive")
                .arg(
                    Arg::new("filename")
                        .help("Backup archive to restore from")
                        .required(true)
                        .value_parser(existing_path)
                        .index(1)
                )
                .arg(
                    Arg::new("quiet")
                        .long("quiet")
                        .help("Skip confirmation prompt")
                        .action(ArgAction::SetTrue)
                )
        )
        .subcommand(Command::new("update").about("Update to the latest version"))
        .subcommand(
            Command::new("erase")
                .about("Erase all of Teamplify data and Docker images")
                .arg(
                    Arg::new("quiet")
                        .long("quiet")
                        .help("Skip confirmation prompt")
                        .action(ArgAction::SetTrue)
                )
        )
}

fn existing_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.exists() {
        Ok(path)
    } else {
        Err(format!("Path '{}' does not exist.", value))
    }
}

fn existing_file(value: &str) -> Result<PathBuf, String> {
    let path = existing_path(value)?;
    if path.is_dir() {
        Err(format!("File '{}' is a directory.", value))
    } else {
        Ok(path)
    }
}
