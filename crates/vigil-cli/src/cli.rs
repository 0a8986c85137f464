//! Command line definition and dispatch

use crate::scenario::{self, Scenario, ScenarioReport};
use crate::server;
use crate::telemetry::{init_tracing, DEFAULT_LOG_LEVEL};
use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use vigil_core::{ApiClient, VigilConfig};

/// Build the `vigil` command
#[must_use]
pub fn build_cli() -> Command {
    Command::new("vigil")
        .version(vigil_core::VERSION)
        .about("Self-healing supervisor for the Quality Re-Org Platform front end")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .default_value(DEFAULT_LOG_LEVEL)
                .help("Log filter used when RUST_LOG is unset"),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run scripted failure scenarios against the supervisor")
                .arg(
                    Arg::new("scenario")
                        .long("scenario")
                        .default_value("all")
                        .help("stall, white-screen, tab-error, cors, module-missing or all"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output reports as JSON"),
                ),
        )
        .subcommand(
            Command::new("serve")
                .about("Serve the application directory with a health endpoint")
                .arg(Arg::new("bind").long("bind").help("Listen address, overrides [server].bind"))
                .arg(
                    Arg::new("root")
                        .long("root")
                        .value_parser(value_parser!(PathBuf))
                        .help("Static root, overrides [server].static_root"),
                ),
        )
        .subcommand(
            Command::new("health")
                .about("Query a running server's health endpoint")
                .arg(
                    Arg::new("url")
                        .long("url")
                        .default_value("http://127.0.0.1:8080/")
                        .help("Base URL of the server"),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Inspect configuration")
                .subcommand_required(true)
                .subcommand(
                    Command::new("check")
                        .about("Validate a configuration file")
                        .arg(
                            Arg::new("path")
                                .required(true)
                                .value_parser(value_parser!(PathBuf)),
                        ),
                )
                .subcommand(Command::new("default").about("Print the default configuration")),
        )
}

fn load_config(matches: &ArgMatches) -> Result<VigilConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => VigilConfig::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(VigilConfig::default()),
    }
}

fn selected(name: &str) -> Result<Vec<Scenario>> {
    if name == "all" {
        Ok(Scenario::ALL.to_vec())
    } else {
        Ok(vec![name.parse()?])
    }
}

async fn simulate(config: &VigilConfig, args: &ArgMatches) -> Result<i32> {
    let name = args.get_one::<String>("scenario").map_or("all", String::as_str);
    let mut reports: Vec<ScenarioReport> = Vec::new();
    for scenario in selected(name)? {
        reports.push(scenario::run(scenario, config).await?);
    }

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!("{}", report.generate_text());
        }
        let healed = reports.iter().filter(|r| r.passed).count();
        println!("{healed}/{} scenarios healed", reports.len());
    }
    Ok(if reports.iter().all(|r| r.passed) { 0 } else { 1 })
}

async fn health(args: &ArgMatches) -> Result<i32> {
    let url = args
        .get_one::<String>("url")
        .context("missing --url")?;
    let client = ApiClient::new(url)?;
    let status = client.health().await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(if status.is_ok() { 0 } else { 1 })
}

fn config_command(args: &ArgMatches) -> Result<i32> {
    match args.subcommand() {
        Some(("check", check)) => {
            let path = check.get_one::<PathBuf>("path").context("missing path")?;
            match VigilConfig::load(path) {
                Ok(_) => {
                    println!("{}: ok", path.display());
                    Ok(0)
                }
                Err(err) => {
                    println!("{}: {err}", path.display());
                    Ok(1)
                }
            }
        }
        Some(("default", _)) => {
            print!("{}", VigilConfig::default().to_toml_string()?);
            Ok(0)
        }
        _ => Ok(2),
    }
}

/// Execute parsed arguments, returning the process exit code
///
/// # Errors
/// Returns an error if configuration cannot be loaded or a subcommand fails
/// outright.
pub async fn run(matches: ArgMatches) -> Result<i32> {
    let level = matches
        .get_one::<String>("log-level")
        .map_or(DEFAULT_LOG_LEVEL, String::as_str);
    init_tracing(matches.get_flag("log-json"), level);

    match matches.subcommand() {
        Some(("simulate", args)) => {
            let config = load_config(args)?;
            simulate(&config, args).await
        }
        Some(("serve", args)) => {
            let config = load_config(args)?;
            let bind = args
                .get_one::<String>("bind")
                .map_or(config.server.bind.as_str(), String::as_str);
            let root = args
                .get_one::<PathBuf>("root")
                .unwrap_or(&config.server.static_root);
            server::serve(server::parse_bind(bind)?, root).await?;
            Ok(0)
        }
        Some(("health", args)) => health(args).await,
        Some(("config", args)) => config_command(args),
        _ => Ok(2),
    }
}
