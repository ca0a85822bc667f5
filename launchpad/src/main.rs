//! Launchpad - Entry Point
//!
//! HTTP API that clones Git repositories into isolated workspaces and
//! publishes them through the Railway CLI.

use std::collections::HashMap;
use std::env;

use colored::Colorize;
use launchpad::app::options::AppOptions;
use launchpad::app::run::run;
use launchpad::deploy::platform::{PlatformCli, RailwayCli};
use launchpad::filesys::file::File;
use launchpad::logs::{init_logging, LogOptions};
use launchpad::storage::settings::Settings;
use launchpad::utils::version_info;

use tracing::{error, info};

const DEFAULT_SETTINGS_FILE: &str = "./launchpad.json";

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{json}"),
            Err(_) => println!("{}", version.version),
        }
        return;
    }

    // Load settings, then overlay the environment
    let settings_path = cli_args
        .get("config")
        .cloned()
        .unwrap_or_else(|| DEFAULT_SETTINGS_FILE.to_string());
    let mut settings = match Settings::load(&File::new(&settings_path)).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file: {e}");
            std::process::exit(1);
        }
    };
    settings.apply_env(|key| env::var(key).ok());
    if let Err(e) = settings.validate() {
        eprintln!("Invalid settings: {e}");
        std::process::exit(1);
    }

    // Check the platform CLI and exit
    if cli_args.contains_key("check-cli") {
        check_cli(&settings).await;
        return;
    }

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level,
        log_dir: settings.log_dir.clone(),
        json_format: settings.log_json,
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    // Run the server
    let options = AppOptions::from_settings(&settings);
    info!(
        "Running Launchpad on {}:{} (workspace root: {}, max concurrent deployments: {})",
        options.server.host,
        options.server.port,
        options.deployments.workspace_root.display(),
        options.deployments.max_concurrent_deployments
    );
    let result = run(version.version, options, await_shutdown_signal()).await;
    if let Err(e) = result {
        error!("Failed to run Launchpad: {e}");
        std::process::exit(1);
    }
}

async fn check_cli(settings: &Settings) {
    let cli = RailwayCli::new(
        settings.deployments.platform_binary.clone(),
        settings.deployments.platform_install_command.clone(),
    );
    match cli.tool_version().await {
        Ok(version) => println!(
            "{} {} ({})",
            "✓".green(),
            settings.deployments.platform_binary.bold(),
            version
        ),
        Err(e) => {
            println!(
                "{} {} is not available: {}",
                "✗".red(),
                settings.deployments.platform_binary.bold(),
                e
            );
            std::process::exit(1);
        }
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                _ => {
                    error!("Failed to install signal handlers, falling back to Ctrl+C");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        info!("Ctrl+C received, shutting down...");
    }
}
