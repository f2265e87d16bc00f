//! steampipe - Steam content deployment tool built around SteamCMD
//!
//! Terminal entry point.
//!
//! # Overview
//!
//! This binary crate wires the core services behind a clap CLI. It
//! initializes:
//! - Logging infrastructure (daily-rolling file logs + stderr diagnostics)
//! - Tokio async runtime (4 worker threads for subprocess supervision)
//! - State management ([`StateManager`])
//! - Configuration loading ([`ConfigManager`])
//! - The build runner and CLI controller
//!
//! # Execution Flow
//!
//! 1. Parse the command line (the data directory override decides where
//!    logs land, so parsing comes first)
//! 2. Initialize logging → `<data dir>/logs/steampipe.log.<date>`
//! 3. Create the tokio runtime with 4 worker threads
//! 4. Load `config.json` and every profile under `profiles/` into state
//! 5. Build the credential store, notifier, and build runner
//! 6. Execute the requested command on the runtime
//! 7. Log metrics and shut the runtime down with a 5s timeout
//!
//! # Data Directory
//!
//! Defaults to `<platform data dir>/steampipe/`, overridable with
//! `--data-dir`. Holds `config.json`, `profiles/`, `secrets.json`, and
//! `logs/`.

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use steampipe::cli::{Cli, CliController};
use steampipe::config::{self, ConfigManager};
use steampipe::metrics::Metrics;
use steampipe::services::{ConsoleNotifier, CredentialStore, FileSecretStore};
use steampipe::{APP_NAME, BuildRunner, StateManager, VERSION};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(config::default_data_dir);

    // The guard must stay alive for the process lifetime to keep the
    // non-blocking file writer flushing
    let log_dir = data_dir.join("logs");
    let _guard = steampipe::logging::setup_logging_with_console(
        log_dir.as_str(),
        "steampipe.log",
        cfg!(debug_assertions),
        true,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(4)
        .thread_name("steampipe-worker")
        .build()?;

    let metrics = Arc::new(Metrics::new());
    let state = Arc::new(StateManager::with_metrics(Arc::clone(&metrics)));

    // Load persisted settings and profiles into state
    let config_manager = ConfigManager::new(&data_dir)?;
    let tool_config = config_manager.load_config()?;
    let profiles = config_manager.list_profiles()?;
    tracing::info!(
        "Loaded configuration and {} profile(s) from {}",
        profiles.len(),
        config_manager.data_dir()
    );
    state.load_config(tool_config);
    state.set_profiles(profiles);

    let credentials = Arc::new(CredentialStore::new(Box::new(FileSecretStore::new(
        data_dir.join("secrets.json"),
    ))));
    let notifier = Arc::new(ConsoleNotifier::new());
    let runner = Arc::new(BuildRunner::new(
        Arc::clone(&state),
        Arc::clone(&credentials),
        notifier,
        Arc::clone(&metrics),
    ));

    let controller = CliController::new(state, config_manager, credentials, runner);
    let result = runtime.block_on(controller.execute(cli.command));

    metrics.log_summary();
    runtime.shutdown_timeout(Duration::from_secs(5));
    tracing::info!("Shutdown complete");

    result
}
