// Terminal front end module
//
// Wires the core services together behind a clap-derive CLI: profile
// listing, local validation, real builds with live log streaming and
// Ctrl-C cancellation, and settings management.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::config::ConfigManager;
use crate::models::{AppProfile, BuildOutcome};
use crate::runner::BuildRunner;
use crate::services::secrets::CredentialStore;
use crate::state::{StateChange, StateManager};

/// How long to wait for the log printer to flush trailing events
const PRINTER_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(name = crate::APP_NAME, version = crate::VERSION)]
#[command(about = "Steam content deployment tool built around SteamCMD")]
pub struct Cli {
    /// Override the managed data directory
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List loaded profiles
    Profiles,

    /// Validate a profile locally and render its VDF scripts
    Check {
        /// Profile name (as shown by `profiles`)
        profile: String,
    },

    /// Run a build for a profile and upload it through SteamCMD
    Build {
        /// Profile name (as shown by `profiles`)
        profile: String,
    },

    /// Set the Steam login name
    SetLogin {
        /// Steam account name used by `+login`
        login: String,
    },

    /// Set the Content Builder directory SteamCMD lives under
    SetBuilderPath {
        /// Path to the SDK's ContentBuilder directory
        path: String,
    },

    /// Read a password from stdin and store it for the configured login
    SetPassword {
        /// Keep the password for this run only; clear any persisted copy
        #[arg(long)]
        no_remember: bool,
    },
}

/// Executes one CLI command against the shared state and services
///
/// The controller is the only UI-facing context: it subscribes to
/// [`StateChange`] events for live output and performs `save_all` on exit
/// paths that mutated settings.
pub struct CliController {
    state: Arc<StateManager>,
    config: ConfigManager,
    credentials: Arc<CredentialStore>,
    runner: Arc<BuildRunner>,
}

impl CliController {
    pub fn new(
        state: Arc<StateManager>,
        config: ConfigManager,
        credentials: Arc<CredentialStore>,
        runner: Arc<BuildRunner>,
    ) -> Self {
        Self {
            state,
            config,
            credentials,
            runner,
        }
    }

    /// Dispatch one parsed command and return the process exit code
    pub async fn execute(&self, command: Command) -> Result<ExitCode> {
        match command {
            Command::Profiles => self.cmd_profiles(),
            Command::Check { profile } => self.cmd_check(&profile),
            Command::Build { profile } => self.cmd_build(&profile).await,
            Command::SetLogin { login } => self.cmd_set_login(login),
            Command::SetBuilderPath { path } => self.cmd_set_builder_path(path),
            Command::SetPassword { no_remember } => self.cmd_set_password(no_remember),
        }
    }

    fn cmd_profiles(&self) -> Result<ExitCode> {
        let profiles: Vec<AppProfile> =
            self.state.read(|s| s.profiles.values().cloned().collect());

        if profiles.is_empty() {
            println!("No profiles found under {}", self.config.profiles_dir());
            println!("Create one JSON file per app profile in that directory.");
            return Ok(ExitCode::SUCCESS);
        }

        println!("{} profile(s) loaded:", profiles.len());
        for profile in &profiles {
            let app_id = if profile.app_id.is_empty() {
                "(none)"
            } else {
                profile.app_id.as_str()
            };
            let mut line = format!(
                "   • {} (App ID: {}, depots: {})",
                profile.name,
                app_id,
                profile.depots.len()
            );
            if !profile.is_buildable() {
                line.push_str(" [not buildable]");
            }
            println!("{}", line);
        }
        Ok(ExitCode::SUCCESS)
    }

    fn cmd_check(&self, profile: &str) -> Result<ExitCode> {
        let passed = self.runner.check_build(profile)?;
        print!("{}", self.state.read(|s| s.build_log.clone()));
        Ok(if passed {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }

    /// Run a real build, streaming the session log to stdout as it grows
    ///
    /// Ctrl-C is forwarded to the runner as a cancel request rather than
    /// killing the process, so SteamCMD gets torn down cleanly and the
    /// session ends with a `Cancelled` outcome.
    async fn cmd_build(&self, profile: &str) -> Result<ExitCode> {
        // Subscribe before starting so no early events are missed
        let mut rx = self.state.subscribe();
        let printer = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(StateChange::LogAppended { text }) => {
                        print!("{}", text);
                        let _ = std::io::stdout().flush();
                    }
                    Ok(StateChange::BuildFinished { .. }) | Ok(StateChange::BuildAborted) => {
                        break;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("Log printer lagged, {} events missed", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let cancel_runner = Arc::clone(&self.runner);
        let ctrl_c = tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if !cancel_runner.request_cancel() {
                    info!("Ctrl-C received while no build was running");
                }
            }
        });

        let result = self.runner.run_build(profile).await;

        ctrl_c.abort();
        let _ = tokio::time::timeout(PRINTER_FLUSH_TIMEOUT, printer).await;

        match result {
            Ok(BuildOutcome::Succeeded) => Ok(ExitCode::SUCCESS),
            Ok(BuildOutcome::Failed(_)) => Ok(ExitCode::FAILURE),
            Ok(BuildOutcome::Cancelled) => Ok(ExitCode::from(130)),
            Err(err) => {
                // The session log already explained the failure; keep stderr short
                error!("Build did not run: {:#}", err);
                eprintln!("Build did not run: {}", err);
                Ok(ExitCode::FAILURE)
            }
        }
    }

    fn cmd_set_login(&self, login: String) -> Result<ExitCode> {
        self.state.set_login_name(login.clone());
        self.save_settings()?;
        println!("Login name set to '{}'", login);
        Ok(ExitCode::SUCCESS)
    }

    fn cmd_set_builder_path(&self, path: String) -> Result<ExitCode> {
        if !Utf8Path::new(&path).exists() {
            eprintln!("Warning: '{}' does not exist yet", path);
        }
        self.state.set_builder_path(path.clone());
        self.save_settings()?;
        println!("Builder path set to '{}'", path);
        Ok(ExitCode::SUCCESS)
    }

    fn cmd_set_password(&self, no_remember: bool) -> Result<ExitCode> {
        let login = self.state.read(|s| s.config.login_name.clone());
        if login.is_empty() {
            eprintln!("No login name configured. Run set-login first.");
            return Ok(ExitCode::FAILURE);
        }

        eprint!("Password for {}: ", login);
        let mut secret = String::new();
        std::io::stdin()
            .read_line(&mut secret)
            .context("Failed to read password from stdin")?;
        let secret = secret.trim_end_matches(['\r', '\n']);
        if secret.is_empty() {
            eprintln!("Empty password; nothing stored.");
            return Ok(ExitCode::FAILURE);
        }

        let remember = !no_remember;
        self.credentials.store(&login, secret, remember)?;
        self.state.set_remember_password(remember);
        self.save_settings()?;

        if remember {
            println!("Password stored for '{}'", login);
        } else {
            println!("Password set for this session only; persisted copy cleared");
        }
        Ok(ExitCode::SUCCESS)
    }

    /// Persist settings after a mutating command
    fn save_settings(&self) -> Result<()> {
        let state = self.state.snapshot();
        self.config.save_all(&state.config, state.profiles.values())
    }
}
