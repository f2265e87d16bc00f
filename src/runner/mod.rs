// Build orchestration module
//
// Drives one SteamCMD upload session end to end: pre-flight checks, VDF
// script rendering, executable discovery, process supervision with live
// output streaming, Steam Guard detection, and user cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use camino::Utf8Path;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::metrics::Metrics;
use crate::models::{AppProfile, BuildOutcome, BuildPhase, ToolConfig};
use crate::services::locator;
use crate::services::notify::{Notifier, STEAM_GUARD_BODY, STEAM_GUARD_TITLE};
use crate::services::secrets::CredentialStore;
use crate::services::steamcmd::{
    BuildError, NETWORK_REMEDIATION, OutputLine, SteamCmdService,
};
use crate::services::vdf;
use crate::state::StateManager;

/// How long to keep draining buffered output after the process exits
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Orchestrates SteamCMD build sessions against the shared application state
///
/// At most one session runs at a time; a second [`run_build`](Self::run_build)
/// call while one is active fails with [`BuildError::AlreadyRunning`]. All
/// user-visible progress goes into the session log on
/// [`AppState`](crate::models::AppState), so every subscriber (the terminal
/// front end, tests) sees the same stream of
/// [`StateChange`](crate::state::StateChange) events.
///
/// The runner owns the pieces a session needs beyond the state itself:
/// the SteamCMD service, the credential store the password is fetched from
/// at launch time, the notifier used for Steam Guard alerts, and the
/// cancellation channel for the in-flight session.
pub struct BuildRunner {
    state: Arc<StateManager>,
    service: SteamCmdService,
    credentials: Arc<CredentialStore>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<Metrics>,

    /// Cancellation sender for the in-flight session, if any
    cancel_tx: Mutex<Option<watch::Sender<bool>>>,

    /// Whether notification authorization was already requested this process
    authorization_requested: AtomicBool,
}

impl BuildRunner {
    pub fn new(
        state: Arc<StateManager>,
        credentials: Arc<CredentialStore>,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            state,
            service: SteamCmdService::new(),
            credentials,
            notifier,
            metrics,
            cancel_tx: Mutex::new(None),
            authorization_requested: AtomicBool::new(false),
        }
    }

    /// Run a full build session for the named profile
    ///
    /// Walks the whole pipeline: pre-flight checks, VDF rendering, SteamCMD
    /// discovery, process supervision, and outcome classification. Progress
    /// is appended to the session log as it happens, so subscribers can
    /// stream it live.
    ///
    /// # Returns
    /// The session outcome. Pre-flight and launch failures abort the session
    /// without an outcome and surface as [`BuildError`] values instead.
    pub async fn run_build(&self, profile_name: &str) -> Result<BuildOutcome> {
        // Busy check and session start must be one atomic state update, or
        // two concurrent calls could both pass the check
        let mut rejected = false;
        self.state.update(|state| {
            if state.is_building() {
                rejected = true;
            } else {
                state.begin_session(profile_name);
            }
        });
        if rejected {
            return Err(BuildError::AlreadyRunning.into());
        }

        info!("Build session started for profile '{}'", profile_name);
        let started = Instant::now();

        match self.drive_session(profile_name).await {
            Ok(outcome) => {
                self.clear_cancel();
                self.state.finish_session(outcome);
                self.record_outcome(outcome, started.elapsed());
                Ok(outcome)
            }
            Err(err) => {
                self.clear_cancel();
                self.state.abort_session();
                warn!("Build session aborted: {:#}", err);
                Err(err)
            }
        }
    }

    /// Ask the in-flight session to stop
    ///
    /// Only a session in the `Running` phase can be cancelled; earlier phases
    /// finish too quickly to interrupt. Returns whether a cancel request was
    /// delivered.
    pub fn request_cancel(&self) -> bool {
        if !self.state.read(|s| s.build_phase == BuildPhase::Running) {
            return false;
        }
        match self.cancel_tx.lock().unwrap().as_ref() {
            Some(tx) => {
                info!("Cancellation requested");
                tx.send(true).is_ok()
            }
            None => false,
        }
    }

    /// Validate a profile locally and render its scripts without uploading
    ///
    /// Replaces the session log with a validation report: profile fields,
    /// depot configuration (including whether each content root exists),
    /// Steam settings, and a preview of the rendered app script. Only profile
    /// and depot problems fail the check; missing Steam settings are reported
    /// but do not block rendering.
    ///
    /// # Returns
    /// `Ok(true)` when validation passed and the scripts were rendered.
    pub fn check_build(&self, profile_name: &str) -> Result<bool> {
        if self.state.read(|s| s.is_building()) {
            return Err(BuildError::AlreadyRunning.into());
        }

        let (profile, config) = self
            .state
            .read(|s| (s.profile(profile_name).cloned(), s.config.clone()));
        let profile = match profile {
            Some(profile) => profile,
            None => return Err(BuildError::ProfileNotFound(profile_name.to_string()).into()),
        };

        self.state.update(|s| s.build_log.clear());

        let (report, passed) = self.check_report(&profile, &config);
        self.state.append_log(&report);
        Ok(passed)
    }

    /// The session pipeline from pre-flight to outcome
    ///
    /// Every failure path appends its diagnostic to the session log before
    /// returning, so the log always explains what stopped the build.
    async fn drive_session(&self, profile_name: &str) -> Result<BuildOutcome> {
        // Pre-flight: profile exists, has an App ID, and a password is available
        let (profile, config) = self
            .state
            .read(|s| (s.profile(profile_name).cloned(), s.config.clone()));
        let profile = match profile {
            Some(profile) => profile,
            None => {
                self.state
                    .append_log(&format!("❌ Error: Profile '{}' not found", profile_name));
                return Err(BuildError::ProfileNotFound(profile_name.to_string()).into());
            }
        };

        if !profile.is_buildable() {
            self.state.append_log("❌ Error: App ID is required");
            return Err(BuildError::MissingAppId.into());
        }

        let login = config.login_name.clone();
        let password = match self.credentials.lookup(&login) {
            Ok(Some(password)) => password,
            Ok(None) => {
                self.state
                    .append_log("❌ Error: Password is required to run the build.");
                self.state
                    .append_log("💡 Set it with the set-password command.");
                return Err(BuildError::MissingPassword(login).into());
            }
            Err(err) => {
                warn!("Secret store lookup failed: {:#}", err);
                self.state
                    .append_log("❌ Error: Password is required to run the build.");
                return Err(BuildError::MissingPassword(login).into());
            }
        };

        // Render the build scripts for this session
        self.state
            .append_log(&format!("📦 Generating VDF files for '{}'...", profile.name));
        let render = match vdf::render_scripts(&profile, &config) {
            Ok(render) => render,
            Err(err) => {
                self.state
                    .append_log(&format!("❌ Failed to generate VDF files: {:#}", err));
                return Err(err);
            }
        };
        for path in &render.written {
            self.metrics.record_script_written();
            self.state
                .append_log(&format!("   - {}", path.file_name().unwrap_or(path.as_str())));
        }

        // Find a runnable SteamCMD under the builder directory
        self.state.set_phase(BuildPhase::Locating);
        let base = config.builder_base();
        let steamcmd = match locator::locate_steamcmd(&base) {
            Some(path) => path,
            None => {
                let mut msg =
                    String::from("❌ SteamCMD not found!\nSearched in the following locations:");
                for candidate in locator::candidate_paths(&base) {
                    msg.push_str(&format!("\n   • {}", candidate));
                }
                msg.push_str(
                    "\n💡 Tips:\
                     \n   1. Make sure you've downloaded the Steamworks SDK\
                     \n   2. Set the builder path to the ContentBuilder directory\
                     \n   3. Common path: /path/to/sdk/tools/ContentBuilder\
                     \n   4. Run: chmod +x <builder path>/steamcmd.sh",
                );
                self.state.append_log(&msg);
                return Err(BuildError::SteamCmdNotFound(base).into());
            }
        };
        if !locator::is_executable(&steamcmd) {
            self.state.append_log(&format!(
                "❌ SteamCMD found but not accessible (permissions?): {}",
                steamcmd
            ));
            return Err(BuildError::SteamCmdNotExecutable(steamcmd).into());
        }
        self.state
            .append_log(&format!("✅ Found SteamCMD at: {}", steamcmd));

        // Arm cancellation for this session
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        *self.cancel_tx.lock().unwrap() = Some(cancel_tx);

        let args = self.service.build_args(&login, &password, &render.app_script);
        self.state.append_log(&format!(
            "🚀 Starting Steam build...\n{}\n",
            self.service
                .describe_command(&steamcmd, &login, &render.app_script)
        ));

        let mut build = match self.service.spawn(&steamcmd, &args) {
            Ok(build) => build,
            Err(err) => {
                // BuildError::Spawn already carries the full message
                self.state.append_log(&format!("❌ {}", err));
                return Err(err.into());
            }
        };
        self.state.set_phase(BuildPhase::Running);

        // Supervise: race process exit, output lines, and cancellation
        let mut guard_notified = false;
        let mut output_open = true;
        let mut cancel_open = true;

        let status = loop {
            tokio::select! {
                status = build.child.wait() => {
                    break status.map_err(BuildError::Process)?;
                }
                line = build.output_rx.recv(), if output_open => {
                    match line {
                        Some(line) => self.handle_output_line(&line, &mut guard_notified),
                        None => output_open = false,
                    }
                }
                changed = cancel_rx.changed(), if cancel_open => {
                    if changed.is_err() {
                        cancel_open = false;
                    } else if *cancel_rx.borrow() {
                        if let Err(err) = build.kill().await {
                            warn!("Failed to kill SteamCMD process: {}", err);
                        }
                        self.state.append_log("\n⚠️ Build cancelled by user");
                        return Ok(BuildOutcome::Cancelled);
                    }
                }
            }
        };

        // The pipes can outlive the process; drain what the readers still
        // hold, bounded in case a grandchild keeps them open
        if output_open {
            let drain = async {
                while let Some(line) = build.output_rx.recv().await {
                    self.handle_output_line(&line, &mut guard_notified);
                }
            };
            let _ = tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, drain).await;
        }

        let code = status.code().unwrap_or(-1);
        if status.success() {
            self.state.append_log("\n✅ Build completed successfully!");
            Ok(BuildOutcome::Succeeded)
        } else {
            self.state
                .append_log(&format!("\n❌ Build failed with exit code: {}", code));
            let log = self.state.read(|s| s.build_log.clone());
            if self.service.has_network_failure(&log) {
                self.state.append_log(NETWORK_REMEDIATION);
            }
            Ok(BuildOutcome::Failed(code))
        }
    }

    /// Feed one child output line into the session log and scan it for the
    /// Steam Guard prompt (notified at most once per session)
    fn handle_output_line(&self, line: &OutputLine, guard_notified: &mut bool) {
        if line.from_stderr {
            debug!("steamcmd stderr: {}", line.text);
        } else {
            debug!("steamcmd: {}", line.text);
        }
        self.metrics.record_output_line();
        self.state.append_log(&line.text);

        if !*guard_notified && self.service.is_guard_prompt(&line.text) {
            *guard_notified = true;
            self.state.mark_guard_notified();
            self.notify_guard();
            self.state
                .append_log("\n🔐 Steam Guard confirmation required - check your mobile device!");
        }
    }

    /// Post the Steam Guard alert, requesting authorization on first use
    fn notify_guard(&self) {
        if !self.authorization_requested.swap(true, Ordering::SeqCst) {
            if let Err(err) = self.notifier.request_authorization() {
                warn!("Notification authorization failed: {:#}", err);
            }
        }
        if let Err(err) = self.notifier.notify(STEAM_GUARD_TITLE, STEAM_GUARD_BODY) {
            warn!("Failed to post Steam Guard notification: {:#}", err);
        }
    }

    fn clear_cancel(&self) {
        self.cancel_tx.lock().unwrap().take();
    }

    fn record_outcome(&self, outcome: BuildOutcome, elapsed: Duration) {
        self.metrics.record_build_time(elapsed);
        match outcome {
            BuildOutcome::Succeeded => self.metrics.record_build_succeeded(),
            BuildOutcome::Failed(_) => self.metrics.record_build_failed(),
            BuildOutcome::Cancelled => self.metrics.record_build_cancelled(),
        }
        info!(
            "Build finished: {:?} in {:.2}s",
            outcome,
            elapsed.as_secs_f64()
        );
    }

    /// Assemble the local validation report and render the scripts when the
    /// profile passes
    ///
    /// Steam settings (builder path, SteamCMD presence, login, password) are
    /// informational; only profile and depot problems gate rendering.
    fn check_report(&self, profile: &AppProfile, config: &ToolConfig) -> (String, bool) {
        let mut report = String::from("🧪 Starting Local Test Build...\n\n");

        report.push_str("📋 Validating Profile Configuration:\n");
        report.push_str(&format!("   Profile Name: {}\n", profile.name));

        if profile.app_id.is_empty() {
            report.push_str("   App ID: ❌ MISSING\n");
            report.push_str("\n❌ Error: App ID is required\n");
            return (report, false);
        }
        report.push_str(&format!("   App ID: ✅ {}\n", profile.app_id));

        if profile.description.is_empty() {
            report.push_str("   Description: (none)\n");
        } else {
            report.push_str(&format!("   Description: {}\n", profile.description));
        }
        report.push_str(&format!("   Depots Count: {}\n", profile.depots.len()));
        if profile.depots.is_empty() {
            report.push_str("⚠️ Warning: No depots configured\n");
        }

        let mut depots_ok = true;
        if !profile.depots.is_empty() {
            report.push_str("\n📦 Validating Depots:\n");
            for (index, depot) in profile.depots.iter().enumerate() {
                report.push_str(&format!("   Depot #{}:\n", index + 1));

                if depot.name.is_empty() {
                    report.push_str("      Name: ⚠️ (unnamed)\n");
                } else {
                    report.push_str(&format!("      Name: {}\n", depot.name));
                }

                if depot.depot_id.is_empty() {
                    report.push_str("      Depot ID: ❌ MISSING\n");
                    depots_ok = false;
                } else {
                    report.push_str(&format!("      Depot ID: ✅ {}\n", depot.depot_id));
                }

                if depot.content_root.is_empty() {
                    report.push_str("      Content Root: ❌ MISSING\n");
                    depots_ok = false;
                } else {
                    report.push_str(&format!("      Content Root: {}\n", depot.content_root));
                    if Utf8Path::new(&depot.content_root).exists() {
                        report.push_str("      Path Status: ✅ Exists\n");
                    } else {
                        report.push_str("      Path Status: ❌ Path not found\n");
                        depots_ok = false;
                    }
                }
            }
        }
        if !depots_ok {
            report.push_str("\n❌ Depot validation failed. Please fix the errors above.\n");
            return (report, false);
        }

        report.push_str("\n⚙️ Validating Steam Configuration:\n");
        if config.has_builder_path() {
            report.push_str(&format!("   Builder Path: {}\n", config.builder_path));
        } else {
            report.push_str("   Builder Path: ❌ MISSING\n");
        }
        match locator::locate_steamcmd(&config.builder_base()) {
            Some(_) => report.push_str("   SteamCMD: ✅ Found\n"),
            None => report.push_str("   SteamCMD: ⚠️ Not found at expected location\n"),
        }
        if config.has_login() {
            report.push_str(&format!("   Username: ✅ {}\n", config.login_name));
        } else {
            report.push_str("   Username: ❌ MISSING\n");
        }
        if matches!(self.credentials.lookup(&config.login_name), Ok(Some(_))) {
            report.push_str("   Password: ✅ Set\n");
        } else {
            report.push_str("   Password: ❌ NOT SET\n");
        }

        report.push_str("\n📝 Generating VDF Files...\n");
        let render = match vdf::render_scripts(profile, config) {
            Ok(render) => render,
            Err(err) => {
                report.push_str(&format!("❌ Failed to generate VDF files: {:#}\n", err));
                return (report, false);
            }
        };
        for _ in &render.written {
            self.metrics.record_script_written();
        }

        report.push_str("✅ VDF files generated successfully!\n");
        report.push_str(&format!("   Location: {}\n", config.scripts_dir()));
        report.push_str("   Files created:\n");
        report.push_str(&format!("      • app_{}.vdf\n", profile.app_id));
        for depot in &profile.depots {
            report.push_str(&format!(
                "      • {}\n",
                vdf::depot_file_name(&depot.depot_id)
            ));
        }

        report.push_str(&format!("\n📄 Preview of app_{}.vdf:\n", profile.app_id));
        report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        report.push_str(&vdf::render_app(profile, config));
        report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

        report.push_str("\n✅ Test Build Completed Successfully!\n");
        report.push_str("\n💡 Everything looks good! You can now:\n");
        report.push_str("   1. Review the generated VDF files\n");
        report.push_str("   2. Run the build command to upload to Steam\n");
        report.push_str("   3. Check the build on your Steamworks dashboard\n");

        (report, true)
    }
}
