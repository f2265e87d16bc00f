use indexmap::IndexMap;

use crate::models::{AppProfile, ToolConfig};

/// Maximum number of concurrent SteamCMD build processes.
///
/// **IMPORTANT:** This is hardcoded to 1 because SteamCMD maintains a single
/// login session and content-builder cache per account. Launching a second
/// upload while one is running does not crash, but the two uploads corrupt
/// each other's depot state on the backend.
///
/// This constraint is enforced in the build workflow (see
/// [`crate::runner::BuildRunner`]): starting a build while one is live is
/// rejected before anything is spawned, never queued.
pub const MAX_CONCURRENT_BUILDS: usize = 1;

/// Phase of the build session state machine.
///
/// Transitions: `Idle → Validating → Locating → Running → Idle`. Validation
/// and location failures fall straight back to `Idle` (no process was ever
/// spawned); `Running` ends only through the child's own exit or an explicit
/// cancel, recorded as the session's [`BuildOutcome`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BuildPhase {
    #[default]
    Idle,
    Validating,
    Locating,
    Running,
}

/// How the last build session ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildOutcome {
    Succeeded,
    /// Child exited non-zero; carries the exit code (-1 when killed by a
    /// signal outside our cancel path)
    Failed(i32),
    Cancelled,
}

/// Single source of truth for all application state.
///
/// # Thread Safety
///
/// `AppState` is wrapped in `Arc<RwLock<AppState>>` by
/// [`crate::state::StateManager`] to provide thread-safe access across the
/// application. Never access `AppState` directly - always use
/// [`StateManager`](crate::state::StateManager) methods:
/// - [`read()`](crate::state::StateManager::read) for read-only access
/// - [`update()`](crate::state::StateManager::update) for mutations with automatic change events
///
/// The in-flight child process handle is not part of this struct: `AppState`
/// is `Clone` and diffed for change events, so the handle stays inside the
/// runner's session task.
#[derive(Clone, Debug, Default)]
pub struct AppState {
    /// Global tool configuration (builder path, login, remember flag)
    pub config: ToolConfig,

    /// Loaded profiles keyed by display name, in insertion order
    pub profiles: IndexMap<String, AppProfile>,

    // Build session state
    pub build_phase: BuildPhase,
    pub active_profile: Option<String>,
    pub build_log: String,
    pub guard_notified: bool,
    pub last_outcome: Option<BuildOutcome>,
}

impl AppState {
    /// True from pre-flight until the session terminates
    pub fn is_building(&self) -> bool {
        self.build_phase != BuildPhase::Idle
    }

    /// Check if the settings needed to launch SteamCMD are present.
    ///
    /// The password is not part of this check; it lives in the secret store
    /// and is only fetched at build time.
    pub fn is_build_ready(&self) -> bool {
        self.config.has_builder_path() && self.config.has_login()
    }

    /// Append one line to the session log (newline added)
    pub fn append_log(&mut self, text: &str) {
        self.build_log.push_str(text);
        self.build_log.push('\n');
    }

    /// Start a fresh session: clears the log, the guard flag, and the
    /// previous outcome, then enters `Validating`
    pub fn begin_session(&mut self, profile: impl Into<String>) {
        self.build_log.clear();
        self.guard_notified = false;
        self.last_outcome = None;
        self.active_profile = Some(profile.into());
        self.build_phase = BuildPhase::Validating;
    }

    /// Terminate the session with an outcome and return to `Idle`
    pub fn finish_session(&mut self, outcome: BuildOutcome) {
        self.build_phase = BuildPhase::Idle;
        self.last_outcome = Some(outcome);
    }

    /// Abort a session that never spawned a process (pre-flight or locate
    /// failure); no outcome is recorded
    pub fn abort_session(&mut self) {
        self.build_phase = BuildPhase::Idle;
        self.active_profile = None;
    }

    pub fn profile(&self, name: &str) -> Option<&AppProfile> {
        self.profiles.get(name)
    }

    /// Insert or replace a profile under its display name
    pub fn upsert_profile(&mut self, profile: AppProfile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    /// Remove a profile, preserving the order of the rest
    pub fn remove_profile(&mut self, name: &str) -> Option<AppProfile> {
        self.profiles.shift_remove(name)
    }

    pub fn profile_names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}
