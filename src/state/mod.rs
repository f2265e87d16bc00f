// State management module
//
// This module provides the StateManager which wraps AppState with thread-safe access
// using Arc<RwLock<T>> and emits change events for front-end updates.

use crate::metrics::Metrics;
use crate::models::{AppProfile, AppState, BuildOutcome, BuildPhase, ToolConfig};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when state is modified
///
/// These events are emitted to notify interested parties (primarily the
/// front end) about state changes without requiring them to poll the state.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// Tool configuration has been updated (builder path or login)
    ConfigurationChanged {
        is_build_ready: bool,
    },

    /// Non-path settings have been updated (remember-password flag)
    SettingsChanged,

    /// The profile set changed (added, removed, or edited)
    ProfileListChanged {
        count: usize,
    },

    /// A build session has started pre-flight
    BuildStarted {
        profile: String,
    },

    /// The build session moved to a new phase
    PhaseChanged {
        phase: BuildPhase,
    },

    /// Text was appended to the session log
    LogAppended {
        text: String,
    },

    /// The guard prompt was seen for the first time this session
    GuardPromptDetected,

    /// A build session terminated with an outcome
    BuildFinished {
        outcome: BuildOutcome,
    },

    /// A build session ended before anything was spawned (pre-flight or
    /// locate failure); does not count as a build attempt
    BuildAborted,
}

/// Thread-safe state manager with event emission
///
/// This is the central state management component that:
/// - Provides thread-safe access to [`AppState`] via `Arc<RwLock<T>>`
/// - Detects state changes and emits [`StateChange`] events
/// - Supports subscribing to state changes via tokio broadcast channels
///
/// # Usage
///
/// Always use `StateManager` instead of accessing [`AppState`] directly:
/// - [`read()`](Self::read) for reading state without cloning
/// - [`update()`](Self::update) for mutations with automatic event emission
/// - [`subscribe()`](Self::subscribe) for listening to state changes
///
/// # Related Types
///
/// - [`crate::models::AppState`]: The underlying state structure
/// - [`StateChange`]: Event types emitted on state mutations
/// - [`crate::config::ConfigManager`]: Loads configurations into state
/// - [`crate::runner::BuildRunner`]: Primary producer of session events
pub struct StateManager {
    /// The application state protected by RwLock for thread-safe access
    state: Arc<RwLock<AppState>>,

    /// Broadcast channel for emitting state change events
    /// Multiple subscribers can listen for state changes
    state_tx: broadcast::Sender<StateChange>,

    /// Optional sink for update and broadcast counters
    metrics: Option<Arc<Metrics>>,
}

impl StateManager {
    /// Create a new StateManager with default state
    ///
    /// # Returns
    /// A new StateManager with a broadcast channel buffer of 100 events
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(AppState::default())),
            state_tx,
            metrics: None,
        }
    }

    /// Create a StateManager that reports update and broadcast counters
    pub fn with_metrics(metrics: Arc<Metrics>) -> Self {
        let mut manager = Self::new();
        manager.metrics = Some(metrics);
        manager
    }

    /// Get a read-only snapshot of the current state
    ///
    /// This clones the entire state, so it's safe to use without holding locks.
    /// For checking individual fields, consider using `read()` with a closure.
    pub fn snapshot(&self) -> AppState {
        self.state.read().unwrap().clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let busy = state_manager.read(|state| state.is_building());
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AppState) -> R,
    {
        let state = self.state.read().unwrap();
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// This is the primary way to modify state. It:
    /// 1. Captures the old state
    /// 2. Applies the update function
    /// 3. Detects what changed
    /// 4. Emits appropriate events
    ///
    /// # Arguments
    /// * `update_fn` - A function that mutates the state
    ///
    /// # Returns
    /// A vector of StateChange events that were emitted
    ///
    /// # Example
    /// ```ignore
    /// state_manager.update(|state| {
    ///     state.build_phase = BuildPhase::Running;
    /// });
    /// ```
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut AppState),
    {
        let mut state = self.state.write().unwrap();
        let old_state = state.clone();

        // Apply the update
        update_fn(&mut state);

        // Detect changes and emit events
        let changes = self.detect_changes(&old_state, &state);

        if let Some(metrics) = &self.metrics {
            metrics.record_state_update();
        }

        for change in &changes {
            // Send errors just mean no one is listening right now
            let delivered = self.state_tx.send(change.clone()).is_ok();
            if let Some(metrics) = &self.metrics {
                if delivered {
                    metrics.record_state_broadcast();
                } else {
                    metrics.record_state_broadcast_error();
                }
            }
        }

        changes
    }

    /// Subscribe to state change events
    ///
    /// Returns a receiver that will get notified of all future state changes.
    /// Multiple subscribers can listen simultaneously.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    /// Detect what changed between two states and generate events
    ///
    /// This is called internally by `update()` to determine which events to emit.
    fn detect_changes(&self, old: &AppState, new: &AppState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        // Tool configuration changes
        if old.config.builder_path != new.config.builder_path
            || old.config.login_name != new.config.login_name
        {
            changes.push(StateChange::ConfigurationChanged {
                is_build_ready: new.is_build_ready(),
            });
        }

        if old.config.remember_password != new.config.remember_password {
            changes.push(StateChange::SettingsChanged);
        }

        // Profile set changes
        if old.profiles != new.profiles {
            changes.push(StateChange::ProfileListChanged {
                count: new.profiles.len(),
            });
        }

        // Session lifecycle changes
        if !old.is_building() && new.is_building() {
            changes.push(StateChange::BuildStarted {
                profile: new.active_profile.clone().unwrap_or_default(),
            });
        }

        if old.build_phase != new.build_phase {
            changes.push(StateChange::PhaseChanged {
                phase: new.build_phase,
            });
        }

        // Log growth; a cleared log (session start) emits nothing
        if old.build_log != new.build_log {
            match new.build_log.strip_prefix(old.build_log.as_str()) {
                Some(delta) => changes.push(StateChange::LogAppended {
                    text: delta.to_string(),
                }),
                None if !new.build_log.is_empty() => changes.push(StateChange::LogAppended {
                    text: new.build_log.clone(),
                }),
                None => {}
            }
        }

        if !old.guard_notified && new.guard_notified {
            changes.push(StateChange::GuardPromptDetected);
        }

        // Termination events come last so subscribers processing in order
        // see the final log text before reacting to completion
        if old.is_building() && !new.is_building() {
            match new.last_outcome {
                Some(outcome) if old.last_outcome != new.last_outcome => {
                    changes.push(StateChange::BuildFinished { outcome });
                }
                _ => changes.push(StateChange::BuildAborted),
            }
        }

        changes
    }

    // Convenience methods for common state updates

    /// Set the ContentBuilder base path
    pub fn set_builder_path(&self, path: String) -> Vec<StateChange> {
        self.update(|state| {
            state.config.builder_path = path;
        })
    }

    /// Set the Steam login name
    pub fn set_login_name(&self, login: String) -> Vec<StateChange> {
        self.update(|state| {
            state.config.login_name = login;
        })
    }

    /// Set the remember-password flag
    pub fn set_remember_password(&self, remember: bool) -> Vec<StateChange> {
        self.update(|state| {
            state.config.remember_password = remember;
        })
    }

    /// Load the tool configuration at startup
    pub fn load_config(&self, config: ToolConfig) -> Vec<StateChange> {
        self.update(|state| {
            tracing::info!(
                "Loaded tool config: builder_path={:?}, login={:?}, remember={}",
                config.builder_path,
                config.login_name,
                config.remember_password
            );
            state.config = config;
        })
    }

    /// Replace the whole profile set (startup bulk load)
    pub fn set_profiles(&self, profiles: Vec<AppProfile>) -> Vec<StateChange> {
        self.update(|state| {
            state.profiles.clear();
            for profile in profiles {
                state.upsert_profile(profile);
            }
        })
    }

    /// Insert or replace one profile
    pub fn upsert_profile(&self, profile: AppProfile) -> Vec<StateChange> {
        self.update(|state| {
            state.upsert_profile(profile);
        })
    }

    /// Remove one profile by name
    pub fn remove_profile(&self, name: &str) -> Vec<StateChange> {
        self.update(|state| {
            state.remove_profile(name);
        })
    }

    /// Append one line to the session log
    pub fn append_log(&self, text: &str) -> Vec<StateChange> {
        self.update(|state| {
            state.append_log(text);
        })
    }

    /// Enter pre-flight for a new session
    pub fn begin_session(&self, profile: &str) -> Vec<StateChange> {
        self.update(|state| {
            state.begin_session(profile);
        })
    }

    /// Move the live session to a new phase
    pub fn set_phase(&self, phase: BuildPhase) -> Vec<StateChange> {
        self.update(|state| {
            state.build_phase = phase;
        })
    }

    /// Terminate the session with an outcome
    pub fn finish_session(&self, outcome: BuildOutcome) -> Vec<StateChange> {
        self.update(|state| {
            state.finish_session(outcome);
        })
    }

    /// End a session that never spawned a process
    pub fn abort_session(&self) -> Vec<StateChange> {
        self.update(|state| {
            state.abort_session();
        })
    }

    /// Record that the guard notification has been delivered this session
    pub fn mark_guard_notified(&self) -> Vec<StateChange> {
        self.update(|state| {
            state.guard_notified = true;
        })
    }

    /// Get an Arc reference to the state for use in worker threads
    ///
    /// Use this when you need to share state across threads but want
    /// to minimize cloning. Remember to use read/write locks appropriately.
    pub fn state_arc(&self) -> Arc<RwLock<AppState>> {
        Arc::clone(&self.state)
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

// Make StateManager cloneable for sharing across threads
impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
            metrics: self.metrics.clone(),
        }
    }
}
