//! Data models for the steampipe application.
//!
//! This module contains all the core data structures used throughout the application:
//! - [`AppState`]: The central state container holding config, profiles, and the build session
//! - [`AppProfile`] / [`DepotConfig`]: One named Steam app build and its content depots
//! - [`ToolConfig`]: Global settings loaded from `config.json` (builder path, login, remember flag)
//! - [`BuildPhase`] / [`BuildOutcome`]: Build session state machine and how a session ended
//! - [`MAX_CONCURRENT_BUILDS`]: Critical concurrency limit constant (always 1, single SteamCMD session)
//!
//! # Architecture Note
//!
//! The models are designed to be:
//! - **Serializable**: Profile and config records derive `Serialize`/`Deserialize` for JSON persistence
//! - **Cloneable**: AppState is wrapped in `Arc<RwLock<>>` by [`StateManager`](crate::state::StateManager) for thread-safe access
//! - **Immutable**: State updates go through StateManager's `update()` method to ensure consistency

pub mod app_state;
pub mod config;
pub mod profile;

pub use app_state::{AppState, BuildOutcome, BuildPhase, MAX_CONCURRENT_BUILDS};
pub use config::ToolConfig;
pub use profile::{AppProfile, DepotConfig};
