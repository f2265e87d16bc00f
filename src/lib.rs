// steampipe - Steam content deployment tool built around SteamCMD
//
// This is the library crate containing the core business logic and data structures.
// The binary crate (main.rs) provides the terminal entry point.

pub mod cli;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod runner;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::{AppProfile, AppState, BuildOutcome, BuildPhase, DepotConfig, ToolConfig};
pub use runner::BuildRunner;
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Fixed service identifier used to scope secret-store entries
pub const SERVICE_ID: &str = "steampipe";
