//! Services module - Pure business logic for SteamCMD build operations.
//!
//! This module contains the core logic for rendering build scripts and driving
//! Valve's SteamCMD tool. The services are **framework-agnostic** and have no
//! dependencies on the front-end layer, making them testable and reusable.
//!
//! # Components
//!
//! - [`vdf`]: Renders app profiles into SteamCMD's VDF text format. Handles:
//!   - Exact-format depot and app descriptor text (SteamCMD parses these)
//!   - Compare-before-write file emission so unchanged renders keep mtimes
//!
//! - [`locator`]: Resolves the SteamCMD launcher under the builder base by
//!   probing the known SDK layouts in a fixed order, and distinguishes a
//!   missing launcher from one that lost its executable bit.
//!
//! - [`SteamCmdService`]: Invocation and output classification for the
//!   SteamCMD subprocess. Handles:
//!   - Building the `+login ... +run_app_build ... +quit` argument sequence
//!   - Spawning with piped, line-buffered output and per-stream reader tasks
//!   - Steam Guard prompt detection (case-insensitive patterns)
//!   - Network-failure heuristics over the accumulated log
//!
//! - [`SecretStore`] / [`CredentialStore`]: Password storage addressed like a
//!   keychain entry, with session-cache semantics for "remember password".
//!
//! - [`Notifier`]: Out-of-band alert seam used for the Steam Guard prompt.
//!
//! # Design Philosophy
//!
//! The services layer is designed to be:
//! - **Pure**: No side effects beyond file I/O and subprocess execution
//! - **Async where it matters**: subprocess streaming uses tokio; small-file
//!   persistence stays synchronous
//! - **Testable**: No hidden dependencies, all inputs are explicit parameters
//! - **Framework-agnostic**: No terminal or GUI code, only business logic
//!
//! # Usage Example
//!
//! ```ignore
//! use steampipe::services::{locator, vdf, SteamCmdService};
//!
//! let report = vdf::render_scripts(&profile, &config)?;
//! let steamcmd = locator::locate_steamcmd(&config.builder_base())
//!     .ok_or(BuildError::SteamCmdNotFound(config.builder_base()))?;
//!
//! let service = SteamCmdService::new();
//! let args = service.build_args(&config.login_name, &password, &report.app_script);
//! let mut build = service.spawn(&steamcmd, &args)?;
//! ```

pub mod locator;
pub mod notify;
pub mod secrets;
pub mod steamcmd;
pub mod vdf;

pub use notify::{ConsoleNotifier, Notifier, RecordingNotifier};
pub use secrets::{CredentialStore, FileSecretStore, MemorySecretStore, SecretStore};
pub use steamcmd::{BuildError, OutputLine, RunningBuild, SteamCmdService};
pub use vdf::{RenderReport, render_scripts};
