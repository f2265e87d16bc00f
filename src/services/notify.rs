// Out-of-band user alerts
//
// The one alert this tool posts is the Steam Guard prompt: SteamCMD blocks
// mid-upload until the user confirms the login on their phone, so the build
// controller raises a notification the user can see without watching the
// log. The trait seam keeps the controller independent of how the alert is
// delivered.

use anyhow::Result;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Title of the Steam Guard alert
pub const STEAM_GUARD_TITLE: &str = "Steam Guard Required";

/// Body of the Steam Guard alert
pub const STEAM_GUARD_BODY: &str =
    "Please accept login from your Steam Mobile App to continue the build process.";

/// Posts alerts to the user outside the session log
pub trait Notifier: Send + Sync {
    /// Ask the platform for permission to post alerts
    ///
    /// Called once per process before the first [`notify`](Self::notify).
    fn request_authorization(&self) -> Result<()>;

    /// Post one alert
    fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Default notifier for the terminal front end
///
/// Writes the alert to stderr with a terminal bell so it cuts through the
/// streamed build output on stdout.
#[derive(Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for ConsoleNotifier {
    fn request_authorization(&self) -> Result<()> {
        // Nothing to ask for on a terminal
        Ok(())
    }

    fn notify(&self, title: &str, body: &str) -> Result<()> {
        eprintln!("\x07🔔 {}: {}", title, body);
        tracing::info!("Notification posted: {}", title);
        Ok(())
    }
}

/// Notifier that records every call, for tests
#[derive(Default)]
pub struct RecordingNotifier {
    authorization_requests: AtomicUsize,
    posted: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alerts posted so far, in order
    pub fn posted(&self) -> Vec<(String, String)> {
        self.posted.lock().unwrap().clone()
    }

    /// How many times authorization was requested
    pub fn authorization_requests(&self) -> usize {
        self.authorization_requests.load(Ordering::Relaxed)
    }
}

impl Notifier for RecordingNotifier {
    fn request_authorization(&self) -> Result<()> {
        self.authorization_requests.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn notify(&self, title: &str, body: &str) -> Result<()> {
        self.posted
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}
