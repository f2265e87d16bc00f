use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

/// Errors raised while preparing or running a SteamCMD build
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("A build is already running")]
    AlreadyRunning,

    #[error("Profile '{0}' not found")]
    ProfileNotFound(String),

    #[error("App ID is empty")]
    MissingAppId,

    #[error("No password available for login '{0}'")]
    MissingPassword(String),

    #[error("SteamCMD not found under {0}")]
    SteamCmdNotFound(Utf8PathBuf),

    #[error("SteamCMD found but not accessible: {0}")]
    SteamCmdNotExecutable(Utf8PathBuf),

    #[error("Failed to start build process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Process error: {0}")]
    Process(#[from] std::io::Error),
}

/// One line of child output, tagged with its source stream
///
/// Both streams get merged into the session log in arrival order; the tag
/// only feeds tracing.
#[derive(Debug, Clone)]
pub struct OutputLine {
    pub from_stderr: bool,
    pub text: String,
}

/// A spawned SteamCMD build: the child handle plus its merged output stream
///
/// Reader tasks for stdout and stderr push lines into `output_rx` as they
/// arrive; the channel closes when both streams hit end-of-file. The handle
/// stays with whoever drives the session, never in shared state.
pub struct RunningBuild {
    pub child: Child,
    pub output_rx: mpsc::UnboundedReceiver<OutputLine>,
}

impl RunningBuild {
    /// Kill the child immediately; no graceful shutdown is attempted
    pub async fn kill(&mut self) -> std::io::Result<()> {
        self.child.kill().await
    }
}

/// Service wrapping SteamCMD invocation and output classification
///
/// Owns the pre-compiled patterns used to classify the output stream:
///
/// - `guard_patterns`: case-insensitive matches for the two phrasings
///   SteamCMD uses while it waits for a Steam Guard confirmation
///   ("please confirm the login", "waiting for confirmation")
///
/// Network-failure classification stays a plain case-sensitive substring
/// scan; those marker strings appear verbatim in SteamCMD output.
pub struct SteamCmdService {
    guard_patterns: Vec<Regex>,
}

/// Marker substrings of a sandboxed-networking failure, scanned case-sensitively
const NETWORK_FAILURE_MARKERS: [&str; 2] = ["CreateBoundSocket", "ERROR (No Connection)"];

/// Guidance appended to the log when a failed build matched a network marker
pub const NETWORK_REMEDIATION: &str = "\n⚠️ Network Connection Error Detected!\n\
This usually means SteamCMD could not open a network socket.\n\n\
To fix this:\n\
1. Check your internet connection\n\
2. Verify the Content Builder path is correct\n\
3. Delete the SteamCMD cache under the builder directory and retry\n\
4. Try running SteamCMD manually from a terminal to verify it works\n";

impl SteamCmdService {
    /// Create a new service with compiled guard-prompt patterns
    pub fn new() -> Self {
        Self {
            guard_patterns: vec![
                Regex::new(r"(?i)please confirm the login").expect("Invalid guard regex"),
                Regex::new(r"(?i)waiting for confirmation").expect("Invalid guard regex"),
            ],
        }
    }

    /// Argument vector for one upload run
    ///
    /// Fixed sequence: log in, run the app build against the rendered app
    /// script, quit.
    pub fn build_args(&self, login: &str, password: &str, app_script: &Utf8Path) -> Vec<String> {
        vec![
            "+login".to_string(),
            login.to_string(),
            password.to_string(),
            "+run_app_build".to_string(),
            app_script.to_string(),
            "+quit".to_string(),
        ]
    }

    /// Printable form of the invocation with the password masked
    pub fn describe_command(
        &self,
        steamcmd: &Utf8Path,
        login: &str,
        app_script: &Utf8Path,
    ) -> String {
        format!(
            "{} +login {} ****** +run_app_build {} +quit",
            steamcmd, login, app_script
        )
    }

    /// Whether a chunk of output is SteamCMD waiting on a Steam Guard
    /// confirmation (case-insensitive)
    pub fn is_guard_prompt(&self, text: &str) -> bool {
        self.guard_patterns.iter().any(|p| p.is_match(text))
    }

    /// Whether the accumulated log carries a known network-failure marker
    pub fn has_network_failure(&self, log: &str) -> bool {
        NETWORK_FAILURE_MARKERS.iter().any(|m| log.contains(m))
    }

    /// Spawn SteamCMD with piped, unbuffered output
    ///
    /// `NSUnbufferedIO=YES` makes the launcher flush line-by-line instead of
    /// in large delayed chunks. Each stream gets its own reader task; both
    /// feed the returned build's single output channel, so per-stream
    /// ordering is preserved and delivery is append-only.
    pub fn spawn(
        &self,
        steamcmd: &Utf8Path,
        args: &[String],
    ) -> Result<RunningBuild, BuildError> {
        tracing::info!("Spawning SteamCMD: {}", steamcmd);

        let mut child = Command::new(steamcmd)
            .args(args)
            .env("NSUnbufferedIO", "YES")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(BuildError::Spawn)?;

        let (tx, output_rx) = mpsc::unbounded_channel();

        if let Some(stdout) = child.stdout.take() {
            spawn_line_reader(stdout, false, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_line_reader(stderr, true, tx);
        }

        Ok(RunningBuild { child, output_rx })
    }
}

impl Default for SteamCmdService {
    fn default() -> Self {
        Self::new()
    }
}

/// Read one child stream line-by-line into the shared output channel
///
/// The task ends at end-of-file or once the receiving side is gone.
fn spawn_line_reader<R>(stream: R, from_stderr: bool, tx: mpsc::UnboundedSender<OutputLine>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(text)) = lines.next_line().await {
            if tx.send(OutputLine { from_stderr, text }).is_err() {
                break;
            }
        }
    });
}
