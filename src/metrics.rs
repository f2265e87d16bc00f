// Performance metrics module
//
// Provides lightweight metrics tracking for monitoring application performance

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Global performance metrics
///
/// Uses atomic operations for thread-safe metric tracking without locks.
/// Metrics are collected throughout the application lifecycle and can be
/// logged periodically or on shutdown for performance analysis.
#[derive(Debug)]
pub struct Metrics {
    /// Total number of builds that completed successfully
    pub builds_succeeded: AtomicUsize,

    /// Total number of builds that exited with a failure code
    pub builds_failed: AtomicUsize,

    /// Total number of builds cancelled by the user
    pub builds_cancelled: AtomicUsize,

    /// Total build session time in milliseconds
    pub total_build_time_ms: AtomicU64,

    /// Number of output lines streamed from SteamCMD
    pub output_lines: AtomicU64,

    /// Number of VDF scripts written to disk
    pub scripts_written: AtomicU64,

    /// Number of state updates performed
    pub state_updates: AtomicU64,

    /// Number of state broadcasts sent
    pub state_broadcasts: AtomicU64,

    /// Number of state broadcast errors (no active subscribers)
    pub state_broadcast_errors: AtomicU64,

    /// Application start time
    start_time: Instant,
}

impl Metrics {
    /// Create a new Metrics instance
    pub fn new() -> Self {
        Self {
            builds_succeeded: AtomicUsize::new(0),
            builds_failed: AtomicUsize::new(0),
            builds_cancelled: AtomicUsize::new(0),
            total_build_time_ms: AtomicU64::new(0),
            output_lines: AtomicU64::new(0),
            scripts_written: AtomicU64::new(0),
            state_updates: AtomicU64::new(0),
            state_broadcasts: AtomicU64::new(0),
            state_broadcast_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a successful build
    pub fn record_build_succeeded(&self) {
        self.builds_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed build
    pub fn record_build_failed(&self) {
        self.builds_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cancelled build
    pub fn record_build_cancelled(&self) {
        self.builds_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Record wall-clock time for a build session
    pub fn record_build_time(&self, duration: Duration) {
        self.total_build_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    /// Record one line of SteamCMD output
    pub fn record_output_line(&self) {
        self.output_lines.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a VDF script written to disk
    pub fn record_script_written(&self) {
        self.scripts_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a state update
    pub fn record_state_update(&self) {
        self.state_updates.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a state broadcast
    pub fn record_state_broadcast(&self) {
        self.state_broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a state broadcast error
    pub fn record_state_broadcast_error(&self) {
        self.state_broadcast_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Total number of completed build sessions
    pub fn builds_total(&self) -> usize {
        self.builds_succeeded.load(Ordering::Relaxed)
            + self.builds_failed.load(Ordering::Relaxed)
            + self.builds_cancelled.load(Ordering::Relaxed)
    }

    /// Get average build time per session in milliseconds
    pub fn avg_build_time_ms(&self) -> f64 {
        let total = self.total_build_time_ms.load(Ordering::Relaxed);
        let count = self.builds_total();
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        let uptime = self.uptime();
        tracing::info!("=== Performance Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", uptime.as_secs_f64());
        tracing::info!(
            "Builds: {} succeeded, {} failed, {} cancelled",
            self.builds_succeeded.load(Ordering::Relaxed),
            self.builds_failed.load(Ordering::Relaxed),
            self.builds_cancelled.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Total build time: {:.2}s (avg: {:.2}ms per build)",
            self.total_build_time_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            self.avg_build_time_ms()
        );
        tracing::info!(
            "Output lines streamed: {}, scripts written: {}",
            self.output_lines.load(Ordering::Relaxed),
            self.scripts_written.load(Ordering::Relaxed)
        );
        tracing::info!(
            "State updates: {}, broadcasts: {}, errors: {}",
            self.state_updates.load(Ordering::Relaxed),
            self.state_broadcasts.load(Ordering::Relaxed),
            self.state_broadcast_errors.load(Ordering::Relaxed)
        );
    }

    /// Log periodic metrics (for long-running operations)
    pub fn log_periodic(&self) {
        tracing::info!(
            "Metrics: {} builds run, {} output lines, {} state updates, uptime {:.0}s",
            self.builds_total(),
            self.output_lines.load(Ordering::Relaxed),
            self.state_updates.load(Ordering::Relaxed),
            self.uptime().as_secs_f64()
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert_eq!(metrics.builds_succeeded.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.builds_failed.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_record_build_outcomes() {
        let metrics = Metrics::new();

        metrics.record_build_succeeded();
        metrics.record_build_succeeded();
        metrics.record_build_failed();
        metrics.record_build_cancelled();

        assert_eq!(metrics.builds_succeeded.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.builds_failed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.builds_cancelled.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.builds_total(), 4);
    }

    #[test]
    fn test_record_build_time() {
        let metrics = Metrics::new();

        metrics.record_build_succeeded();
        metrics.record_build_time(Duration::from_millis(100));
        metrics.record_build_succeeded();
        metrics.record_build_time(Duration::from_millis(200));

        assert_eq!(metrics.total_build_time_ms.load(Ordering::Relaxed), 300);
        assert_eq!(metrics.avg_build_time_ms(), 150.0);
    }

    #[test]
    fn test_avg_build_time_no_builds() {
        let metrics = Metrics::new();
        assert_eq!(metrics.avg_build_time_ms(), 0.0);
    }

    #[test]
    fn test_uptime() {
        let metrics = Metrics::new();
        thread::sleep(Duration::from_millis(10));
        assert!(metrics.uptime().as_millis() >= 10);
    }

    #[test]
    fn test_stream_and_state_counters() {
        let metrics = Metrics::new();

        metrics.record_output_line();
        metrics.record_script_written();
        metrics.record_state_update();
        metrics.record_state_broadcast();
        metrics.record_state_broadcast_error();

        assert_eq!(metrics.output_lines.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.scripts_written.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.state_updates.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.state_broadcasts.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.state_broadcast_errors.load(Ordering::Relaxed), 1);
    }
}
