//! Health monitoring and metrics for the perception pipeline

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Health metrics for a running pipeline.
///
/// Tracks counters and timestamps to monitor pipeline behavior. All fields
/// use atomic operations for thread-safe access from the fan-out tasks and
/// the merge task.
pub struct PipelineHealth {
    /// Number of video frames submitted to the fan-out.
    pub frames_submitted: AtomicU64,

    /// Number of audio chunks submitted to the fan-out.
    pub audio_submitted: AtomicU64,

    /// Number of stage invocations started.
    pub invocations_started: AtomicU64,

    /// Number of stage invocations that failed.
    pub invocation_failures: AtomicU64,

    /// Number of stage results merged into the composite state.
    pub results_merged: AtomicU64,

    /// Timestamp (Unix microseconds) of the last merged result.
    pub last_merge_time: AtomicU64,
}

impl PipelineHealth {
    /// Create a new health metrics instance.
    pub fn new() -> Self {
        Self {
            frames_submitted: AtomicU64::new(0),
            audio_submitted: AtomicU64::new(0),
            invocations_started: AtomicU64::new(0),
            invocation_failures: AtomicU64::new(0),
            results_merged: AtomicU64::new(0),
            last_merge_time: AtomicU64::new(now_micros()),
        }
    }

    pub fn record_frame_submitted(&self) {
        self.frames_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_audio_submitted(&self) {
        self.audio_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invocation_started(&self) {
        self.invocations_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invocation_failure(&self) {
        self.invocation_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a result merged into the composite state.
    pub fn record_merge(&self) {
        self.results_merged.fetch_add(1, Ordering::Relaxed);
        self.last_merge_time.store(now_micros(), Ordering::Relaxed);
    }

    pub fn frames_submitted(&self) -> u64 {
        self.frames_submitted.load(Ordering::Relaxed)
    }

    pub fn audio_submitted(&self) -> u64 {
        self.audio_submitted.load(Ordering::Relaxed)
    }

    pub fn invocations_started(&self) -> u64 {
        self.invocations_started.load(Ordering::Relaxed)
    }

    pub fn invocation_failures(&self) -> u64 {
        self.invocation_failures.load(Ordering::Relaxed)
    }

    pub fn results_merged(&self) -> u64 {
        self.results_merged.load(Ordering::Relaxed)
    }

    pub fn last_merge_time(&self) -> u64 {
        self.last_merge_time.load(Ordering::Relaxed)
    }

    /// Fraction of started invocations that failed, as a percentage.
    pub fn failure_rate(&self) -> f64 {
        let started = self.invocations_started();
        if started == 0 {
            return 0.0;
        }
        (self.invocation_failures() as f64 / started as f64) * 100.0
    }

    /// Check whether no result has been merged for the given duration.
    pub fn is_stalled(&self, threshold: Duration) -> bool {
        let elapsed = now_micros().saturating_sub(self.last_merge_time());
        elapsed > threshold.as_micros() as u64
    }

    /// Get a snapshot of the current metrics.
    pub fn summary(&self) -> HealthSummary {
        HealthSummary {
            frames_submitted: self.frames_submitted(),
            audio_submitted: self.audio_submitted(),
            invocations_started: self.invocations_started(),
            invocation_failures: self.invocation_failures(),
            results_merged: self.results_merged(),
            failure_rate: self.failure_rate(),
        }
    }
}

impl Default for PipelineHealth {
    fn default() -> Self {
        Self::new()
    }
}

fn now_micros() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_micros() as u64
}

/// Snapshot of health metrics.
#[derive(Debug, Clone)]
pub struct HealthSummary {
    pub frames_submitted: u64,
    pub audio_submitted: u64,
    pub invocations_started: u64,
    pub invocation_failures: u64,
    pub results_merged: u64,
    pub failure_rate: f64,
}

impl std::fmt::Display for HealthSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Health: {} frames + {} audio in, {} invocations ({} failed, {:.2}%), {} results merged",
            self.frames_submitted,
            self.audio_submitted,
            self.invocations_started,
            self.invocation_failures,
            self.failure_rate,
            self.results_merged
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_counters() {
        let health = PipelineHealth::new();

        health.record_frame_submitted();
        health.record_frame_submitted();
        health.record_audio_submitted();
        for _ in 0..6 {
            health.record_invocation_started();
        }
        health.record_invocation_failure();
        for _ in 0..5 {
            health.record_merge();
        }

        assert_eq!(health.frames_submitted(), 2);
        assert_eq!(health.audio_submitted(), 1);
        assert_eq!(health.invocations_started(), 6);
        assert_eq!(health.invocation_failures(), 1);
        assert_eq!(health.results_merged(), 5);
        assert!((health.failure_rate() - 100.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_failure_rate_without_invocations() {
        let health = PipelineHealth::new();
        assert_eq!(health.failure_rate(), 0.0);
    }

    #[test]
    fn test_stall_detection() {
        let health = PipelineHealth::new();

        // Fresh pipeline is not stalled.
        assert!(!health.is_stalled(Duration::from_secs(1)));

        health.record_merge();
        std::thread::sleep(Duration::from_millis(150));

        assert!(health.is_stalled(Duration::from_millis(100)));
        assert!(!health.is_stalled(Duration::from_secs(10)));
    }
}
