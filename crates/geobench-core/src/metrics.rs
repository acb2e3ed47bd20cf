//! Global atomic counters for GeoBench observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (the orchestrator does this at batch end).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters.
pub struct Metrics {
    events_consumed: AtomicU64,
    runs_recorded: AtomicU64,
    runs_failed: AtomicU64,
    snapshots_written: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            events_consumed: AtomicU64::new(0),
            runs_recorded: AtomicU64::new(0),
            runs_failed: AtomicU64::new(0),
            snapshots_written: AtomicU64::new(0),
        }
    }

    /// Increment the agent-events-consumed counter by one.
    pub fn inc_events_consumed(&self) {
        self.events_consumed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "events_consumed", "counter incremented");
    }

    /// Count one recorded run, and one failure when `success` is false.
    pub fn record_run(&self, success: bool) {
        self.runs_recorded.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.runs_failed.fetch_add(1, Ordering::Relaxed);
        }
        tracing::trace!(metric = "runs_recorded", success = success, "counter incremented");
    }

    /// Increment the snapshots-written counter by one.
    pub fn inc_snapshots(&self) {
        self.snapshots_written.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "snapshots_written", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            events_consumed = self.events_consumed(),
            runs_recorded = self.runs_recorded(),
            runs_failed = self.runs_failed(),
            snapshots_written = self.snapshots_written(),
        );
    }

    pub fn events_consumed(&self) -> u64 {
        self.events_consumed.load(Ordering::Relaxed)
    }

    pub fn runs_recorded(&self) -> u64 {
        self.runs_recorded.load(Ordering::Relaxed)
    }

    pub fn runs_failed(&self) -> u64 {
        self.runs_failed.load(Ordering::Relaxed)
    }

    pub fn snapshots_written(&self) -> u64 {
        self.snapshots_written.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.events_consumed.store(0, Ordering::Relaxed);
        self.runs_recorded.store(0, Ordering::Relaxed);
        self.runs_failed.store(0, Ordering::Relaxed);
        self.snapshots_written.store(0, Ordering::Relaxed);
    }
}
